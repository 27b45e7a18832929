use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// 查询结果行：列名 -> 值，保持数据库返回的列顺序
pub type Row = IndexMap<String, Value>;

/// SQL查询结果
///
/// error 非空时 columns/rows 为空；affected_rows 仅在非查询语句时出现。
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueryResult {
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub affected_rows: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl QueryResult {
    /// 查询语句的结果集
    pub fn with_rows(columns: Vec<String>, rows: Vec<Row>) -> Self {
        Self {
            columns,
            rows,
            ..Default::default()
        }
    }

    /// 非查询语句 (INSERT/UPDATE/DELETE) 的结果
    pub fn mutation(affected_rows: u64) -> Self {
        Self {
            affected_rows: Some(affected_rows),
            ..Default::default()
        }
    }

    /// 执行失败：错误以数据形式返回，不向调用方抛异常
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            error: Some(message.into()),
            ..Default::default()
        }
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_err(&self) -> bool {
        self.error.is_some()
    }
}
