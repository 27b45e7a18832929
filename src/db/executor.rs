use crate::db::queries::{SqlParam, SqlStatement};
use crate::models::{QueryResult, Row};
use bigdecimal::BigDecimal;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use futures::TryStreamExt;
use serde_json::Value;
use sqlx::mysql::{MySqlPool, MySqlRow};
use sqlx::{Column, Either, Row as _, TypeInfo};
use tracing::{error, info};

/// SQL执行器
///
/// 每次执行从连接池取一个会话，单次尝试不重试；任何失败都转成
/// QueryResult.error 返回，不向上层抛异常。
pub struct SqlExecutor {
    pool: MySqlPool,
}

impl SqlExecutor {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    pub async fn execute(&self, statement: &SqlStatement) -> QueryResult {
        let preview: String = statement.sql.chars().take(500).collect();
        info!("执行SQL查询: {}", preview);

        match self.run(statement).await {
            Ok(result) => {
                if result.affected_rows.is_some() {
                    info!("SQL执行成功（非查询语句）");
                } else {
                    info!("SQL查询成功，返回 {} 行数据", result.rows.len());
                }
                result
            }
            Err(e) => {
                let message = format!("SQL执行错误: {e}");
                error!("{}", message);
                QueryResult::failure(message)
            }
        }
    }

    async fn run(&self, statement: &SqlStatement) -> Result<QueryResult, sqlx::Error> {
        let mut query = sqlx::query(&statement.sql);
        for param in &statement.params {
            query = match param {
                SqlParam::Text(s) => query.bind(s.as_str()),
                SqlParam::Float(f) => query.bind(*f),
            };
        }

        let mut stream = query.fetch_many(&self.pool);
        let mut columns: Vec<String> = Vec::new();
        let mut rows: Vec<Row> = Vec::new();
        let mut affected: u64 = 0;

        while let Some(step) = stream.try_next().await? {
            match step {
                Either::Left(done) => affected = done.rows_affected(),
                Either::Right(row) => {
                    if columns.is_empty() {
                        columns = row
                            .columns()
                            .iter()
                            .map(|c| c.name().to_string())
                            .collect();
                    }
                    rows.push(decode_row(&row)?);
                }
            }
        }

        if columns.is_empty() {
            // 非查询语句，或不返回任何行的查询
            Ok(QueryResult::mutation(affected))
        } else {
            Ok(QueryResult::with_rows(columns, rows))
        }
    }
}

fn decode_row(row: &MySqlRow) -> Result<Row, sqlx::Error> {
    let mut map = Row::with_capacity(row.len());
    for (idx, column) in row.columns().iter().enumerate() {
        map.insert(column.name().to_string(), decode_value(row, idx)?);
    }
    Ok(map)
}

/// 按列类型把MySQL值转成JSON值，保留数值/文本/空值的区分
fn decode_value(row: &MySqlRow, idx: usize) -> Result<Value, sqlx::Error> {
    let type_name = row.column(idx).type_info().name();
    let value = match type_name {
        "BOOLEAN" => row.try_get::<Option<bool>, _>(idx)?.map(Value::Bool),
        "TINYINT" | "SMALLINT" | "MEDIUMINT" | "INT" | "BIGINT" => row
            .try_get::<Option<i64>, _>(idx)?
            .map(|v| Value::Number(v.into())),
        "TINYINT UNSIGNED" | "SMALLINT UNSIGNED" | "MEDIUMINT UNSIGNED" | "INT UNSIGNED"
        | "BIGINT UNSIGNED" => row
            .try_get::<Option<u64>, _>(idx)?
            .map(|v| Value::Number(v.into())),
        "YEAR" => row
            .try_get::<Option<u16>, _>(idx)?
            .map(|v| Value::Number(u64::from(v).into())),
        "FLOAT" => row
            .try_get::<Option<f32>, _>(idx)?
            .map(|v| float_value(f64::from(v))),
        "DOUBLE" => row.try_get::<Option<f64>, _>(idx)?.map(float_value),
        "DECIMAL" => row
            .try_get::<Option<BigDecimal>, _>(idx)?
            .map(decimal_value),
        "DATE" => row
            .try_get::<Option<NaiveDate>, _>(idx)?
            .map(|v| Value::String(v.to_string())),
        "TIME" => row
            .try_get::<Option<NaiveTime>, _>(idx)?
            .map(|v| Value::String(v.to_string())),
        "DATETIME" => row
            .try_get::<Option<NaiveDateTime>, _>(idx)?
            .map(|v| Value::String(v.format("%Y-%m-%d %H:%M:%S").to_string())),
        "TIMESTAMP" => row
            .try_get::<Option<DateTime<Utc>>, _>(idx)?
            .map(|v| Value::String(v.to_rfc3339())),
        "JSON" => row.try_get::<Option<Value>, _>(idx)?,
        _ => match row.try_get::<Option<String>, _>(idx) {
            Ok(v) => v.map(Value::String),
            // BLOB/向量等二进制列，尽力转成文本
            Err(_) => row
                .try_get::<Option<Vec<u8>>, _>(idx)?
                .map(|bytes| Value::String(String::from_utf8_lossy(&bytes).into_owned())),
        },
    };
    Ok(value.unwrap_or(Value::Null))
}

fn float_value(v: f64) -> Value {
    serde_json::Number::from_f64(v)
        .map(Value::Number)
        .unwrap_or(Value::Null)
}

fn decimal_value(v: BigDecimal) -> Value {
    let text = v.to_string();
    match serde_json::from_str::<serde_json::Number>(&text) {
        Ok(n) => Value::Number(n),
        Err(_) => Value::String(text),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn float_value_handles_non_finite() {
        assert_eq!(float_value(2.5), Value::Number(serde_json::Number::from_f64(2.5).unwrap()));
        assert_eq!(float_value(f64::NAN), Value::Null);
    }

    #[test]
    fn decimal_value_stays_numeric() {
        let v = decimal_value(BigDecimal::from_str("1234.56").unwrap());
        assert_eq!(v, serde_json::json!(1234.56));
    }
}
