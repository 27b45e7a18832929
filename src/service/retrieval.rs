use crate::db::queries::{self, EmbeddingColumn, SqlStatement};
use crate::db::SqlExecutor;
use crate::models::QueryResult;
use std::sync::Arc;
use tracing::{info, warn};

/// 查询族：供应商历史表现聚合 或 二采产品价格
#[derive(Debug, Clone, Copy)]
pub enum QueryFamily {
    Performance,
    Price,
}

impl QueryFamily {
    fn vector_statement(
        &self,
        column: EmbeddingColumn,
        vector_literal: &str,
        max_distance: Option<f64>,
    ) -> SqlStatement {
        match self {
            Self::Performance => queries::performance_vector(column, vector_literal, max_distance),
            Self::Price => queries::price_vector(column, vector_literal, max_distance),
        }
    }

    fn fallback_statement(&self, item_name: &str) -> SqlStatement {
        match self {
            Self::Performance => queries::performance_like(item_name),
            Self::Price => queries::price_like(item_name),
        }
    }

    fn label(&self) -> &'static str {
        match self {
            Self::Performance => "历史表现",
            Self::Price => "二采价格",
        }
    }
}

/// 单列向量子查询的结局
#[derive(Debug)]
pub enum VectorOutcome {
    Hit {
        source: EmbeddingColumn,
        result: QueryResult,
    },
    Empty {
        source: EmbeddingColumn,
    },
    Failed {
        source: EmbeddingColumn,
        reason: String,
    },
}

/// 在命中的子查询里选行数最多的；行数相同保留先评估的 (项目名称向量优先)
pub fn select_best(outcomes: Vec<VectorOutcome>) -> Option<(EmbeddingColumn, QueryResult)> {
    let mut best: Option<(EmbeddingColumn, QueryResult)> = None;
    for outcome in outcomes {
        if let VectorOutcome::Hit { source, result } = outcome {
            let better = match &best {
                Some((_, current)) => result.rows.len() > current.rows.len(),
                None => true,
            };
            if better {
                best = Some((source, result));
            }
        }
    }
    best
}

/// MOI数据源查询服务：向量检索优先，LIKE检索兜底
pub struct MoiService {
    executor: Arc<SqlExecutor>,
    /// 向量检索的距离上限；None 表示无条件接受近邻
    max_distance: Option<f64>,
}

impl MoiService {
    pub fn new(executor: Arc<SqlExecutor>, max_distance: Option<f64>) -> Self {
        Self {
            executor,
            max_distance,
        }
    }

    /// 直接执行SQL (run_sql 透传，语句按原样信任)
    pub async fn run_sql(&self, statement: &str) -> QueryResult {
        self.executor.execute(&SqlStatement::raw(statement)).await
    }

    /// 查询采购项目数据，仅LIKE路径
    pub async fn query_procurement_projects(&self, item_name: &str) -> QueryResult {
        self.executor
            .execute(&queries::procurement_search(item_name))
            .await
    }

    /// 查询潜在供应商历史表现
    pub async fn query_historical_performance(
        &self,
        item_name: &str,
        embedding: Option<&[f64]>,
    ) -> QueryResult {
        self.search(QueryFamily::Performance, item_name, embedding)
            .await
    }

    /// 查询二采产品价格库
    pub async fn query_secondary_price(
        &self,
        item_name: &str,
        embedding: Option<&[f64]>,
    ) -> QueryResult {
        self.search(QueryFamily::Price, item_name, embedding).await
    }

    /// 检索策略：向量存在时先对两个向量列各查一次，取命中行数多的；
    /// 全部落空或向量缺失/无效时回退LIKE查询，其结果（含错误）即最终结果。
    async fn search(
        &self,
        family: QueryFamily,
        item_name: &str,
        embedding: Option<&[f64]>,
    ) -> QueryResult {
        if let Some(vector) = embedding.filter(|v| !v.is_empty()) {
            match queries::render_vector(vector) {
                Ok(literal) => {
                    let (first, second) = tokio::join!(
                        self.vector_attempt(family, EmbeddingColumn::ProjectName, &literal),
                        self.vector_attempt(family, EmbeddingColumn::Product, &literal),
                    );
                    if let Some((source, result)) = select_best(vec![first, second]) {
                        info!(
                            "{} 向量检索命中 {} 行 (来源: {})",
                            family.label(),
                            result.rows.len(),
                            source.label()
                        );
                        return result;
                    }
                    info!("{} 向量检索无结果，回退LIKE查询", family.label());
                }
                Err(e) => {
                    warn!("{} 查询向量无效，回退LIKE查询: {}", family.label(), e);
                }
            }
        }

        self.executor
            .execute(&family.fallback_statement(item_name))
            .await
    }

    /// 单列向量子查询；失败只记日志，不影响另一路
    async fn vector_attempt(
        &self,
        family: QueryFamily,
        column: EmbeddingColumn,
        vector_literal: &str,
    ) -> VectorOutcome {
        let statement = family.vector_statement(column, vector_literal, self.max_distance);
        let result = self.executor.execute(&statement).await;
        if let Some(reason) = result.error.clone() {
            warn!("{} {}查询失败: {}", family.label(), column.label(), reason);
            VectorOutcome::Failed {
                source: column,
                reason,
            }
        } else if result.rows.is_empty() {
            VectorOutcome::Empty { source: column }
        } else {
            VectorOutcome::Hit {
                source: column,
                result,
            }
        }
    }
}
