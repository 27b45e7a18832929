use crate::models::{QueryResult, Row};
use crate::service::MoiService;
use axum::extract::{Json, State};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// 请求体: SQL语句
#[derive(Debug, Deserialize)]
pub struct SqlQueryRequest {
    pub statement: String,
}

/// 请求体: 查询采购项目
#[derive(Debug, Deserialize)]
pub struct QueryProcurementProjectsRequest {
    pub item_name: String,
}

/// 请求体: 查询历史表现 (embedding 缺失时走LIKE查询)
#[derive(Debug, Deserialize)]
pub struct QueryHistoricalPerformanceRequest {
    pub item_name: String,
    #[serde(default)]
    pub embedding: Option<Vec<f64>>,
}

/// 请求体: 查询二采价格
#[derive(Debug, Deserialize)]
pub struct QuerySecondaryPriceRequest {
    pub item_name: String,
    #[serde(default)]
    pub embedding: Option<Vec<f64>>,
}

/// 响应体 (affected_rows 不外露)
#[derive(Debug, Serialize)]
pub struct SqlQueryResponse {
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
    pub error: Option<String>,
}

impl From<QueryResult> for SqlQueryResponse {
    fn from(result: QueryResult) -> Self {
        Self {
            columns: result.columns,
            rows: result.rows,
            error: result.error,
        }
    }
}

/// 健康检查
pub async fn health_check() -> &'static str {
    "OK"
}

/// 执行SQL查询
///
/// 前端传入SQL语句，后端按原样执行并返回结果
pub async fn run_sql(
    State(service): State<Arc<MoiService>>,
    Json(req): Json<SqlQueryRequest>,
) -> Json<SqlQueryResponse> {
    Json(service.run_sql(&req.statement).await.into())
}

/// 查询采购项目数据
pub async fn query_procurement_projects(
    State(service): State<Arc<MoiService>>,
    Json(req): Json<QueryProcurementProjectsRequest>,
) -> Json<SqlQueryResponse> {
    Json(
        service
            .query_procurement_projects(&req.item_name)
            .await
            .into(),
    )
}

/// 查询潜在供应商历史表现
pub async fn query_historical_performance(
    State(service): State<Arc<MoiService>>,
    Json(req): Json<QueryHistoricalPerformanceRequest>,
) -> Json<SqlQueryResponse> {
    Json(
        service
            .query_historical_performance(&req.item_name, req.embedding.as_deref())
            .await
            .into(),
    )
}

/// 查询二采产品价格库
pub async fn query_secondary_price(
    State(service): State<Arc<MoiService>>,
    Json(req): Json<QuerySecondaryPriceRequest>,
) -> Json<SqlQueryResponse> {
    Json(
        service
            .query_secondary_price(&req.item_name, req.embedding.as_deref())
            .await
            .into(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedding_is_optional() {
        let req: QueryHistoricalPerformanceRequest =
            serde_json::from_str(r#"{"item_name": "螺母"}"#).unwrap();
        assert_eq!(req.item_name, "螺母");
        assert!(req.embedding.is_none());

        let req: QueryHistoricalPerformanceRequest =
            serde_json::from_str(r#"{"item_name": "螺母", "embedding": [0.1, 0.2]}"#).unwrap();
        assert_eq!(req.embedding.unwrap(), vec![0.1, 0.2]);
    }

    #[test]
    fn response_drops_affected_rows() {
        let response: SqlQueryResponse = QueryResult::mutation(3).into();
        let json = serde_json::to_value(&response).unwrap();
        assert!(json.get("affected_rows").is_none());
        assert_eq!(json["columns"], serde_json::json!([]));
        assert_eq!(json["error"], serde_json::Value::Null);
    }
}
