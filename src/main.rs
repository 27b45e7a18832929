use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tracing::info;
use tracing_subscriber::fmt::time::ChronoLocal;
use xunyuan_agent_rust::db::SqlExecutor;
use xunyuan_agent_rust::{api, create_pool, AppConfig, MoiService};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 初始化日志 - 使用本地时间格式
    tracing_subscriber::fmt()
        .with_timer(ChronoLocal::new("%Y-%m-%d %H:%M:%S".to_string()))
        .with_target(true)
        .with_level(true)
        .init();

    // 加载配置
    let config = AppConfig::from_env();
    info!("Starting server with config: {:?}", config);

    // 创建数据库连接池
    let pool = create_pool(&config.database.url).await?;
    info!("Database pool created");

    // 服务在启动时构造一次，经 State 显式注入各 handler
    let executor = Arc::new(SqlExecutor::new(pool));
    let service = Arc::new(MoiService::new(
        executor,
        config.search.max_vector_distance,
    ));

    // 构建路由
    let moi_routes = Router::new()
        .route("/api/moi/run_sql", post(api::run_sql))
        .route(
            "/api/moi/query/procurement-projects",
            post(api::query_procurement_projects),
        )
        .route(
            "/api/moi/query/historical-performance",
            post(api::query_historical_performance),
        )
        .route(
            "/api/moi/query/secondary-price",
            post(api::query_secondary_price),
        )
        .with_state(service);

    let app = Router::new()
        .route("/health", get(api::health_check))
        .merge(moi_routes)
        .layer(ServiceBuilder::new());

    // 启动服务器
    let addr = format!("{}:{}", config.server.host, config.server.port);
    info!("Server listening on {}", addr);
    info!("API Endpoints:");
    info!("  POST /api/moi/run_sql                      - 直接执行SQL");
    info!("  POST /api/moi/query/procurement-projects   - 采购项目查询");
    info!("  POST /api/moi/query/historical-performance - 供应商历史表现");
    info!("  POST /api/moi/query/secondary-price        - 二采产品价格");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
