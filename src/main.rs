use nfe_ingest_rust::api::{self, AppState};
use nfe_ingest_rust::{
    create_pool, create_tables, logging, AppConfig, ClassificationRules, FormatContext,
    IngestService, ReportService,
};
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    logging::init();

    // 加载配置 (缺少 DATABASE_URL 直接退出)
    let config = AppConfig::from_env()?;
    info!("Starting server with config: {:?}", config.server);

    // 创建数据库连接池
    let pool = create_pool(&config.database).await?;
    info!("Database pool created");
    create_tables(&pool).await?;

    let rules = Arc::new(ClassificationRules::default());
    let state = AppState {
        ingest: Arc::new(IngestService::new(pool.clone(), config.ingest.clone(), rules.clone())),
        reports: ReportService::new(pool),
        rules,
        format: Arc::new(FormatContext::default()),
    };
    let app = api::router(state, config.ingest.max_upload_bytes());

    // 启动服务器
    let addr = format!("{}:{}", config.server.host, config.server.port);
    info!("Server listening on {}", addr);
    info!("API Endpoints:");
    info!("  POST /api/ingest         - import NF-e ZIP archive");
    info!("  POST /api/analyze        - profile CSV tables in a ZIP");
    info!("  GET  /api/summary | /api/invoices | /api/products/top | /api/status | /api/context");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
