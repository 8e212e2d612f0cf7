pub mod handlers;

pub use handlers::*;

use crate::format::FormatContext;
use crate::normalize::ClassificationRules;
use crate::service::{IngestService, ReportService};
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use tower::ServiceBuilder;

/// 共享状态
#[derive(Clone)]
pub struct AppState {
    pub ingest: Arc<IngestService>,
    pub reports: ReportService,
    pub rules: Arc<ClassificationRules>,
    pub format: Arc<FormatContext>,
}

/// 构建路由
pub fn router(state: AppState, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/api/ingest", post(ingest_archive))
        .route("/api/analyze", post(analyze_archive))
        .route("/api/summary", get(summary))
        .route("/api/invoices", get(list_invoices))
        .route("/api/products/top", get(top_products))
        .route("/api/status", get(status))
        .route("/api/context", get(data_context))
        .layer(ServiceBuilder::new().layer(DefaultBodyLimit::max(max_upload_bytes)))
        .with_state(state)
}
