use super::AppState;
use crate::error::{ArchiveError, IngestError, PersistenceError};
use crate::models::{DataContext, DatabaseStatus, InvoiceFilter, InvoiceListing, InvoiceSummary, ProductRanking};
use crate::service::{self, ArchiveAnalysis, IngestReport};
use axum::{
    body::Bytes,
    extract::{Json, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// 统一响应体
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub message: String,
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn ok(message: impl Into<String>, data: T) -> Json<Self> {
        Json(Self {
            success: true,
            message: message.into(),
            data: Some(data),
        })
    }
}

/// 接口错误: 压缩包问题 400, 数据库问题 500
#[derive(Debug)]
pub enum ApiError {
    Archive(ArchiveError),
    Persistence(PersistenceError),
}

impl From<ArchiveError> for ApiError {
    fn from(e: ArchiveError) -> Self {
        ApiError::Archive(e)
    }
}

impl From<PersistenceError> for ApiError {
    fn from(e: PersistenceError) -> Self {
        ApiError::Persistence(e)
    }
}

impl From<IngestError> for ApiError {
    fn from(e: IngestError) -> Self {
        match e {
            IngestError::Archive(e) => ApiError::Archive(e),
            IngestError::Persistence(e) => ApiError::Persistence(e),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Archive(e) => (StatusCode::BAD_REQUEST, format!("Error: {}", e)),
            ApiError::Persistence(e) => {
                tracing::error!("Request failed: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, format!("Error: {}", e))
            }
        };
        let body = ApiResponse::<()> {
            success: false,
            message,
            data: None,
        };
        (status, Json(body)).into_response()
    }
}

type ApiResult<T> = Result<Json<ApiResponse<T>>, ApiError>;

/// 发票列表查询参数
#[derive(Debug, Default, Deserialize)]
pub struct InvoiceQuery {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub emitente: Option<String>,
}

impl From<InvoiceQuery> for InvoiceFilter {
    fn from(q: InvoiceQuery) -> Self {
        InvoiceFilter {
            start_date: q.start_date,
            end_date: q.end_date,
            emitente: q.emitente.filter(|e| !e.trim().is_empty()),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct TopProductsQuery {
    pub limit: Option<i64>,
}

/// 健康检查
pub async fn health_check() -> &'static str {
    "OK"
}

/// 导入 ZIP (请求体为原始字节)
pub async fn ingest_archive(State(state): State<AppState>, body: Bytes) -> ApiResult<IngestReport> {
    tracing::info!("Received archive of {} bytes", body.len());
    let report = state.ingest.ingest_archive(&body).await?;
    Ok(ApiResponse::ok(report.summary(), report))
}

/// 分析 ZIP 内的表格, 不写库
pub async fn analyze_archive(State(state): State<AppState>, body: Bytes) -> ApiResult<ArchiveAnalysis> {
    let analysis = service::analyze_archive(&body, state.ingest.config(), &state.rules, &state.format)?;
    let message = format!("Analyzed {} tables", analysis.tables.len());
    Ok(ApiResponse::ok(message, analysis))
}

pub async fn summary(State(state): State<AppState>) -> ApiResult<InvoiceSummary> {
    let summary = state.reports.summary().await?;
    let message = format!("{} invoices", summary.invoices.total_invoices);
    Ok(ApiResponse::ok(message, summary))
}

pub async fn list_invoices(
    State(state): State<AppState>,
    Query(query): Query<InvoiceQuery>,
) -> ApiResult<Vec<InvoiceListing>> {
    let invoices = state.reports.invoices(&query.into()).await?;
    Ok(ApiResponse::ok(format!("{} invoices", invoices.len()), invoices))
}

pub async fn top_products(
    State(state): State<AppState>,
    Query(query): Query<TopProductsQuery>,
) -> ApiResult<Vec<ProductRanking>> {
    let products = state.reports.top_products(query.limit).await?;
    Ok(ApiResponse::ok(format!("{} products", products.len()), products))
}

/// 数据库状态; 数据库不可用时仍返回 200, success 为 false
pub async fn status(State(state): State<AppState>) -> Json<ApiResponse<DatabaseStatus>> {
    let status = state.reports.status().await;
    Json(ApiResponse {
        success: status.is_ready(),
        message: status.message(),
        data: Some(status),
    })
}

pub async fn data_context(State(state): State<AppState>) -> ApiResult<DataContext> {
    let context = state.reports.data_context(&state.rules).await?;
    let message = format!(
        "{} invoices, {} products, {} profiles",
        context.invoices.len(),
        context.products.len(),
        context.profiles.len()
    );
    Ok(ApiResponse::ok(message, context))
}
