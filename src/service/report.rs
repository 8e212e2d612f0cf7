use crate::db::queries;
use crate::error::PersistenceResult;
use crate::normalize::ClassificationRules;
use crate::models::{DataContext, DatabaseStatus, InvoiceFilter, InvoiceListing, InvoiceSummary, ProductRanking};
use sqlx::PgPool;

pub const DEFAULT_TOP_PRODUCTS: i64 = 10;

/// 报表服务 (只读)
#[derive(Clone)]
pub struct ReportService {
    pool: PgPool,
}

impl ReportService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn summary(&self) -> PersistenceResult<InvoiceSummary> {
        queries::invoice_summary(&self.pool).await
    }

    /// limit 小于 1 时按 1 处理
    pub async fn top_products(&self, limit: Option<i64>) -> PersistenceResult<Vec<ProductRanking>> {
        let limit = limit.unwrap_or(DEFAULT_TOP_PRODUCTS).max(1);
        queries::top_products(&self.pool, limit).await
    }

    pub async fn invoices(&self, filter: &InvoiceFilter) -> PersistenceResult<Vec<InvoiceListing>> {
        queries::query_invoices(&self.pool, filter).await
    }

    pub async fn status(&self) -> DatabaseStatus {
        let status = queries::database_status(&self.pool).await;
        tracing::debug!("{}", status.message());
        status
    }

    pub async fn data_context(&self, rules: &ClassificationRules) -> PersistenceResult<DataContext> {
        queries::data_context(&self.pool, rules).await
    }
}
