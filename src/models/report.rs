use super::Invoice;
use crate::analysis::TableProfile;
use bigdecimal::BigDecimal;
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// 发票汇总 (单条聚合查询)
#[derive(Debug, Clone, Default, FromRow, Serialize, Deserialize)]
pub struct InvoiceTotals {
    pub total_invoices: i64,
    pub total_value: Option<BigDecimal>,
    pub avg_value: Option<BigDecimal>,
    pub min_date: Option<NaiveDate>,
    pub max_date: Option<NaiveDate>,
    pub unique_emitters: i64,
    pub unique_recipients: i64,
}

/// 明细汇总
#[derive(Debug, Clone, Default, FromRow, Serialize, Deserialize)]
pub struct ItemTotals {
    pub total_items: i64,
    pub total_quantity: Option<BigDecimal>,
    pub total_items_value: Option<BigDecimal>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InvoiceSummary {
    pub invoices: InvoiceTotals,
    pub items: ItemTotals,
}

/// 按商品描述聚合
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct ProductRanking {
    pub descricao_produto: String,
    pub total_quantity: Option<BigDecimal>,
    pub total_value: Option<BigDecimal>,
    pub frequency: i64,
}

/// 发票列表行: 表头 + 明细数量 + 明细合计
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct InvoiceListing {
    pub id: i32,
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub invoice: Invoice,
    pub created_at: Option<NaiveDateTime>,
    pub item_count: i64,
    pub calculated_total: Option<BigDecimal>,
}

/// 发票列表过滤条件 (日期闭区间)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InvoiceFilter {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    /// 发行方税号, 精确匹配
    pub emitente: Option<String>,
}

/// 数据库就绪状态
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DatabaseStatus {
    NoTables,
    Empty,
    Ready { invoice_count: i64 },
    Error { message: String },
}

impl DatabaseStatus {
    pub fn message(&self) -> String {
        match self {
            DatabaseStatus::NoTables => "Database tables not created".to_string(),
            DatabaseStatus::Empty => "Database is empty".to_string(),
            DatabaseStatus::Ready { invoice_count } => {
                format!("Database ready with {} invoices", invoice_count)
            }
            DatabaseStatus::Error { message } => format!("Database error: {}", message),
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, DatabaseStatus::Ready { .. })
    }
}

/// 提供给自然语言问答组件的表格上下文
#[derive(Debug, Clone, Serialize)]
pub struct DataContext {
    pub invoices: Vec<InvoiceListing>,
    pub products: Vec<ProductRanking>,
    /// "invoices" 与 "top_products" 两张表的画像
    pub profiles: Vec<TableProfile>,
}
