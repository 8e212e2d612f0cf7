pub mod invoice;
pub mod report;

pub use invoice::{Invoice, InvoiceItem};
pub use report::{
    DataContext, DatabaseStatus, InvoiceFilter, InvoiceListing, InvoiceSummary, InvoiceTotals,
    ItemTotals, ProductRanking,
};
