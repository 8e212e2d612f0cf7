pub mod merge;
pub mod pool;
pub mod queries;
pub mod schema;

pub use merge::{fold_invoices, merge, replace_items, upsert_invoices, MergeOutcome};
pub use pool::create_pool;
pub use queries::*;
pub use schema::create_tables;
