pub mod analysis;
pub mod api;
pub mod archive;
pub mod config;
pub mod db;
pub mod decoder;
pub mod error;
pub mod format;
pub mod logging;
pub mod models;
pub mod normalize;
pub mod service;

pub use config::{AppConfig, IngestConfig};
pub use db::{create_pool, create_tables};
pub use decoder::{decode_table, DecodePolicy, Table, TextEncoding};
pub use format::FormatContext;
pub use normalize::ClassificationRules;
pub use service::{IngestService, ReportService};
