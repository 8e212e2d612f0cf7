pub mod analyze;
pub mod ingest;
pub mod report;

pub use analyze::{analyze_archive, ArchiveAnalysis};
pub use ingest::{prepare_archive, FileOutcome, FileReport, IngestReport, IngestService, PreparedArchive};
pub use report::ReportService;
