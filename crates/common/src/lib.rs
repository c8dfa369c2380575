pub mod cve;
pub mod error;
pub mod models;

pub use cve::{extract_vulnerability_ids, validate_cve_id};
pub use error::{Error, Result};
pub use models::{ContextRecord, FindingRecord, ScanReport};
