#![allow(clippy::collapsible_if)]
pub mod error;
pub mod params;
pub mod result;
pub mod scan_job;

pub use error::JobError;
pub use params::JobParams;
pub use result::{ScanResult, ScanResultBuilder};
pub use scan_job::ScanJob;
