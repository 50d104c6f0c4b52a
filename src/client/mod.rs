//! Upload client: directory scan, concurrent upload with one retry pass,
//! and result rendering.

pub mod report;
pub mod upload;

pub use report::render_assignment;
pub use upload::{scan_directory, CoordinatorClient, UploadOutcome, UploadReport, Uploader};
