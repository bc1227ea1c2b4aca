pub mod catalog;
pub mod config;
pub mod error;
pub mod fetch;
pub mod process;

pub use catalog::{Catalog, ReportKind, Selection};
pub use config::Settings;
pub use error::{CatalogError, DownloadError, TransformError};
pub use fetch::{DownloadEvent, DownloadId, DownloadManager, DownloadRequest};
pub use process::{is_staged, transform};
