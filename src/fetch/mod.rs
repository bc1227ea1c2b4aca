// src/fetch/mod.rs

use std::{fmt, path::PathBuf};
use url::Url;

pub mod manager;
pub mod payload;

pub use manager::DownloadManager;

/// One fetch as handed over by the caller. Immutable once submitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadRequest {
    pub url: Url,
    pub destination: PathBuf,
}

impl DownloadRequest {
    pub fn new(url: Url, destination: impl Into<PathBuf>) -> Self {
        Self {
            url,
            destination: destination.into(),
        }
    }
}

/// Opaque handle of an in-flight download, unique per manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DownloadId(pub(crate) u64);

impl fmt::Display for DownloadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Notifications raised to the caller.
///
/// Within one item, zero or more `Progress` events precede exactly one of
/// `Finished` or `Failed`. `AllFinished` closes a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadEvent {
    Progress { id: DownloadId, percent: u8 },
    Failed { id: DownloadId, message: String },
    Finished { id: DownloadId, destination: PathBuf },
    AllFinished,
}
