// src/error.rs

use std::path::PathBuf;
use thiserror::Error;

/// Per-item failure of a download. Never fatal to the rest of the batch.
#[derive(Debug, Error)]
pub enum DownloadError {
    /// Connection, DNS, TLS, non-success status or a body cut short.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The payload arrived but could not be stored at its destination.
    #[error("could not write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Failure of a single transform call. The source file is kept.
#[derive(Debug, Error)]
pub enum TransformError {
    #[error("could not access {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed document: {0}")]
    Parse(#[from] quick_xml::Error),

    /// A record lacks a field the report needs, or carries one it cannot read.
    #[error("record {record}: {reason}")]
    Structure { record: usize, reason: String },

    #[error("{} does not carry the staging suffix", .0.display())]
    NotStaged(PathBuf),
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("could not read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed reference file {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: quick_xml::Error,
    },

    #[error("reference file {}: {reason}", path.display())]
    Structure { path: PathBuf, reason: String },

    #[error("indicator {indicator} refers to unknown topic {topic}")]
    UnknownTopicRef { indicator: String, topic: String },

    #[error("invalid selection: {0}")]
    Selection(String),

    #[error("invalid API base url: {0}")]
    Url(#[from] url::ParseError),
}
