// src/process/mod.rs
use std::{
    fs::{self, File},
    io::BufWriter,
    path::{Path, PathBuf},
};
use tracing::{debug, info, warn};

use crate::error::TransformError;

pub mod pivot;
pub mod records;

pub use pivot::{Observation, PivotTable};

/// Extension of a downloaded document that still has to become a report.
pub const STAGING_EXTENSION: &str = "t";

/// Extension of the finished report.
pub const REPORT_EXTENSION: &str = "csv";

/// Filename gate deciding whether a finished download feeds [`transform`].
pub fn is_staged(path: &Path) -> bool {
    path.extension().and_then(|e| e.to_str()) == Some(STAGING_EXTENSION)
}

/// Where the report for a staged document goes.
pub fn report_path(source: &Path) -> Option<PathBuf> {
    is_staged(source).then(|| source.with_extension(REPORT_EXTENSION))
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> TransformError + '_ {
    move |source| TransformError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Parse every record of a data document into observations, in document order.
pub fn parse_observations(xml: &str) -> Result<Vec<Observation>, TransformError> {
    let records = records::read_records(xml)?.ok_or_else(|| TransformError::Structure {
        record: 0,
        reason: "document has no root element".to_string(),
    })?;

    records
        .iter()
        .enumerate()
        .map(|(i, rec)| Observation::from_record(i, rec))
        .collect()
}

/// Turn a staged XML document into a `;`-separated country × year report
/// next to it, then delete the document.
///
/// On any error the source is left in place and no report remains.
#[tracing::instrument(level = "info", skip_all, fields(path = %source.display()))]
pub fn transform(source: &Path) -> Result<PathBuf, TransformError> {
    let target =
        report_path(source).ok_or_else(|| TransformError::NotStaged(source.to_path_buf()))?;

    let xml = fs::read_to_string(source).map_err(io_error(source))?;
    let observations = parse_observations(&xml)?;
    debug!(count = observations.len(), "parsed observations");

    let table = PivotTable::from_observations(observations);
    if table.is_empty() {
        warn!("document holds no observations");
    }

    let file = File::create(&target).map_err(io_error(&target))?;
    if let Err(err) = table.write_to(BufWriter::new(file)) {
        // never leave a half-written report behind
        let _ = fs::remove_file(&target);
        return Err(io_error(&target)(err));
    }

    match fs::remove_file(source) {
        Ok(()) => debug!("removed staged document"),
        Err(err) => warn!(error = %err, "failed to delete staged document"),
    }

    info!(report = %target.display(), "report written");
    Ok(target)
}
