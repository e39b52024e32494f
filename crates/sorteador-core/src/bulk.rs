// Bulk import/export of newline-delimited name lists.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::info;

use crate::roster::{ImportSummary, Roster, RosterError};

/// File name suggested for exports when none is configured.
pub const DEFAULT_EXPORT_FILE: &str = "lista-pessoas.txt";

#[derive(Debug, Error)]
pub enum BulkError {
    #[error(transparent)]
    Roster(#[from] RosterError),

    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("{path} is not UTF-8 text")]
    NotText { path: PathBuf },

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Read a text file, dropping a leading byte-order mark if present.
pub fn read_text(path: &Path) -> Result<String, BulkError> {
    let bytes = std::fs::read(path).map_err(|source| BulkError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let text = String::from_utf8(bytes).map_err(|_| BulkError::NotText {
        path: path.to_path_buf(),
    })?;
    Ok(match text.strip_prefix('\u{feff}') {
        Some(rest) => rest.to_string(),
        None => text,
    })
}

/// Write `text` to `path`, replacing any existing file.
pub fn write_text(path: &Path, text: &str) -> Result<(), BulkError> {
    std::fs::write(path, text).map_err(|source| BulkError::Write {
        path: path.to_path_buf(),
        source,
    })
}

/// Import names from the file at `path` into `roster`.
///
/// The file is read completely before the roster is touched, so a read
/// failure leaves the roster unchanged.
pub fn import_file(roster: &mut Roster, path: &Path) -> Result<ImportSummary, BulkError> {
    let text = read_text(path)?;
    let summary = roster.import_bulk(&text);
    info!(
        "Imported {} of {} names from {}",
        summary.added,
        summary.read,
        path.display()
    );
    Ok(summary)
}

/// Write the roster to `path`, one name per line. Returns the number of
/// names written.
pub fn export_file(roster: &Roster, path: &Path) -> Result<usize, BulkError> {
    let text = roster.export_text()?;
    write_text(path, &text)?;
    info!("Exported {} names to {}", roster.len(), path.display());
    Ok(roster.len())
}
