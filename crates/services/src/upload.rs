use std::path::Path;

use thiserror::Error;

use transport::CsvUpload;

use crate::sample_data;

/// Errors preparing an upload from the local filesystem.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum UploadError {
    #[error("could not read {path}: {source}")]
    Unreadable {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Where the transaction history for `submit_data` comes from.
///
/// Both entry points produce the same command input: the bundled sample
/// dataset or a CSV the user picked themselves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadSource {
    /// The bundled 44-transaction demo dataset.
    Sample,
    /// A caller-supplied CSV document.
    Csv(CsvUpload),
}

impl UploadSource {
    /// Reads a CSV file from disk.
    ///
    /// # Errors
    ///
    /// Returns `UploadError::Unreadable` if the file cannot be read.
    pub fn from_path(path: &Path) -> Result<Self, UploadError> {
        let bytes = std::fs::read(path).map_err(|source| UploadError::Unreadable {
            path: path.display().to_string(),
            source,
        })?;
        let filename = path
            .file_name()
            .map_or_else(|| "transactions.csv".to_string(), |n| n.to_string_lossy().into_owned());
        Ok(Self::Csv(CsvUpload::new(filename, bytes)))
    }

    pub(crate) fn into_upload(self) -> CsvUpload {
        match self {
            Self::Sample => sample_data::sample_upload(),
            Self::Csv(upload) => upload,
        }
    }
}
