//! Download fallback boundary.
//!
//! Hands raw note text plus a file name to a client-side save-as surface.
//! Used when no directory is bound and when a directory write fails.

use chrono::Utc;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::io;

/// Failure to hand text to the download surface.
#[derive(Debug)]
pub enum DownloadError {
    Io { file_name: String, source: io::Error },
}

impl Display for DownloadError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { file_name, source } => {
                write!(f, "download of `{file_name}` failed: {source}")
            }
        }
    }
}

impl Error for DownloadError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
        }
    }
}

/// Client-side save-as capability.
pub trait DownloadSink {
    /// Offers `text` to the user as a file named `file_name`.
    fn offer_download(&mut self, file_name: &str, text: &str) -> Result<(), DownloadError>;
}

/// File name used when a failed write has no known file name to reuse.
pub fn fallback_file_name() -> String {
    format!("note-{}.txt", Utc::now().timestamp_millis())
}
