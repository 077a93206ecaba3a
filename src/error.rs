use std::path::PathBuf;
use thiserror::Error;

/// Startup failures while building the track catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("no usable files in {}", folder.display())]
    EmptyFolder { folder: PathBuf },

    #[error("found {audio} audio files but {covers} cover images")]
    MismatchedCount { audio: usize, covers: usize },

    #[error("failed to read folder {}", folder.display())]
    Unreadable {
        folder: PathBuf,
        #[source]
        source: walkdir::Error,
    },
}

/// Failures raised by the playback engine and its audio device.
#[derive(Debug, Error)]
pub enum PlaybackError {
    #[error("cannot play {}: {reason}", path.display())]
    UnreadableFile { path: PathBuf, reason: String },

    #[error("audio output device unavailable: {0}")]
    DeviceUnavailable(String),

    #[error("failed to seek {}: {reason}", path.display())]
    SeekFailed { path: PathBuf, reason: String },
}

impl PlaybackError {
    pub(crate) fn unreadable(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::UnreadableFile {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}
