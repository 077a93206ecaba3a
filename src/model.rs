use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Track {
    pub audio_path: PathBuf,
    pub cover_path: PathBuf,
}

impl Track {
    pub fn new(audio_path: impl Into<PathBuf>, cover_path: impl Into<PathBuf>) -> Self {
        Self {
            audio_path: audio_path.into(),
            cover_path: cover_path.into(),
        }
    }

    /// Display title, taken from the cover image's file name without its extension.
    pub fn title(&self) -> String {
        file_stem_or_name(&self.cover_path)
            .or_else(|| file_stem_or_name(&self.audio_path))
            .unwrap_or_else(|| String::from("unknown"))
    }
}

fn file_stem_or_name(path: &Path) -> Option<String> {
    path.file_stem()
        .and_then(OsStr::to_str)
        .filter(|stem| !stem.trim().is_empty())
        .map(ToOwned::to_owned)
}

/// Authoritative transport status. Device activity is tracked separately and
/// never replaces this value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaybackState {
    #[default]
    Stopped,
    Playing,
    Paused,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PlaybackPosition {
    pub elapsed_micros: u64,
    pub total_micros: u64,
}

impl PlaybackPosition {
    pub fn new(elapsed: Duration, total: Duration) -> Self {
        Self {
            elapsed_micros: duration_micros(elapsed),
            total_micros: duration_micros(total),
        }
    }

    /// Whole percentage of the track that has elapsed, 0 when the total is unknown.
    pub fn percentage(&self) -> u8 {
        if self.total_micros == 0 {
            return 0;
        }
        let pct = u128::from(self.elapsed_micros) * 100 / u128::from(self.total_micros);
        pct.min(100) as u8
    }
}

pub(crate) fn duration_micros(duration: Duration) -> u64 {
    u64::try_from(duration.as_micros()).unwrap_or(u64::MAX)
}

/// Transport intent delivered from the input surface to the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Command {
    Play,
    Pause,
    Next,
    Previous,
    /// Jump to a percentage of the current track, 0..=100.
    SeekTo(u8),
    #[default]
    None,
}

impl Command {
    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }
}
