use crate::error::CatalogError;
use crate::model::Track;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use walkdir::WalkDir;

const AUDIO_EXTENSIONS: &[&str] = &["mp3", "flac", "wav", "ogg", "m4a", "aac", "opus"];
const COVER_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "gif", "webp"];

/// Ordered, fixed-at-startup list of tracks with a cursor that always points
/// at a valid entry.
#[derive(Debug, Clone)]
pub struct Catalog {
    tracks: Vec<Track>,
    current: usize,
}

impl Catalog {
    /// Pairs the i-th audio file with the i-th cover image, both sorted by path.
    pub fn load(audio_folder: &Path, cover_folder: &Path) -> Result<Self, CatalogError> {
        let audio = scan_folder(audio_folder, AUDIO_EXTENSIONS)?;
        let covers = scan_folder(cover_folder, COVER_EXTENSIONS)?;

        if audio.is_empty() {
            return Err(CatalogError::EmptyFolder {
                folder: audio_folder.to_path_buf(),
            });
        }
        if covers.is_empty() {
            return Err(CatalogError::EmptyFolder {
                folder: cover_folder.to_path_buf(),
            });
        }
        if audio.len() != covers.len() {
            return Err(CatalogError::MismatchedCount {
                audio: audio.len(),
                covers: covers.len(),
            });
        }

        let tracks: Vec<Track> = audio
            .into_iter()
            .zip(covers)
            .map(|(audio_path, cover_path)| Track {
                audio_path,
                cover_path,
            })
            .collect();

        info!(count = tracks.len(), folder = %audio_folder.display(), "songs in music folder");
        for track in &tracks {
            debug!(audio = %track.audio_path.display(), cover = %track.cover_path.display(), "catalog entry");
        }

        Ok(Self { tracks, current: 0 })
    }

    /// Builds a catalog from tracks already in memory. `None` when `tracks` is empty.
    pub fn from_tracks(tracks: Vec<Track>) -> Option<Self> {
        (!tracks.is_empty()).then_some(Self { tracks, current: 0 })
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn current(&self) -> &Track {
        &self.tracks[self.current]
    }

    /// Index `steps` positions away from the cursor, wrapping in either direction.
    pub fn index_after(&self, forward: bool, steps: usize) -> usize {
        let len = self.tracks.len();
        let steps = steps % len;
        if forward {
            (self.current + steps) % len
        } else {
            (self.current + len - steps) % len
        }
    }

    pub fn advance(&mut self, forward: bool) -> &Track {
        self.current = self.index_after(forward, 1);
        &self.tracks[self.current]
    }

    /// Moves the cursor to `index`. Out-of-range indices leave it untouched.
    pub fn select(&mut self, index: usize) -> Option<&Track> {
        if index >= self.tracks.len() {
            return None;
        }
        self.current = index;
        self.tracks.get(index)
    }
}

fn scan_folder(root: &Path, extensions: &[&str]) -> Result<Vec<PathBuf>, CatalogError> {
    let mut found = Vec::new();

    for entry in WalkDir::new(root).min_depth(1).max_depth(1).follow_links(true) {
        let entry = entry.map_err(|source| CatalogError::Unreadable {
            folder: root.to_path_buf(),
            source,
        })?;
        let path = entry.path();
        if entry.file_type().is_file() && has_extension(path, extensions) {
            found.push(path.to_path_buf());
        }
    }

    found.sort();
    Ok(found)
}

fn has_extension(path: &Path, extensions: &[&str]) -> bool {
    path.extension()
        .and_then(OsStr::to_str)
        .map(|ext| {
            extensions
                .iter()
                .any(|candidate| candidate.eq_ignore_ascii_case(ext))
        })
        .unwrap_or(false)
}
