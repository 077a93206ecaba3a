#![allow(dead_code)]

use deckplay::audio::{AudioDevice, Clip};
use deckplay::catalog::Catalog;
use deckplay::display::Display;
use deckplay::engine::PlaybackEngine;
use deckplay::error::PlaybackError;
use deckplay::model::{Command, Track};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Debug, Clone, Copy)]
struct ClipState {
    duration: Duration,
    position: Duration,
    playing: bool,
    finished: bool,
    closed: bool,
}

#[derive(Default)]
struct RigState {
    durations: HashMap<PathBuf, Duration>,
    broken: HashSet<PathBuf>,
    unseekable: HashSet<PathBuf>,
    clips: Vec<Arc<Mutex<ClipState>>>,
    loads: Vec<PathBuf>,
}

impl RigState {
    /// The most recently loaded clip the engine still holds.
    fn live(&self) -> &Arc<Mutex<ClipState>> {
        self.clips
            .iter()
            .rev()
            .find(|clip| !clip.lock().unwrap().closed)
            .expect("a clip should be open")
    }
}

/// Test-side handle onto the fake device: scripts durations and failures and
/// pokes the clip the engine currently holds.
#[derive(Clone, Default)]
pub struct Rig {
    state: Arc<Mutex<RigState>>,
}

impl Rig {
    pub fn device(&self) -> Box<dyn AudioDevice> {
        Box::new(FakeDevice { rig: self.clone() })
    }

    pub fn set_duration(&self, path: impl Into<PathBuf>, duration: Duration) {
        self.state
            .lock()
            .unwrap()
            .durations
            .insert(path.into(), duration);
    }

    pub fn break_track(&self, path: impl Into<PathBuf>) {
        self.state.lock().unwrap().broken.insert(path.into());
    }

    /// Clips of `path` load fine but reject every reposition.
    pub fn fail_seek(&self, path: impl Into<PathBuf>) {
        self.state.lock().unwrap().unseekable.insert(path.into());
    }

    /// Marks the current clip as played to the end.
    pub fn finish_current(&self) {
        self.with_latest(|clip| {
            clip.finished = true;
            clip.position = clip.duration;
        });
    }

    pub fn set_position(&self, position: Duration) {
        self.with_latest(|clip| clip.position = position);
    }

    pub fn latest_is_playing(&self) -> bool {
        let state = self.state.lock().unwrap();
        state.live().lock().unwrap().playing
    }

    pub fn open_clips(&self) -> usize {
        let state = self.state.lock().unwrap();
        state
            .clips
            .iter()
            .filter(|clip| !clip.lock().unwrap().closed)
            .count()
    }

    pub fn loads(&self) -> Vec<PathBuf> {
        self.state.lock().unwrap().loads.clone()
    }

    fn with_latest(&self, change: impl FnOnce(&mut ClipState)) {
        let state = self.state.lock().unwrap();
        change(&mut state.live().lock().unwrap());
    }
}

struct FakeDevice {
    rig: Rig,
}

impl AudioDevice for FakeDevice {
    fn load(&mut self, path: &Path) -> Result<Box<dyn Clip>, PlaybackError> {
        let mut state = self.rig.state.lock().unwrap();
        if state.broken.contains(path) {
            return Err(PlaybackError::UnreadableFile {
                path: path.to_path_buf(),
                reason: String::from("corrupt fixture"),
            });
        }
        let duration = state
            .durations
            .get(path)
            .copied()
            .unwrap_or(Duration::from_secs(1));
        let clip = Arc::new(Mutex::new(ClipState {
            duration,
            position: Duration::ZERO,
            playing: false,
            finished: false,
            closed: false,
        }));
        state.clips.push(Arc::clone(&clip));
        state.loads.push(path.to_path_buf());
        Ok(Box::new(FakeClip {
            state: clip,
            path: path.to_path_buf(),
            seekable: !state.unseekable.contains(path),
        }))
    }

    fn name(&self) -> String {
        String::from("fake")
    }
}

struct FakeClip {
    state: Arc<Mutex<ClipState>>,
    path: PathBuf,
    seekable: bool,
}

impl Drop for FakeClip {
    fn drop(&mut self) {
        let mut state = self.state.lock().unwrap();
        state.closed = true;
        state.playing = false;
    }
}

impl Clip for FakeClip {
    fn duration(&self) -> Duration {
        self.state.lock().unwrap().duration
    }

    fn start(&mut self) {
        self.state.lock().unwrap().playing = true;
    }

    fn stop(&mut self) {
        self.state.lock().unwrap().playing = false;
    }

    fn set_position(&mut self, position: Duration) -> Result<(), PlaybackError> {
        if !self.seekable {
            return Err(PlaybackError::SeekFailed {
                path: self.path.clone(),
                reason: String::from("backend cannot reposition"),
            });
        }
        let mut state = self.state.lock().unwrap();
        state.position = position.min(state.duration);
        Ok(())
    }

    fn position(&self) -> Duration {
        self.state.lock().unwrap().position
    }

    fn is_active(&self) -> bool {
        let state = self.state.lock().unwrap();
        state.playing && !state.finished
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Shown {
    Track { cover: PathBuf, title: String },
    Progress(u8),
    Notice(String),
}

#[derive(Default)]
pub struct RecordingDisplay {
    shown: Mutex<Vec<Shown>>,
}

impl RecordingDisplay {
    pub fn shown(&self) -> Vec<Shown> {
        self.shown.lock().unwrap().clone()
    }

    pub fn track_changes(&self) -> Vec<String> {
        self.shown()
            .into_iter()
            .filter_map(|shown| match shown {
                Shown::Track { title, .. } => Some(title),
                _ => None,
            })
            .collect()
    }

    pub fn notices(&self) -> Vec<String> {
        self.shown()
            .into_iter()
            .filter_map(|shown| match shown {
                Shown::Notice(message) => Some(message),
                _ => None,
            })
            .collect()
    }

    pub fn last_progress(&self) -> Option<u8> {
        self.shown().into_iter().rev().find_map(|shown| match shown {
            Shown::Progress(pct) => Some(pct),
            _ => None,
        })
    }
}

impl Display for RecordingDisplay {
    fn on_track_changed(&self, cover_path: &Path, title: &str) {
        self.shown.lock().unwrap().push(Shown::Track {
            cover: cover_path.to_path_buf(),
            title: title.to_string(),
        });
    }

    fn on_progress(&self, percentage: u8) {
        self.shown.lock().unwrap().push(Shown::Progress(percentage));
    }

    fn on_notice(&self, message: &str) {
        self.shown
            .lock()
            .unwrap()
            .push(Shown::Notice(message.to_string()));
    }
}

pub fn audio_path(index: usize) -> PathBuf {
    PathBuf::from(format!("songs/{index}.wav"))
}

pub struct Harness {
    pub rig: Rig,
    pub display: Arc<RecordingDisplay>,
    pub engine: Arc<PlaybackEngine>,
}

/// Engine over `durations_secs.len()` fake tracks, opened and playing track 0.
pub fn playing(durations_secs: &[u64]) -> Harness {
    let harness = stopped(durations_secs);
    harness.engine.open_current().expect("open first track");
    harness
        .engine
        .apply_command(Command::Play)
        .expect("start playback");
    harness
}

pub fn stopped(durations_secs: &[u64]) -> Harness {
    let rig = Rig::default();
    let tracks = durations_secs
        .iter()
        .enumerate()
        .map(|(index, secs)| {
            rig.set_duration(audio_path(index), Duration::from_secs(*secs));
            Track::new(audio_path(index), format!("covers/Cover {index}.jpg"))
        })
        .collect();
    let catalog = Catalog::from_tracks(tracks).expect("non-empty catalog");
    let display = Arc::new(RecordingDisplay::default());
    let engine = Arc::new(PlaybackEngine::new(catalog, rig.device(), display.clone()));
    Harness {
        rig,
        display,
        engine,
    }
}
