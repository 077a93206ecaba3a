use crate::audio::{AudioDevice, Clip};
use crate::catalog::Catalog;
use crate::display::Display;
use crate::error::PlaybackError;
use crate::model::{Command, PlaybackPosition, PlaybackState, Track, duration_micros};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Owns the catalog, the transport state and the open audio resource.
///
/// Every transition runs under one lock, so a concurrent
/// [`current_position`](Self::current_position) never sees a half-applied
/// switch. Display notifications are sent after the lock is released.
pub struct PlaybackEngine {
    inner: Mutex<EngineInner>,
    display: Arc<dyn Display>,
}

struct EngineInner {
    device: Box<dyn AudioDevice>,
    catalog: Catalog,
    state: PlaybackState,
    clip: Option<Box<dyn Clip>>,
    // Position snapshot, authoritative whenever the state is not Playing.
    elapsed: Duration,
    total: Duration,
    advanced_this_tick: bool,
}

impl PlaybackEngine {
    pub fn new(catalog: Catalog, device: Box<dyn AudioDevice>, display: Arc<dyn Display>) -> Self {
        Self {
            inner: Mutex::new(EngineInner {
                device,
                catalog,
                state: PlaybackState::Stopped,
                clip: None,
                elapsed: Duration::ZERO,
                total: Duration::ZERO,
                advanced_this_tick: false,
            }),
            display,
        }
    }

    /// Loads the current catalog track, leaving the engine Paused at zero.
    /// Does nothing unless the engine is Stopped.
    pub fn open_current(&self) -> Result<(), PlaybackError> {
        let opened = {
            let mut inner = self.lock();
            if inner.state != PlaybackState::Stopped {
                return Ok(());
            }
            inner.open_current()?
        };
        self.notify_track_changed(&opened);
        Ok(())
    }

    /// Advances to the next track when the device went idle without a Pause.
    /// Returns whether an auto-advance happened.
    pub fn tick(&self) -> Result<bool, PlaybackError> {
        let advanced = {
            let mut inner = self.lock();
            inner.advanced_this_tick = false;
            if !inner.finished_without_pause() {
                return Ok(false);
            }
            let track = inner.auto_advance()?;
            inner.advanced_this_tick = true;
            track
        };
        self.notify_track_changed(&advanced);
        Ok(true)
    }

    pub fn apply_command(&self, command: Command) -> Result<(), PlaybackError> {
        let changed = {
            let mut inner = self.lock();
            let advanced_this_tick = std::mem::take(&mut inner.advanced_this_tick);
            if !command.is_none() {
                debug!(?command, state = ?inner.state, "applying command");
            }
            match command {
                Command::None => None,
                Command::Play => inner.play()?,
                Command::Pause => {
                    inner.pause();
                    None
                }
                Command::Next if advanced_this_tick => {
                    debug!("next absorbed by auto-advance in the same tick");
                    None
                }
                Command::Next => inner.switch_track(true)?,
                Command::Previous => inner.switch_track(false)?,
                Command::SeekTo(percentage) => {
                    inner.seek_to(percentage)?;
                    None
                }
            }
        };
        if let Some(track) = changed {
            self.notify_track_changed(&track);
        }
        Ok(())
    }

    /// Live device position while Playing, otherwise the last snapshot; clamped
    /// to the track length.
    pub fn current_position(&self) -> PlaybackPosition {
        let inner = self.lock();
        let elapsed = match (inner.state, inner.clip.as_ref()) {
            (PlaybackState::Playing, Some(clip)) => clip.position(),
            _ => inner.elapsed,
        };
        PlaybackPosition::new(inner.clamp(elapsed), inner.total)
    }

    pub fn state(&self) -> PlaybackState {
        self.lock().state
    }

    pub fn current_index(&self) -> usize {
        self.lock().catalog.current_index()
    }

    /// Closes the audio resource and returns to Stopped.
    pub fn shutdown(&self) {
        let mut inner = self.lock();
        inner.close();
        inner.state = PlaybackState::Stopped;
        inner.elapsed = Duration::ZERO;
        inner.total = Duration::ZERO;
        info!("playback engine stopped");
    }

    fn notify_track_changed(&self, track: &Track) {
        self.display
            .on_track_changed(&track.cover_path, &track.title());
    }

    fn lock(&self) -> MutexGuard<'_, EngineInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl EngineInner {
    fn clamp(&self, position: Duration) -> Duration {
        if self.total.is_zero() {
            position
        } else {
            position.min(self.total)
        }
    }

    fn finished_without_pause(&self) -> bool {
        self.state == PlaybackState::Playing
            && self.clip.as_ref().is_some_and(|clip| !clip.is_active())
    }

    fn open_current(&mut self) -> Result<Track, PlaybackError> {
        let track = self.catalog.current().clone();
        let clip = self.device.load(&track.audio_path)?;
        self.install(clip, Duration::ZERO);
        self.state = PlaybackState::Paused;
        info!(index = self.catalog.current_index(), title = %track.title(), "track opened");
        Ok(track)
    }

    fn play(&mut self) -> Result<Option<Track>, PlaybackError> {
        match self.state {
            PlaybackState::Playing => {
                debug!("play ignored, already playing");
                Ok(None)
            }
            PlaybackState::Paused => {
                if let Some(clip) = self.clip.as_mut() {
                    clip.start();
                }
                self.state = PlaybackState::Playing;
                Ok(None)
            }
            PlaybackState::Stopped => {
                let track = self.open_current()?;
                if let Some(clip) = self.clip.as_mut() {
                    clip.start();
                }
                self.state = PlaybackState::Playing;
                Ok(Some(track))
            }
        }
    }

    fn pause(&mut self) {
        if self.state != PlaybackState::Playing {
            debug!(state = ?self.state, "pause ignored");
            return;
        }
        let position = self.clip.as_mut().map(|clip| {
            let position = clip.position();
            clip.stop();
            position
        });
        if let Some(position) = position {
            self.elapsed = self.clamp(position);
        }
        self.state = PlaybackState::Paused;
    }

    fn switch_track(&mut self, forward: bool) -> Result<Option<Track>, PlaybackError> {
        if self.state == PlaybackState::Stopped {
            debug!(forward, "track switch ignored while stopped");
            return Ok(None);
        }
        let index = self.catalog.index_after(forward, 1);
        self.play_index(index, Duration::ZERO).map(Some)
    }

    fn seek_to(&mut self, percentage: u8) -> Result<(), PlaybackError> {
        if self.clip.is_none() {
            debug!(percentage, "seek ignored while stopped");
            return Ok(());
        }
        let offset = seek_offset(self.total, percentage);
        let index = self.catalog.current_index();
        self.play_index(index, offset)?;
        debug!(percentage, offset_micros = duration_micros(offset), "seeked");
        Ok(())
    }

    /// Tries every following track in order until one opens. When none does,
    /// parks in Paused and returns the first failure.
    fn auto_advance(&mut self) -> Result<Track, PlaybackError> {
        let first_error = match self.play_index(self.catalog.index_after(true, 1), Duration::ZERO) {
            Ok(track) => return Ok(track),
            Err(err) => err,
        };
        warn!(error = %first_error, "auto-advance target unreadable, skipping");

        for steps in 2..=self.catalog.len() {
            let index = self.catalog.index_after(true, steps);
            match self.play_index(index, Duration::ZERO) {
                Ok(track) => return Ok(track),
                Err(err) => warn!(error = %err, index, "auto-advance target unreadable, skipping"),
            }
        }

        warn!("no playable track left, pausing");
        self.elapsed = self.total;
        self.state = PlaybackState::Paused;
        Err(first_error)
    }

    /// Opens the track at `index` positioned at `offset` and starts it. The old
    /// resource and the cursor are only replaced once the new one is ready, so a
    /// failure leaves the engine exactly as it was.
    fn play_index(&mut self, index: usize, offset: Duration) -> Result<Track, PlaybackError> {
        let track = self.catalog.tracks()[index].clone();
        let mut clip = self.device.load(&track.audio_path)?;
        if !offset.is_zero() {
            clip.set_position(offset)?;
        }

        self.install(clip, offset);
        self.catalog.select(index);
        if let Some(clip) = self.clip.as_mut() {
            clip.start();
        }
        self.state = PlaybackState::Playing;
        info!(index, title = %track.title(), "now playing");
        Ok(track)
    }

    fn install(&mut self, clip: Box<dyn Clip>, elapsed: Duration) {
        self.close();
        self.total = clip.duration();
        self.elapsed = elapsed;
        self.clip = Some(clip);
    }

    fn close(&mut self) {
        if let Some(mut clip) = self.clip.take() {
            clip.stop();
        }
    }
}

/// Absolute offset for a percentage of `total`, floored and clamped to `total`.
pub fn seek_offset(total: Duration, percentage: u8) -> Duration {
    let micros = u128::from(duration_micros(total)) * u128::from(percentage.min(100)) / 100;
    Duration::from_micros(u64::try_from(micros).unwrap_or(u64::MAX)).min(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::SimulatedDevice;
    use crate::audio::tests::write_test_wav;
    use std::path::Path;
    use tempfile::{TempDir, tempdir};

    struct Silent;

    impl Display for Silent {
        fn on_track_changed(&self, _cover_path: &Path, _title: &str) {}
        fn on_progress(&self, _percentage: u8) {}
    }

    fn fixture(lengths_ms: &[u32]) -> (TempDir, PlaybackEngine) {
        let dir = tempdir().expect("tempdir");
        let tracks = lengths_ms
            .iter()
            .enumerate()
            .map(|(idx, length)| {
                let audio = dir.path().join(format!("{idx}.wav"));
                write_test_wav(&audio, *length);
                Track::new(audio, dir.path().join(format!("{idx}.jpg")))
            })
            .collect();
        let catalog = Catalog::from_tracks(tracks).expect("catalog");
        let engine = PlaybackEngine::new(catalog, Box::new(SimulatedDevice::new()), Arc::new(Silent));
        (dir, engine)
    }

    #[test]
    fn seek_offset_floors_and_clamps() {
        let total = Duration::from_micros(999);
        assert_eq!(seek_offset(total, 0), Duration::ZERO);
        assert_eq!(seek_offset(total, 50), Duration::from_micros(499));
        assert_eq!(seek_offset(total, 100), total);
        assert_eq!(seek_offset(total, 250), total);
        assert_eq!(seek_offset(Duration::ZERO, 70), Duration::ZERO);
    }

    #[test]
    fn open_current_moves_stopped_to_paused() {
        let (_dir, engine) = fixture(&[300, 300]);
        assert_eq!(engine.state(), PlaybackState::Stopped);

        engine.open_current().expect("open");
        assert_eq!(engine.state(), PlaybackState::Paused);
        let position = engine.current_position();
        assert_eq!(position.elapsed_micros, 0);
        assert!(position.total_micros >= 290_000);

        engine.open_current().expect("second open is a no-op");
        assert_eq!(engine.state(), PlaybackState::Paused);
    }

    #[test]
    fn play_from_stopped_opens_track() {
        let (_dir, engine) = fixture(&[300]);
        engine.apply_command(Command::Play).expect("play");
        assert_eq!(engine.state(), PlaybackState::Playing);
    }

    #[test]
    fn paused_position_is_frozen() {
        let (_dir, engine) = fixture(&[2_000]);
        engine.apply_command(Command::Play).expect("play");
        std::thread::sleep(Duration::from_millis(30));
        engine.apply_command(Command::Pause).expect("pause");

        let first = engine.current_position();
        std::thread::sleep(Duration::from_millis(30));
        assert_eq!(engine.current_position(), first);
        assert!(first.elapsed_micros > 0);
    }

    #[test]
    fn simulated_track_auto_advances() {
        let (_dir, engine) = fixture(&[40, 2_000]);
        engine.apply_command(Command::Play).expect("play");
        std::thread::sleep(Duration::from_millis(80));

        assert!(engine.tick().expect("tick"));
        assert_eq!(engine.current_index(), 1);
        assert_eq!(engine.state(), PlaybackState::Playing);
    }

    #[test]
    fn shutdown_releases_resource() {
        let (_dir, engine) = fixture(&[300]);
        engine.apply_command(Command::Play).expect("play");
        engine.shutdown();
        assert_eq!(engine.state(), PlaybackState::Stopped);
        assert_eq!(engine.current_position(), PlaybackPosition::default());
        assert!(!engine.tick().expect("tick"));
    }
}
