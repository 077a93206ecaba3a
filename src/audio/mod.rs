mod rodio_output;

pub use rodio_output::{OutputGuard, RodioDevice, available_outputs};

use crate::error::PlaybackError;
use rodio::{Decoder, Source};
use std::fs::File;
use std::path::Path;
use std::time::{Duration, Instant};

/// Source of decoded audio resources. The engine is the only caller.
pub trait AudioDevice: Send {
    /// Opens and decodes `path` into a paused resource positioned at zero.
    fn load(&mut self, path: &Path) -> Result<Box<dyn Clip>, PlaybackError>;
    fn name(&self) -> String;
}

/// One opened track on the output device. Dropping it closes the resource.
pub trait Clip: Send {
    /// Total length; zero when the decoder cannot tell.
    fn duration(&self) -> Duration;
    fn start(&mut self);
    fn stop(&mut self);
    fn set_position(&mut self, position: Duration) -> Result<(), PlaybackError>;
    fn position(&self) -> Duration;
    /// Whether sound is currently being produced. Derived, not authoritative.
    fn is_active(&self) -> bool;
}

fn decode(path: &Path) -> Result<impl Source + Send + 'static, PlaybackError> {
    let file = File::open(path).map_err(|err| PlaybackError::unreadable(path, err))?;
    Decoder::try_from(file).map_err(|err| PlaybackError::unreadable(path, err))
}

fn known_duration(source: &impl Source) -> Duration {
    source
        .total_duration()
        .filter(|duration| !duration.is_zero())
        .unwrap_or(Duration::ZERO)
}

/// Output that keeps a wall-clock instead of producing sound. Files are still
/// decoded on load so unreadable tracks fail the same way they would on a real
/// device.
#[derive(Debug, Default)]
pub struct SimulatedDevice;

impl SimulatedDevice {
    pub fn new() -> Self {
        Self
    }
}

impl AudioDevice for SimulatedDevice {
    fn load(&mut self, path: &Path) -> Result<Box<dyn Clip>, PlaybackError> {
        let source = decode(path)?;
        Ok(Box::new(SimulatedClip::new(known_duration(&source))))
    }

    fn name(&self) -> String {
        String::from("Simulated output")
    }
}

#[derive(Debug)]
struct SimulatedClip {
    duration: Duration,
    position_offset: Duration,
    started_at: Option<Instant>,
}

impl SimulatedClip {
    fn new(duration: Duration) -> Self {
        Self {
            duration,
            position_offset: Duration::ZERO,
            started_at: None,
        }
    }

    fn current_position(&self) -> Duration {
        let mut position = self.position_offset;
        if let Some(started_at) = self.started_at {
            position = position.saturating_add(started_at.elapsed());
        }
        if self.duration.is_zero() {
            return position;
        }
        position.min(self.duration)
    }
}

impl Clip for SimulatedClip {
    fn duration(&self) -> Duration {
        self.duration
    }

    fn start(&mut self) {
        if self.started_at.is_none() {
            self.started_at = Some(Instant::now());
        }
    }

    fn stop(&mut self) {
        self.position_offset = self.current_position();
        self.started_at = None;
    }

    fn set_position(&mut self, position: Duration) -> Result<(), PlaybackError> {
        self.position_offset = if self.duration.is_zero() {
            position
        } else {
            position.min(self.duration)
        };
        if self.started_at.is_some() {
            self.started_at = Some(Instant::now());
        }
        Ok(())
    }

    fn position(&self) -> Duration {
        self.current_position()
    }

    fn is_active(&self) -> bool {
        self.started_at.is_some()
            && (self.duration.is_zero() || self.current_position() < self.duration)
    }
}
