use crate::display::Display;
use crate::engine::PlaybackEngine;
use std::sync::Arc;

/// Pushes the elapsed percentage of the current track to the display.
pub struct ProgressReporter {
    display: Arc<dyn Display>,
}

impl ProgressReporter {
    pub fn new(display: Arc<dyn Display>) -> Self {
        Self { display }
    }

    /// Returns the percentage that was pushed.
    pub fn report(&self, engine: &PlaybackEngine) -> u8 {
        let percentage = engine.current_position().percentage();
        self.display.on_progress(percentage);
        percentage
    }
}
