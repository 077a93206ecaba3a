use std::path::Path;

/// Receives what the player wants shown. Called from the driver thread, so
/// implementations must tolerate calls concurrent with their own input handling.
pub trait Display: Send + Sync {
    /// A different track became current, manually or by auto-advance.
    fn on_track_changed(&self, cover_path: &Path, title: &str);

    /// Elapsed share of the current track, 0..=100. Called once per tick.
    fn on_progress(&self, percentage: u8);

    /// A non-fatal problem worth telling the user about.
    fn on_notice(&self, _message: &str) {}
}
