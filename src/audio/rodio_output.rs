use super::{AudioDevice, Clip, decode, known_duration};
use crate::error::PlaybackError;
use anyhow::{Context, Result};
use rodio::cpal::traits::{DeviceTrait, HostTrait};
use rodio::mixer::Mixer;
use rodio::{OutputStream, OutputStreamBuilder, Sink};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

const DEFAULT_OUTPUT_NAME: &str = "System default output (CPAL)";

/// Keeps the output stream alive. Clips stop producing sound once it is dropped,
/// so it must outlive the engine that owns the [`RodioDevice`].
pub struct OutputGuard {
    _stream: OutputStream,
}

/// Output device backed by a rodio mixer; every loaded track gets its own sink.
pub struct RodioDevice {
    mixer: Mixer,
    name: String,
}

impl RodioDevice {
    /// Opens `output` by name, or the system default when `None`.
    pub fn open(output: Option<&str>) -> Result<(OutputGuard, Self), PlaybackError> {
        let (stream, name) = open_output_stream(output)
            .map_err(|err| PlaybackError::DeviceUnavailable(format!("{err:#}")))?;
        info!(output = %name, "audio output opened");
        let mixer = stream.mixer().clone();
        Ok((OutputGuard { _stream: stream }, Self { mixer, name }))
    }
}

impl AudioDevice for RodioDevice {
    fn load(&mut self, path: &Path) -> Result<Box<dyn Clip>, PlaybackError> {
        let source = decode(path)?;
        let duration = known_duration(&source);

        let sink = Sink::connect_new(&self.mixer);
        sink.pause();
        sink.append(source);
        debug!(path = %path.display(), ?duration, "track loaded");

        Ok(Box::new(RodioClip {
            sink,
            duration,
            path: path.to_path_buf(),
        }))
    }

    fn name(&self) -> String {
        self.name.clone()
    }
}

struct RodioClip {
    sink: Sink,
    duration: Duration,
    path: PathBuf,
}

impl Clip for RodioClip {
    fn duration(&self) -> Duration {
        self.duration
    }

    fn start(&mut self) {
        self.sink.play();
    }

    fn stop(&mut self) {
        self.sink.pause();
    }

    fn set_position(&mut self, position: Duration) -> Result<(), PlaybackError> {
        self.sink
            .try_seek(position)
            .map_err(|err| PlaybackError::SeekFailed {
                path: self.path.clone(),
                reason: format!("{err:?}"),
            })
    }

    fn position(&self) -> Duration {
        self.sink.get_pos()
    }

    fn is_active(&self) -> bool {
        !self.sink.is_paused() && !self.sink.empty()
    }
}

impl Drop for RodioClip {
    fn drop(&mut self) {
        self.sink.stop();
    }
}

/// Names of the output devices the host can see, sorted and deduplicated.
pub fn available_outputs() -> Vec<String> {
    let mut outputs: Vec<String> = with_silenced_stderr(|| {
        rodio::cpal::default_host()
            .output_devices()
            .ok()
            .into_iter()
            .flatten()
            .filter_map(|device| device.name().ok())
            .collect()
    });
    outputs.sort_by_cached_key(|name| name.to_ascii_lowercase());
    outputs.dedup();
    outputs
}

fn open_output_stream(output: Option<&str>) -> Result<(OutputStream, String)> {
    let (mut stream, name) = with_silenced_stderr(|| -> Result<(OutputStream, String)> {
        let host = rodio::cpal::default_host();
        if let Some(requested) = output {
            let device = host
                .output_devices()
                .context("failed to enumerate output devices")?
                .find(|candidate| candidate.name().ok().as_deref() == Some(requested))
                .with_context(|| format!("audio output device not found: {requested}"))?;
            let stream = OutputStreamBuilder::from_device(device)
                .context("failed to open selected output device")?
                .with_error_callback(|_| {})
                .open_stream_or_fallback()
                .context("failed to start selected output stream")?;
            return Ok((stream, requested.to_string()));
        }

        let default_err = match OutputStreamBuilder::from_default_device()
            .context("failed to open default system output stream")
            .and_then(|builder| {
                builder
                    .with_error_callback(|_| {})
                    .open_stream_or_fallback()
                    .context("failed to start default output stream")
            }) {
            Ok(stream) => return Ok((stream, DEFAULT_OUTPUT_NAME.to_string())),
            Err(err) => err,
        };
        warn!(error = %format!("{default_err:#}"), "default output failed, trying other devices");

        for candidate in fallback_candidates(&host) {
            let Some(device) = host
                .output_devices()
                .ok()
                .into_iter()
                .flatten()
                .find(|entry| entry.name().ok().as_deref() == Some(candidate.as_str()))
            else {
                continue;
            };
            let opened = OutputStreamBuilder::from_device(device)
                .context("failed to open fallback output device")
                .and_then(|builder| {
                    builder
                        .with_error_callback(|_| {})
                        .open_stream_or_fallback()
                        .context("failed to start fallback output stream")
                });
            if let Ok(stream) = opened {
                return Ok((stream, candidate));
            }
        }

        Err(default_err.context("unable to start any audio output stream"))
    })?;
    stream.log_on_drop(false);
    Ok((stream, name))
}

fn fallback_candidates(host: &rodio::cpal::Host) -> Vec<String> {
    let mut candidates: Vec<String> = host
        .output_devices()
        .ok()
        .into_iter()
        .flatten()
        .filter_map(|device| device.name().ok())
        .collect();
    candidates.sort_by_cached_key(|name| fallback_rank(name));
    candidates.dedup();
    candidates
}

fn fallback_rank(name: &str) -> (u8, String) {
    let lower = name.to_ascii_lowercase();
    let rank = if lower.contains("pulse") {
        0_u8
    } else if lower.contains("pipewire") {
        1_u8
    } else if lower.contains("default") {
        2_u8
    } else {
        3_u8
    };
    (rank, lower)
}

/// Points stderr at /dev/null until dropped. ALSA and JACK print probe noise
/// straight to fd 2, which would land on top of the terminal UI.
#[cfg(unix)]
struct StderrMute {
    saved_fd: libc::c_int,
}

#[cfg(unix)]
impl StderrMute {
    fn engage() -> Option<Self> {
        // SAFETY: plain fd calls; every descriptor opened here is closed or
        // handed to `Drop`.
        unsafe {
            let saved_fd = libc::dup(libc::STDERR_FILENO);
            if saved_fd < 0 {
                return None;
            }
            let null_fd = libc::open(c"/dev/null".as_ptr(), libc::O_WRONLY);
            if null_fd >= 0 {
                libc::dup2(null_fd, libc::STDERR_FILENO);
                libc::close(null_fd);
            }
            Some(Self { saved_fd })
        }
    }
}

#[cfg(unix)]
impl Drop for StderrMute {
    fn drop(&mut self) {
        // SAFETY: `saved_fd` came from `dup` and is closed exactly once.
        unsafe {
            libc::dup2(self.saved_fd, libc::STDERR_FILENO);
            libc::close(self.saved_fd);
        }
    }
}

fn with_silenced_stderr<T>(operation: impl FnOnce() -> T) -> T {
    #[cfg(unix)]
    let _mute = StderrMute::engage();
    operation()
}

#[cfg(test)]
mod tests {
    use super::{fallback_rank, with_silenced_stderr};

    #[test]
    fn fallback_prefers_sound_servers() {
        let mut names = vec![
            String::from("hw:CARD=PCH"),
            String::from("default"),
            String::from("pipewire"),
            String::from("pulse"),
        ];
        names.sort_by_cached_key(|name| fallback_rank(name));
        assert_eq!(names, vec!["pulse", "pipewire", "default", "hw:CARD=PCH"]);
    }

    #[test]
    fn silenced_operation_returns_its_value() {
        assert_eq!(with_silenced_stderr(|| 41 + 1), 42);
    }

    #[cfg(unix)]
    #[test]
    fn stderr_is_restored_after_silencing() {
        let before = unsafe { libc::fcntl(libc::STDERR_FILENO, libc::F_GETFD) };
        with_silenced_stderr(|| eprint!(""));
        let after = unsafe { libc::fcntl(libc::STDERR_FILENO, libc::F_GETFD) };
        assert_eq!(before >= 0, after >= 0);
    }
}
