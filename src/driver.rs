use crate::display::Display;
use crate::engine::PlaybackEngine;
use crate::error::PlaybackError;
use crate::mailbox::Mailbox;
use crate::progress::ProgressReporter;
use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, info, warn};

pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_millis(10);

/// Cooperative stop flag, checked once per tick.
#[derive(Debug, Clone, Default)]
pub struct StopSignal(Arc<AtomicBool>);

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_requested(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Scheduling shell: ticks the engine, reports progress, then applies the
/// pending command, once per interval.
pub struct Driver {
    engine: Arc<PlaybackEngine>,
    mailbox: Arc<Mailbox>,
    reporter: ProgressReporter,
    display: Arc<dyn Display>,
    interval: Duration,
}

impl Driver {
    pub fn new(
        engine: Arc<PlaybackEngine>,
        mailbox: Arc<Mailbox>,
        display: Arc<dyn Display>,
        interval: Duration,
    ) -> Self {
        Self {
            engine,
            mailbox,
            reporter: ProgressReporter::new(Arc::clone(&display)),
            display,
            interval: interval.max(Duration::from_millis(1)),
        }
    }

    /// One cycle. Steady-state errors are surfaced and swallowed so a bad file
    /// never ends the loop.
    pub fn step(&self) {
        if let Err(err) = self.engine.tick() {
            self.surface(&err);
        }

        self.reporter.report(&self.engine);

        let command = self.mailbox.take_if_any();
        if let Err(err) = self.engine.apply_command(command) {
            self.surface(&err);
        }
    }

    /// Runs until `stop` is requested, then releases the audio resource.
    pub fn run(&self, stop: &StopSignal) {
        info!(interval_ms = self.interval.as_millis() as u64, "driver loop started");
        while !stop.is_requested() {
            self.step();
            thread::sleep(self.interval);
        }
        self.engine.shutdown();
        info!("driver loop finished");
    }

    pub fn spawn(self) -> io::Result<DriverHandle> {
        let stop = StopSignal::new();
        let signal = stop.clone();
        let thread = thread::Builder::new()
            .name(String::from("playback-driver"))
            .spawn(move || self.run(&signal))?;
        Ok(DriverHandle {
            stop,
            thread: Some(thread),
        })
    }

    fn surface(&self, err: &PlaybackError) {
        warn!(error = %err, "playback error");
        self.display.on_notice(&err.to_string());
    }
}

/// Owner of a spawned driver thread.
pub struct DriverHandle {
    stop: StopSignal,
    thread: Option<JoinHandle<()>>,
}

impl DriverHandle {
    pub fn stop_signal(&self) -> StopSignal {
        self.stop.clone()
    }

    /// Requests a stop and waits for the current tick to finish.
    pub fn shutdown(mut self) {
        self.join();
    }

    fn join(&mut self) {
        self.stop.request();
        let Some(thread) = self.thread.take() else {
            return;
        };
        if thread.join().is_err() {
            warn!("driver thread panicked");
        } else {
            debug!("driver joined");
        }
    }
}

impl Drop for DriverHandle {
    fn drop(&mut self) {
        self.join();
    }
}
