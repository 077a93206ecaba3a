use crate::audio::{AudioDevice, OutputGuard, RodioDevice, SimulatedDevice};
use crate::catalog::Catalog;
use crate::config::PlayerConfig;
use crate::driver::{Driver, StopSignal};
use crate::engine::PlaybackEngine;
use crate::input::{InputAction, translate_key, translate_mouse};
use crate::mailbox::Mailbox;
use crate::model::Command;
use crate::ui::TerminalDisplay;
use anyhow::{Context, Result};
use crossterm::cursor::{Hide, Show};
use crossterm::event::{self, DisableMouseCapture, EnableMouseCapture, Event};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::Terminal;
use ratatui::backend::{Backend, CrosstermBackend};
use std::io::stdout;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

const INPUT_POLL: Duration = Duration::from_millis(50);

/// Loads the catalog, opens the output, and plays until the user quits.
pub fn run(config: &PlayerConfig) -> Result<()> {
    let catalog = Catalog::load(&config.music_dir, &config.cover_dir)
        .context("failed to build track catalog")?;
    let (output_guard, device) = open_device(config)?;
    let output_name = device.name();

    let session = TerminalSession::enter()?;
    let terminal = Terminal::new(CrosstermBackend::new(stdout()))
        .context("failed to initialise terminal")?;
    let display = Arc::new(TerminalDisplay::new(terminal, &output_name));
    display.redraw();
    let engine = Arc::new(PlaybackEngine::new(catalog, device, display.clone()));
    let mailbox = Arc::new(Mailbox::new());
    engine
        .open_current()
        .context("failed to open the first track")?;
    if config.autoplay {
        engine
            .apply_command(Command::Play)
            .context("failed to start playback")?;
    }

    let driver = Driver::new(
        Arc::clone(&engine),
        Arc::clone(&mailbox),
        display.clone(),
        config.tick_interval(),
    )
    .spawn()
    .context("failed to start playback driver")?;

    let result = input_loop(&mailbox, &display, &driver.stop_signal());

    driver.shutdown();
    drop(session);
    drop(engine);
    drop(output_guard);
    info!("player closed");
    result
}

fn open_device(config: &PlayerConfig) -> Result<(Option<OutputGuard>, Box<dyn AudioDevice>)> {
    if config.simulated_output {
        info!("using simulated output");
        return Ok((None, Box::new(SimulatedDevice::new())));
    }
    let (guard, device) = RodioDevice::open(config.output_device.as_deref())?;
    Ok((Some(guard), Box::new(device)))
}

/// Terminal input source: translates key presses and seek-bar clicks into
/// commands and posts them. Returns when the user quits or the driver stops.
fn input_loop<B: Backend>(
    mailbox: &Mailbox,
    display: &TerminalDisplay<B>,
    stop: &StopSignal,
) -> Result<()> {
    loop {
        if stop.is_requested() {
            return Ok(());
        }
        if !event::poll(INPUT_POLL)? {
            continue;
        }

        let action = match event::read()? {
            Event::Key(key) => translate_key(&key),
            Event::Mouse(mouse) => translate_mouse(&mouse, display.seek_area()),
            Event::Resize(..) => {
                display.redraw();
                None
            }
            _ => None,
        };

        match action {
            Some(InputAction::Quit) => return Ok(()),
            Some(InputAction::Command(command)) => {
                debug!(?command, "command posted");
                mailbox.post(command);
            }
            None => {}
        }
    }
}

/// Raw mode, alternate screen and mouse capture for as long as it lives.
struct TerminalSession;

impl TerminalSession {
    fn enter() -> Result<Self> {
        enable_raw_mode().context("failed to enable raw mode")?;
        execute!(
            stdout(),
            EnterAlternateScreen,
            EnableMouseCapture,
            Hide
        )?;
        Ok(Self)
    }
}

impl Drop for TerminalSession {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(stdout(), Show, DisableMouseCapture, LeaveAlternateScreen);
    }
}
