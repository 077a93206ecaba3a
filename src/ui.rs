use crate::display::Display;
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph};
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::debug;

const HELP: &str = "p play | space pause | b/<- previous | n/-> next | 0-9 seek | click bar to seek | q quit";

#[derive(Debug, Default)]
struct Screen {
    title: String,
    cover: String,
    percentage: Option<u8>,
    notice: String,
    output: String,
}

struct Surface<B: Backend> {
    terminal: Terminal<B>,
    screen: Screen,
    seek_area: Rect,
}

/// Draws the player state through a ratatui terminal. The terminal, the shown
/// values and the last seek-bar area share one lock, so draws from the driver
/// thread never interleave with redraws requested by input handling.
pub struct TerminalDisplay<B: Backend> {
    surface: Mutex<Surface<B>>,
}

impl<B: Backend> TerminalDisplay<B> {
    pub fn new(terminal: Terminal<B>, output_name: &str) -> Self {
        Self {
            surface: Mutex::new(Surface {
                terminal,
                screen: Screen {
                    output: output_name.to_string(),
                    ..Screen::default()
                },
                seek_area: Rect::default(),
            }),
        }
    }

    /// Clears and redraws everything, e.g. after the terminal was resized.
    pub fn redraw(&self) {
        let mut surface = self.lock();
        if let Err(err) = surface.terminal.clear() {
            debug!(error = %err, "terminal clear failed");
        }
        render(&mut surface);
    }

    /// Area of the progress bar as last drawn; empty before the first draw.
    pub fn seek_area(&self) -> Rect {
        self.lock().seek_area
    }

    fn update(&self, change: impl FnOnce(&mut Screen) -> bool) {
        let mut surface = self.lock();
        if change(&mut surface.screen) {
            render(&mut surface);
        }
    }

    fn lock(&self) -> MutexGuard<'_, Surface<B>> {
        self.surface.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<B: Backend + Send> Display for TerminalDisplay<B> {
    fn on_track_changed(&self, cover_path: &Path, title: &str) {
        self.update(|screen| {
            screen.title = title.to_string();
            screen.cover = cover_path.display().to_string();
            screen.percentage = None;
            true
        });
    }

    fn on_progress(&self, percentage: u8) {
        self.update(|screen| {
            if screen.percentage == Some(percentage) {
                return false;
            }
            screen.percentage = Some(percentage);
            true
        });
    }

    fn on_notice(&self, message: &str) {
        self.update(|screen| {
            screen.notice = message.to_string();
            true
        });
    }
}

fn render<B: Backend>(surface: &mut Surface<B>) {
    let Surface {
        terminal,
        screen,
        seek_area,
    } = surface;
    if let Err(err) = terminal.draw(|frame| *seek_area = draw(frame, screen)) {
        debug!(error = %err, "terminal draw failed");
    }
}

/// Lays out the player and returns the area the seek bar was drawn into.
fn draw(frame: &mut Frame, screen: &Screen) -> Rect {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(4),
            Constraint::Length(3),
            Constraint::Length(4),
            Constraint::Min(0),
            Constraint::Length(1),
        ])
        .split(frame.area());

    let now_playing = Paragraph::new(vec![
        Line::from(Span::styled(
            screen.title.as_str(),
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from(Span::styled(
            screen.cover.as_str(),
            Style::default().add_modifier(Modifier::DIM),
        )),
    ])
    .block(panel_block("Now playing"));
    frame.render_widget(now_playing, rows[0]);

    let percentage = screen.percentage.unwrap_or(0);
    let progress = panel_block("Progress");
    let seek_area = progress.inner(rows[1]);
    frame.render_widget(progress, rows[1]);
    frame.render_widget(
        Paragraph::new(render_bar(percentage, seek_area.width)),
        seek_area,
    );

    let status = Paragraph::new(vec![
        Line::from(vec![
            Span::styled(
                format!("{percentage:>3}%"),
                Style::default().add_modifier(Modifier::BOLD),
            ),
            Span::styled("  |  ", Style::default().add_modifier(Modifier::DIM)),
            Span::raw(screen.output.as_str()),
        ]),
        Line::from(Span::styled(
            screen.notice.as_str(),
            Style::default().fg(Color::Yellow),
        )),
    ])
    .block(panel_block("Status"));
    frame.render_widget(status, rows[2]);

    frame.render_widget(
        Paragraph::new(HELP).style(Style::default().add_modifier(Modifier::DIM)),
        rows[4],
    );

    seek_area
}

fn panel_block(title: &str) -> Block<'_> {
    Block::default().borders(Borders::ALL).title(Span::styled(
        format!(" {title} "),
        Style::default().add_modifier(Modifier::BOLD),
    ))
}

/// Bar `width` cells wide with the first `percentage`% filled.
pub fn render_bar(percentage: u8, width: u16) -> String {
    let width = usize::from(width);
    let filled = width * usize::from(percentage.min(100)) / 100;
    let mut bar = "█".repeat(filled);
    bar.push_str(&"░".repeat(width - filled));
    bar
}
