use crate::model::Command;
use crossterm::event::{
    KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
};
use ratatui::layout::{Position, Rect};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputAction {
    Command(Command),
    Quit,
}

/// Percentage for a click `click_x` cells into a seek control `control_width` wide.
pub fn seek_percentage(click_x: u16, control_width: u16) -> u8 {
    if control_width == 0 {
        return 0;
    }
    let pct = u32::from(click_x) * 100 / u32::from(control_width);
    pct.min(100) as u8
}

pub fn translate_key(key: &KeyEvent) -> Option<InputAction> {
    if key.kind != KeyEventKind::Press {
        return None;
    }

    let command = match key.code {
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            return Some(InputAction::Quit);
        }
        KeyCode::Char('q') | KeyCode::Esc => return Some(InputAction::Quit),
        KeyCode::Char('p') | KeyCode::Enter => Command::Play,
        KeyCode::Char(' ') => Command::Pause,
        KeyCode::Char('n') | KeyCode::Right => Command::Next,
        KeyCode::Char('b') | KeyCode::Left => Command::Previous,
        KeyCode::Char(digit @ '0'..='9') => {
            let tenth = digit.to_digit(10).unwrap_or(0) as u8;
            Command::SeekTo(tenth * 10)
        }
        _ => return None,
    };
    Some(InputAction::Command(command))
}

/// Left clicks inside the drawn seek bar become a [`Command::SeekTo`] measured
/// from the bar's left edge; everything else is ignored.
pub fn translate_mouse(mouse: &MouseEvent, seek_area: Rect) -> Option<InputAction> {
    let MouseEventKind::Down(MouseButton::Left) = mouse.kind else {
        return None;
    };
    if !seek_area.contains(Position::new(mouse.column, mouse.row)) {
        return None;
    }
    let pct = seek_percentage(mouse.column - seek_area.x, seek_area.width);
    Some(InputAction::Command(Command::SeekTo(pct)))
}
