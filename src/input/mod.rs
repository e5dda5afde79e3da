use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use crate::core::Command;

pub fn map_key_event(key: KeyEvent) -> Option<Command> {
    if key.kind != KeyEventKind::Press {
        return None;
    }

    let mods = key.modifiers;
    match (key.code, mods) {
        (KeyCode::Char('c'), KeyModifiers::CONTROL)
        | (KeyCode::Char('C'), KeyModifiers::CONTROL)
        | (KeyCode::Char('q'), KeyModifiers::CONTROL)
        | (KeyCode::Char('Q'), KeyModifiers::CONTROL) => Some(Command::Quit),
        (KeyCode::Char('s'), KeyModifiers::CONTROL)
        | (KeyCode::Char('S'), KeyModifiers::CONTROL) => Some(Command::Save),
        (KeyCode::Char('l'), KeyModifiers::CONTROL)
        | (KeyCode::Char('L'), KeyModifiers::CONTROL) => Some(Command::OpenList),
        (KeyCode::Char('n'), KeyModifiers::CONTROL)
        | (KeyCode::Char('N'), KeyModifiers::CONTROL) => Some(Command::NewNote),
        (KeyCode::Char('t'), KeyModifiers::CONTROL)
        | (KeyCode::Char('T'), KeyModifiers::CONTROL) => Some(Command::ToggleAutocomplete),
        (KeyCode::Char('g'), KeyModifiers::CONTROL)
        | (KeyCode::Char('G'), KeyModifiers::CONTROL) => Some(Command::RefreshSuggestion),
        (KeyCode::Esc, _) => Some(Command::Cancel),
        (KeyCode::Enter, _) => Some(Command::Confirm),
        (KeyCode::Tab, _) => Some(Command::Tab),
        (KeyCode::Left, _) => Some(Command::MoveLeft),
        (KeyCode::Right, _) => Some(Command::MoveRight),
        (KeyCode::Up, _) => Some(Command::MoveUp),
        (KeyCode::Down, _) => Some(Command::MoveDown),
        (KeyCode::Home, _) => Some(Command::MoveHome),
        (KeyCode::End, _) => Some(Command::MoveEnd),
        (KeyCode::PageUp, _) => Some(Command::PageUp),
        (KeyCode::PageDown, _) => Some(Command::PageDown),
        (KeyCode::Backspace, _) => Some(Command::Backspace),
        (KeyCode::Delete, _) => Some(Command::Delete),
        (KeyCode::Char(c), KeyModifiers::NONE) => Some(Command::Insert(c)),
        (KeyCode::Char(c), KeyModifiers::SHIFT) => Some(Command::Insert(c)),
        _ => None,
    }
}
