use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum EditorCommand {
    Save,
    Quit,
    FieldNext,
    FieldPrev,
    CursorNext,
    CursorPrev,
    EntryNext,
    EntryPrev,
    AddEntry,
    RemoveEntry,
    MoveEntryUp,
    MoveEntryDown,
    ToggleCollapse,
    Activate,
    DrillOut,
    Input(char),
    Backspace,
}

pub(crate) const HELP_TEXT: &str = "Tab field • ↑/↓ cursor • ←/→ entry • Enter open/toggle • \
Esc back • Ctrl+N add • Ctrl+D remove • Ctrl+↑/↓ move • Ctrl+E collapse • Ctrl+S save • Ctrl+Q quit";

pub(crate) fn map_key(key: KeyEvent) -> Option<EditorCommand> {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    match key.code {
        KeyCode::Char('s') | KeyCode::Char('S') if ctrl => Some(EditorCommand::Save),
        KeyCode::Char('q') | KeyCode::Char('Q') if ctrl => Some(EditorCommand::Quit),
        KeyCode::Char('n') | KeyCode::Char('N') if ctrl => Some(EditorCommand::AddEntry),
        KeyCode::Char('d') | KeyCode::Char('D') if ctrl => Some(EditorCommand::RemoveEntry),
        KeyCode::Char('e') | KeyCode::Char('E') if ctrl => Some(EditorCommand::ToggleCollapse),
        KeyCode::Up if ctrl => Some(EditorCommand::MoveEntryUp),
        KeyCode::Down if ctrl => Some(EditorCommand::MoveEntryDown),
        KeyCode::Tab => Some(EditorCommand::FieldNext),
        KeyCode::BackTab => Some(EditorCommand::FieldPrev),
        KeyCode::Up => Some(EditorCommand::CursorPrev),
        KeyCode::Down => Some(EditorCommand::CursorNext),
        KeyCode::Left => Some(EditorCommand::EntryPrev),
        KeyCode::Right => Some(EditorCommand::EntryNext),
        KeyCode::Enter => Some(EditorCommand::Activate),
        KeyCode::Esc => Some(EditorCommand::DrillOut),
        KeyCode::Backspace => Some(EditorCommand::Backspace),
        KeyCode::Char(ch) if !ctrl => Some(EditorCommand::Input(ch)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode, modifiers: KeyModifiers) -> KeyEvent {
        KeyEvent::new(code, modifiers)
    }

    #[test]
    fn ctrl_combos_map_to_list_operations() {
        assert_eq!(
            map_key(key(KeyCode::Char('n'), KeyModifiers::CONTROL)),
            Some(EditorCommand::AddEntry)
        );
        assert_eq!(
            map_key(key(KeyCode::Up, KeyModifiers::CONTROL)),
            Some(EditorCommand::MoveEntryUp)
        );
    }

    #[test]
    fn plain_chars_are_input() {
        assert_eq!(
            map_key(key(KeyCode::Char('n'), KeyModifiers::NONE)),
            Some(EditorCommand::Input('n'))
        );
    }
}
