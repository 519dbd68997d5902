use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::app::App;

/// Input action that can be performed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Quit,
    FocusLeft,
    FocusRight,
    ScrollDown,
    ScrollUp,
    ScrollHalfPageDown,
    ScrollHalfPageUp,
    ScrollPageDown,
    ScrollPageUp,
    JumpToTop,
    JumpToBottom,
    PendingG, // First 'g' press, waiting for second 'g'
    Reset,
    ToggleAttach,
    None,
}

/// Handle a key event and return the corresponding action
pub fn handle_key_event(key: KeyEvent, app: &App) -> Action {
    match (key.code, key.modifiers) {
        // Quit
        (KeyCode::Char('q'), KeyModifiers::NONE) => Action::Quit,
        (KeyCode::Char('c'), KeyModifiers::CONTROL) => Action::Quit,

        // Navigation between panes
        (KeyCode::Char('h'), KeyModifiers::NONE) => Action::FocusLeft,
        (KeyCode::Char('l'), KeyModifiers::NONE) => Action::FocusRight,
        (KeyCode::Left, KeyModifiers::NONE) => Action::FocusLeft,
        (KeyCode::Right, KeyModifiers::NONE) => Action::FocusRight,

        // Line scrolling
        (KeyCode::Char('j'), KeyModifiers::NONE) => Action::ScrollDown,
        (KeyCode::Char('k'), KeyModifiers::NONE) => Action::ScrollUp,
        (KeyCode::Down, KeyModifiers::NONE) => Action::ScrollDown,
        (KeyCode::Up, KeyModifiers::NONE) => Action::ScrollUp,

        // Page scrolling
        (KeyCode::Char('d'), KeyModifiers::CONTROL) => Action::ScrollHalfPageDown,
        (KeyCode::Char('u'), KeyModifiers::CONTROL) => Action::ScrollHalfPageUp,
        (KeyCode::Char('f'), KeyModifiers::CONTROL) => Action::ScrollPageDown,
        (KeyCode::Char('b'), KeyModifiers::CONTROL) => Action::ScrollPageUp,
        (KeyCode::PageDown, KeyModifiers::NONE) => Action::ScrollPageDown,
        (KeyCode::PageUp, KeyModifiers::NONE) => Action::ScrollPageUp,

        // Jump to top/bottom
        (KeyCode::Char('g'), KeyModifiers::NONE) => {
            // gg requires double press
            if app.pending_key == Some('g') {
                Action::JumpToTop
            } else {
                Action::PendingG
            }
        }
        (KeyCode::Char('G'), KeyModifiers::SHIFT | KeyModifiers::NONE) => Action::JumpToBottom,

        (KeyCode::Char('r'), KeyModifiers::NONE) => Action::Reset,
        (KeyCode::Char('x'), KeyModifiers::NONE) => Action::ToggleAttach,

        _ => Action::None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::tests::test_app;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn ctrl(c: char) -> KeyEvent {
        KeyEvent::new(KeyCode::Char(c), KeyModifiers::CONTROL)
    }

    #[test]
    fn test_gg_needs_two_presses() {
        let mut app = test_app(2, 50);
        assert_eq!(handle_key_event(key(KeyCode::Char('g')), &app), Action::PendingG);

        app.handle_action(Action::PendingG);
        assert_eq!(handle_key_event(key(KeyCode::Char('g')), &app), Action::JumpToTop);
    }

    #[test]
    fn test_other_key_clears_pending_g() {
        let mut app = test_app(2, 50);
        app.handle_action(Action::PendingG);
        app.handle_action(Action::ScrollDown);
        assert_eq!(app.pending_key, None);
        assert_eq!(handle_key_event(key(KeyCode::Char('g')), &app), Action::PendingG);
    }

    #[test]
    fn test_page_keys() {
        let app = test_app(1, 10);
        assert_eq!(handle_key_event(ctrl('d'), &app), Action::ScrollHalfPageDown);
        assert_eq!(handle_key_event(ctrl('u'), &app), Action::ScrollHalfPageUp);
        assert_eq!(handle_key_event(ctrl('f'), &app), Action::ScrollPageDown);
        assert_eq!(handle_key_event(ctrl('b'), &app), Action::ScrollPageUp);
    }

    #[test]
    fn test_shifted_g_jumps_to_bottom() {
        let app = test_app(1, 10);
        let shifted = KeyEvent::new(KeyCode::Char('G'), KeyModifiers::SHIFT);
        assert_eq!(handle_key_event(shifted, &app), Action::JumpToBottom);
        assert_eq!(handle_key_event(key(KeyCode::Char('G')), &app), Action::JumpToBottom);
    }

    #[test]
    fn test_unbound_key_is_none() {
        let app = test_app(1, 10);
        assert_eq!(handle_key_event(key(KeyCode::Char('z')), &app), Action::None);
        assert_eq!(handle_key_event(ctrl('c'), &app), Action::Quit);
    }
}
