//! Key handling for the chat screen.
//!
//! Keys resolve against the current [`UiMode`]: while a reset confirmation is
//! pending only the y/n answer matters, otherwise keys edit the composer or
//! map to [`AppAction`]s for the event loop to apply.

use ratatui::crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::core::app::{App, AppAction, UiMode};

const PAGE_SCROLL_LINES: u16 = 10;

/// What the loop should do once a key has been handled.
#[derive(Debug, Default)]
pub struct KeyResult {
    pub actions: Vec<AppAction>,
    pub redraw: bool,
}

impl KeyResult {
    fn action(action: AppAction) -> Self {
        Self {
            actions: vec![action],
            redraw: true,
        }
    }

    fn redraw() -> Self {
        Self {
            actions: Vec::new(),
            redraw: true,
        }
    }
}

pub fn handle_key(app: &mut App, key: KeyEvent) -> KeyResult {
    if is_ctrl(&key, 'c') {
        return KeyResult::action(AppAction::Quit);
    }

    match app.ui.mode {
        UiMode::ConfirmReset => handle_confirm_key(key),
        UiMode::Typing => handle_typing_key(app, key),
    }
}

fn handle_confirm_key(key: KeyEvent) -> KeyResult {
    match key.code {
        KeyCode::Char('y') | KeyCode::Char('Y') => KeyResult::action(AppAction::ConfirmReset),
        _ => KeyResult::action(AppAction::CancelReset),
    }
}

fn handle_typing_key(app: &mut App, key: KeyEvent) -> KeyResult {
    if is_ctrl(&key, 'l') {
        return KeyResult::action(AppAction::RequestReset);
    }

    if is_ctrl(&key, 'j') {
        app.ui.textarea.insert_newline();
        return KeyResult::redraw();
    }

    match key.code {
        KeyCode::Enter
            if key
                .modifiers
                .intersects(KeyModifiers::SHIFT | KeyModifiers::ALT) =>
        {
            app.ui.textarea.insert_newline();
            KeyResult::redraw()
        }
        KeyCode::Enter => KeyResult::action(AppAction::SubmitMessage {
            message: app.ui.get_input_text(),
        }),
        KeyCode::PageUp => KeyResult::action(AppAction::ScrollUp {
            lines: PAGE_SCROLL_LINES,
        }),
        KeyCode::PageDown => KeyResult::action(AppAction::ScrollDown {
            lines: PAGE_SCROLL_LINES,
        }),
        _ => {
            let changed = app.ui.textarea.input(key);
            KeyResult {
                actions: Vec::new(),
                redraw: changed,
            }
        }
    }
}

/// Bracketed paste goes straight into the composer, newlines included.
pub fn handle_paste(app: &mut App, text: &str) -> KeyResult {
    if app.ui.mode != UiMode::Typing {
        return KeyResult::default();
    }
    let normalized = text.replace("\r\n", "\n").replace('\r', "\n");
    app.ui.textarea.insert_str(normalized);
    KeyResult::redraw()
}

fn is_ctrl(key: &KeyEvent, ch: char) -> bool {
    key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char(ch)
}
