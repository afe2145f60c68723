use std::time::Instant;

use ratatui::style::{Modifier, Style};
use tui_textarea::{CursorMove, TextArea};

/// Current UI interaction mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UiMode {
    /// Default typing mode for composing new messages.
    #[default]
    Typing,

    /// Waiting for the user to confirm discarding the conversation.
    ConfirmReset,
}

pub struct UiState {
    pub mode: UiMode,
    pub textarea: TextArea<'static>,
    /// Wrapped transcript lines scrolled up from the bottom; 0 follows new output.
    pub scroll_from_bottom: u16,
    pub status: Option<String>,
    pub status_set_at: Option<Instant>,
    pub exit_requested: bool,
    pub pulse_start: Instant,
}

impl Default for UiState {
    fn default() -> Self {
        Self::new()
    }
}

impl UiState {
    pub fn new() -> Self {
        let mut textarea = TextArea::default();
        textarea.set_placeholder_text("Type your message...");
        textarea.set_cursor_line_style(Style::default());
        textarea.set_cursor_style(Style::default().add_modifier(Modifier::REVERSED));
        Self {
            mode: UiMode::Typing,
            textarea,
            scroll_from_bottom: 0,
            status: None,
            status_set_at: None,
            exit_requested: false,
            pulse_start: Instant::now(),
        }
    }

    pub fn get_input_text(&self) -> String {
        self.textarea.lines().join("\n")
    }

    pub fn has_input(&self) -> bool {
        self.textarea.lines().iter().any(|line| !line.trim().is_empty())
    }

    pub fn set_input_text(&mut self, text: &str) {
        self.textarea.select_all();
        self.textarea.cut();
        self.textarea.insert_str(text);
        self.textarea.move_cursor(CursorMove::Bottom);
        self.textarea.move_cursor(CursorMove::End);
    }

    pub fn clear_input(&mut self) {
        self.set_input_text("");
    }

    pub fn input_line_count(&self) -> u16 {
        self.textarea.lines().len().max(1) as u16
    }

    pub fn set_status<S: Into<String>>(&mut self, status: S) {
        self.status = Some(status.into());
        self.status_set_at = Some(Instant::now());
    }

    pub fn clear_status(&mut self) {
        self.status = None;
        self.status_set_at = None;
    }

    pub fn scroll_up(&mut self, lines: u16) {
        self.scroll_from_bottom = self.scroll_from_bottom.saturating_add(lines);
    }

    pub fn scroll_down(&mut self, lines: u16) {
        self.scroll_from_bottom = self.scroll_from_bottom.saturating_sub(lines);
    }

    pub fn follow_output(&mut self) {
        self.scroll_from_bottom = 0;
    }

    pub fn is_following_output(&self) -> bool {
        self.scroll_from_bottom == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn multi_line_input_round_trips_through_textarea() {
        let mut ui = UiState::new();
        ui.set_input_text("first\nsecond");
        assert_eq!(ui.get_input_text(), "first\nsecond");
        assert_eq!(ui.input_line_count(), 2);

        ui.clear_input();
        assert_eq!(ui.get_input_text(), "");
        assert!(!ui.has_input());
    }

    #[test]
    fn whitespace_only_input_does_not_count() {
        let mut ui = UiState::new();
        ui.set_input_text("  \n\t");
        assert!(!ui.has_input());
        ui.set_input_text("  x ");
        assert!(ui.has_input());
    }

    #[test]
    fn scrolling_saturates_at_bottom() {
        let mut ui = UiState::new();
        ui.scroll_up(5);
        ui.scroll_down(2);
        assert_eq!(ui.scroll_from_bottom, 3);
        ui.scroll_down(10);
        assert!(ui.is_following_output());
    }
}
