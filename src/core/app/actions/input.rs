use super::{App, AppAction, AppCommand};
use crate::core::app::UiMode;

pub(super) fn handle_input_action(app: &mut App, action: AppAction) -> Option<AppCommand> {
    match action {
        AppAction::RequestReset => {
            app.ui.mode = UiMode::ConfirmReset;
            app.ui.set_status("Clear the conversation? (y/n)");
        }
        AppAction::ConfirmReset => {
            if app.ui.mode == UiMode::ConfirmReset {
                app.ui.mode = UiMode::Typing;
                app.reset_conversation();
                app.ui.set_status("Conversation cleared");
            }
        }
        AppAction::CancelReset => {
            if app.ui.mode == UiMode::ConfirmReset {
                app.ui.mode = UiMode::Typing;
                app.ui.clear_status();
            }
        }
        AppAction::SetStatus { message } => app.ui.set_status(message),
        AppAction::ClearStatus => app.ui.clear_status(),
        AppAction::ScrollUp { lines } => app.ui.scroll_up(lines),
        AppAction::ScrollDown { lines } => app.ui.scroll_down(lines),
        AppAction::Quit => app.ui.exit_requested = true,
        _ => unreachable!("non-input action routed to input handler"),
    }
    None
}
