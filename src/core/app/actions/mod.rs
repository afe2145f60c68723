mod input;
mod streaming;

use super::App;
use crate::core::chat_stream::{StreamError, StreamParams};
use crate::core::reconciler::TurnId;

#[derive(Debug)]
pub enum AppAction {
    SubmitMessage { message: String },
    AppendResponseChunk { content: String, turn: TurnId },
    StreamErrored { error: StreamError, turn: TurnId },
    StreamCompleted { turn: TurnId },
    RequestReset,
    ConfirmReset,
    CancelReset,
    SetStatus { message: String },
    ClearStatus,
    ScrollUp { lines: u16 },
    ScrollDown { lines: u16 },
    Quit,
}

pub enum AppCommand {
    SpawnStream(StreamParams),
}

pub fn apply_actions(app: &mut App, actions: impl IntoIterator<Item = AppAction>) -> Vec<AppCommand> {
    actions
        .into_iter()
        .filter_map(|action| apply_action(app, action))
        .collect()
}

pub fn apply_action(app: &mut App, action: AppAction) -> Option<AppCommand> {
    match action {
        AppAction::SubmitMessage { .. }
        | AppAction::AppendResponseChunk { .. }
        | AppAction::StreamErrored { .. }
        | AppAction::StreamCompleted { .. } => streaming::handle_streaming_action(app, action),

        AppAction::RequestReset
        | AppAction::ConfirmReset
        | AppAction::CancelReset
        | AppAction::SetStatus { .. }
        | AppAction::ClearStatus
        | AppAction::ScrollUp { .. }
        | AppAction::ScrollDown { .. }
        | AppAction::Quit => input::handle_input_action(app, action),
    }
}
