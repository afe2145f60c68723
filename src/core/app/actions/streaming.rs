use super::{App, AppAction, AppCommand};
use crate::core::chat_stream::StreamParams;

pub(super) fn handle_streaming_action(app: &mut App, action: AppAction) -> Option<AppCommand> {
    match action {
        AppAction::SubmitMessage { message } => spawn_stream_for_message(app, message),
        AppAction::AppendResponseChunk { content, turn } => {
            app.reconciler.apply_fragment(turn, &content);
            None
        }
        AppAction::StreamErrored { error, turn } => {
            app.reconciler.fail(turn, &error);
            None
        }
        AppAction::StreamCompleted { turn } => {
            app.reconciler.complete(turn);
            None
        }
        _ => unreachable!("non-streaming action routed to streaming handler"),
    }
}

fn spawn_stream_for_message(app: &mut App, message: String) -> Option<AppCommand> {
    let pending = app.reconciler.submit(&message)?;

    app.ui.clear_input();
    app.ui.clear_status();
    app.ui.follow_output();
    app.ui.pulse_start = std::time::Instant::now();

    Some(AppCommand::SpawnStream(StreamParams {
        session: app.sessions.current().clone(),
        prompt: pending.prompt,
        turn: pending.turn,
    }))
}
