//! Main chat event loop.
//!
//! The loop owns the [`App`] outright: terminal events and stream updates are
//! collected into [`AppAction`]s, applied in one batch, and any resulting
//! [`AppCommand`]s are started on background tasks before the next frame.

mod keybindings;
mod lifecycle;

use std::{
    error::Error,
    time::{Duration, Instant},
};

use ratatui::crossterm::event::{self, Event, KeyEventKind};
use tokio::sync::mpsc;
use tracing::debug;

use crate::core::app::{apply_actions, App, AppAction, AppCommand, UiMode};
use crate::core::chat_stream::{ChatStreamService, StreamMessage};
use crate::core::reconciler::TurnId;
use crate::ui::renderer::ui;

use self::keybindings::{handle_key, handle_paste};
use self::lifecycle::{restore_terminal, setup_terminal, ChatTerminal};

const MAX_FPS: u64 = 30;
const STATUS_TTL: Duration = Duration::from_secs(3);

pub async fn run_chat(mut app: App) -> Result<(), Box<dyn Error>> {
    let mut terminal = setup_terminal()?;
    let result = event_loop(&mut terminal, &mut app).await;
    restore_terminal(&mut terminal)?;
    result
}

async fn event_loop(terminal: &mut ChatTerminal, app: &mut App) -> Result<(), Box<dyn Error>> {
    let (stream_service, mut stream_rx) = ChatStreamService::new();
    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<Event>();
    let event_reader = spawn_event_reader(event_tx);

    let frame_duration = Duration::from_millis(1000 / MAX_FPS);
    let mut last_draw = Instant::now();
    let mut request_redraw = true;
    let mut seen_revision = app.transcript().revision();

    let result = loop {
        if app.ui.exit_requested {
            break Ok(());
        }

        let mut actions = Vec::new();
        if process_terminal_events(app, &mut event_rx, &mut actions) {
            request_redraw = true;
        }
        if process_stream_updates(&mut stream_rx, app.reconciler.active_turn(), &mut actions) {
            request_redraw = true;
        }

        for command in apply_actions(app, actions) {
            match command {
                AppCommand::SpawnStream(params) => {
                    debug!(turn = %params.turn, "spawning chat stream");
                    stream_service.spawn_stream(params);
                }
            }
        }

        let revision = app.transcript().revision();
        if revision != seen_revision {
            seen_revision = revision;
            request_redraw = true;
        }

        if expire_status(app) {
            request_redraw = true;
        }

        // Keep the busy indicator animating.
        if app.is_busy() && last_draw.elapsed() >= frame_duration {
            request_redraw = true;
        }

        if request_redraw {
            if let Err(err) = terminal.draw(|f| ui(f, app)) {
                break Err(err.into());
            }
            last_draw = Instant::now();
            request_redraw = false;
        }

        tokio::time::sleep(frame_duration / 2).await;
    };

    event_reader.abort();
    result
}

fn process_terminal_events(
    app: &mut App,
    event_rx: &mut mpsc::UnboundedReceiver<Event>,
    actions: &mut Vec<AppAction>,
) -> bool {
    let mut redraw = false;
    while let Ok(ev) = event_rx.try_recv() {
        let result = match ev {
            Event::Key(key) if key.kind == KeyEventKind::Press => handle_key(app, key),
            Event::Paste(text) => handle_paste(app, &text),
            Event::Resize(_, _) => {
                redraw = true;
                continue;
            }
            _ => continue,
        };
        redraw |= result.redraw;
        actions.extend(result.actions);
    }
    redraw
}

/// Drain stream updates for `current_turn`, coalescing consecutive chunks into
/// one action. Updates for any other turn are dropped.
fn process_stream_updates(
    rx: &mut mpsc::UnboundedReceiver<(StreamMessage, TurnId)>,
    current_turn: Option<TurnId>,
    actions: &mut Vec<AppAction>,
) -> bool {
    let mut received_any = false;
    let mut coalesced = String::new();

    while let Ok((message, turn)) = rx.try_recv() {
        if Some(turn) != current_turn {
            debug!(%turn, "dropping update for inactive turn");
            continue;
        }
        received_any = true;

        match message {
            StreamMessage::Chunk(content) => coalesced.push_str(&content),
            StreamMessage::Error(error) => {
                flush_chunks(&mut coalesced, turn, actions);
                actions.push(AppAction::StreamErrored { error, turn });
            }
            StreamMessage::End => {
                flush_chunks(&mut coalesced, turn, actions);
                actions.push(AppAction::StreamCompleted { turn });
            }
        }
    }

    if let Some(turn) = current_turn {
        flush_chunks(&mut coalesced, turn, actions);
    }
    received_any
}

fn flush_chunks(coalesced: &mut String, turn: TurnId, actions: &mut Vec<AppAction>) {
    if coalesced.is_empty() {
        return;
    }
    actions.push(AppAction::AppendResponseChunk {
        content: std::mem::take(coalesced),
        turn,
    });
}

fn expire_status(app: &mut App) -> bool {
    if app.ui.mode != UiMode::Typing {
        return false;
    }
    match app.ui.status_set_at {
        Some(set_at) if set_at.elapsed() >= STATUS_TTL => {
            app.ui.clear_status();
            true
        }
        _ => false,
    }
}

fn spawn_event_reader(event_tx: mpsc::UnboundedSender<Event>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            if let Ok(true) = event::poll(Duration::from_millis(10)) {
                match event::read() {
                    Ok(ev) => {
                        if event_tx.send(ev).is_err() {
                            break;
                        }
                    }
                    Err(_) => continue,
                }
            } else {
                tokio::task::yield_now().await;
            }
        }
    })
}
