//! TUI-less "say" command

use std::error::Error;
use std::io::{self, Write};

use crate::core::constants::FAILURE_NOTICE;
use crate::core::reconciler::{Reconciler, TurnOutcome};
use crate::core::session::SessionManager;

pub async fn run_say(sessions: SessionManager, prompt: String) -> Result<(), Box<dyn Error>> {
    if prompt.trim().is_empty() {
        eprintln!("Usage: flint say <prompt>");
        std::process::exit(1);
    }

    let mut stdout = io::stdout();
    match say(&sessions, &prompt, &mut stdout).await? {
        TurnOutcome::Completed => Ok(()),
        TurnOutcome::Failed => {
            eprintln!("{FAILURE_NOTICE}");
            std::process::exit(1);
        }
    }
}

/// Run one turn through a fresh reconciler, writing each fragment to `out` as
/// it arrives.
pub async fn say<W: Write>(
    sessions: &SessionManager,
    prompt: &str,
    out: &mut W,
) -> io::Result<TurnOutcome> {
    let mut reconciler = Reconciler::new();
    let Some(pending) = reconciler.submit(prompt) else {
        return Ok(TurnOutcome::Completed);
    };

    let stream = match sessions.current().send_stream(&pending.prompt).await {
        Ok(stream) => stream,
        Err(err) => {
            reconciler.fail(pending.turn, &err);
            return Ok(TurnOutcome::Failed);
        }
    };

    let mut write_error = None;
    let outcome = reconciler
        .drive(pending.turn, stream, |fragment| {
            if write_error.is_some() {
                return;
            }
            if let Err(err) = out.write_all(fragment.as_bytes()).and_then(|_| out.flush()) {
                write_error = Some(err);
            }
        })
        .await;

    if let Some(err) = write_error {
        return Err(err);
    }
    if outcome == TurnOutcome::Completed {
        writeln!(out)?;
    }
    Ok(outcome)
}
