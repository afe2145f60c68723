//! Diagnostic logging setup.
//!
//! Events go to `--log-file` when one is given and to stderr otherwise. While
//! the terminal UI owns the screen, stderr output is gated off so log lines
//! never paint over the interface.

use std::error::Error;
use std::fs::OpenOptions;
use std::io;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use tracing_subscriber::fmt::writer::{BoxMakeWriter, EitherWriter, MakeWriter};
use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "warn";

static STDERR_SUPPRESSED: AtomicBool = AtomicBool::new(false);

/// Gate stderr logging on or off; file logging is unaffected.
pub fn suppress_stderr(suppressed: bool) {
    STDERR_SUPPRESSED.store(suppressed, Ordering::Release);
}

pub fn stderr_suppressed() -> bool {
    STDERR_SUPPRESSED.load(Ordering::Acquire)
}

#[derive(Clone, Copy, Debug, Default)]
pub struct GatedStderr;

impl<'a> MakeWriter<'a> for GatedStderr {
    type Writer = EitherWriter<io::Stderr, io::Sink>;

    fn make_writer(&'a self) -> Self::Writer {
        if stderr_suppressed() {
            EitherWriter::B(io::sink())
        } else {
            EitherWriter::A(io::stderr())
        }
    }
}

/// Install the global `tracing` subscriber. `RUST_LOG` overrides the default
/// `warn` filter.
pub fn init_tracing(log_file: Option<&Path>) -> Result<(), Box<dyn Error>> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let (writer, ansi) = match log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|e| format!("Failed to open log file {}: {e}", path.display()))?;
            (BoxMakeWriter::new(Mutex::new(file)), false)
        }
        None => (BoxMakeWriter::new(GatedStderr), true),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(ansi)
        .with_target(false)
        .try_init()
        .map_err(|e| -> Box<dyn Error> { format!("Failed to initialize logging: {e}").into() })
}
