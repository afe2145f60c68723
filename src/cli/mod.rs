//! Command-line interface parsing and handling
//!
//! This module parses command-line arguments, performs the shared startup
//! (logging, configuration, credentials) and runs the chosen command.

pub mod say;

use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::{error, info};

use crate::cli::say::run_say;
use crate::core::app::App;
use crate::core::chat_stream::GeminiTransport;
use crate::core::config::{api_key_from_env, print_effective, Config, ResolvedSettings};
use crate::core::session::SessionManager;
use crate::ui::chat_loop::run_chat;
use crate::utils::logging::init_tracing;

#[derive(Parser, Debug)]
#[command(name = "flint", version)]
#[command(about = "A terminal chat client for Gemini with streaming responses")]
#[command(
    long_about = "Flint is a full-screen terminal chat client that streams responses from \
Google's Gemini models as they are generated.\n\n\
Environment Variables:\n\
  GEMINI_API_KEY    Your Gemini API key (API_KEY is used as a fallback)\n\
  RUST_LOG          Log filter, defaults to 'warn'\n\n\
Controls:\n\
  Enter             Send the message\n\
  Shift+Enter       Insert a new line (Alt+Enter and Ctrl+J also work)\n\
  PageUp/PageDown   Scroll through the conversation\n\
  Ctrl+L            Clear the conversation (asks for confirmation)\n\
  Ctrl+C            Quit the application"
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Model to chat with, overriding the configuration file
    #[arg(short = 'm', long, global = true, value_name = "MODEL")]
    pub model: Option<String>,

    /// Read configuration from this file instead of the default location
    #[arg(short = 'c', long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Write diagnostic logs to this file instead of stderr
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Commands {
    /// Start the chat interface (default)
    Chat,
    /// Send a single prompt and stream the reply to stdout
    Say {
        /// Prompt text; multiple words are joined with spaces
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        prompt: Vec<String>,
    },
    /// Print the effective configuration
    Config,
}

pub fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    init_tracing(args.log_file.as_deref())?;

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(async_main(args))
}

async fn async_main(args: Args) -> Result<(), Box<dyn Error>> {
    let config = match &args.config {
        Some(path) => Config::load_from_path(path)?,
        None => Config::load()?,
    };
    let config_path = args.config.clone().or_else(Config::default_path);
    let settings = config.resolve(args.model.as_deref());
    let api_key = api_key_from_env();

    match args.command.unwrap_or(Commands::Chat) {
        Commands::Config => {
            print_effective(&settings, config_path.as_deref(), api_key.is_some());
            Ok(())
        }
        Commands::Say { prompt } => {
            let sessions = build_sessions(&settings, api_key);
            run_say(sessions, prompt.join(" ")).await
        }
        Commands::Chat => {
            let sessions = build_sessions(&settings, api_key);
            run_chat(App::new(sessions)).await
        }
    }
}

/// Construct the session manager. A missing credential is reported here but
/// is not fatal; the first send fails instead.
fn build_sessions(settings: &ResolvedSettings, api_key: Option<String>) -> SessionManager {
    if api_key.is_none() {
        error!("no API key found; set GEMINI_API_KEY to chat");
    }
    info!(model = %settings.model, base_url = %settings.base_url, "starting session");

    let transport = GeminiTransport::new(
        reqwest::Client::new(),
        settings.base_url.clone(),
        api_key,
    );
    SessionManager::new(settings.session_settings(), Arc::new(transport))
}
