//! Shared constants used across the application

/// Model used when neither the command line nor the config file picks one.
pub const DEFAULT_MODEL: &str = "gemini-flash-lite-latest";

/// System instruction sent with every request of a session.
pub const DEFAULT_SYSTEM_INSTRUCTION: &str = "You are a helpful, lightning-fast AI assistant. \n\
Your goal is to provide concise, accurate, and immediate responses. \n\
You are powered by the Gemini 2.5 Flash Lite model, optimized for speed.";

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Environment variables consulted for the API credential, in order.
pub const API_KEY_ENV_VARS: [&str; 2] = ["GEMINI_API_KEY", "API_KEY"];

/// Notice appended to the transcript when a turn fails for any reason.
pub const FAILURE_NOTICE: &str =
    "I'm having trouble connecting right now. Please check your network or API key.";

/// Space reserved for the send indicator + margin in the input area.
pub const INDICATOR_SPACE: u16 = 4;
