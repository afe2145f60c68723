//! Flint is a terminal chat client that streams replies from Google's Gemini
//! models as they are generated.
//!
//! The crate is organized around a small set of collaborating layers:
//! - [`core`] owns the transcript, the turn state machine that folds streamed
//!   fragments into it, and the remote session whose history is replayed with
//!   every request.
//! - [`ui`] renders the terminal interface and runs the interactive event loop.
//! - [`api`] defines the Gemini request and response payloads.
//! - [`cli`] parses arguments and dispatches to the chat loop or one-shot
//!   commands.
//!
//! Runtime entrypoints live in the binary crate (`src/main.rs`) and route
//! through [`crate::cli::main`].

pub mod api;
pub mod cli;
pub mod core;
pub mod ui;
pub mod utils;
