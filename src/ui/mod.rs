//! Terminal UI layer for interactive chat sessions.
//!
//! [`chat_loop`] runs the event loop and owns the terminal; [`renderer`]
//! composes each frame from the current [`crate::core::app::App`] state.

pub mod chat_loop;
pub mod renderer;
