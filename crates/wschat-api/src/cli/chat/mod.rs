//! Interactive terminal chat.
//!
//! Entry point: `loop_runner::run_chat_loop`. Input is read with
//! rustyline-async while the engine's view and notifications are rendered
//! as they change.

pub mod commands;
pub mod input;
pub mod loop_runner;
