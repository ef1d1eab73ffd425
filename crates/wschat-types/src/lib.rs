//! Shared domain types for wschat.
//!
//! Messages, session and message identifiers, change-feed events,
//! user-facing notifications, configuration, and the error taxonomy.
//!
//! Zero infrastructure dependencies -- only serde, uuid, chrono, thiserror.

pub mod chat;
pub mod completion;
pub mod config;
pub mod error;
pub mod feed;
pub mod notification;
pub mod session;
