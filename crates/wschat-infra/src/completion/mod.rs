//! Completion endpoint clients.

pub mod http;
