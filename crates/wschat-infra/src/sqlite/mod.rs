//! SQLite storage: pooled connections plus the message backend.

pub mod backend;
pub mod pool;
