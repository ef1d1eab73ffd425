//! Infrastructure layer for wschat.
//!
//! Implementations of the ports defined in `wschat-core`: an in-memory and a
//! SQLite message backend (each with its change feed), the HTTP completion
//! client, reply generators, and the configuration loader.

pub mod completion;
pub mod config;
pub mod fanout;
pub mod generator;
pub mod memory;
pub mod sqlite;
