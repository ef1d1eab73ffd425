//! Client-side synchronization and request-lifecycle engine for wschat.
//!
//! This crate defines the "ports" the infrastructure layer implements
//! (message repository, change feed, completion endpoint, session provider)
//! and the engine that keeps a rendered conversation consistent with them.
//! It depends only on `wschat-types` and tokio -- never on `wschat-infra`.

pub mod auth;
pub mod completion;
pub mod deletion;
pub mod engine;
pub mod feed;
pub mod lifecycle;
pub mod notify;
pub mod reply;
pub mod repository;
pub mod store;

#[cfg(test)]
pub(crate) mod testing;
