//! CALLWATCH, a token-call tracker for chat groups.
//!
//! Library crate exposing all modules for use by integration tests
//! and the binary entry points.

pub mod config;
pub mod types;
pub mod quotes;
pub mod storage;
pub mod notify;
pub mod engine;
pub mod chat;
pub mod dashboard;
pub mod logging;
