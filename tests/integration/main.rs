//! End-to-end tests: inbound text → classifier → tracker → store →
//! notices → report, with an in-memory gateway, store and notifier.

mod mock_gateway;
mod pipeline;
