//! Deterministic, pure logic shared by the agent engine.
//!
//! Core modules must be free of I/O side effects. They operate on in-memory
//! data structures and return deterministic outputs suitable for tests.

pub mod context;
pub mod environment;
pub mod names;
pub mod state_update;
pub mod types;
