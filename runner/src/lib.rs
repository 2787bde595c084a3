//! Local automation runner for declarative agents.
//!
//! Agents are JSON definitions under `.cursor/agents/` that name a script,
//! dependencies, the bus events they listen to, and the state keys their
//! completion updates. The architecture keeps a strict separation:
//!
//! - **[`core`]**: Pure, deterministic logic (types, state mutation policy,
//!   child environment contract). No I/O.
//! - **[`io`]**: Side-effecting adapters (`.cursor/` documents, git, process
//!   spawning). Behind traits where tests need to substitute them.
//!
//! [`engine`] runs agents depth-first and emits lifecycle events on the
//! synchronous [`bus`]; [`dispatch`] reacts to those events by firing listener
//! agents. [`list`] and [`info`] back the remaining CLI commands.

pub mod bus;
pub mod core;
pub mod dispatch;
pub mod engine;
pub mod exit_codes;
pub mod info;
pub mod io;
pub mod list;
pub mod logging;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
