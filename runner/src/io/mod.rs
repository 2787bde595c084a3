//! I/O adapters: `.cursor/` documents, git, and child processes.

pub mod agents;
pub mod config;
pub mod git;
pub mod init;
pub mod json_file;
pub mod launcher;
pub mod process;
pub mod state_store;
pub mod workspace;
