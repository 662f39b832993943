//! I/O helpers for panel commands and the engine boundary.

pub mod atomic;
pub mod config;
pub mod engine;
pub mod init;
pub mod run_archive;
pub mod settings;
