// src/commands/mod.rs
//! Command handlers for the depmark CLI
//!
//! Every handler returns whether the command succeeded; usage and I/O
//! problems come back as errors.

mod query;
mod resolve;

pub use query::{cmd_vercmp, cmd_whatprovides};
pub use resolve::{cmd_install, cmd_uninstall, cmd_verify};
