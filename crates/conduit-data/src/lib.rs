//! Data-driven configuration for Conduit pipe networks.
//!
//! Reads `pipes.{ron,toml,json}` from a data directory and resolves it into
//! a validated [`PipeConfigSet`].

pub mod loader;
pub mod schema;

pub use loader::{DataLoadError, PipeConfigSet, load_pipe_config, load_pipe_config_file};
