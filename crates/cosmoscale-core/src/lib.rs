//! cosmoscale-core: shared types and settings for the cosmoscale workspace.
//!
//! Holds the per-collection policy model, the transient data that flows
//! through one evaluation pass (samples, snapshots, decisions), and the
//! `cosmoscale.toml` settings parser.

pub mod config;
pub mod duration;
pub mod types;

pub use config::{ConfigError, ConfigResult, Settings};
pub use duration::parse_duration;
pub use types::*;
