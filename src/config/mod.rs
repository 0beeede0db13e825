//! Configuration module for Skyposter
//!
//! Settings are the flags of the `start` command, each backed by an
//! environment variable (optionally seeded from a `.env` file). Cross-field
//! checks run after parsing; anything rejected is a
//! [`ConfigError`](crate::ConfigError) and must stop the process at startup.
//!
//! # Example
//!
//! ```no_run
//! use clap::Parser;
//! use skyposter::config::StartArgs;
//!
//! let config = StartArgs::parse().into_config().unwrap();
//! println!("Polling {} feeds", config.feeds.urls.len());
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{AccountConfig, Config, FeedsConfig, PostingConfig, StorageConfig};

// Re-export the argument parser
pub use parser::{StartArgs, DEFAULT_DATABASE_PATH};

pub use validation::validate;
