//! CLI module for PMP Memo Cache
//!
//! Provides subcommands:
//! - `demo`: memoize a slow computation and call it around its expiry
//! - `key`: print the cache key a call would use

pub mod demo;
pub mod key;

use clap::{Parser, Subcommand};

use crate::config::AppConfig;
use crate::infrastructure::logging;

/// PMP Memo Cache - Memoize async operations against pluggable caches
#[derive(Parser)]
#[command(name = "pmp-memo-cache")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the expensive-computation demo against a cache backend
    Demo(demo::DemoArgs),

    /// Print the cache key derived for an operation call
    Key(key::KeyArgs),
}

fn init_logging(config: &AppConfig) {
    logging::init_logging(&config.logging);
}
