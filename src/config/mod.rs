//! Configuration module for auction-scraper
//!
//! This module handles loading, parsing, and validating TOML configuration
//! files. Command line flags are applied on top of a loaded configuration by
//! the binary, which validates the result again.
//!
//! # Example
//!
//! ```no_run
//! use auction_scraper::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("scraper.toml")).unwrap();
//! println!("Cooldown: {:?}", config.cooldown());
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{Config, PathOverrides, ScraperConfig, SiteOverrides, UserAgentConfig};

// Re-export parser and validation functions
pub use parser::load_config;
pub use validation::validate;
