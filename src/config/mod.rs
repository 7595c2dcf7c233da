//! Configuration for rdgai.
//!
//! ## config.kdl - User preferences
//!
//! Located at `~/.config/rdgai/config.kdl` unless `--config` or
//! `RDGAI_CONFIG` names another file.
//!
//! Contains:
//! - `responsible` - Provenance written by edits and imports
//! - `examples` - Representative examples per category in prompts
//! - `seed` - Seed for example sampling
//! - `output-format` - "json" or "human"
//! - `model`, `endpoint`, `temperature` - Classification service settings
//!
//! The API key is only ever read from `OPENAI_API_KEY`.
//!
//! ## Precedence
//!
//! CLI flag > config.kdl > defaults
//!
//! Use the [`resolver`] module for precedence resolution.

pub mod resolver;
pub mod schema;

pub use resolver::{
    CONFIG_ENV, ConfigLocation, ConfigOverrides, Resolved, ResolvedConfig, ValueSource,
    default_config_path, init_config, load_config, locate_config, resolve_config, resolve_with,
};
pub use schema::{OutputFormat, RdgaiConfig};
