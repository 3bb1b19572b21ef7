//! Layered TOML configuration for the Warden gateway.
//!
//! Four layers, later ones winning field by field: embedded defaults,
//! `~/.warden/config.toml`, `{workspace}/.warden/config.toml`, and
//! `WARDEN_*` environment variables. [`Config::load`] runs the whole
//! pipeline and validates the result; secrets never appear in `Debug` or
//! serialized output.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![allow(clippy::must_use_candidate)]

pub mod error;
mod loader;
pub mod types;
mod validate;

pub use error::{ConfigError, ConfigResult};
pub use types::{
    AgentSection, Config, GatewaySection, LogFormat, LoggingSection, PolicySection,
    StorageBackend, StorageSection,
};
