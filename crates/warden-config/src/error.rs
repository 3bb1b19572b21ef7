//! Configuration error taxonomy.

use thiserror::Error;

/// Failure while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A config file exists but could not be read.
    #[error("failed to read config file {path}: {source}")]
    Read {
        /// File that failed.
        path: String,
        /// Underlying IO error.
        source: std::io::Error,
    },

    /// A config file or layer is not valid TOML for the schema.
    #[error("failed to parse config {path}: {source}")]
    Parse {
        /// File or layer that failed.
        path: String,
        /// Underlying TOML error.
        source: toml::de::Error,
    },

    /// The merged configuration is structurally valid but unusable.
    #[error("invalid config value for {field}: {message}")]
    Validation {
        /// Dotted path of the offending field.
        field: String,
        /// What is wrong with it.
        message: String,
    },

    /// No home directory could be determined for user-level config.
    #[error("could not determine a home directory")]
    NoHomeDir,
}

/// Shorthand result for config operations.
pub type ConfigResult<T> = Result<T, ConfigError>;
