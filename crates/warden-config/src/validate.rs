//! Structural validation of the merged configuration.

use warden_core::AgentBackendKind;

use crate::error::{ConfigError, ConfigResult};
use crate::types::Config;

/// Reject configurations that would fail at first use.
pub(crate) fn validate(config: &Config) -> ConfigResult<()> {
    if config.agent.binary.trim().is_empty() {
        return Err(ConfigError::Validation {
            field: "agent.binary".into(),
            message: "must not be empty".into(),
        });
    }
    if config.agent.timeout_secs == 0 {
        return Err(ConfigError::Validation {
            field: "agent.timeout_secs".into(),
            message: "must be at least 1".into(),
        });
    }
    if config.agent.backend == AgentBackendKind::Sdk {
        if config
            .agent
            .base_url
            .as_deref()
            .is_none_or(|url| url.trim().is_empty())
        {
            return Err(ConfigError::Validation {
                field: "agent.base_url".into(),
                message: "required when agent.backend is sdk".into(),
            });
        }
        if config
            .agent
            .api_key
            .as_deref()
            .is_none_or(|key| key.trim().is_empty())
        {
            return Err(ConfigError::Validation {
                field: "agent.api_key".into(),
                message: "required when agent.backend is sdk".into(),
            });
        }
    }
    if config.gateway.chunk_limit < 64 {
        return Err(ConfigError::Validation {
            field: "gateway.chunk_limit".into(),
            message: "must be at least 64 bytes".into(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_pass() {
        assert!(validate(&Config::default()).is_ok());
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let mut config = Config::default();
        config.agent.timeout_secs = 0;
        let err = validate(&config).unwrap_err();
        assert!(matches!(err, ConfigError::Validation { field, .. } if field == "agent.timeout_secs"));
    }

    #[test]
    fn sdk_backend_requires_url_and_key() {
        let mut config = Config::default();
        config.agent.backend = AgentBackendKind::Sdk;
        assert!(validate(&config).is_err());

        config.agent.base_url = Some("https://agent.example.com".into());
        let err = validate(&config).unwrap_err();
        assert!(matches!(err, ConfigError::Validation { field, .. } if field == "agent.api_key"));

        config.agent.api_key = Some("token".into());
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn tiny_chunk_limit_is_rejected() {
        let mut config = Config::default();
        config.gateway.chunk_limit = 10;
        assert!(validate(&config).is_err());
    }
}
