//! Config discovery and layered loading.
//!
//! Layer order: embedded defaults, then `~/.warden/config.toml`, then
//! `{workspace}/.warden/config.toml`, then `WARDEN_*` environment
//! variables. Later layers win field by field; a missing file just skips
//! its layer.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::{ConfigError, ConfigResult};
use crate::types::{Config, StorageBackend};
use crate::validate;

/// Embedded default configuration.
const DEFAULTS_TOML: &str = include_str!("defaults.toml");

/// Largest config file the loader will read (1 MB).
const MAX_CONFIG_FILE_SIZE: usize = 1_048_576;

impl Config {
    /// Load the layered configuration.
    ///
    /// `workspace_root` is the directory whose `.warden/config.toml` forms
    /// the workspace layer; `None` skips that layer. `home_override`
    /// replaces the discovered home directory, which tests use to stay
    /// hermetic.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] when a present file is unreadable or
    /// malformed, or when the merged result fails validation.
    pub fn load(
        workspace_root: Option<&Path>,
        home_override: Option<&Path>,
    ) -> ConfigResult<Self> {
        let env: HashMap<String, String> = std::env::vars()
            .filter(|(key, _)| key.starts_with("WARDEN_"))
            .collect();
        Self::load_with_env(workspace_root, home_override, &env)
    }

    /// [`Config::load`] with an explicit environment map.
    ///
    /// # Errors
    ///
    /// Same conditions as [`Config::load`].
    pub fn load_with_env(
        workspace_root: Option<&Path>,
        home_override: Option<&Path>,
        env: &HashMap<String, String>,
    ) -> ConfigResult<Self> {
        let mut merged: toml::Value =
            toml::from_str(DEFAULTS_TOML).map_err(|e| ConfigError::Parse {
                path: "<embedded defaults>".into(),
                source: e,
            })?;

        let home = match home_override {
            Some(dir) => dir.to_path_buf(),
            None => home_directory()?,
        };
        let user_path = home.join(".warden").join("config.toml");
        if let Some(overlay) = try_load_file(&user_path)? {
            deep_merge(&mut merged, &overlay);
            info!(path = %user_path.display(), "loaded user config");
        }

        if let Some(root) = workspace_root {
            let workspace_path = root.join(".warden").join("config.toml");
            if let Some(overlay) = try_load_file(&workspace_path)? {
                deep_merge(&mut merged, &overlay);
                info!(path = %workspace_path.display(), "loaded workspace config");
            }
        }

        let mut config: Config =
            merged
                .try_into()
                .map_err(|e: toml::de::Error| ConfigError::Parse {
                    path: "<merged config>".into(),
                    source: e,
                })?;

        apply_env_overrides(&mut config, env)?;
        validate::validate(&config)?;
        Ok(config)
    }

    /// Load exactly one file, skipping the layering.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] when the file is missing, unreadable,
    /// malformed, or fails validation.
    pub fn load_file(path: &Path) -> ConfigResult<Self> {
        let Some(value) = try_load_file(path)? else {
            return Err(ConfigError::Read {
                path: path.display().to_string(),
                source: std::io::Error::from(std::io::ErrorKind::NotFound),
            });
        };
        let config: Config = value
            .try_into()
            .map_err(|e: toml::de::Error| ConfigError::Parse {
                path: path.display().to_string(),
                source: e,
            })?;
        validate::validate(&config)?;
        Ok(config)
    }
}

/// Apply `WARDEN_*` overrides. The environment beats every file layer.
fn apply_env_overrides(config: &mut Config, env: &HashMap<String, String>) -> ConfigResult<()> {
    if let Some(binary) = env.get("WARDEN_AGENT_BINARY") {
        config.agent.binary = binary.clone();
    }
    if let Some(model) = env.get("WARDEN_AGENT_MODEL") {
        config.agent.model = Some(model.clone());
    }
    if let Some(backend) = env.get("WARDEN_AGENT_BACKEND") {
        config.agent.backend = backend.parse().map_err(|message| ConfigError::Validation {
            field: "agent.backend".into(),
            message,
        })?;
    }
    if let Some(secs) = env.get("WARDEN_AGENT_TIMEOUT_SECS") {
        config.agent.timeout_secs = secs.parse().map_err(|_| ConfigError::Validation {
            field: "agent.timeout_secs".into(),
            message: format!("not a number of seconds: {secs}"),
        })?;
    }
    if let Some(url) = env.get("WARDEN_BASE_URL") {
        config.agent.base_url = Some(url.clone());
    }
    if let Some(key) = env.get("WARDEN_API_KEY") {
        config.agent.api_key = Some(key.clone());
    }
    if let Some(backend) = env.get("WARDEN_STORAGE_BACKEND") {
        config.storage.backend = match backend.trim().to_ascii_lowercase().as_str() {
            "memory" => StorageBackend::Memory,
            "kv" => StorageBackend::Kv,
            other => {
                return Err(ConfigError::Validation {
                    field: "storage.backend".into(),
                    message: format!("unknown storage backend: {other}"),
                });
            },
        };
    }
    if let Some(path) = env.get("WARDEN_STORAGE_PATH") {
        config.storage.path = Some(PathBuf::from(path));
    }
    if let Some(level) = env.get("WARDEN_LOG_LEVEL") {
        config.logging.level = level.clone();
    }
    if let Some(language) = env.get("WARDEN_LANGUAGE") {
        config.gateway.language = language.clone();
    }
    Ok(())
}

/// Read and parse one optional layer. A missing file is not an error.
fn try_load_file(path: &Path) -> ConfigResult<Option<toml::Value>> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "no config file, skipping layer");
            return Ok(None);
        },
        Err(e) => {
            return Err(ConfigError::Read {
                path: path.display().to_string(),
                source: e,
            });
        },
    };

    // Size is checked on the content, never on a prior stat.
    if content.len() > MAX_CONFIG_FILE_SIZE {
        return Err(ConfigError::Validation {
            field: path.display().to_string(),
            message: format!(
                "config file is {} bytes, over the {MAX_CONFIG_FILE_SIZE} byte limit",
                content.len()
            ),
        });
    }

    let value = toml::from_str(&content).map_err(|e| ConfigError::Parse {
        path: path.display().to_string(),
        source: e,
    })?;
    Ok(Some(value))
}

/// Merge `overlay` into `base`: tables merge key-wise, everything else is
/// replaced.
fn deep_merge(base: &mut toml::Value, overlay: &toml::Value) {
    match (base, overlay) {
        (toml::Value::Table(base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_child) in overlay_table {
                match base_table.get_mut(key) {
                    Some(base_child) if base_child.is_table() && overlay_child.is_table() => {
                        deep_merge(base_child, overlay_child);
                    },
                    _ => {
                        base_table.insert(key.clone(), overlay_child.clone());
                    },
                }
            }
        },
        (base_slot, _) => *base_slot = overlay.clone(),
    }
}

fn home_directory() -> ConfigResult<PathBuf> {
    directories::BaseDirs::new()
        .map(|dirs| dirs.home_dir().to_path_buf())
        .ok_or(ConfigError::NoHomeDir)
}

#[cfg(test)]
mod tests {
    use super::*;
    use warden_core::AgentBackendKind;

    fn write_config(dir: &Path, content: &str) {
        let config_dir = dir.join(".warden");
        std::fs::create_dir_all(&config_dir).unwrap();
        std::fs::write(config_dir.join("config.toml"), content).unwrap();
    }

    fn no_env() -> HashMap<String, String> {
        HashMap::new()
    }

    #[test]
    fn defaults_toml_matches_the_default_impl() {
        let parsed: Config = toml::from_str(DEFAULTS_TOML).unwrap();
        assert_eq!(parsed, Config::default());
    }

    #[test]
    fn missing_files_yield_pure_defaults() {
        let home = tempfile::tempdir().unwrap();
        let config = Config::load_with_env(None, Some(home.path()), &no_env()).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn user_layer_overrides_defaults_field_by_field() {
        let home = tempfile::tempdir().unwrap();
        write_config(home.path(), "[agent]\nbinary = \"user-agent\"\n");

        let config = Config::load_with_env(None, Some(home.path()), &no_env()).unwrap();
        assert_eq!(config.agent.binary, "user-agent");
        assert_eq!(config.agent.timeout_secs, 300);
        assert_eq!(config.policy, Config::default().policy);
    }

    #[test]
    fn workspace_layer_beats_the_user_layer() {
        let home = tempfile::tempdir().unwrap();
        let workspace = tempfile::tempdir().unwrap();
        write_config(
            home.path(),
            "[agent]\nbinary = \"user-agent\"\nmodel = \"user-model\"\n",
        );
        write_config(workspace.path(), "[agent]\nmodel = \"workspace-model\"\n");

        let config =
            Config::load_with_env(Some(workspace.path()), Some(home.path()), &no_env()).unwrap();
        assert_eq!(config.agent.binary, "user-agent");
        assert_eq!(config.agent.model.as_deref(), Some("workspace-model"));
    }

    #[test]
    fn environment_beats_every_file_layer() {
        let home = tempfile::tempdir().unwrap();
        write_config(home.path(), "[agent]\nbinary = \"user-agent\"\n");
        let env: HashMap<String, String> = [
            ("WARDEN_AGENT_BINARY".to_string(), "env-agent".to_string()),
            ("WARDEN_AGENT_BACKEND".to_string(), "sdk".to_string()),
            ("WARDEN_BASE_URL".to_string(), "https://a.example".to_string()),
            ("WARDEN_API_KEY".to_string(), "tok".to_string()),
        ]
        .into();

        let config = Config::load_with_env(None, Some(home.path()), &env).unwrap();
        assert_eq!(config.agent.binary, "env-agent");
        assert_eq!(config.agent.backend, AgentBackendKind::Sdk);
    }

    #[test]
    fn bad_env_timeout_is_a_validation_error() {
        let home = tempfile::tempdir().unwrap();
        let env: HashMap<String, String> = [(
            "WARDEN_AGENT_TIMEOUT_SECS".to_string(),
            "soon".to_string(),
        )]
        .into();

        let err = Config::load_with_env(None, Some(home.path()), &env).unwrap_err();
        assert!(matches!(err, ConfigError::Validation { field, .. } if field == "agent.timeout_secs"));
    }

    #[test]
    fn malformed_layer_is_a_parse_error() {
        let home = tempfile::tempdir().unwrap();
        write_config(home.path(), "agent = not toml [\n");

        let err = Config::load_with_env(None, Some(home.path()), &no_env()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn oversized_layer_is_rejected() {
        let home = tempfile::tempdir().unwrap();
        let filler = "x = \"".to_owned() + &"a".repeat(1_100_000) + "\"";
        write_config(home.path(), &filler);

        let err = Config::load_with_env(None, Some(home.path()), &no_env()).unwrap_err();
        assert!(matches!(err, ConfigError::Validation { .. }));
    }

    #[test]
    fn load_file_skips_layering() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("one-off.toml");
        std::fs::write(&path, "[agent]\nbinary = \"direct\"\n").unwrap();

        let config = Config::load_file(&path).unwrap();
        assert_eq!(config.agent.binary, "direct");
        assert!(Config::load_file(&dir.path().join("absent.toml")).is_err());
    }

    #[test]
    fn deep_merge_merges_tables_and_replaces_scalars() {
        let mut base: toml::Value = toml::from_str(
            "[agent]\nbinary = \"a\"\ntimeout_secs = 300\n[policy]\nblock = [\"x\"]\n",
        )
        .unwrap();
        let overlay: toml::Value =
            toml::from_str("[agent]\nbinary = \"b\"\n[policy]\nblock = [\"y\", \"z\"]\n").unwrap();

        deep_merge(&mut base, &overlay);
        let merged: Config = base.try_into().unwrap();
        assert_eq!(merged.agent.binary, "b");
        assert_eq!(merged.agent.timeout_secs, 300);
        assert_eq!(merged.policy.block, vec!["y".to_string(), "z".to_string()]);
    }
}
