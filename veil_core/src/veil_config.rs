//! Configuration for the invisibility mechanic.
//!
//! Loaded from `veil_config.json` with support for environment variable overrides.

use std::{
    env, fs, io,
    path::{Path, PathBuf},
    sync::Arc,
};

use bevy::prelude::Resource;
use serde::Deserialize;
use thiserror::Error;

use crate::{fade::DormantVisibility, reveal::RevealDurations};

pub const BUILTIN_VEIL_CONFIG: &str = include_str!("data/veil_config.json");

/// Root configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct VeilConfig {
    /// Admin flag required to run the toggle command, e.g. `@css/generic`.
    pub command_permission: String,
    pub command_aliases: Vec<String>,
    pub dormant_visibility: DormantVisibility,
    pub reveal: RevealDurations,
    pub progress_bar: ProgressBarConfig,
}

impl Default for VeilConfig {
    fn default() -> Self {
        Self {
            command_permission: "@css/generic".to_string(),
            command_aliases: vec!["css_invisible".to_string(), "css_invis".to_string()],
            dormant_visibility: DormantVisibility::default(),
            reveal: RevealDurations::default(),
            progress_bar: ProgressBarConfig::default(),
        }
    }
}

impl VeilConfig {
    pub fn builtin() -> Arc<Self> {
        Arc::new(
            serde_json::from_str(BUILTIN_VEIL_CONFIG).expect("builtin veil config should parse"),
        )
    }

    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn from_file(path: &Path) -> Result<Self, VeilConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| VeilConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = VeilConfig::from_json_str(&contents)?;
        Ok(config)
    }

    /// Whether `command` (case-insensitive) is one of the toggle command aliases.
    pub fn is_command_alias(&self, command: &str) -> bool {
        self.command_aliases
            .iter()
            .any(|alias| alias.eq_ignore_ascii_case(command))
    }
}

/// Styling of the centre-screen visibility bar.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ProgressBarConfig {
    pub enabled: bool,
    pub width: usize,
    pub glyph: String,
    pub neutral_color: String,
    pub visible_color: String,
}

impl Default for ProgressBarConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            width: 20,
            glyph: "&#9608;".to_string(),
            neutral_color: "#404040".to_string(),
            visible_color: "#FF0000".to_string(),
        }
    }
}

#[derive(Debug, Error)]
pub enum VeilConfigError {
    #[error("failed to parse veil config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("failed to read veil config from {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Handle for accessing the configuration from systems.
#[derive(Resource, Debug, Clone)]
pub struct VeilConfigHandle(pub Arc<VeilConfig>);

impl VeilConfigHandle {
    pub fn new(config: Arc<VeilConfig>) -> Self {
        Self(config)
    }
}

impl Default for VeilConfigHandle {
    fn default() -> Self {
        Self::new(Arc::new(VeilConfig::default()))
    }
}

/// Where the active configuration came from; `None` means the builtin copy.
#[derive(Resource, Debug, Clone, Default)]
pub struct VeilConfigMetadata {
    path: Option<PathBuf>,
}

impl VeilConfigMetadata {
    pub fn new(path: Option<PathBuf>) -> Self {
        Self { path }
    }

    pub fn path(&self) -> Option<&PathBuf> {
        self.path.as_ref()
    }
}

/// Load configuration from `VEIL_CONFIG_PATH`, falling back to the builtin copy.
pub fn load_veil_config_from_env() -> (Arc<VeilConfig>, VeilConfigMetadata) {
    if let Some(path) = env::var("VEIL_CONFIG_PATH").ok().map(PathBuf::from) {
        match VeilConfig::from_file(&path) {
            Ok(config) => {
                tracing::info!(
                    target: "veil::config",
                    path = %path.display(),
                    "veil_config.loaded=file"
                );
                return (Arc::new(config), VeilConfigMetadata::new(Some(path)));
            }
            Err(err) => {
                tracing::warn!(
                    target: "veil::config",
                    path = %path.display(),
                    error = %err,
                    "veil_config.load_failed"
                );
            }
        }
    }

    let config = VeilConfig::builtin();
    tracing::info!(target: "veil::config", "veil_config.loaded=builtin");
    (config, VeilConfigMetadata::new(None))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_config_matches_defaults() {
        let builtin = VeilConfig::builtin();
        let defaults = VeilConfig::default();
        assert_eq!(builtin.command_permission, defaults.command_permission);
        assert_eq!(builtin.dormant_visibility, defaults.dormant_visibility);
        assert_eq!(builtin.dormant_visibility, DormantVisibility::Hidden);
        assert_eq!(builtin.reveal.reload, 1.5);
        assert_eq!(builtin.reveal.sound_multiplier, 2.0);
        assert_eq!(builtin.progress_bar.width, 20);
    }

    #[test]
    fn partial_json_fills_defaults() {
        let config = VeilConfig::from_json_str(
            r#"{ "dormant_visibility": "Visible", "reveal": { "reload": 3.0 } }"#,
        )
        .unwrap();
        assert_eq!(config.dormant_visibility, DormantVisibility::Visible);
        assert_eq!(config.reveal.reload, 3.0);
        assert_eq!(config.reveal.hurt, 0.5);
        assert_eq!(config.command_permission, "@css/generic");
    }

    #[test]
    fn alias_lookup_is_case_insensitive() {
        let config = VeilConfig::default();
        assert!(config.is_command_alias("CSS_INVIS"));
        assert!(config.is_command_alias("css_invisible"));
        assert!(!config.is_command_alias("css_slay"));
    }

    #[test]
    fn missing_file_reports_read_error() {
        let err = VeilConfig::from_file(Path::new("/definitely/not/here.json")).unwrap_err();
        assert!(matches!(err, VeilConfigError::Read { .. }));
    }
}
