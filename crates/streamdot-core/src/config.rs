use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::platform;

/// Default stream address; overridable in config and editable at runtime.
pub const DEFAULT_STREAM_URL: &str =
    "http://glzwizzlv.bynetcdn.com/glz_mp3?awCollectionId=misc&awEpisodeId=glz";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub stream: StreamConfig,
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub editor: EditorConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamConfig {
    /// Stream played on toggle. Runtime edits via the menu are not written
    /// back here and are lost on restart.
    #[serde(default = "default_stream_url")]
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Media engine binary resolved from PATH.
    #[serde(default = "default_engine_binary")]
    pub binary: String,
}

/// External dialog used for the "Change URL…" menu action.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EditorConfig {
    #[serde(default = "default_editor_command")]
    pub command: String,
    /// Arguments passed to the command; `{url}` is replaced with the
    /// current stream URL.
    #[serde(default = "default_editor_args")]
    pub args: Vec<String>,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            url: default_stream_url(),
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            binary: default_engine_binary(),
        }
    }
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            command: default_editor_command(),
            args: default_editor_args(),
        }
    }
}

fn default_stream_url() -> String {
    DEFAULT_STREAM_URL.to_string()
}

fn default_engine_binary() -> String {
    "mpv".to_string()
}

fn default_editor_command() -> String {
    "zenity".to_string()
}

fn default_editor_args() -> Vec<String> {
    vec![
        "--entry".to_string(),
        "--title=Change stream URL".to_string(),
        "--text=Enter new stream URL:".to_string(),
        "--entry-text={url}".to_string(),
    ]
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        let config_path = Self::config_path();

        if !config_path.exists() {
            let config = Self::default();
            config.save()?;
            return Ok(config);
        }

        let content = std::fs::read_to_string(&config_path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn save(&self) -> anyhow::Result<()> {
        let config_path = Self::config_path();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(&config_path, content)?;
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        platform::config_dir().join("config.toml")
    }
}
