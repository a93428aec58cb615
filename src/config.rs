use crate::drawing::Tool;
use crate::error::{AnnotatorError, AnnotatorResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::warn;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub canvas: CanvasConfig,
    #[serde(default)]
    pub inference: InferenceConfig,
    #[serde(default)]
    pub memory: MemoryConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CanvasConfig {
    #[serde(default = "default_max_display_width")]
    pub max_display_width: f64,
    #[serde(default = "default_min_box_size")]
    pub min_box_size: f64,
    #[serde(default = "default_min_circle_radius")]
    pub min_circle_radius: f64,
    #[serde(default = "default_min_zoom")]
    pub min_zoom: f64,
    #[serde(default = "default_max_zoom")]
    pub max_zoom: f64,
    #[serde(default = "default_zoom_step")]
    pub zoom_step: f64,
    #[serde(default = "default_poi_color")]
    pub poi_color: String,
    #[serde(default = "default_ifvg_color")]
    pub ifvg_color: String,
    #[serde(default = "default_bos_color")]
    pub bos_color: String,
    #[serde(default = "default_circle_color")]
    pub circle_color: String,
    #[serde(default = "default_ai_color")]
    pub ai_color: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InferenceConfig {
    #[serde(default = "default_inference_host")]
    pub host: String,
    #[serde(default = "default_inference_port")]
    pub port: u16,
    #[serde(default = "default_history_turns")]
    pub history_turns: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct MemoryConfig {
    /// Store file; defaults to `memory.json` in the data directory.
    pub store_path: Option<PathBuf>,
}

// Default value functions
fn default_base_url() -> String {
    "http://127.0.0.1:8000".to_string()
}

fn default_request_timeout() -> u64 {
    30
}

fn default_max_display_width() -> f64 {
    1200.0
}

fn default_min_box_size() -> f64 {
    10.0
}

fn default_min_circle_radius() -> f64 {
    5.0
}

fn default_min_zoom() -> f64 {
    crate::transform::DEFAULT_MIN_ZOOM
}

fn default_max_zoom() -> f64 {
    crate::transform::DEFAULT_MAX_ZOOM
}

fn default_zoom_step() -> f64 {
    1.1
}

fn default_poi_color() -> String {
    "#f5a623".to_string()
}

fn default_ifvg_color() -> String {
    "#9b59b6".to_string()
}

fn default_bos_color() -> String {
    "#2ecc71".to_string()
}

fn default_circle_color() -> String {
    "#3498db".to_string()
}

fn default_ai_color() -> String {
    "#e74c3c".to_string()
}

fn default_inference_host() -> String {
    "127.0.0.1".to_string()
}

fn default_inference_port() -> u16 {
    5001
}

fn default_history_turns() -> usize {
    10
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self {
            max_display_width: default_max_display_width(),
            min_box_size: default_min_box_size(),
            min_circle_radius: default_min_circle_radius(),
            min_zoom: default_min_zoom(),
            max_zoom: default_max_zoom(),
            zoom_step: default_zoom_step(),
            poi_color: default_poi_color(),
            ifvg_color: default_ifvg_color(),
            bos_color: default_bos_color(),
            circle_color: default_circle_color(),
            ai_color: default_ai_color(),
        }
    }
}

impl CanvasConfig {
    /// Default stroke color for shapes drawn with `tool`.
    pub fn color_for(&self, tool: Tool) -> &str {
        match tool {
            Tool::Ifvg => &self.ifvg_color,
            Tool::Bos => &self.bos_color,
            Tool::Circle => &self.circle_color,
            _ => &self.poi_color,
        }
    }
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            host: default_inference_host(),
            port: default_inference_port(),
            history_turns: default_history_turns(),
        }
    }
}

impl InferenceConfig {
    pub fn base_url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }
}

fn project_dirs() -> AnnotatorResult<directories::ProjectDirs> {
    directories::ProjectDirs::from("", "", "trade-annotator").ok_or_else(|| {
        AnnotatorError::Configuration("Failed to determine config directory".into())
    })
}

/// Get the path to the config file
pub fn config_path() -> AnnotatorResult<PathBuf> {
    Ok(project_dirs()?.config_dir().join("config.toml"))
}

/// Default location of the chat memory store
pub fn default_memory_path() -> AnnotatorResult<PathBuf> {
    Ok(project_dirs()?.data_dir().join("memory.json"))
}

/// Load configuration from the default location, or defaults if absent.
pub fn load_config() -> AppConfig {
    match config_path() {
        Ok(path) => load_config_from(&path),
        Err(e) => {
            warn!("{e}. Using defaults.");
            AppConfig::default()
        }
    }
}

/// Load configuration from `path`. Unreadable or invalid files fall back to
/// defaults with a warning.
pub fn load_config_from(path: &Path) -> AppConfig {
    if !path.exists() {
        return AppConfig::default();
    }
    match std::fs::read_to_string(path) {
        Ok(content) => match toml::from_str(&content) {
            Ok(config) => config,
            Err(e) => {
                warn!("Failed to parse config file {}: {e}. Using defaults.", path.display());
                AppConfig::default()
            }
        },
        Err(e) => {
            warn!("Failed to read config file {}: {e}. Using defaults.", path.display());
            AppConfig::default()
        }
    }
}

/// Save configuration to `path`, creating parent directories.
pub fn save_config_to(config: &AppConfig, path: &Path) -> AnnotatorResult<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml = toml::to_string_pretty(config)?;
    std::fs::write(path, toml)?;
    Ok(())
}
