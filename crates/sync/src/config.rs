use std::path::{Path, PathBuf};

use foundation::CountryCode;
use layers::LayerStyle;
use serde::{Deserialize, Serialize};

/// Environment variable that overrides [`SyncConfig::base_url`].
pub const BASE_URL_ENV: &str = "ADM2_DATA_BASE";

/// Engine configuration. Every field has a default, so a config file only
/// needs the keys it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Static-file store holding `<code>_<kind>.geojson`.
    pub base_url: String,
    pub default_zoom: f64,
    pub large_country_zoom: f64,
    /// Countries framed with `large_country_zoom`.
    pub large_countries: Vec<String>,
    pub fly_speed: f64,
    pub fly_curve: f64,
    /// IR visibility applied on every country confirmation.
    pub ir_visible_by_default: bool,
    /// Base-map layers hidden once the style has loaded.
    pub hide_basemap_layers: Vec<String>,
    pub adm2_fill_opacity: f64,
    pub adm2_outline_width: f64,
    pub ir_fill_opacity: f64,
    pub ir_outline_width: f64,
    pub ir_hover_opacity: f64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        let style = LayerStyle::default();
        Self {
            base_url: "/outputs/geometries/countries".to_string(),
            default_zoom: 5.0,
            large_country_zoom: 4.0,
            large_countries: vec!["USA".to_string(), "CHN".to_string(), "IND".to_string()],
            fly_speed: 1.2,
            fly_curve: 1.42,
            ir_visible_by_default: true,
            hide_basemap_layers: vec![
                "admin-0-boundary".to_string(),
                "admin-1-boundary".to_string(),
                "admin-0-boundary-bg".to_string(),
                "admin-1-boundary-bg".to_string(),
            ],
            adm2_fill_opacity: style.adm2_fill_opacity,
            adm2_outline_width: style.adm2_outline_width,
            ir_fill_opacity: style.ir_fill_opacity,
            ir_outline_width: style.ir_outline_width,
            ir_hover_opacity: style.ir_hover_opacity,
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Parse(serde_json::Error),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io { path, source } => {
                write!(f, "failed to read config {}: {source}", path.display())
            }
            ConfigError::Parse(e) => write!(f, "invalid config: {e}"),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io { source, .. } => Some(source),
            ConfigError::Parse(e) => Some(e),
        }
    }
}

impl SyncConfig {
    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(text).map_err(ConfigError::Parse)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&text)
    }

    /// Applies `ADM2_DATA_BASE` when set and non-empty.
    pub fn with_env_overrides(self) -> Self {
        self.with_base_url_override(std::env::var(BASE_URL_ENV).ok())
    }

    fn with_base_url_override(mut self, base: Option<String>) -> Self {
        if let Some(base) = base.filter(|b| !b.trim().is_empty()) {
            self.base_url = base;
        }
        self
    }

    pub fn is_large_country(&self, country: &CountryCode) -> bool {
        self.large_countries
            .iter()
            .any(|c| c.trim().eq_ignore_ascii_case(country.as_str()))
    }

    pub fn zoom_for(&self, country: &CountryCode) -> f64 {
        if self.is_large_country(country) {
            self.large_country_zoom
        } else {
            self.default_zoom
        }
    }

    pub fn layer_style(&self) -> LayerStyle {
        LayerStyle {
            adm2_fill_opacity: self.adm2_fill_opacity,
            adm2_outline_width: self.adm2_outline_width,
            ir_fill_opacity: self.ir_fill_opacity,
            ir_outline_width: self.ir_outline_width,
            ir_hover_opacity: self.ir_hover_opacity,
        }
    }
}
