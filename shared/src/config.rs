use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

use crate::binding::Route;
use crate::capabilities::ValidatedUrl;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("could not read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("could not parse config: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FormsConfig {
    pub api_base_url: String,
    pub location_path_prefix: String,
    pub map_path: String,
    /// Viewports at least this wide show forms inline.
    pub desktop_breakpoint_px: u32,
}

impl Default for FormsConfig {
    fn default() -> Self {
        Self {
            api_base_url: "https://fallingfruit.org/api/0.3/".to_string(),
            location_path_prefix: "/locations".to_string(),
            map_path: "/map".to_string(),
            desktop_breakpoint_px: 768,
        }
    }
}

impl FormsConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        ValidatedUrl::new(self.api_base_url.clone())
            .map_err(|e| ConfigError::Validation(e.to_string()))?;
        if !self.location_path_prefix.starts_with('/') {
            return Err(ConfigError::Validation(
                "location_path_prefix must start with '/'".into(),
            ));
        }
        if !self.map_path.starts_with('/') {
            return Err(ConfigError::Validation("map_path must start with '/'".into()));
        }
        if self.desktop_breakpoint_px == 0 {
            return Err(ConfigError::Validation(
                "desktop_breakpoint_px must be > 0".into(),
            ));
        }
        Ok(())
    }

    /// Parses and validates. Missing fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&json)
    }

    pub fn path_for(&self, route: &Route) -> String {
        match route {
            Route::LocationDetail(id) => {
                format!("{}/{}", self.location_path_prefix.trim_end_matches('/'), id)
            }
            Route::Map => self.map_path.clone(),
        }
    }
}
