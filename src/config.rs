use crate::model::DenoiseMethod;
use crate::request::builder::UiSelection;
use serde::Deserialize;
use std::fs;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Read(#[from] std::io::Error),
    #[error("failed to parse config file: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub base_url: String,
    pub request_timeout_seconds: Option<u64>,
    pub state_db: String,
    pub chart_output_dir: String,
    /// Method names the resolver looks for in responses.
    pub denoise_methods: Vec<String>,
    pub selection: UiSelection,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:5001".to_string(),
            request_timeout_seconds: None,
            state_db: "state.db".to_string(),
            chart_output_dir: "charts".to_string(),
            denoise_methods: DenoiseMethod::ALL.iter().map(|m| m.to_string()).collect(),
            selection: UiSelection::default(),
        }
    }
}

pub fn load_config(path: &str) -> Result<AppConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    let config: AppConfig = serde_json::from_str(&content)?;
    Ok(config)
}
