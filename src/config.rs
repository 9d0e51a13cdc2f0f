use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;
use config::{Config, ConfigError, File};

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub allowed_extensions: HashSet<String>,
    pub log_level: String,
    /// Largest accepted distance in seconds between a photo and its nearest
    /// track sample. Unset means every photo gets the closest sample.
    #[serde(default)]
    pub max_time_gap_secs: Option<i64>,
    pub dry_run: bool,
}

impl AppConfig {
    pub fn new(extra: Option<&Path>) -> Result<Self, ConfigError> {
        let env = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let mut builder = Config::builder()
            .set_default("allowed_extensions", vec!["jpg", "jpeg", "png"])?
            .set_default("log_level", "info")?
            .set_default("dry_run", false)?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            .add_source(File::with_name("config/local").required(false));

        if let Some(path) = extra {
            builder = builder.add_source(File::from(path));
        }

        let mut config: AppConfig = builder.build()?.try_deserialize()?;
        config.allowed_extensions = config
            .allowed_extensions
            .iter()
            .map(|ext| ext.trim_start_matches('.').to_lowercase())
            .collect();
        Ok(config)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            allowed_extensions: ["jpg", "jpeg", "png"].iter().map(|s| s.to_string()).collect(),
            log_level: "info".to_string(),
            max_time_gap_secs: None,
            dry_run: false,
        }
    }
}
