use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::schedule::ScheduleIntervals;

pub const DEFAULT_API_URL: &str = "http://127.0.0.1:8000/api/v1";

/// Root configuration file structure
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct DashConfig {
    /// Config file version
    #[serde(default = "default_version")]
    pub version: String,

    /// Base URL of the supervisor management API
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Auto-refresh period in milliseconds
    #[serde(default = "default_refresh_interval")]
    pub refresh_interval_ms: u64,

    /// Staleness counter period in milliseconds
    #[serde(default = "default_staleness_tick")]
    pub staleness_tick_ms: u64,

    /// Per-request timeout in milliseconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_ms: u64,

    /// Where preferences are kept (defaults to the user config dir)
    #[serde(default)]
    pub preferences_path: Option<PathBuf>,
}

fn default_version() -> String {
    "1".into()
}
fn default_api_url() -> String {
    DEFAULT_API_URL.into()
}
fn default_refresh_interval() -> u64 {
    10_000
}
fn default_staleness_tick() -> u64 {
    1_000
}
fn default_request_timeout() -> u64 {
    10_000
}

impl Default for DashConfig {
    fn default() -> Self {
        Self {
            version: default_version(),
            api_url: default_api_url(),
            refresh_interval_ms: default_refresh_interval(),
            staleness_tick_ms: default_staleness_tick(),
            request_timeout_ms: default_request_timeout(),
            preferences_path: None,
        }
    }
}

/// Configuration loading errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("api_url must start with http:// or https://, got '{0}'")]
    InvalidApiUrl(String),
    #[error("{field} must be greater than zero")]
    ZeroInterval { field: &'static str },
}

impl DashConfig {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    /// Load configuration from a string (useful for testing)
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> Result<Self, ConfigError> {
        let config: DashConfig = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Search for a config file in standard locations. Returns `None` when
    /// nothing was found; the caller falls back to defaults.
    pub fn discover(start_dir: &Path) -> Result<Option<(PathBuf, Self)>, ConfigError> {
        let names = ["svdash.yaml", "svdash.yml", ".svdash.yaml", ".svdash.yml"];

        // Check environment variable first
        if let Ok(env_path) = std::env::var("SVDASH_CONFIG") {
            let path = PathBuf::from(&env_path);
            if path.exists() {
                let config = Self::load(&path)?;
                return Ok(Some((path, config)));
            }
            tracing::warn!(
                event = "config.env_path_missing",
                path = %path.display(),
                "SVDASH_CONFIG points at a missing file"
            );
        }

        // Search current directory and parents
        let mut dir = Some(start_dir);
        while let Some(current) = dir {
            for name in &names {
                let path = current.join(name);
                if path.exists() {
                    let config = Self::load(&path)?;
                    return Ok(Some((path, config)));
                }
            }
            dir = current.parent();
        }

        Ok(None)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.api_url.starts_with("http://") || self.api_url.starts_with("https://")) {
            return Err(ConfigError::InvalidApiUrl(self.api_url.clone()));
        }

        for (field, value) in [
            ("refresh_interval_ms", self.refresh_interval_ms),
            ("staleness_tick_ms", self.staleness_tick_ms),
            ("request_timeout_ms", self.request_timeout_ms),
        ] {
            if value == 0 {
                return Err(ConfigError::ZeroInterval { field });
            }
        }

        Ok(())
    }

    pub fn intervals(&self) -> ScheduleIntervals {
        ScheduleIntervals {
            refresh: Duration::from_millis(self.refresh_interval_ms),
            staleness_tick: Duration::from_millis(self.staleness_tick_ms),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_config() {
        let yaml = r#"
version: "1"
api_url: https://supervisors.internal/api/v1
refresh_interval_ms: 5000
staleness_tick_ms: 500
preferences_path: /tmp/svdash-prefs.json
"#;
        let config = DashConfig::from_str(yaml).unwrap();
        assert_eq!(config.api_url, "https://supervisors.internal/api/v1");
        assert_eq!(config.intervals().refresh, Duration::from_secs(5));
        assert_eq!(config.intervals().staleness_tick, Duration::from_millis(500));
        assert_eq!(config.request_timeout(), Duration::from_secs(10));
        assert_eq!(
            config.preferences_path,
            Some(PathBuf::from("/tmp/svdash-prefs.json"))
        );
    }

    #[test]
    fn test_empty_mapping_uses_defaults() {
        let config = DashConfig::from_str("{}").unwrap();
        assert_eq!(config, DashConfig::default());
        assert_eq!(config.intervals(), ScheduleIntervals::default());
    }

    #[test]
    fn test_invalid_api_url() {
        let result = DashConfig::from_str("api_url: ftp://example.com");
        assert!(matches!(result, Err(ConfigError::InvalidApiUrl(_))));
    }

    #[test]
    fn test_zero_interval_rejected() {
        let result = DashConfig::from_str("refresh_interval_ms: 0");
        assert!(matches!(
            result,
            Err(ConfigError::ZeroInterval {
                field: "refresh_interval_ms"
            })
        ));
    }

    #[test]
    fn test_discover_walks_up_parents() {
        let root = tempfile::tempdir().unwrap();
        let nested = root.path().join("a").join("b");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(
            root.path().join("svdash.yml"),
            "api_url: http://10.0.0.5:8000/api/v1\n",
        )
        .unwrap();

        let (path, config) = DashConfig::discover(&nested).unwrap().unwrap();
        assert_eq!(path, root.path().join("svdash.yml"));
        assert_eq!(config.api_url, "http://10.0.0.5:8000/api/v1");
    }
}
