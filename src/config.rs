use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_API_BASE: &str = "http://localhost:8000";
const DEFAULT_TIMEOUT_SECS: u64 = 900;
const MIN_TIMEOUT_SECS: u64 = 5;
const DEFAULT_DOWNLOAD_DIR: &str = "downloads";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// Service origin without trailing slash; artifact paths are appended verbatim.
    pub api_base: String,
    pub request_timeout: Duration,
    pub download_dir: PathBuf,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            download_dir: PathBuf::from(DEFAULT_DOWNLOAD_DIR),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let api_base = lookup("VISION_API_BASE")
            .and_then(|val| normalize_origin(&val))
            .unwrap_or_else(|| DEFAULT_API_BASE.to_string());
        let timeout_secs = lookup("VISION_TIMEOUT_SECS")
            .and_then(|val| val.trim().parse::<u64>().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECS)
            .max(MIN_TIMEOUT_SECS);
        let download_dir = lookup("VISION_DOWNLOAD_DIR")
            .map(|val| val.trim().to_string())
            .filter(|val| !val.is_empty())
            .unwrap_or_else(|| DEFAULT_DOWNLOAD_DIR.to_string());

        Self {
            api_base,
            request_timeout: Duration::from_secs(timeout_secs),
            download_dir: PathBuf::from(download_dir),
        }
    }
}

pub fn normalize_origin(raw: &str) -> Option<String> {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::time::Duration;

    use super::{AppConfig, DEFAULT_API_BASE};

    fn config_from(pairs: &[(&str, &str)]) -> AppConfig {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_when_nothing_set() {
        let cfg = config_from(&[]);
        assert_eq!(cfg, AppConfig::default());
        assert_eq!(cfg.api_base, DEFAULT_API_BASE);
    }

    #[test]
    fn origin_trailing_slashes_are_stripped() {
        let cfg = config_from(&[("VISION_API_BASE", " http://10.0.0.5:9000// ")]);
        assert_eq!(cfg.api_base, "http://10.0.0.5:9000");
    }

    #[test]
    fn blank_origin_falls_back_to_default() {
        let cfg = config_from(&[("VISION_API_BASE", "  / ")]);
        assert_eq!(cfg.api_base, DEFAULT_API_BASE);
    }

    #[test]
    fn timeout_has_a_floor_and_ignores_garbage() {
        let cfg = config_from(&[("VISION_TIMEOUT_SECS", "1")]);
        assert_eq!(cfg.request_timeout, Duration::from_secs(5));

        let cfg = config_from(&[("VISION_TIMEOUT_SECS", "soon")]);
        assert_eq!(cfg.request_timeout, Duration::from_secs(900));
    }
}
