// src/config.rs

use std::path::PathBuf;

/// World Bank API endpoint used when nothing else is configured.
pub const DEFAULT_API_BASE: &str = "http://api.worldbank.org";

/// Largest page the API serves; asking for it avoids pagination.
pub const DEFAULT_PER_PAGE: u32 = 32767;

/// Where the reference files (topics, indicators, countries) live.
pub const DEFAULT_CONFIG_DIR: &str = "config";

/// Process-wide settings, built once and passed down explicitly.
#[derive(Debug, Clone)]
pub struct Settings {
    pub api_base: String,
    pub config_dir: PathBuf,
    pub per_page: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            config_dir: PathBuf::from(DEFAULT_CONFIG_DIR),
            per_page: DEFAULT_PER_PAGE,
        }
    }
}

impl Settings {
    pub fn new(api_base: impl Into<String>, config_dir: impl Into<PathBuf>) -> Self {
        Self {
            api_base: api_base.into(),
            config_dir: config_dir.into(),
            ..Self::default()
        }
    }

    /// API base without a trailing slash, so paths can be appended verbatim.
    pub fn api_base(&self) -> &str {
        self.api_base.trim_end_matches('/')
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_point_at_world_bank() {
        let s = Settings::default();
        assert_eq!(s.api_base(), "http://api.worldbank.org");
        assert_eq!(s.config_dir, PathBuf::from("config"));
        assert_eq!(s.per_page, 32767);
    }

    #[test]
    fn trailing_slash_is_dropped() {
        let s = Settings::new("http://127.0.0.1:8080/", "cfg");
        assert_eq!(s.api_base(), "http://127.0.0.1:8080");
    }
}
