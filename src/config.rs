use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::error::HarvestError;
use crate::models::{MembershipType, DEFAULT_PLATFORMS};

/// Environment variable checked before `api.api_key`.
pub const API_KEY_ENV: &str = "BUNGIE_API_KEY";

/// Largest `count` the activity history endpoint accepts.
pub const MAX_PAGE_SIZE: u32 = 250;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub harvest: HarvestConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_base_url() -> String {
    "https://www.bungie.net/Platform".to_string()
}
fn default_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Deserialize, Clone)]
pub struct HarvestConfig {
    #[serde(default = "default_platforms")]
    pub platforms: Vec<MembershipType>,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    /// Per-character page ceiling. Unbounded when absent.
    #[serde(default)]
    pub max_pages: Option<u32>,
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self {
            platforms: default_platforms(),
            page_size: default_page_size(),
            max_pages: None,
        }
    }
}

fn default_platforms() -> Vec<MembershipType> {
    DEFAULT_PLATFORMS.to_vec()
}
fn default_page_size() -> u32 {
    MAX_PAGE_SIZE
}

#[derive(Debug, Deserialize, Clone)]
pub struct OutputConfig {
    #[serde(default = "default_output_path")]
    pub path: PathBuf,
    #[serde(default = "default_pgcr_base_url")]
    pub pgcr_base_url: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            path: default_output_path(),
            pgcr_base_url: default_pgcr_base_url(),
        }
    }
}

fn default_output_path() -> PathBuf {
    PathBuf::from("activities.csv")
}
fn default_pgcr_base_url() -> String {
    "https://www.bungie.net/en/PGCR/".to_string()
}

impl Config {
    /// Check the values a config file may have set out of range.
    pub fn validate(&self) -> Result<()> {
        if self.harvest.platforms.is_empty() {
            anyhow::bail!("harvest.platforms must list at least one platform");
        }

        if !(1..=MAX_PAGE_SIZE).contains(&self.harvest.page_size) {
            anyhow::bail!("harvest.page_size must be in [1, {}]", MAX_PAGE_SIZE);
        }

        if self.harvest.max_pages == Some(0) {
            anyhow::bail!("harvest.max_pages must be >= 1 when set");
        }

        if self.api.timeout_secs == 0 {
            anyhow::bail!("api.timeout_secs must be > 0");
        }

        if !self.api.base_url.starts_with("http://") && !self.api.base_url.starts_with("https://")
        {
            anyhow::bail!(
                "api.base_url must be an http(s) URL, got '{}'",
                self.api.base_url
            );
        }

        Ok(())
    }

    /// The API key: `BUNGIE_API_KEY` first, then `api.api_key`.
    pub fn api_key(&self) -> Result<String, HarvestError> {
        resolve_api_key(std::env::var(API_KEY_ENV).ok(), self.api.api_key.as_deref())
    }
}

fn resolve_api_key(env: Option<String>, file: Option<&str>) -> Result<String, HarvestError> {
    env.map(|k| k.trim().to_string())
        .filter(|k| !k.is_empty())
        .or_else(|| {
            file.map(|k| k.trim().to_string())
                .filter(|k| !k.is_empty())
        })
        .ok_or(HarvestError::CredentialMissing)
}

/// Load the config file, falling back to defaults when it does not exist.
pub fn load_config(path: &Path) -> Result<Config> {
    if !path.exists() {
        tracing::debug!(path = %path.display(), "config file not found; using defaults");
        return Ok(Config::default());
    }

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    config.validate()?;

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn defaults_match_service() {
        let cfg = Config::default();
        assert_eq!(
            cfg.harvest.platforms,
            vec![
                MembershipType(3),
                MembershipType(1),
                MembershipType(2),
                MembershipType(6)
            ]
        );
        assert_eq!(cfg.harvest.page_size, 250);
        assert_eq!(cfg.harvest.max_pages, None);
        assert_eq!(cfg.output.path, PathBuf::from("activities.csv"));
        cfg.validate().unwrap();
    }

    #[test]
    fn missing_file_uses_defaults() {
        let tmp = TempDir::new().unwrap();
        let cfg = load_config(&tmp.path().join("nope.toml")).unwrap();
        assert_eq!(cfg.api.base_url, "https://www.bungie.net/Platform");
    }

    #[test]
    fn partial_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("d2h.toml");
        std::fs::write(
            &path,
            r#"
[harvest]
platforms = [1, 3]
max_pages = 40

[output]
path = "out/history.csv"
"#,
        )
        .unwrap();
        let cfg = load_config(&path).unwrap();
        assert_eq!(
            cfg.harvest.platforms,
            vec![MembershipType(1), MembershipType(3)]
        );
        assert_eq!(cfg.harvest.max_pages, Some(40));
        assert_eq!(cfg.harvest.page_size, 250);
        assert_eq!(cfg.output.path, PathBuf::from("out/history.csv"));
        assert_eq!(cfg.api.timeout_secs, 30);
    }

    #[test]
    fn rejects_out_of_range() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("d2h.toml");
        for bad in [
            "[harvest]\npage_size = 0\n",
            "[harvest]\npage_size = 251\n",
            "[harvest]\nplatforms = []\n",
            "[harvest]\nmax_pages = 0\n",
            "[api]\ntimeout_secs = 0\n",
            "[api]\nbase_url = \"ftp://example.com\"\n",
        ] {
            std::fs::write(&path, bad).unwrap();
            assert!(load_config(&path).is_err(), "accepted: {}", bad);
        }
    }

    #[test]
    fn api_key_precedence() {
        assert_eq!(
            resolve_api_key(Some("env".into()), Some("file")).unwrap(),
            "env"
        );
        assert_eq!(resolve_api_key(Some("  ".into()), Some("file")).unwrap(), "file");
        assert_eq!(resolve_api_key(None, Some(" file ")).unwrap(), "file");
        assert!(matches!(
            resolve_api_key(None, Some("")),
            Err(HarvestError::CredentialMissing)
        ));
        assert!(matches!(
            resolve_api_key(None, None),
            Err(HarvestError::CredentialMissing)
        ));
    }
}
