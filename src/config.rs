use anyhow::Context;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Trusted root domains that bypass analysis entirely (exact or subdomain match).
    #[serde(default = "default_whitelist")]
    pub whitelist: Vec<String>,
    /// Results at or above this risk score are marked blocked.
    #[serde(default = "default_block_threshold")]
    pub block_threshold: f64,
    /// How long a cached analysis stays valid.
    #[serde(default = "default_cache_ttl_seconds")]
    pub cache_ttl_seconds: u64,
    /// External ML inference endpoint. Absent means rule-based scoring only.
    pub ml: Option<MlConfig>,
    pub statistics: Option<StatisticsConfig>,
    #[serde(default)]
    pub heuristics: HeuristicConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MlConfig {
    pub endpoint: String,
    #[serde(default = "default_ml_timeout_seconds")]
    pub timeout_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatisticsConfig {
    pub enabled: bool,
    pub output_path: String,
    pub flush_interval_seconds: Option<u64>, // How often to flush stats to disk (default: 60)
}

/// The fixed heuristic tables, kept as data so they can be tuned without
/// touching the scoring control flow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeuristicConfig {
    #[serde(default = "default_suspicious_tlds")]
    pub suspicious_tlds: Vec<String>,
    #[serde(default = "default_phishing_keywords")]
    pub phishing_keywords: Vec<String>,
    #[serde(default = "default_brand_domains")]
    pub brand_domains: Vec<String>,
    #[serde(default = "default_login_paths")]
    pub login_paths: Vec<String>,
    #[serde(default = "default_allowed_ports")]
    pub allowed_ports: Vec<u16>,
}

fn default_whitelist() -> Vec<String> {
    [
        "google.com",
        "youtube.com",
        "facebook.com",
        "amazon.com",
        "wikipedia.org",
        "github.com",
        "microsoft.com",
        "apple.com",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_block_threshold() -> f64 {
    0.7
}

fn default_cache_ttl_seconds() -> u64 {
    24 * 3600
}

fn default_ml_timeout_seconds() -> u64 {
    10
}

fn default_suspicious_tlds() -> Vec<String> {
    [
        ".tk", ".ml", ".ga", ".cf", ".gq", ".top", ".xyz", ".club", ".work", ".click", ".link",
        ".loan", ".download", ".racing",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_phishing_keywords() -> Vec<String> {
    [
        "verify",
        "account",
        "secure",
        "update",
        "confirm",
        "login",
        "signin",
        "banking",
        "paypal",
        "amazon",
        "apple",
        "microsoft",
        "google",
        "facebook",
        "suspended",
        "limited",
        "unusual",
        "activity",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_brand_domains() -> Vec<String> {
    [
        "paypal.com",
        "amazon.com",
        "apple.com",
        "microsoft.com",
        "google.com",
        "facebook.com",
        "netflix.com",
        "chase.com",
        "wellsfargo.com",
        "bankofamerica.com",
        "citibank.com",
        "ebay.com",
        "instagram.com",
        "twitter.com",
        "linkedin.com",
        "dropbox.com",
        "adobe.com",
        "dhl.com",
        "fedex.com",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_login_paths() -> Vec<String> {
    ["/login", "/signin", "/verify", "/account", "/secure", "/update"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_allowed_ports() -> Vec<u16> {
    vec![80, 443, 8080, 3000]
}

impl Default for HeuristicConfig {
    fn default() -> Self {
        HeuristicConfig {
            suspicious_tlds: default_suspicious_tlds(),
            phishing_keywords: default_phishing_keywords(),
            brand_domains: default_brand_domains(),
            login_paths: default_login_paths(),
            allowed_ports: default_allowed_ports(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            whitelist: default_whitelist(),
            block_threshold: default_block_threshold(),
            cache_ttl_seconds: default_cache_ttl_seconds(),
            ml: None,
            statistics: None,
            heuristics: HeuristicConfig::default(),
        }
    }
}

impl Config {
    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {path}"))?;
        let config: Config = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {path}"))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_file(&self, path: &str) -> anyhow::Result<()> {
        let content = serde_yaml::to_string(self)?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {path}"))?;
        Ok(())
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if !(0.0..=1.0).contains(&self.block_threshold) {
            anyhow::bail!(
                "block_threshold must be within [0, 1], got {}",
                self.block_threshold
            );
        }
        if self.cache_ttl_seconds == 0 {
            anyhow::bail!("cache_ttl_seconds must be greater than zero");
        }
        if let Some(ml) = &self.ml {
            if ml.endpoint.is_empty() {
                anyhow::bail!("ml.endpoint must not be empty");
            }
            if ml.timeout_seconds == 0 {
                anyhow::bail!("ml.timeout_seconds must be greater than zero");
            }
        }
        let h = &self.heuristics;
        if h.suspicious_tlds.is_empty()
            || h.phishing_keywords.is_empty()
            || h.brand_domains.is_empty()
            || h.login_paths.is_empty()
            || h.allowed_ports.is_empty()
        {
            anyhow::bail!("heuristic tables must not be empty");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.block_threshold, 0.7);
        assert_eq!(config.cache_ttl_seconds, 86400);
        assert!(config.ml.is_none());
    }

    #[test]
    fn test_yaml_round_trip() {
        let config = Config::default();
        let yaml = serde_yaml::to_string(&config).unwrap();
        let parsed: Config = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(parsed.whitelist, config.whitelist);
        assert_eq!(
            parsed.heuristics.suspicious_tlds,
            config.heuristics.suspicious_tlds
        );
    }

    #[test]
    fn test_partial_yaml_fills_defaults() {
        let yaml = "whitelist:\n  - example.com\n";
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.whitelist, vec!["example.com".to_string()]);
        assert_eq!(config.block_threshold, 0.7);
        assert!(!config.heuristics.phishing_keywords.is_empty());
    }

    #[test]
    fn test_invalid_threshold_rejected() {
        let mut config = Config::default();
        config.block_threshold = 1.5;
        assert!(config.validate().is_err());
    }
}
