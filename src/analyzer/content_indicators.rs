use url::Url;

use super::SignalScore;
use crate::config::HeuristicConfig;

/// Checks against the page the URL points at: credential-harvesting path
/// shapes, inline data documents, odd service ports
pub struct ContentIndicatorScorer {
    login_paths: Vec<String>,
    allowed_ports: Vec<u16>,
}

impl ContentIndicatorScorer {
    pub fn new(config: &HeuristicConfig) -> Self {
        ContentIndicatorScorer {
            login_paths: config.login_paths.clone(),
            allowed_ports: config.allowed_ports.clone(),
        }
    }

    pub fn score(&self, url: &str) -> SignalScore {
        let mut score = 0.0;
        let mut flags = Vec::new();
        let url_lower = url.to_lowercase();

        // One login-ish segment is everyday web traffic; stacking several
        // is the harvesting pattern
        let path_hits = self
            .login_paths
            .iter()
            .filter(|pattern| url_lower.contains(pattern.as_str()))
            .count();
        if path_hits > 1 {
            score += 0.2;
            flags.push(format!(
                "Multiple credential-related path segments ({path_hits} matches)"
            ));
        }

        if url_lower.starts_with("data:") {
            score += 0.3;
            flags.push("Inline data: URL instead of a hosted page".to_string());
        }

        if let Ok(parsed) = Url::parse(url) {
            if let Some(port) = parsed.port() {
                if !self.allowed_ports.contains(&port) {
                    score += 0.1;
                    flags.push(format!("Non-standard port {port}"));
                }
            }
        }

        SignalScore { score, flags }
    }
}
