use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::analyzer::{
    risk_message, round2, clamp01, HeuristicAnalyzer, RuleAnalysisResult, SubScores,
    ThreatBreakdown,
};
use crate::cache::{AnalysisCache, CachedEntry, MemoryCache};
use crate::config::Config;
use crate::domain_utils::DomainUtils;
use crate::ml_client::{MlClient, MlResponse};
use crate::stats::{StatEvent, StatisticsCollector};

/// Heuristic per-category threats keep half their weight when merged with
/// the ML breakdown; the overall score takes the straight max of the two.
const HEURISTIC_THREAT_WEIGHT: f64 = 0.5;

pub const RULES_MODEL_VERSION: &str = concat!("rules-v", env!("CARGO_PKG_VERSION"));

/// Which subsystem produced the final score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Source {
    Whitelist,
    Cache,
    Ml,
    RuleBased,
    Fallback,
}

impl Source {
    pub fn as_str(&self) -> &'static str {
        match self {
            Source::Whitelist => "whitelist",
            Source::Cache => "cache",
            Source::Ml => "ml",
            Source::RuleBased => "rule_based",
            Source::Fallback => "fallback",
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CombinedAnalysisResult {
    pub url: String,
    pub domain: String,
    pub risk_score: f64,
    pub threats: ThreatBreakdown,
    pub confidence: f64,
    pub flags: Vec<String>,
    pub details: SubScores,
    pub source: Source,
    pub model_version: String,
    pub processing_time_ms: u64,
    pub blocked: bool,
    pub message: String,
}

/// Per-request orchestration: whitelist bypass, cache short-circuit,
/// heuristic scoring, the optional ML call, and the merge/fallback policy.
/// Dependency failures degrade to a rule-based result; only a URL the
/// `url` crate cannot parse into a host is a hard error.
pub struct AnalysisEngine {
    config: Config,
    analyzer: HeuristicAnalyzer,
    ml: Option<MlClient>,
    cache: Arc<dyn AnalysisCache>,
    stats: Option<StatisticsCollector>,
}

impl AnalysisEngine {
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;

        let analyzer = HeuristicAnalyzer::new(&config.heuristics);
        let ml = config.ml.as_ref().map(MlClient::new).transpose()?;
        let stats = match &config.statistics {
            Some(settings) if settings.enabled => Some(StatisticsCollector::new(
                settings.output_path.clone(),
                settings.flush_interval_seconds.unwrap_or(60),
            )?),
            _ => None,
        };

        Ok(AnalysisEngine {
            config,
            analyzer,
            ml,
            cache: Arc::new(MemoryCache::new()),
            stats,
        })
    }

    /// Swap in an alternate result store
    pub fn with_cache(mut self, cache: Arc<dyn AnalysisCache>) -> Self {
        self.cache = cache;
        self
    }

    pub fn analyzer(&self) -> &HeuristicAnalyzer {
        &self.analyzer
    }

    pub async fn analyze_url(&self, raw_url: &str) -> Result<CombinedAnalysisResult> {
        let started = Instant::now();

        let parsed = Url::parse(raw_url).with_context(|| format!("Invalid URL: {raw_url}"))?;
        let host = parsed
            .host_str()
            .with_context(|| format!("URL has no host: {raw_url}"))?;
        let domain = DomainUtils::canonicalize_domain(host);

        if DomainUtils::matches_domain_list(&domain, &self.config.whitelist) {
            log::debug!("{domain} is whitelisted, bypassing analysis");
            let result = self.whitelist_result(raw_url, &domain, started);
            self.record(&result);
            return Ok(result);
        }

        let normalized = DomainUtils::normalize_url(raw_url);
        if let Some(entry) = self.cache.get(&normalized) {
            log::debug!("Cache hit for {normalized}");
            let mut result = entry.result;
            result.source = Source::Cache;
            self.record(&result);
            return Ok(result);
        }

        let heuristic = self.analyzer.analyze(raw_url, &domain);

        let result = match &self.ml {
            Some(ml) => {
                match tokio::time::timeout(ml.timeout(), ml.classify(raw_url, &domain)).await {
                    Ok(Ok(response)) => {
                        self.combined_result(raw_url, &domain, heuristic, response, started)
                    }
                    Ok(Err(e)) => {
                        log::warn!("ML classification failed for {domain}, using rules: {e:#}");
                        self.record_ml_failure();
                        self.rule_result(raw_url, &domain, heuristic, Source::Fallback, started)
                    }
                    Err(_) => {
                        log::warn!(
                            "ML classification timed out after {:?} for {domain}, using rules",
                            ml.timeout()
                        );
                        self.record_ml_failure();
                        self.rule_result(raw_url, &domain, heuristic, Source::Fallback, started)
                    }
                }
            }
            None => self.rule_result(raw_url, &domain, heuristic, Source::RuleBased, started),
        };

        self.persist(&normalized, &result);
        self.record(&result);
        Ok(result)
    }

    fn whitelist_result(
        &self,
        url: &str,
        domain: &str,
        started: Instant,
    ) -> CombinedAnalysisResult {
        CombinedAnalysisResult {
            url: url.to_string(),
            domain: domain.to_string(),
            risk_score: 0.0,
            threats: ThreatBreakdown::default(),
            confidence: 1.0,
            flags: Vec::new(),
            details: SubScores::default(),
            source: Source::Whitelist,
            model_version: RULES_MODEL_VERSION.to_string(),
            processing_time_ms: started.elapsed().as_millis() as u64,
            blocked: false,
            message: "Domain is whitelisted".to_string(),
        }
    }

    fn rule_result(
        &self,
        url: &str,
        domain: &str,
        heuristic: RuleAnalysisResult,
        source: Source,
        started: Instant,
    ) -> CombinedAnalysisResult {
        let blocked = heuristic.risk_score >= self.config.block_threshold;
        let message = risk_message(heuristic.risk_score, &heuristic.flags);
        CombinedAnalysisResult {
            url: url.to_string(),
            domain: domain.to_string(),
            risk_score: heuristic.risk_score,
            threats: heuristic.threats,
            confidence: heuristic.confidence,
            flags: heuristic.flags,
            details: heuristic.details,
            source,
            model_version: RULES_MODEL_VERSION.to_string(),
            processing_time_ms: started.elapsed().as_millis() as u64,
            blocked,
            message,
        }
    }

    /// Merge policy: overall risk is the max of both scorers; per-category
    /// threats take the ML value against down-weighted heuristics. The
    /// heuristic flags ride along for explainability either way.
    fn combined_result(
        &self,
        url: &str,
        domain: &str,
        heuristic: RuleAnalysisResult,
        ml: MlResponse,
        started: Instant,
    ) -> CombinedAnalysisResult {
        let risk_score = round2(clamp01(ml.risk_score.max(heuristic.risk_score)));
        let threats = ThreatBreakdown {
            phishing: round2(clamp01(
                ml.threats
                    .phishing
                    .max(HEURISTIC_THREAT_WEIGHT * heuristic.threats.phishing),
            )),
            malware: round2(clamp01(
                ml.threats
                    .malware
                    .max(HEURISTIC_THREAT_WEIGHT * heuristic.threats.malware),
            )),
            social: round2(clamp01(
                ml.threats
                    .social
                    .max(HEURISTIC_THREAT_WEIGHT * heuristic.threats.social),
            )),
        };
        let confidence = round2(clamp01(ml.confidence.max(heuristic.confidence)));
        let blocked = risk_score >= self.config.block_threshold;
        let message = risk_message(risk_score, &heuristic.flags);

        CombinedAnalysisResult {
            url: url.to_string(),
            domain: domain.to_string(),
            risk_score,
            threats,
            confidence,
            flags: heuristic.flags,
            details: heuristic.details,
            source: Source::Ml,
            model_version: ml.model_version,
            processing_time_ms: started.elapsed().as_millis() as u64,
            blocked,
            message,
        }
    }

    fn persist(&self, normalized_url: &str, result: &CombinedAnalysisResult) {
        let entry = CachedEntry {
            result: result.clone(),
            expires_at: SystemTime::now() + Duration::from_secs(self.config.cache_ttl_seconds),
        };
        self.cache.upsert(normalized_url, entry);
    }

    fn record(&self, result: &CombinedAnalysisResult) {
        if let Some(stats) = &self.stats {
            stats.record_event(StatEvent::Analyzed {
                source: result.source,
                blocked: result.blocked,
                processing_time_ms: result.processing_time_ms,
            });
        }
    }

    fn record_ml_failure(&self) {
        if let Some(stats) = &self.stats {
            stats.record_event(StatEvent::MlFailure);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MlConfig;

    fn engine() -> AnalysisEngine {
        AnalysisEngine::new(Config::default()).unwrap()
    }

    fn engine_with_dead_ml() -> AnalysisEngine {
        let mut config = Config::default();
        // Nothing listens on the discard port; connection is refused fast
        config.ml = Some(MlConfig {
            endpoint: "http://127.0.0.1:9/classify".to_string(),
            timeout_seconds: 1,
        });
        AnalysisEngine::new(config).unwrap()
    }

    #[tokio::test]
    async fn test_whitelist_short_circuits() {
        let result = engine()
            .analyze_url("https://accounts.google.com/signin/verify?user=paypal.com")
            .await
            .unwrap();
        assert_eq!(result.source, Source::Whitelist);
        assert_eq!(result.risk_score, 0.0);
        assert_eq!(result.threats, ThreatBreakdown::default());
        assert_eq!(result.confidence, 1.0);
        assert!(!result.blocked);
    }

    #[tokio::test]
    async fn test_rule_based_without_ml() {
        let result = engine()
            .analyze_url("http://192.168.0.1/login")
            .await
            .unwrap();
        assert_eq!(result.source, Source::RuleBased);
        assert!((result.risk_score - 0.16).abs() < 1e-9);
        assert!(!result.blocked);
        assert_eq!(result.model_version, RULES_MODEL_VERSION);
        assert!(result
            .flags
            .iter()
            .any(|f| f == "Uses IP address instead of domain name"));
    }

    #[tokio::test]
    async fn test_blocked_at_threshold() {
        let result = engine()
            .analyze_url("https://paypal-secure-login-verify-account.xyz/")
            .await
            .unwrap();
        assert!(result.risk_score >= 0.7);
        assert!(result.blocked);
    }

    #[tokio::test]
    async fn test_ml_failure_falls_back_to_heuristics() {
        let engine = engine_with_dead_ml();
        let url = "http://192.168.0.1/login";
        let result = engine.analyze_url(url).await.unwrap();

        assert_eq!(result.source, Source::Fallback);

        // Numbers must equal the pure analyzer's output
        let pure = engine.analyzer().analyze(url, "192.168.0.1");
        assert_eq!(result.risk_score, pure.risk_score);
        assert_eq!(result.threats, pure.threats);
        assert_eq!(result.confidence, pure.confidence);
        assert_eq!(result.flags, pure.flags);
    }

    #[tokio::test]
    async fn test_cache_serves_repeat_analysis() {
        let engine = engine();
        let url = "http://tracking.example-offers.click/login/verify";

        let first = engine.analyze_url(url).await.unwrap();
        assert_eq!(first.source, Source::RuleBased);

        let second = engine.analyze_url(url).await.unwrap();
        assert_eq!(second.source, Source::Cache);
        assert_eq!(second.risk_score, first.risk_score);
        assert_eq!(second.threats, first.threats);
        assert_eq!(second.flags, first.flags);
    }

    #[tokio::test]
    async fn test_cache_key_ignores_query_and_fragment() {
        let engine = engine();
        let first = engine
            .analyze_url("http://deals.example-offers.click/page?a=1")
            .await
            .unwrap();
        assert_eq!(first.source, Source::RuleBased);

        let second = engine
            .analyze_url("http://deals.example-offers.click/page?b=2#x")
            .await
            .unwrap();
        assert_eq!(second.source, Source::Cache);
    }

    #[tokio::test]
    async fn test_invalid_url_is_a_hard_error() {
        assert!(engine().analyze_url("not a url at all").await.is_err());
        assert!(engine().analyze_url("data:text/html,x").await.is_err());
    }

    #[tokio::test]
    async fn test_whitelist_bypasses_cache_entirely() {
        let engine = engine();
        let first = engine.analyze_url("https://github.com/login").await.unwrap();
        let second = engine.analyze_url("https://github.com/login").await.unwrap();
        assert_eq!(first.source, Source::Whitelist);
        assert_eq!(second.source, Source::Whitelist);
    }
}
