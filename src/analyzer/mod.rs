pub mod content_indicators;
pub mod domain_reputation;
pub mod url_patterns;

use serde::{Deserialize, Serialize};

use crate::config::HeuristicConfig;
use content_indicators::ContentIndicatorScorer;
use domain_reputation::DomainReputationScorer;
use url_patterns::UrlPatternScorer;

// Accumulator weights for the overall score. A single accumulator at or
// above DOMINANCE_GATE overrides the weighted average so one extreme
// signal cannot be diluted below the blocking threshold.
const URL_WEIGHT: f64 = 0.4;
const DOMAIN_WEIGHT: f64 = 0.4;
const CONTENT_WEIGHT: f64 = 0.2;
const DOMINANCE_GATE: f64 = 0.8;
const DOMINANCE_FACTOR: f64 = 0.9;

const CONFIDENCE_PER_FLAG: f64 = 0.15;
const CONFIDENCE_CEILING: f64 = 0.95;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ThreatBreakdown {
    pub phishing: f64,
    pub malware: f64,
    pub social: f64,
}

/// Raw per-accumulator sub-scores, reported for explainability
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SubScores {
    pub url_patterns: f64,
    pub domain_reputation: f64,
    pub content_indicators: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleAnalysisResult {
    pub risk_score: f64,
    pub threats: ThreatBreakdown,
    pub confidence: f64,
    /// Human-readable reasons, in the order the checks fired
    pub flags: Vec<String>,
    pub details: SubScores,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Safe,
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    pub fn from_score(score: f64) -> Self {
        match score {
            s if s < 0.2 => RiskLevel::Safe,
            s if s < 0.4 => RiskLevel::Low,
            s if s < 0.6 => RiskLevel::Medium,
            s if s < 0.8 => RiskLevel::High,
            _ => RiskLevel::Critical,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            RiskLevel::Safe => "safe",
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
            RiskLevel::Critical => "critical",
        }
    }
}

/// One accumulator's contribution: a running score and the evidence behind it
#[derive(Debug, Clone, Default)]
pub struct SignalScore {
    pub score: f64,
    pub flags: Vec<String>,
}

pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

pub(crate) fn clamp01(value: f64) -> f64 {
    value.clamp(0.0, 1.0)
}

/// Risk-level label plus the top three reasons, for end-user display
pub fn risk_message(risk_score: f64, flags: &[String]) -> String {
    if flags.is_empty() {
        return "No suspicious patterns detected".to_string();
    }
    let top: Vec<&str> = flags.iter().take(3).map(|f| f.as_str()).collect();
    format!(
        "{} risk: {}",
        RiskLevel::from_score(risk_score).label(),
        top.join("; ")
    )
}

/// Pure rule-based URL risk scorer. Deterministic, no I/O; callers must
/// reject malformed URLs before handing them in.
pub struct HeuristicAnalyzer {
    url_patterns: UrlPatternScorer,
    domain_reputation: DomainReputationScorer,
    content_indicators: ContentIndicatorScorer,
}

impl HeuristicAnalyzer {
    pub fn new(config: &HeuristicConfig) -> Self {
        HeuristicAnalyzer {
            url_patterns: UrlPatternScorer::new(config),
            domain_reputation: DomainReputationScorer::new(config),
            content_indicators: ContentIndicatorScorer::new(config),
        }
    }

    pub fn analyze(&self, url: &str, domain: &str) -> RuleAnalysisResult {
        let url_signal = self.url_patterns.score(url, domain);
        let domain_signal = self.domain_reputation.score(domain);
        let content_signal = self.content_indicators.score(url);

        let mut flags = Vec::new();
        flags.extend(url_signal.flags);
        flags.extend(domain_signal.flags);
        flags.extend(content_signal.flags);

        // Accumulators are left unclamped until here so an extreme
        // accumulator can still dominate the weighted average.
        let url_score = url_signal.score;
        let domain_score = domain_signal.score;
        let content_score = content_signal.score;

        let weighted =
            URL_WEIGHT * url_score + DOMAIN_WEIGHT * domain_score + CONTENT_WEIGHT * content_score;
        let max_individual = url_score.max(domain_score).max(content_score);
        let total = if max_individual >= DOMINANCE_GATE {
            weighted.max(DOMINANCE_FACTOR * max_individual)
        } else {
            weighted
        };

        let threats = ThreatBreakdown {
            phishing: round2(clamp01(domain_score + 0.5 * content_score)),
            malware: round2(clamp01(0.3 * url_score + 0.3 * content_score)),
            social: round2(clamp01(0.6 * domain_score + 0.4 * content_score)),
        };

        let confidence = (flags.len() as f64 * CONFIDENCE_PER_FLAG).clamp(0.0, CONFIDENCE_CEILING);

        RuleAnalysisResult {
            risk_score: round2(clamp01(total)),
            threats,
            confidence: round2(confidence),
            flags,
            details: SubScores {
                url_patterns: round2(url_score),
                domain_reputation: round2(domain_score),
                content_indicators: round2(content_score),
            },
        }
    }
}
