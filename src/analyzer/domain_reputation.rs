use lazy_static::lazy_static;
use regex::Regex;

use super::SignalScore;
use crate::config::HeuristicConfig;

lazy_static! {
    // Vietnamese-diacritic vowels that render nearly identically to plain
    // ASCII vowels in a browser address bar
    static ref HOMOGLYPH_VOWELS: Regex = Regex::new(
        "[àáạảãâầấậẩẫăằắặẳẵèéẹẻẽêềếệểễìíịỉĩòóọỏõôồốộổỗơờớợởỡùúụủũưừứựửữỳýỵỷỹ]"
    )
    .unwrap();
    static ref DIGIT_LETTER_ADJACENT: Regex = Regex::new(r"[a-z][0-9]|[0-9][a-z]").unwrap();
}

const KEYWORD_SCORE_STEP: f64 = 0.2;
const KEYWORD_SCORE_CAP: f64 = 0.6;
const KEYWORD_STACKING_BONUS: f64 = 0.2;
const KEYWORD_STACKING_MIN: usize = 3;

/// Lexical reputation checks against the hostname alone
pub struct DomainReputationScorer {
    phishing_keywords: Vec<String>,
}

impl DomainReputationScorer {
    pub fn new(config: &HeuristicConfig) -> Self {
        DomainReputationScorer {
            phishing_keywords: config.phishing_keywords.clone(),
        }
    }

    pub fn score(&self, domain: &str) -> SignalScore {
        let mut score = 0.0;
        let mut flags = Vec::new();
        let domain_lower = domain.to_lowercase();

        if HOMOGLYPH_VOWELS.is_match(&domain_lower) {
            score += 0.35;
            flags.push("Accented look-alike characters in domain (homoglyph spoofing)".to_string());
        }

        let matched: Vec<&str> = self
            .phishing_keywords
            .iter()
            .filter(|keyword| domain_lower.contains(keyword.as_str()))
            .map(|keyword| keyword.as_str())
            .collect();
        if !matched.is_empty() {
            score += (matched.len() as f64 * KEYWORD_SCORE_STEP).min(KEYWORD_SCORE_CAP);
            if matched.len() >= KEYWORD_STACKING_MIN {
                score += KEYWORD_STACKING_BONUS;
                flags.push(format!(
                    "HIGH RISK: Domain stacks {} phishing keywords ({})",
                    matched.len(),
                    matched.join(", ")
                ));
            } else {
                flags.push(format!("Phishing keywords in domain: {}", matched.join(", ")));
            }
        }

        let first_label = domain_lower.split('.').next().unwrap_or("");
        if DIGIT_LETTER_ADJACENT.is_match(first_label) {
            score += 0.25;
            flags.push("Digits mixed into the domain name".to_string());
        }

        let label_len = first_label.chars().count();
        if label_len < 3 {
            score += 0.1;
            flags.push(format!("Unusually short domain label ({label_len} characters)"));
        } else if label_len > 50 {
            score += 0.4;
            flags.push(format!(
                "Abnormally long domain label ({label_len} characters, strong phishing indicator)"
            ));
        } else if label_len > 30 {
            score += 0.2;
            flags.push(format!("Very long domain label ({label_len} characters)"));
        }

        if has_repeated_run(&domain_lower, 4) {
            score += 0.2;
            flags.push("Repeated character run in domain".to_string());
        }

        if domain_lower.matches('-').count() > 2 {
            score += 0.15;
            flags.push("Excessive hyphenation in domain".to_string());
        }

        SignalScore { score, flags }
    }
}

/// True if the string contains `min_len` identical consecutive characters
fn has_repeated_run(s: &str, min_len: usize) -> bool {
    let mut run = 1;
    let mut prev: Option<char> = None;
    for ch in s.chars() {
        if Some(ch) == prev {
            run += 1;
            if run >= min_len {
                return true;
            }
        } else {
            run = 1;
            prev = Some(ch);
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scorer() -> DomainReputationScorer {
        DomainReputationScorer::new(&HeuristicConfig::default())
    }

    #[test]
    fn test_neutral_domain() {
        let signal = scorer().score("example.org");
        assert_eq!(signal.score, 0.0);
        assert!(signal.flags.is_empty());
    }

    #[test]
    fn test_homoglyph_vowels() {
        let signal = scorer().score("gòogle-clone.com");
        assert!(signal.score >= 0.35);
        assert!(signal.flags[0].contains("homoglyph"));
    }

    #[test]
    fn test_keyword_scoring_caps_and_bonus() {
        let s = scorer();

        // Two keywords: 0.4, no stacking bonus
        let two = s.score("verifylogin.com");
        assert!((two.score - 0.4).abs() < 1e-9);
        assert!(two.flags[0].starts_with("Phishing keywords"));

        // Five keywords: capped at 0.6 plus the 0.2 stacking bonus, then
        // hyphen and label-length checks on top
        let five = s.score("paypal-secure-login-verify-account.xyz");
        assert!((five.score - 1.15).abs() < 1e-9);
        assert!(five.flags[0].starts_with("HIGH RISK"));
    }

    #[test]
    fn test_digit_adjacency() {
        let signal = scorer().score("site4you.net");
        assert!((signal.score - 0.25).abs() < 1e-9);
    }

    #[test]
    fn test_label_length_bands() {
        let s = scorer();
        assert!((s.score("ab.io").score - 0.1).abs() < 1e-9);
        let long32 = format!("{}.com", "xy".repeat(16));
        assert!((s.score(&long32).score - 0.2).abs() < 1e-9);
        let long52 = format!("{}.com", "xy".repeat(26));
        assert!((s.score(&long52).score - 0.4).abs() < 1e-9);
    }

    #[test]
    fn test_repeated_run_and_hyphens() {
        let s = scorer();
        assert!((s.score("wwwwsite.com").score - 0.2).abs() < 1e-9);
        assert!((s.score("my-own-little-shop.com").score - 0.15).abs() < 1e-9);
        // Three identical characters are not yet a run
        assert_eq!(s.score("booking.net").score, 0.0);
    }
}
