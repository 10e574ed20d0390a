use lazy_static::lazy_static;
use regex::Regex;

use super::SignalScore;
use crate::config::HeuristicConfig;
use crate::domain_utils::DomainUtils;

lazy_static! {
    static ref PERCENT_ENCODED: Regex = Regex::new(r"%[0-9A-Fa-f]{2}").unwrap();
}

const MAX_URL_LENGTH: usize = 150;
const MAX_PERCENT_SEQUENCES: usize = 3;

/// Structural checks against the full URL and its host
pub struct UrlPatternScorer {
    suspicious_tlds: Vec<String>,
    brand_domains: Vec<String>,
}

impl UrlPatternScorer {
    pub fn new(config: &HeuristicConfig) -> Self {
        UrlPatternScorer {
            suspicious_tlds: config.suspicious_tlds.clone(),
            brand_domains: config.brand_domains.clone(),
        }
    }

    pub fn score(&self, url: &str, domain: &str) -> SignalScore {
        let mut score = 0.0;
        let mut flags = Vec::new();
        let url_lower = url.to_lowercase();
        let domain_lower = domain.to_lowercase();

        if DomainUtils::is_ipv4_literal(&domain_lower) {
            score += 0.4;
            flags.push("Uses IP address instead of domain name".to_string());
        }

        if let Some(tld) = self
            .suspicious_tlds
            .iter()
            .find(|tld| domain_lower.ends_with(tld.as_str()))
        {
            score += 0.2;
            flags.push(format!("Suspicious top-level domain: {tld}"));
        }

        if url.contains('@') {
            score += 0.3;
            flags.push("Embedded @ separator (credential phishing pattern)".to_string());
        }

        let depth = DomainUtils::subdomain_depth(&domain_lower);
        if depth > 8 {
            score += 1.0;
            flags.push(format!("CRITICAL: Extreme subdomain nesting ({depth} levels)"));
        } else if depth > 5 {
            score += 0.7;
            flags.push(format!("Very deep subdomain nesting ({depth} levels)"));
        } else if depth > 3 {
            score += 0.4;
            flags.push(format!("Deep subdomain nesting ({depth} levels)"));
        }

        let encoded = PERCENT_ENCODED.find_iter(url).count();
        if encoded > MAX_PERCENT_SEQUENCES {
            score += 0.15;
            flags.push(format!("Heavy percent-encoding ({encoded} escaped sequences)"));
        }

        if url.len() > MAX_URL_LENGTH {
            score += 0.1;
            flags.push(format!("Unusually long URL ({} characters)", url.len()));
        }

        // A brand domain appearing anywhere in the URL while the host is
        // not that brand (or one of its subdomains) is a spoof attempt.
        // Legitimately nested references (review sites linking a brand)
        // will also trip this; accepted precision tradeoff.
        for brand in &self.brand_domains {
            if url_lower.contains(brand.as_str())
                && !DomainUtils::matches_domain_list(&domain_lower, std::slice::from_ref(brand))
            {
                score += 0.8;
                flags.push(format!("CRITICAL: Impersonates {brand}"));
                break;
            }
        }

        SignalScore { score, flags }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scorer() -> UrlPatternScorer {
        UrlPatternScorer::new(&HeuristicConfig::default())
    }

    #[test]
    fn test_ip_literal_host() {
        let signal = scorer().score("http://192.168.0.1/admin", "192.168.0.1");
        assert!((signal.score - 0.4).abs() < 1e-9);
        assert_eq!(signal.flags[0], "Uses IP address instead of domain name");
    }

    #[test]
    fn test_suspicious_tld_and_at_symbol() {
        let signal = scorer().score("http://evil.tk/a@b", "evil.tk");
        assert!((signal.score - 0.5).abs() < 1e-9);
        assert_eq!(signal.flags.len(), 2);
    }

    #[test]
    fn test_subdomain_tiers_are_exclusive() {
        let s = scorer();
        // depth 4
        let shallow = s.score("http://a.b.c.d.example.com/", "a.b.c.d.example.com");
        assert!((shallow.score - 0.4).abs() < 1e-9);
        // depth 6
        let mid = s.score(
            "http://a.b.c.d.e.f.example.com/",
            "a.b.c.d.e.f.example.com",
        );
        assert!((mid.score - 0.7).abs() < 1e-9);
        // depth 9
        let deep = s.score(
            "http://a.b.c.d.e.f.g.h.i.example.com/",
            "a.b.c.d.e.f.g.h.i.example.com",
        );
        assert!((deep.score - 1.0).abs() < 1e-9);
        assert!(deep.flags[0].starts_with("CRITICAL"));
    }

    #[test]
    fn test_percent_encoding_threshold() {
        let s = scorer();
        let under = s.score("http://x.com/%41%42%43", "x.com");
        assert_eq!(under.score, 0.0);
        let over = s.score("http://x.com/%41%42%43%44", "x.com");
        assert!((over.score - 0.15).abs() < 1e-9);
    }

    #[test]
    fn test_long_url() {
        let url = format!("http://x.com/{}", "a".repeat(160));
        let signal = scorer().score(&url, "x.com");
        assert!((signal.score - 0.1).abs() < 1e-9);
    }

    #[test]
    fn test_brand_spoofing() {
        let s = scorer();
        // Brand text in the URL, host is unrelated
        let spoof = s.score(
            "http://real-paypal.com/paypal.com/login",
            "real-paypal.com",
        );
        assert!((spoof.score - 0.8).abs() < 1e-9);
        assert!(spoof.flags[0].contains("paypal.com"));

        // The brand itself and its subdomains are exempt
        let legit = s.score("https://paypal.com/signin", "paypal.com");
        assert_eq!(legit.score, 0.0);
        let sub = s.score("https://www.paypal.com/signin", "www.paypal.com");
        assert_eq!(sub.score, 0.0);
    }
}
