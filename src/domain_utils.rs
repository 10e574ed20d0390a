use url::Url;

/// Minimal domain and URL hierarchy utilities
pub struct DomainUtils;

impl DomainUtils {
    /// Extract the lowercase host from a URL
    pub fn extract_domain(url: &str) -> Option<String> {
        Url::parse(url).ok()?.host_str().map(|h| h.to_lowercase())
    }

    /// Check if domain matches any in list (with hierarchy support)
    pub fn matches_domain_list(domain: &str, domain_list: &[String]) -> bool {
        let domain_lower = domain.to_lowercase();

        for pattern in domain_list {
            let pattern_lower = pattern.to_lowercase();

            // Exact match
            if domain_lower == pattern_lower {
                return true;
            }

            // Subdomain match (domain ends with .pattern)
            if domain_lower.ends_with(&format!(".{}", pattern_lower)) {
                return true;
            }
        }

        false
    }

    /// Canonicalize domain (remove www prefix)
    pub fn canonicalize_domain(domain: &str) -> String {
        let domain_lower = domain.to_lowercase();
        if let Some(stripped) = domain_lower.strip_prefix("www.") {
            stripped.to_string()
        } else {
            domain_lower
        }
    }

    /// Cache key form of a URL: query and fragment stripped, trailing slash removed
    pub fn normalize_url(url: &str) -> String {
        let normalized = match Url::parse(url) {
            Ok(mut parsed) => {
                parsed.set_query(None);
                parsed.set_fragment(None);
                parsed.to_string()
            }
            Err(_) => {
                let base = url.split(['?', '#']).next().unwrap_or(url);
                base.to_string()
            }
        };
        normalized
            .strip_suffix('/')
            .unwrap_or(&normalized)
            .to_string()
    }

    /// Number of labels beyond a bare registrable domain
    pub fn subdomain_depth(domain: &str) -> usize {
        domain.split('.').count().saturating_sub(2)
    }

    /// True for a bare dotted-quad IPv4 host
    pub fn is_ipv4_literal(domain: &str) -> bool {
        let octets: Vec<&str> = domain.split('.').collect();
        octets.len() == 4
            && octets
                .iter()
                .all(|o| !o.is_empty() && o.parse::<u8>().is_ok())
    }
}
