use std::collections::HashMap;
use std::sync::Mutex;
use std::time::SystemTime;

use serde::{Deserialize, Serialize};

use crate::engine::CombinedAnalysisResult;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedEntry {
    pub result: CombinedAnalysisResult,
    pub expires_at: SystemTime,
}

impl CachedEntry {
    pub fn is_valid(&self) -> bool {
        self.expires_at > SystemTime::now()
    }
}

/// Result store keyed by normalized URL. Implementations handle their own
/// failures: a read problem looks like a miss, a write problem is logged
/// and dropped, so analysis never blocks on the store.
pub trait AnalysisCache: Send + Sync {
    fn get(&self, normalized_url: &str) -> Option<CachedEntry>;
    fn upsert(&self, normalized_url: &str, entry: CachedEntry);
}

/// In-process store with per-entry expiry; expired rows are dropped on
/// read and swept on write
pub struct MemoryCache {
    entries: Mutex<HashMap<String, CachedEntry>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        MemoryCache {
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new()
    }
}

impl AnalysisCache for MemoryCache {
    fn get(&self, normalized_url: &str) -> Option<CachedEntry> {
        match self.entries.lock() {
            Ok(entries) => entries
                .get(normalized_url)
                .filter(|entry| entry.is_valid())
                .cloned(),
            Err(e) => {
                log::warn!("Analysis cache unavailable on read: {e}");
                None
            }
        }
    }

    fn upsert(&self, normalized_url: &str, entry: CachedEntry) {
        match self.entries.lock() {
            Ok(mut entries) => {
                entries.retain(|_, existing| existing.is_valid());
                entries.insert(normalized_url.to_string(), entry);
            }
            Err(e) => log::warn!("Analysis cache unavailable on write: {e}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::{SubScores, ThreatBreakdown};
    use crate::engine::Source;
    use std::time::Duration;

    fn entry(expires_in: Duration) -> CachedEntry {
        CachedEntry {
            result: CombinedAnalysisResult {
                url: "https://example.com/a".to_string(),
                domain: "example.com".to_string(),
                risk_score: 0.16,
                threats: ThreatBreakdown::default(),
                confidence: 0.15,
                flags: vec!["Uses IP address instead of domain name".to_string()],
                details: SubScores::default(),
                source: Source::RuleBased,
                model_version: "rules-v0.1.0".to_string(),
                processing_time_ms: 1,
                blocked: false,
                message: "low risk".to_string(),
            },
            expires_at: SystemTime::now() + expires_in,
        }
    }

    #[test]
    fn test_get_returns_live_entry() {
        let cache = MemoryCache::new();
        cache.upsert("https://example.com/a", entry(Duration::from_secs(60)));
        let hit = cache.get("https://example.com/a").unwrap();
        assert_eq!(hit.result.domain, "example.com");
        assert!(cache.get("https://example.com/other").is_none());
    }

    #[test]
    fn test_expired_entry_is_a_miss() {
        let cache = MemoryCache::new();
        let mut stale = entry(Duration::from_secs(60));
        stale.expires_at = SystemTime::now() - Duration::from_secs(1);
        cache.upsert("https://example.com/a", stale);
        assert!(cache.get("https://example.com/a").is_none());
    }

    #[test]
    fn test_upsert_sweeps_expired_rows() {
        let cache = MemoryCache::new();
        let mut stale = entry(Duration::from_secs(60));
        stale.expires_at = SystemTime::now() - Duration::from_secs(1);
        cache.upsert("https://example.com/stale", stale);
        cache.upsert("https://example.com/live", entry(Duration::from_secs(60)));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_upsert_replaces_existing_key() {
        let cache = MemoryCache::new();
        cache.upsert("https://example.com/a", entry(Duration::from_secs(60)));
        let mut updated = entry(Duration::from_secs(60));
        updated.result.risk_score = 0.99;
        cache.upsert("https://example.com/a", updated);
        assert_eq!(cache.len(), 1);
        let hit = cache.get("https://example.com/a").unwrap();
        assert!((hit.result.risk_score - 0.99).abs() < 1e-9);
    }
}
