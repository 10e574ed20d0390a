pub mod analyzer;
pub mod cache;
pub mod config;
pub mod domain_utils;
pub mod engine;
pub mod ml_client;
pub mod stats;

pub use analyzer::{HeuristicAnalyzer, RiskLevel, RuleAnalysisResult, SubScores, ThreatBreakdown};
pub use cache::{AnalysisCache, CachedEntry, MemoryCache};
pub use config::Config;
pub use domain_utils::DomainUtils;
pub use engine::{AnalysisEngine, CombinedAnalysisResult, Source};
pub use ml_client::{MlClient, MlResponse};
pub use stats::{StatEvent, StatisticsCollector};
