use std::collections::HashMap;
use std::path::Path;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::time::interval;

use crate::engine::Source;

#[derive(Debug, Clone)]
pub enum StatEvent {
    Analyzed {
        source: Source,
        blocked: bool,
        processing_time_ms: u64,
    },
    MlFailure,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SourceStats {
    pub analyses: u64,
    pub blocked: u64,
    pub total_processing_time_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GlobalStats {
    pub total_analyses: u64,
    pub total_blocked: u64,
    pub ml_failures: u64,
    pub by_source: HashMap<String, SourceStats>,
    pub started_at_epoch_secs: u64,
    pub last_updated_epoch_secs: u64,
}

impl Default for GlobalStats {
    fn default() -> Self {
        let now = epoch_secs();
        GlobalStats {
            total_analyses: 0,
            total_blocked: 0,
            ml_failures: 0,
            by_source: HashMap::new(),
            started_at_epoch_secs: now,
            last_updated_epoch_secs: now,
        }
    }
}

fn epoch_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// Aggregates analysis outcomes off the request path. Events go through an
/// unbounded channel into a worker that flushes JSON snapshots on an
/// interval; a flush failure is logged and never propagated.
pub struct StatisticsCollector {
    output_path: String,
    sender: mpsc::UnboundedSender<StatEvent>,
    _handle: tokio::task::JoinHandle<()>,
}

impl StatisticsCollector {
    pub fn new(output_path: String, flush_interval_seconds: u64) -> Result<Self> {
        if let Some(parent) = Path::new(&output_path).parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create stats directory: {}", parent.display())
            })?;
        }

        let (sender, receiver) = mpsc::unbounded_channel();

        let path_clone = output_path.clone();
        let handle = tokio::spawn(async move {
            Self::stats_worker(path_clone, receiver, flush_interval_seconds).await;
        });

        Ok(Self {
            output_path,
            sender,
            _handle: handle,
        })
    }

    pub fn record_event(&self, event: StatEvent) {
        if let Err(e) = self.sender.send(event) {
            log::warn!("Failed to send statistics event: {e}");
        }
    }

    async fn stats_worker(
        output_path: String,
        mut receiver: mpsc::UnboundedReceiver<StatEvent>,
        flush_interval_seconds: u64,
    ) {
        let mut stats = Self::load(&output_path).unwrap_or_default();
        let mut dirty = false;

        let mut flush_timer = interval(Duration::from_secs(flush_interval_seconds));
        let mut last_flush = Instant::now();

        loop {
            tokio::select! {
                event = receiver.recv() => {
                    match event {
                        Some(event) => {
                            Self::process_event(event, &mut stats);
                            dirty = true;
                        }
                        None => {
                            // Channel closed, flush and exit
                            if dirty {
                                if let Err(e) = Self::flush(&output_path, &stats) {
                                    log::error!("Failed to flush statistics: {e:#}");
                                }
                            }
                            break;
                        }
                    }
                }
                _ = flush_timer.tick() => {
                    if dirty && last_flush.elapsed() >= Duration::from_secs(flush_interval_seconds) {
                        if let Err(e) = Self::flush(&output_path, &stats) {
                            log::error!("Failed to flush statistics: {e:#}");
                        } else {
                            dirty = false;
                            last_flush = Instant::now();
                        }
                    }
                }
            }
        }
    }

    fn process_event(event: StatEvent, stats: &mut GlobalStats) {
        stats.last_updated_epoch_secs = epoch_secs();

        match event {
            StatEvent::Analyzed {
                source,
                blocked,
                processing_time_ms,
            } => {
                stats.total_analyses += 1;
                if blocked {
                    stats.total_blocked += 1;
                }
                let entry = stats
                    .by_source
                    .entry(source.as_str().to_string())
                    .or_default();
                entry.analyses += 1;
                if blocked {
                    entry.blocked += 1;
                }
                entry.total_processing_time_ms += processing_time_ms;
            }
            StatEvent::MlFailure => {
                stats.ml_failures += 1;
            }
        }
    }

    fn load(path: &str) -> Option<GlobalStats> {
        let content = std::fs::read_to_string(path).ok()?;
        match serde_json::from_str(&content) {
            Ok(stats) => Some(stats),
            Err(e) => {
                log::warn!("Discarding unreadable stats file {path}: {e}");
                None
            }
        }
    }

    fn flush(path: &str, stats: &GlobalStats) -> Result<()> {
        let content = serde_json::to_string_pretty(stats)?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write stats file: {path}"))?;
        Ok(())
    }

    pub fn get_stats(&self) -> GlobalStats {
        Self::load(&self.output_path).unwrap_or_default()
    }

    pub fn reset_stats(&self) -> Result<()> {
        Self::flush(&self.output_path, &GlobalStats::default())
    }
}

/// Read a stats snapshot without a collector running
pub fn read_stats_file(path: &str) -> Result<GlobalStats> {
    let content =
        std::fs::read_to_string(path).with_context(|| format!("Failed to read stats file: {path}"))?;
    let stats =
        serde_json::from_str(&content).with_context(|| format!("Failed to parse stats file: {path}"))?;
    Ok(stats)
}
