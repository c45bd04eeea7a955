//! Activity counters for the agent.
//!
//! Only counts are kept. No frames, results or message content are stored.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Activity statistics for the current session.
#[derive(Debug)]
pub struct ActivityLog {
    /// Frames run through a presence source
    frames_sampled: AtomicU64,
    /// Samples that reported a subject
    presence_hits: AtomicU64,
    /// Analyses that produced a result
    analyses_completed: AtomicU64,
    /// Analyses refused for lack of a subject
    analyses_rejected: AtomicU64,
    /// Chat messages appended
    messages_sent: AtomicU64,
    session_start: DateTime<Utc>,
    persist_path: Option<PathBuf>,
}

impl ActivityLog {
    pub fn new() -> Self {
        Self {
            frames_sampled: AtomicU64::new(0),
            presence_hits: AtomicU64::new(0),
            analyses_completed: AtomicU64::new(0),
            analyses_rejected: AtomicU64::new(0),
            messages_sent: AtomicU64::new(0),
            session_start: Utc::now(),
            persist_path: None,
        }
    }

    /// Create a log backed by a JSON file, loading previous counts if present.
    pub fn with_persistence(path: PathBuf) -> Self {
        let mut log = Self::new();
        log.persist_path = Some(path);

        if let Err(e) = log.load() {
            tracing::warn!("could not load previous activity stats: {}", e);
        }

        log
    }

    /// Record one presence sample.
    pub fn record_frame_sampled(&self, detected: bool) {
        self.frames_sampled.fetch_add(1, Ordering::Relaxed);
        if detected {
            self.presence_hits.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_analysis_completed(&self) {
        self.analyses_completed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_analysis_rejected(&self) {
        self.analyses_rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_message_sent(&self) {
        self.messages_sent.fetch_add(1, Ordering::Relaxed);
    }

    pub fn stats(&self) -> ActivityStats {
        ActivityStats {
            frames_sampled: self.frames_sampled.load(Ordering::Relaxed),
            presence_hits: self.presence_hits.load(Ordering::Relaxed),
            analyses_completed: self.analyses_completed.load(Ordering::Relaxed),
            analyses_rejected: self.analyses_rejected.load(Ordering::Relaxed),
            messages_sent: self.messages_sent.load(Ordering::Relaxed),
            session_start: self.session_start,
            session_duration_secs: (Utc::now() - self.session_start).num_seconds().max(0) as u64,
        }
    }

    /// Summary text for `emocollab status`.
    pub fn summary(&self) -> String {
        let stats = self.stats();
        format!(
            "Activity:\n\
             - Frames sampled: {}\n\
             - Presence hits: {} ({:.0}%)\n\
             - Analyses completed: {}\n\
             - Analyses rejected (no subject): {}\n\
             - Messages sent: {}\n\
             - Session duration: {} seconds\n\
             \n\
             Camera frames are analyzed in memory and never stored.",
            stats.frames_sampled,
            stats.presence_hits,
            stats.presence_rate() * 100.0,
            stats.analyses_completed,
            stats.analyses_rejected,
            stats.messages_sent,
            stats.session_duration_secs
        )
    }

    /// Save counts to disk. No-op without a persistence path.
    pub fn save(&self) -> Result<(), std::io::Error> {
        if let Some(ref path) = self.persist_path {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }

            let stats = self.stats();
            let persisted = PersistedStats {
                frames_sampled: stats.frames_sampled,
                presence_hits: stats.presence_hits,
                analyses_completed: stats.analyses_completed,
                analyses_rejected: stats.analyses_rejected,
                messages_sent: stats.messages_sent,
                last_updated: Utc::now(),
            };

            let json = serde_json::to_string_pretty(&persisted).map_err(std::io::Error::other)?;
            std::fs::write(path, json)?;
        }
        Ok(())
    }

    fn load(&mut self) -> Result<(), std::io::Error> {
        if let Some(ref path) = self.persist_path {
            if path.exists() {
                let content = std::fs::read_to_string(path)?;
                let persisted: PersistedStats =
                    serde_json::from_str(&content).map_err(std::io::Error::other)?;

                self.frames_sampled
                    .store(persisted.frames_sampled, Ordering::Relaxed);
                self.presence_hits
                    .store(persisted.presence_hits, Ordering::Relaxed);
                self.analyses_completed
                    .store(persisted.analyses_completed, Ordering::Relaxed);
                self.analyses_rejected
                    .store(persisted.analyses_rejected, Ordering::Relaxed);
                self.messages_sent
                    .store(persisted.messages_sent, Ordering::Relaxed);
            }
        }
        Ok(())
    }

    pub fn reset(&self) {
        self.frames_sampled.store(0, Ordering::Relaxed);
        self.presence_hits.store(0, Ordering::Relaxed);
        self.analyses_completed.store(0, Ordering::Relaxed);
        self.analyses_rejected.store(0, Ordering::Relaxed);
        self.messages_sent.store(0, Ordering::Relaxed);
    }
}

impl Default for ActivityLog {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of activity statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityStats {
    pub frames_sampled: u64,
    pub presence_hits: u64,
    pub analyses_completed: u64,
    pub analyses_rejected: u64,
    pub messages_sent: u64,
    pub session_start: DateTime<Utc>,
    pub session_duration_secs: u64,
}

impl ActivityStats {
    /// Share of samples that found a subject.
    pub fn presence_rate(&self) -> f64 {
        if self.frames_sampled == 0 {
            0.0
        } else {
            self.presence_hits as f64 / self.frames_sampled as f64
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct PersistedStats {
    frames_sampled: u64,
    presence_hits: u64,
    analyses_completed: u64,
    analyses_rejected: u64,
    messages_sent: u64,
    last_updated: DateTime<Utc>,
}

/// Thread-safe shared activity log.
pub type SharedActivityLog = Arc<ActivityLog>;

pub fn create_shared_log() -> SharedActivityLog {
    Arc::new(ActivityLog::new())
}

pub fn create_shared_log_with_persistence(path: PathBuf) -> SharedActivityLog {
    Arc::new(ActivityLog::with_persistence(path))
}
