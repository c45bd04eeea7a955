//! Activity module for the EmoCollab agent.
//!
//! Tracks how much the agent has done (samples, analyses, messages) so the
//! user can see it at any time with `emocollab status`.

pub mod log;

// Re-export commonly used types
pub use log::{
    create_shared_log, create_shared_log_with_persistence, ActivityLog, ActivityStats,
    SharedActivityLog,
};
