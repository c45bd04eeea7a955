//! Core functionality for the EmoCollab agent.
//!
//! This module contains:
//! - Heuristic presence detection over camera frames
//! - The mock stress/emotion engine and its recommendation table
//! - The scan workflow state machine and the background detection loop

pub mod detection;
pub mod engine;
pub mod presence;
pub mod recommendations;
pub mod workflow;

// Re-export commonly used types
pub use detection::{DetectionLoop, PresenceEvent, MIN_POLL_INTERVAL};
pub use engine::{AnalysisError, AnalysisResult, EmotionScores, FaceAnalysis, Gender, MockEngine};
pub use presence::{
    mean_luminance, skin_ratio, source_from_config, PresenceDetector, PresencePolicy,
    PresenceSource, RandomPresence,
};
pub use recommendations::{RecommendationTable, StressTier};
pub use workflow::{ProgressTicker, ScanError, ScanState, ScanWorkflow};
