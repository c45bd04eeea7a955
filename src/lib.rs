//! EmoCollab agent - presence heuristics and mock stress analysis for the
//! EmoCollab employee-wellbeing dashboard.
//!
//! This library provides the logic behind the dashboard's face scan: a cheap
//! presence heuristic over camera frames, a mock engine that turns a positive
//! presence signal into emotion scores and a stress level, and the workflow
//! that ties both to a camera. It also serves the mock analysis endpoint and
//! the employee/HR chat threads.
//!
//! # Honesty
//!
//! - **No real face detection**: presence is a brightness or skin-tone heuristic
//! - **No real analysis**: scores are random draws biased by a latent stress value
//! - **No frame storage**: frames are inspected in memory and dropped
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                        EmoCollab Agent                       │
//! ├──────────────────────────────────────────────────────────────┤
//! │  ┌─────────────┐   ┌─────────────┐   ┌─────────────┐         │
//! │  │   Capture   │──▶│  Presence   │──▶│ Mock Engine │         │
//! │  │  (session)  │   │ (heuristic) │   │  (stress)   │         │
//! │  └─────────────┘   └─────────────┘   └─────────────┘         │
//! │         │                 │                 │                │
//! │         ▼                 ▼                 ▼                │
//! │  ┌─────────────┐   ┌─────────────┐   ┌─────────────┐         │
//! │  │  Detection  │   │  Activity   │   │ HTTP server │◀─ chat  │
//! │  │    Loop     │   │     Log     │   │  (axum)     │         │
//! │  └─────────────┘   └─────────────┘   └─────────────┘         │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use emocollab::{capture, config::Config, core};
//!
//! let config = Config::default();
//! let camera = capture::SyntheticCamera::new(capture::FramePattern::Gray);
//! let mut workflow = core::ScanWorkflow::from_config(&config, Box::new(camera));
//!
//! workflow.start_camera().expect("camera unavailable");
//! if workflow.poll_presence().unwrap_or(false) {
//!     let result = workflow.analyze(|_| {}).expect("analysis failed");
//!     println!("stress: {}", result.stress_level);
//! }
//! ```

pub mod activity;
pub mod capture;
pub mod config;
pub mod core;
pub mod messaging;

#[cfg(feature = "client")]
pub mod client;

#[cfg(feature = "server")]
pub mod server;

// Re-export key types at crate root for convenience
pub use activity::{ActivityLog, ActivityStats, SharedActivityLog};
pub use capture::{Camera, CaptureError, CaptureSession, Frame, SyntheticCamera};
pub use config::Config;
pub use core::{
    AnalysisError, AnalysisResult, DetectionLoop, EmotionScores, MockEngine, PresenceDetector,
    PresencePolicy, ScanError, ScanState, ScanWorkflow, StressTier,
};
pub use messaging::{Message, MessageError, MessageStore};

// Client re-exports (when enabled)
#[cfg(feature = "client")]
pub use client::{
    AnalysisClient, AnalysisClientConfig, BlockingAnalysisClient, ClientAnalysis, ClientError,
};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Notice shown to users before a scan.
pub const SCAN_NOTICE: &str = r#"
╔══════════════════════════════════════════════════════════════════╗
║                EMOCOLLAB - ABOUT THE FACE SCAN                   ║
╠══════════════════════════════════════════════════════════════════╣
║                                                                  ║
║  The scan estimates your stress level for wellbeing check-ins.   ║
║                                                                  ║
║  ✓ WHAT HAPPENS:                                                 ║
║    • A camera frame is checked for someone in front of it        ║
║    • A stress level and emotion scores are produced              ║
║    • Recommendations are picked for the stress level             ║
║                                                                  ║
║  ✗ WHAT IT IS NOT:                                               ║
║    • Not face recognition (nobody is identified)                 ║
║    • Not a medical or psychological assessment                   ║
║    • Frames are never stored or uploaded unless you ask          ║
║                                                                  ║
║  Results are a demonstration and should not drive decisions.     ║
║                                                                  ║
║  You can view activity counts anytime with:                      ║
║    emocollab status                                              ║
║                                                                  ║
╚══════════════════════════════════════════════════════════════════╝
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_notice_contents() {
        assert!(SCAN_NOTICE.contains("FACE SCAN"));
        assert!(SCAN_NOTICE.contains("WHAT IT IS NOT"));
        assert!(SCAN_NOTICE.contains("never stored"));
    }
}
