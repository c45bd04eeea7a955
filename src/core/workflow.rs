//! Scan workflow: camera lifecycle, presence gating and analysis.
//!
//! ```text
//! Idle ─start─▶ CameraStarting ─ok─▶ CameraActive ─analyze─▶ Analyzing ─▶ Complete
//!  ▲                 │ err               ▲   (poll presence)                 │
//!  └─────────────────┘                   └──────────────reset────────────────┘
//!  stop from any state returns to Idle and releases the camera
//! ```

use crate::activity::SharedActivityLog;
use crate::capture::{Camera, CaptureError, CaptureSession};
use crate::config::Config;
use crate::core::engine::{AnalysisError, AnalysisResult, MockEngine};
use crate::core::presence::{source_from_config, PresenceSource};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use std::time::Duration;

/// Workflow state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanState {
    Idle,
    CameraStarting,
    CameraActive,
    Analyzing,
    Complete,
}

/// Anything that can interrupt a scan. All are recoverable by retrying.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanError {
    Capture(CaptureError),
    Analysis(AnalysisError),
    /// The action is not allowed in the current state
    InvalidState {
        action: &'static str,
        state: ScanState,
    },
}

impl ScanError {
    /// Banner text shown to the user.
    pub fn user_message(&self) -> String {
        match self {
            ScanError::Capture(e) => e.user_message(),
            ScanError::Analysis(e) => e.user_message(),
            ScanError::InvalidState { .. } => {
                "Aktifkan kamera terlebih dahulu sebelum memulai analisis.".to_string()
            }
        }
    }
}

impl std::fmt::Display for ScanError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScanError::Capture(e) => write!(f, "Capture error: {e}"),
            ScanError::Analysis(e) => write!(f, "Analysis error: {e}"),
            ScanError::InvalidState { action, state } => {
                write!(f, "Cannot {action} while {state:?}")
            }
        }
    }
}

impl std::error::Error for ScanError {}

impl From<CaptureError> for ScanError {
    fn from(e: CaptureError) -> Self {
        ScanError::Capture(e)
    }
}

impl From<AnalysisError> for ScanError {
    fn from(e: AnalysisError) -> Self {
        ScanError::Analysis(e)
    }
}

/// Cosmetic progress counter: 0 to 100 in random steps.
pub struct ProgressTicker<R: Rng = StdRng> {
    rng: R,
    progress: f64,
    max_step: f64,
}

impl ProgressTicker<StdRng> {
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }
}

impl Default for ProgressTicker<StdRng> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Rng> ProgressTicker<R> {
    pub fn with_rng(rng: R) -> Self {
        Self {
            rng,
            progress: 0.0,
            max_step: 15.0,
        }
    }

    /// Advance by a uniform step in [0, 15), capped at 100.
    pub fn advance(&mut self) -> f64 {
        let step = self.rng.gen::<f64>() * self.max_step;
        self.progress = (self.progress + step).min(100.0);
        self.progress
    }

    pub fn progress(&self) -> f64 {
        self.progress
    }

    pub fn is_complete(&self) -> bool {
        self.progress >= 100.0
    }
}

/// One page instance's scan workflow.
///
/// Owns the capture session; dropping the workflow releases the camera.
pub struct ScanWorkflow {
    state: ScanState,
    session: CaptureSession,
    presence: Box<dyn PresenceSource>,
    engine: MockEngine,
    last_presence: bool,
    result: Option<AnalysisResult>,
    progress_tick: Duration,
    activity: Option<SharedActivityLog>,
}

impl ScanWorkflow {
    pub fn new(
        session: CaptureSession,
        presence: Box<dyn PresenceSource>,
        engine: MockEngine,
    ) -> Self {
        Self {
            state: ScanState::Idle,
            session,
            presence,
            engine,
            last_presence: false,
            result: None,
            progress_tick: Duration::ZERO,
            activity: None,
        }
    }

    /// Wire a workflow from configuration around the given camera.
    pub fn from_config(config: &Config, camera: Box<dyn Camera>) -> Self {
        let session = CaptureSession::new(camera, config.capture.clone());
        let engine = MockEngine::new(config.engine.clone(), config.recommendations.clone());
        Self::new(session, source_from_config(&config.detector), engine)
            .with_progress_tick(config.progress_tick)
    }

    /// Delay between progress ticks while analyzing.
    pub fn with_progress_tick(mut self, tick: Duration) -> Self {
        self.progress_tick = tick;
        self
    }

    pub fn with_activity_log(mut self, log: SharedActivityLog) -> Self {
        self.activity = Some(log);
        self
    }

    pub fn state(&self) -> ScanState {
        self.state
    }

    pub fn last_presence(&self) -> bool {
        self.last_presence
    }

    pub fn result(&self) -> Option<&AnalysisResult> {
        self.result.as_ref()
    }

    pub fn is_camera_active(&self) -> bool {
        self.session.is_active()
    }

    /// Acquire the camera. On failure the workflow returns to `Idle`.
    pub fn start_camera(&mut self) -> Result<(), ScanError> {
        if self.state == ScanState::Analyzing {
            return Err(ScanError::InvalidState {
                action: "start the camera",
                state: self.state,
            });
        }

        self.state = ScanState::CameraStarting;
        self.last_presence = false;
        self.result = None;

        match self.session.start() {
            Ok(()) => {
                self.state = ScanState::CameraActive;
                Ok(())
            }
            Err(e) => {
                tracing::warn!("camera start failed: {}", e);
                self.state = ScanState::Idle;
                Err(e.into())
            }
        }
    }

    /// Sample presence from the current frame.
    pub fn poll_presence(&mut self) -> Result<bool, ScanError> {
        if !matches!(self.state, ScanState::CameraActive | ScanState::Complete) {
            return Err(ScanError::InvalidState {
                action: "detect presence",
                state: self.state,
            });
        }

        let frame = self.session.frame()?;
        let detected = self.presence.sample(&frame);
        self.last_presence = detected;

        if let Some(ref log) = self.activity {
            log.record_frame_sampled(detected);
        }
        tracing::debug!(detected, "presence polled");
        Ok(detected)
    }

    /// Analyze the subject, reporting cosmetic progress along the way.
    ///
    /// Requires the last presence poll to have been positive.
    pub fn analyze<F>(&mut self, mut on_progress: F) -> Result<&AnalysisResult, ScanError>
    where
        F: FnMut(f64),
    {
        if !matches!(self.state, ScanState::CameraActive | ScanState::Complete) {
            return Err(ScanError::InvalidState {
                action: "analyze",
                state: self.state,
            });
        }

        if !self.last_presence {
            if let Some(ref log) = self.activity {
                log.record_analysis_rejected();
            }
            return Err(AnalysisError::NoSubjectDetected.into());
        }

        self.state = ScanState::Analyzing;
        let mut ticker = ProgressTicker::new();
        while !ticker.is_complete() {
            on_progress(ticker.advance());
            if !self.progress_tick.is_zero() {
                std::thread::sleep(self.progress_tick);
            }
        }

        let result = self.engine.analyze(self.last_presence)?;
        tracing::info!(
            stress_level = result.stress_level,
            tier = %result.tier(),
            "scan complete"
        );
        if let Some(ref log) = self.activity {
            log.record_analysis_completed();
        }

        self.state = ScanState::Complete;
        Ok(&*self.result.insert(result))
    }

    /// Discard the result and go back to watching the camera.
    pub fn reset(&mut self) -> Result<(), ScanError> {
        if self.state != ScanState::Complete {
            return Err(ScanError::InvalidState {
                action: "reset",
                state: self.state,
            });
        }
        self.result = None;
        self.state = ScanState::CameraActive;
        Ok(())
    }

    /// Stop from any state and release the camera.
    pub fn stop(&mut self) {
        self.session.stop();
        self.state = ScanState::Idle;
        self.last_presence = false;
        self.result = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activity::create_shared_log;
    use crate::capture::{CaptureConstraints, DeviceBehavior, Frame, FramePattern, SyntheticCamera};
    use crate::config::EngineConfig;
    use crate::core::presence::{PresenceDetector, PresencePolicy};
    use crate::core::recommendations::RecommendationTable;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Replays a fixed sequence of presence signals.
    struct Scripted(VecDeque<bool>);

    impl PresenceSource for Scripted {
        fn sample(&mut self, _frame: &Frame) -> bool {
            self.0.pop_front().unwrap_or(false)
        }
    }

    fn workflow_with(
        camera: SyntheticCamera,
        presence: Box<dyn PresenceSource>,
    ) -> (ScanWorkflow, Arc<AtomicUsize>) {
        let streams = camera.stream_counter();
        let session = CaptureSession::new(Box::new(camera), CaptureConstraints::default());
        let engine = MockEngine::seeded(EngineConfig::default(), RecommendationTable::default(), 4);
        (ScanWorkflow::new(session, presence, engine), streams)
    }

    fn gray_workflow() -> (ScanWorkflow, Arc<AtomicUsize>) {
        workflow_with(
            SyntheticCamera::new(FramePattern::Gray),
            Box::new(PresenceDetector::new(PresencePolicy::brightness_band(), 16)),
        )
    }

    #[test]
    fn test_full_scan() {
        let (mut workflow, streams) = gray_workflow();
        assert_eq!(workflow.state(), ScanState::Idle);

        workflow.start_camera().unwrap();
        assert_eq!(workflow.state(), ScanState::CameraActive);
        assert_eq!(streams.load(Ordering::SeqCst), 1);

        assert!(workflow.poll_presence().unwrap());

        let mut ticks = Vec::new();
        let result = workflow.analyze(|p| ticks.push(p)).unwrap().clone();
        assert_eq!(workflow.state(), ScanState::Complete);
        assert_eq!(workflow.result(), Some(&result));
        assert_eq!(ticks.last().copied(), Some(100.0));
        assert!(ticks.windows(2).all(|w| w[0] <= w[1]));

        workflow.reset().unwrap();
        assert_eq!(workflow.state(), ScanState::CameraActive);
        assert!(workflow.result().is_none());
    }

    #[test]
    fn test_analysis_requires_presence() {
        let (mut workflow, _) = workflow_with(
            SyntheticCamera::new(FramePattern::Black),
            Box::new(PresenceDetector::new(PresencePolicy::brightness_band(), 16)),
        );
        let log = create_shared_log();
        workflow = workflow.with_activity_log(log.clone());

        workflow.start_camera().unwrap();
        assert!(!workflow.poll_presence().unwrap());

        let err = workflow.analyze(|_| {}).unwrap_err();
        assert_eq!(err, ScanError::Analysis(AnalysisError::NoSubjectDetected));
        assert_eq!(workflow.state(), ScanState::CameraActive);
        assert!(workflow.result().is_none());
        assert_eq!(log.stats().analyses_rejected, 1);
    }

    #[test]
    fn test_analysis_without_poll_is_rejected() {
        let (mut workflow, _) = gray_workflow();
        workflow.start_camera().unwrap();
        assert!(matches!(
            workflow.analyze(|_| {}),
            Err(ScanError::Analysis(AnalysisError::NoSubjectDetected))
        ));
    }

    #[test]
    fn test_analyze_again_after_complete() {
        let (mut workflow, _) = workflow_with(
            SyntheticCamera::new(FramePattern::Gray),
            Box::new(Scripted(VecDeque::from([true]))),
        );
        workflow.start_camera().unwrap();
        workflow.poll_presence().unwrap();

        let first = workflow.analyze(|_| {}).unwrap().id;
        let second = workflow.analyze(|_| {}).unwrap().id;
        assert_ne!(first, second);
        assert_eq!(workflow.state(), ScanState::Complete);
    }

    #[test]
    fn test_permission_denied_returns_to_idle() {
        let camera =
            SyntheticCamera::new(FramePattern::Gray).with_behavior(DeviceBehavior::DenyPermission);
        let (mut workflow, streams) = workflow_with(camera, Box::new(Scripted(VecDeque::new())));

        let err = workflow.start_camera().unwrap_err();
        assert_eq!(err, ScanError::Capture(CaptureError::PermissionDenied));
        assert!(err.user_message().contains("izin kamera"));
        assert_eq!(workflow.state(), ScanState::Idle);
        assert_eq!(streams.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_restart_holds_single_stream() {
        let (mut workflow, streams) = gray_workflow();
        workflow.start_camera().unwrap();
        workflow.start_camera().unwrap();
        assert_eq!(streams.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_stop_from_any_state_releases_camera() {
        let (mut workflow, streams) = gray_workflow();
        workflow.start_camera().unwrap();
        workflow.poll_presence().unwrap();
        workflow.analyze(|_| {}).unwrap();

        workflow.stop();
        assert_eq!(workflow.state(), ScanState::Idle);
        assert!(!workflow.is_camera_active());
        assert!(workflow.result().is_none());
        assert_eq!(streams.load(Ordering::SeqCst), 0);

        // Stopping twice is harmless
        workflow.stop();
        assert_eq!(streams.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_drop_releases_camera() {
        let (mut workflow, streams) = gray_workflow();
        workflow.start_camera().unwrap();
        drop(workflow);
        assert_eq!(streams.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_actions_rejected_while_idle() {
        let (mut workflow, _) = gray_workflow();
        assert!(matches!(
            workflow.poll_presence(),
            Err(ScanError::InvalidState { .. })
        ));
        assert!(matches!(
            workflow.analyze(|_| {}),
            Err(ScanError::InvalidState { .. })
        ));
        assert!(matches!(workflow.reset(), Err(ScanError::InvalidState { .. })));
    }

    #[test]
    fn test_progress_ticker_reaches_100() {
        let mut ticker = ProgressTicker::with_rng(StdRng::seed_from_u64(8));
        let mut steps = 0;
        while !ticker.is_complete() {
            let before = ticker.progress();
            let after = ticker.advance();
            assert!(after >= before && after - before < 15.0);
            steps += 1;
            assert!(steps < 10_000);
        }
        assert_eq!(ticker.progress(), 100.0);
    }
}
