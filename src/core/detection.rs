//! Background presence polling.
//!
//! The loop owns the capture session on a worker thread and publishes one
//! [`PresenceEvent`] per tick. The liveness flag is checked every tick, so a
//! stopped or dropped loop never keeps sampling a camera nobody watches.

use crate::activity::SharedActivityLog;
use crate::capture::{CaptureError, CaptureSession};
use crate::core::presence::PresenceSource;
use chrono::{DateTime, Utc};
use crossbeam_channel::{bounded, Receiver, TrySendError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Events buffered before the loop starts dropping them.
const EVENT_CAPACITY: usize = 64;

/// Longest single sleep between liveness checks.
const SLEEP_SLICE: Duration = Duration::from_millis(25);

/// Shortest poll interval; shorter requests are raised to this.
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// One presence sample.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresenceEvent {
    pub detected: bool,
    pub at: DateTime<Utc>,
}

/// Handle to a running detection thread.
pub struct DetectionLoop {
    running: Arc<AtomicBool>,
    interval: Duration,
    receiver: Receiver<PresenceEvent>,
    handle: Option<JoinHandle<CaptureSession>>,
}

impl DetectionLoop {
    /// Start the camera and begin polling every `interval`.
    ///
    /// The session is started here so device errors surface to the caller.
    pub fn spawn(
        session: CaptureSession,
        source: Box<dyn PresenceSource>,
        interval: Duration,
    ) -> Result<Self, CaptureError> {
        Self::spawn_with_log(session, source, interval, None)
    }

    /// Same as [`DetectionLoop::spawn`], recording samples in an activity log.
    pub fn spawn_with_log(
        mut session: CaptureSession,
        mut source: Box<dyn PresenceSource>,
        interval: Duration,
        activity: Option<SharedActivityLog>,
    ) -> Result<Self, CaptureError> {
        session.start()?;
        let interval = interval.max(MIN_POLL_INTERVAL);

        let (sender, receiver) = bounded(EVENT_CAPACITY);
        let running = Arc::new(AtomicBool::new(true));
        let flag = running.clone();

        let handle = thread::spawn(move || {
            while flag.load(Ordering::SeqCst) {
                let detected = match session.frame() {
                    Ok(frame) => source.sample(&frame),
                    Err(e) => {
                        tracing::warn!("frame read failed: {}", e);
                        false
                    }
                };

                if let Some(ref log) = activity {
                    log.record_frame_sampled(detected);
                }

                let event = PresenceEvent {
                    detected,
                    at: Utc::now(),
                };
                match sender.try_send(event) {
                    Ok(()) => {}
                    Err(TrySendError::Full(_)) => {
                        tracing::debug!("presence event dropped, receiver is behind");
                    }
                    Err(TrySendError::Disconnected(_)) => break,
                }

                sleep_while_running(&flag, interval);
            }

            session.stop();
            session
        });

        tracing::info!(interval_ms = interval.as_millis() as u64, "detection loop started");

        Ok(Self {
            running,
            interval,
            receiver,
            handle: Some(handle),
        })
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Effective poll interval.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn receiver(&self) -> &Receiver<PresenceEvent> {
        &self.receiver
    }

    /// Try to receive an event without blocking.
    pub fn try_recv(&self) -> Option<PresenceEvent> {
        self.receiver.try_recv().ok()
    }

    /// Stop polling and take the (stopped) session back.
    ///
    /// Returns `None` if the loop was already stopped or the worker panicked.
    pub fn stop(&mut self) -> Option<CaptureSession> {
        self.running.store(false, Ordering::SeqCst);
        let handle = self.handle.take()?;
        match handle.join() {
            Ok(session) => {
                tracing::info!("detection loop stopped");
                Some(session)
            }
            Err(_) => {
                tracing::warn!("detection thread panicked");
                None
            }
        }
    }
}

impl Drop for DetectionLoop {
    fn drop(&mut self) {
        self.stop();
    }
}

fn sleep_while_running(flag: &AtomicBool, interval: Duration) {
    let mut remaining = interval;
    while !remaining.is_zero() && flag.load(Ordering::SeqCst) {
        let slice = remaining.min(SLEEP_SLICE);
        thread::sleep(slice);
        remaining -= slice;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activity::create_shared_log;
    use crate::capture::{CaptureConstraints, DeviceBehavior, FramePattern, SyntheticCamera};
    use crate::core::presence::{PresenceDetector, PresencePolicy};
    use std::sync::atomic::AtomicUsize;

    fn session_for(camera: SyntheticCamera) -> (CaptureSession, Arc<AtomicUsize>) {
        let streams = camera.stream_counter();
        (
            CaptureSession::new(Box::new(camera), CaptureConstraints::default()),
            streams,
        )
    }

    fn detector() -> Box<dyn PresenceSource> {
        Box::new(PresenceDetector::new(PresencePolicy::brightness_band(), 16))
    }

    #[test]
    fn test_loop_publishes_events() {
        let (session, streams) = session_for(SyntheticCamera::new(FramePattern::Gray));
        let mut detection =
            DetectionLoop::spawn(session, detector(), Duration::from_millis(5)).unwrap();
        assert!(detection.is_running());
        assert_eq!(streams.load(Ordering::SeqCst), 1);

        let event = detection
            .receiver()
            .recv_timeout(Duration::from_secs(2))
            .unwrap();
        assert!(event.detected);

        let session = detection.stop().unwrap();
        assert!(!session.is_active());
        assert_eq!(streams.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_zero_interval_is_raised() {
        let (session, _) = session_for(SyntheticCamera::new(FramePattern::Gray));
        let mut detection = DetectionLoop::spawn(session, detector(), Duration::ZERO).unwrap();
        assert_eq!(detection.interval(), MIN_POLL_INTERVAL);

        let event = detection
            .receiver()
            .recv_timeout(Duration::from_secs(2))
            .unwrap();
        assert!(event.detected);
        assert!(detection.stop().is_some());
    }

    #[test]
    fn test_black_frames_report_absent() {
        let (session, _) = session_for(SyntheticCamera::new(FramePattern::Black));
        let detection =
            DetectionLoop::spawn(session, detector(), Duration::from_millis(5)).unwrap();
        let event = detection
            .receiver()
            .recv_timeout(Duration::from_secs(2))
            .unwrap();
        assert!(!event.detected);
    }

    #[test]
    fn test_drop_stops_and_releases() {
        let (session, streams) = session_for(SyntheticCamera::new(FramePattern::Gray));
        let detection =
            DetectionLoop::spawn(session, detector(), Duration::from_secs(60)).unwrap();
        drop(detection);
        assert_eq!(streams.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_stop_twice() {
        let (session, _) = session_for(SyntheticCamera::new(FramePattern::Gray));
        let mut detection =
            DetectionLoop::spawn(session, detector(), Duration::from_millis(5)).unwrap();
        assert!(detection.stop().is_some());
        assert!(detection.stop().is_none());
        assert!(!detection.is_running());
    }

    #[test]
    fn test_device_error_surfaces_on_spawn() {
        let camera = SyntheticCamera::new(FramePattern::Gray).with_behavior(DeviceBehavior::Busy);
        let (session, streams) = session_for(camera);
        let result = DetectionLoop::spawn(session, detector(), Duration::from_millis(5));
        assert_eq!(result.err(), Some(CaptureError::DeviceBusy));
        assert_eq!(streams.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_samples_are_logged() {
        let log = create_shared_log();
        let (session, _) = session_for(SyntheticCamera::new(FramePattern::Gray));
        let mut detection = DetectionLoop::spawn_with_log(
            session,
            detector(),
            Duration::from_millis(5),
            Some(log.clone()),
        )
        .unwrap();
        detection
            .receiver()
            .recv_timeout(Duration::from_secs(2))
            .unwrap();
        detection.stop();

        let stats = log.stats();
        assert!(stats.frames_sampled >= 1);
        assert_eq!(stats.frames_sampled, stats.presence_hits);
    }
}
