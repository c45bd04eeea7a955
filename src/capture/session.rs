//! Exclusive ownership of one camera stream.

use crate::capture::types::{CaptureConstraints, CaptureError, Frame};
use crate::capture::Camera;

/// Owns a camera and guarantees at most one open stream.
///
/// Starting again releases the current stream before requesting a new one,
/// and dropping the session always releases it.
pub struct CaptureSession {
    camera: Box<dyn Camera>,
    constraints: CaptureConstraints,
}

impl CaptureSession {
    pub fn new(camera: Box<dyn Camera>, constraints: CaptureConstraints) -> Self {
        Self {
            camera,
            constraints,
        }
    }

    /// Acquire the stream, releasing any stream this session already holds.
    pub fn start(&mut self) -> Result<(), CaptureError> {
        if self.camera.is_open() {
            tracing::debug!("releasing previous stream before reacquiring");
            self.camera.close();
        }
        self.camera.open(&self.constraints)?;
        tracing::info!("camera stream started");
        Ok(())
    }

    /// Release the stream. Safe to call when nothing is open.
    pub fn stop(&mut self) {
        if self.camera.is_open() {
            self.camera.close();
            tracing::info!("camera stream stopped");
        }
    }

    pub fn is_active(&self) -> bool {
        self.camera.is_open()
    }

    /// Read the current frame.
    pub fn frame(&mut self) -> Result<Frame, CaptureError> {
        self.camera.read_frame()
    }

    pub fn constraints(&self) -> &CaptureConstraints {
        &self.constraints
    }
}

impl Drop for CaptureSession {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::synthetic::{FramePattern, SyntheticCamera};
    use std::sync::atomic::Ordering;

    #[test]
    fn test_double_start_holds_one_stream() {
        let camera = SyntheticCamera::new(FramePattern::Gray);
        let streams = camera.stream_counter();
        let mut session = CaptureSession::new(Box::new(camera), CaptureConstraints::default());

        session.start().unwrap();
        session.start().unwrap();
        assert_eq!(streams.load(Ordering::SeqCst), 1);
        assert!(session.is_active());
    }

    #[test]
    fn test_drop_releases_stream() {
        let camera = SyntheticCamera::new(FramePattern::Gray);
        let streams = camera.stream_counter();
        {
            let mut session =
                CaptureSession::new(Box::new(camera), CaptureConstraints::default());
            session.start().unwrap();
            assert_eq!(streams.load(Ordering::SeqCst), 1);
        }
        assert_eq!(streams.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_frame_after_stop_fails() {
        let camera = SyntheticCamera::new(FramePattern::Gray);
        let mut session = CaptureSession::new(Box::new(camera), CaptureConstraints::default());
        session.start().unwrap();
        assert!(session.frame().is_ok());

        session.stop();
        assert_eq!(session.frame().unwrap_err(), CaptureError::NotStarted);
    }
}
