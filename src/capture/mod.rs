//! Frame capture for the EmoCollab agent.
//!
//! This module defines the camera seam used by the scan workflow, a synthetic
//! camera for environments without capture hardware, and the session type
//! that owns a stream for its whole lifetime.

pub mod session;
pub mod synthetic;
pub mod types;

// Re-export commonly used types
pub use session::CaptureSession;
pub use synthetic::{DeviceBehavior, FramePattern, SyntheticCamera};
pub use types::{CaptureConstraints, CaptureError, FacingMode, Frame, DEFAULT_JPEG_QUALITY};

/// A video capture device.
pub trait Camera: Send {
    /// Acquire a stream with the given constraints.
    fn open(&mut self, constraints: &CaptureConstraints) -> Result<(), CaptureError>;

    /// Read the current frame from an open stream.
    fn read_frame(&mut self) -> Result<Frame, CaptureError>;

    /// Release the stream. Must be a no-op when nothing is open.
    fn close(&mut self);

    fn is_open(&self) -> bool;
}
