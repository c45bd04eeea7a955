//! Synthetic camera used where no real capture device is available.
//!
//! Frames come from a fixed pattern, and device failures can be simulated so
//! every branch of the scan workflow can be exercised without hardware.

use crate::capture::types::{CaptureConstraints, CaptureError, Frame, BYTES_PER_PIXEL};
use crate::capture::Camera;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// What the synthetic camera "sees".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FramePattern {
    /// Lens covered: every pixel 0,0,0
    Black,
    /// Uniform mid-gray 128,128,128
    Gray,
    /// Warm skin-like tone
    Skin,
    /// Uniform random noise
    Noise,
    /// Any solid colour
    Solid([u8; 3]),
}

impl FramePattern {
    /// Parse a pattern name (`black`, `gray`, `skin`, `noise`, or `r,g,b`).
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "black" => Some(FramePattern::Black),
            "gray" | "grey" => Some(FramePattern::Gray),
            "skin" => Some(FramePattern::Skin),
            "noise" => Some(FramePattern::Noise),
            other => {
                let parts: Vec<u8> = other
                    .split(',')
                    .filter_map(|p| p.trim().parse().ok())
                    .collect();
                match parts.as_slice() {
                    [r, g, b] => Some(FramePattern::Solid([*r, *g, *b])),
                    _ => None,
                }
            }
        }
    }
}

/// How the simulated device responds to `open`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceBehavior {
    Available,
    DenyPermission,
    Missing,
    Busy,
}

impl DeviceBehavior {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "available" | "ok" => Some(DeviceBehavior::Available),
            "deny" => Some(DeviceBehavior::DenyPermission),
            "missing" => Some(DeviceBehavior::Missing),
            "busy" => Some(DeviceBehavior::Busy),
            _ => None,
        }
    }
}

/// A camera that renders frames from a [`FramePattern`].
pub struct SyntheticCamera {
    pattern: FramePattern,
    behavior: DeviceBehavior,
    width: u32,
    height: u32,
    open: bool,
    /// Live streams across every clone of the counter; a leak shows up as > 1
    live_streams: Arc<AtomicUsize>,
    rng: StdRng,
}

impl SyntheticCamera {
    /// Create an available camera rendering `pattern`.
    pub fn new(pattern: FramePattern) -> Self {
        Self {
            pattern,
            behavior: DeviceBehavior::Available,
            width: 0,
            height: 0,
            open: false,
            live_streams: Arc::new(AtomicUsize::new(0)),
            rng: StdRng::from_entropy(),
        }
    }

    /// Simulate a device failure mode.
    pub fn with_behavior(mut self, behavior: DeviceBehavior) -> Self {
        self.behavior = behavior;
        self
    }

    /// Seed the noise pattern.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    /// Shared handle to the live stream counter.
    pub fn stream_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.live_streams)
    }

    /// Number of streams currently held open.
    pub fn live_streams(&self) -> usize {
        self.live_streams.load(Ordering::SeqCst)
    }

    fn render(&mut self) -> Frame {
        match self.pattern {
            FramePattern::Black => Frame::solid(self.width, self.height, [0, 0, 0]),
            FramePattern::Gray => Frame::solid(self.width, self.height, [128, 128, 128]),
            FramePattern::Skin => Frame::solid(self.width, self.height, [205, 150, 125]),
            FramePattern::Solid(rgb) => Frame::solid(self.width, self.height, rgb),
            FramePattern::Noise => {
                let pixels = self.width as usize * self.height as usize;
                let mut data = vec![0u8; pixels * BYTES_PER_PIXEL];
                self.rng.fill(&mut data[..]);
                for px in data.chunks_exact_mut(BYTES_PER_PIXEL) {
                    px[3] = 255;
                }
                Frame::new(self.width, self.height, data)
            }
        }
    }
}

impl Camera for SyntheticCamera {
    fn open(&mut self, constraints: &CaptureConstraints) -> Result<(), CaptureError> {
        match self.behavior {
            DeviceBehavior::Available => {}
            DeviceBehavior::DenyPermission => return Err(CaptureError::PermissionDenied),
            DeviceBehavior::Missing => return Err(CaptureError::DeviceNotFound),
            DeviceBehavior::Busy => return Err(CaptureError::DeviceBusy),
        }
        if !constraints.is_satisfiable() {
            return Err(CaptureError::UnsupportedConstraints);
        }

        // Reopening without a close acquires a second stream, just like a real device
        self.live_streams.fetch_add(1, Ordering::SeqCst);
        self.open = true;
        self.width = constraints.ideal_width;
        self.height = constraints.ideal_height;
        tracing::debug!(
            width = self.width,
            height = self.height,
            "synthetic camera opened"
        );
        Ok(())
    }

    fn read_frame(&mut self) -> Result<Frame, CaptureError> {
        if !self.open {
            return Err(CaptureError::NotStarted);
        }
        Ok(self.render())
    }

    fn close(&mut self) {
        if self.open {
            self.open = false;
            self.live_streams.fetch_sub(1, Ordering::SeqCst);
            tracing::debug!("synthetic camera closed");
        }
    }

    fn is_open(&self) -> bool {
        self.open
    }
}
