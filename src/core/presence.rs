//! Heuristic presence detection over RGBA frames.
//!
//! This is not face detection. Both policies answer "is something that might
//! be a person in front of the camera": a brightness band fires on any
//! moderately lit scene, and the skin-tone ratio fires on enough warm pixels.

use crate::capture::Frame;
use crate::config::DetectorConfig;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

/// Heuristic used to decide presence.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PresencePolicy {
    /// Mean luminance strictly inside `(lower, upper)` on a 0-255 scale
    BrightnessBand { lower: f64, upper: f64 },
    /// Share of skin-like sampled pixels above `min_ratio`
    SkinTone { min_ratio: f64 },
}

impl Default for PresencePolicy {
    fn default() -> Self {
        Self::brightness_band()
    }
}

impl PresencePolicy {
    /// Brightness band with the empirical (50, 200) defaults.
    pub fn brightness_band() -> Self {
        PresencePolicy::BrightnessBand {
            lower: 50.0,
            upper: 200.0,
        }
    }

    /// Skin-tone ratio with the 2% default.
    pub fn skin_tone() -> Self {
        PresencePolicy::SkinTone { min_ratio: 0.02 }
    }

    /// Parse a policy name (`brightness` or `skin`) with default thresholds.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "brightness" | "brightness_band" => Some(Self::brightness_band()),
            "skin" | "skin_tone" => Some(Self::skin_tone()),
            _ => None,
        }
    }
}

/// Anything that can turn the current frame into a presence signal.
///
/// The workflow and the detection loop only see this trait, so a scripted or
/// random source can stand in for the frame heuristic.
pub trait PresenceSource: Send {
    fn sample(&mut self, frame: &Frame) -> bool;
}

/// Pure frame heuristic.
#[derive(Debug, Clone)]
pub struct PresenceDetector {
    policy: PresencePolicy,
    stride: usize,
}

impl PresenceDetector {
    pub fn new(policy: PresencePolicy, stride: usize) -> Self {
        Self {
            policy,
            stride: stride.max(1),
        }
    }

    pub fn from_config(config: &DetectorConfig) -> Self {
        Self::new(config.policy, config.sample_stride)
    }

    pub fn policy(&self) -> PresencePolicy {
        self.policy
    }

    /// Decide presence for one frame. Malformed frames are never "present".
    pub fn detect(&self, frame: &Frame) -> bool {
        match self.policy {
            PresencePolicy::BrightnessBand { lower, upper } => {
                match mean_luminance(frame, self.stride) {
                    Some(mean) => mean > lower && mean < upper,
                    None => false,
                }
            }
            PresencePolicy::SkinTone { min_ratio } => match skin_ratio(frame, self.stride) {
                Some(ratio) => ratio > min_ratio,
                None => false,
            },
        }
    }
}

impl Default for PresenceDetector {
    fn default() -> Self {
        Self::from_config(&DetectorConfig::default())
    }
}

impl PresenceSource for PresenceDetector {
    fn sample(&mut self, frame: &Frame) -> bool {
        self.detect(frame)
    }
}

/// Unweighted mean of R, G and B over every `stride`-th pixel.
///
/// `None` for malformed or empty frames.
pub fn mean_luminance(frame: &Frame, stride: usize) -> Option<f64> {
    if !frame.is_well_formed() {
        return None;
    }

    let mut total = 0.0;
    let mut sampled = 0usize;
    for (r, g, b) in frame.sample_rgb(stride) {
        total += (r as f64 + g as f64 + b as f64) / 3.0;
        sampled += 1;
    }

    if sampled == 0 {
        None
    } else {
        Some(total / sampled as f64)
    }
}

/// Share of skin-like pixels among every `stride`-th pixel.
pub fn skin_ratio(frame: &Frame, stride: usize) -> Option<f64> {
    if !frame.is_well_formed() {
        return None;
    }

    let mut skin = 0usize;
    let mut sampled = 0usize;
    for (r, g, b) in frame.sample_rgb(stride) {
        if is_skin_like(r, g, b) {
            skin += 1;
        }
        sampled += 1;
    }

    if sampled == 0 {
        None
    } else {
        Some(skin as f64 / sampled as f64)
    }
}

/// Classic RGB skin rule.
pub fn is_skin_like(r: u8, g: u8, b: u8) -> bool {
    let (r, g, b) = (r as i32, g as i32, b as i32);
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);

    r > 95 && g > 40 && b > 20 && max - min > 15 && (r - g).abs() > 15 && r > g && r > b
}

/// Random presence draw, used where no camera pixels are available.
pub struct RandomPresence<R: Rng + Send = StdRng> {
    rng: R,
    probability: f64,
}

impl RandomPresence<StdRng> {
    pub fn new(probability: f64) -> Self {
        Self::with_rng(StdRng::from_entropy(), probability)
    }
}

impl<R: Rng + Send> RandomPresence<R> {
    pub fn with_rng(rng: R, probability: f64) -> Self {
        Self {
            rng,
            probability: probability.clamp(0.0, 1.0),
        }
    }

    /// Draw one signal.
    pub fn draw(&mut self) -> bool {
        self.rng.gen::<f64>() < self.probability
    }
}

impl<R: Rng + Send> PresenceSource for RandomPresence<R> {
    fn sample(&mut self, _frame: &Frame) -> bool {
        self.draw()
    }
}

/// Build the presence source the configuration asks for.
pub fn source_from_config(config: &DetectorConfig) -> Box<dyn PresenceSource> {
    if config.use_random_presence {
        tracing::debug!(
            probability = config.random_presence_probability,
            "using random presence source"
        );
        Box::new(RandomPresence::new(config.random_presence_probability))
    } else {
        Box::new(PresenceDetector::from_config(config))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn brightness() -> PresenceDetector {
        PresenceDetector::new(PresencePolicy::brightness_band(), 16)
    }

    fn skin() -> PresenceDetector {
        PresenceDetector::new(PresencePolicy::skin_tone(), 4)
    }

    #[test]
    fn test_black_frame_is_absent() {
        let frame = Frame::solid(64, 48, [0, 0, 0]);
        assert!(!brightness().detect(&frame));
    }

    #[test]
    fn test_mid_gray_frame_is_present() {
        let frame = Frame::solid(64, 48, [128, 128, 128]);
        assert!(brightness().detect(&frame));
    }

    #[test]
    fn test_brightness_band_is_exclusive() {
        let detector = brightness();
        assert!(!detector.detect(&Frame::solid(8, 8, [50, 50, 50])));
        assert!(!detector.detect(&Frame::solid(8, 8, [200, 200, 200])));
        assert!(detector.detect(&Frame::solid(8, 8, [51, 51, 51])));
        assert!(!detector.detect(&Frame::solid(8, 8, [255, 255, 255])));
    }

    #[test]
    fn test_malformed_frames_are_absent() {
        let empty = Frame::new(0, 0, Vec::new());
        let truncated = Frame::new(10, 10, vec![128; 40]);

        for detector in [brightness(), skin()] {
            assert!(!detector.detect(&empty));
            assert!(!detector.detect(&truncated));
        }
        assert_eq!(mean_luminance(&empty, 1), None);
        assert_eq!(skin_ratio(&truncated, 1), None);
    }

    #[test]
    fn test_huge_dimensions_are_absent() {
        let huge = Frame::new(u32::MAX, u32::MAX, Vec::new());

        for detector in [brightness(), skin()] {
            assert!(!detector.detect(&huge));
        }
        assert_eq!(mean_luminance(&huge, 16), None);
        assert_eq!(skin_ratio(&huge, 16), None);
    }

    #[test]
    fn test_skin_rule() {
        assert!(is_skin_like(205, 150, 125));
        // Gray has no channel spread
        assert!(!is_skin_like(128, 128, 128));
        // Too dark
        assert!(!is_skin_like(90, 50, 30));
        // Red and green too close
        assert!(!is_skin_like(150, 140, 60));
        // Blue dominates red
        assert!(!is_skin_like(120, 60, 130));
    }

    #[test]
    fn test_skin_policy() {
        assert!(skin().detect(&Frame::solid(32, 32, [205, 150, 125])));
        assert!(!skin().detect(&Frame::solid(32, 32, [128, 128, 128])));
    }

    #[test]
    fn test_skin_ratio_threshold() {
        // 1 skin pixel out of 100 = 1%, below the 2% threshold
        let mut frame = Frame::solid(10, 10, [0, 0, 0]);
        frame.data[..3].copy_from_slice(&[205, 150, 125]);
        let detector = PresenceDetector::new(PresencePolicy::skin_tone(), 1);
        assert!((skin_ratio(&frame, 1).unwrap() - 0.01).abs() < 1e-9);
        assert!(!detector.detect(&frame));

        // 3 out of 100 crosses it
        for px in 1..3 {
            let offset = px * 4;
            frame.data[offset..offset + 3].copy_from_slice(&[205, 150, 125]);
        }
        assert!(detector.detect(&frame));
    }

    #[test]
    fn test_detection_is_deterministic() {
        let mut frame = Frame::solid(40, 30, [0, 0, 0]);
        for (i, byte) in frame.data.iter_mut().enumerate() {
            if i % 4 != 3 {
                *byte = (i % 251) as u8;
            }
        }

        for detector in [brightness(), skin()] {
            assert_eq!(detector.detect(&frame), detector.detect(&frame));
        }
    }

    #[test]
    fn test_random_presence_extremes() {
        let frame = Frame::solid(2, 2, [0, 0, 0]);
        let mut always = RandomPresence::with_rng(StdRng::seed_from_u64(1), 1.0);
        let mut never = RandomPresence::with_rng(StdRng::seed_from_u64(1), 0.0);
        for _ in 0..50 {
            assert!(always.sample(&frame));
            assert!(!never.sample(&frame));
        }
    }

    #[test]
    fn test_random_presence_rate() {
        let mut source = RandomPresence::with_rng(StdRng::seed_from_u64(42), 0.7);
        let hits = (0..10_000).filter(|_| source.draw()).count();
        assert!((6_500..7_500).contains(&hits), "hits: {hits}");
    }

    #[test]
    fn test_policy_parsing_and_serde() {
        assert_eq!(PresencePolicy::parse("skin"), Some(PresencePolicy::skin_tone()));
        assert_eq!(PresencePolicy::parse("bogus"), None);

        let json = serde_json::to_value(PresencePolicy::brightness_band()).unwrap();
        assert_eq!(json["kind"], "brightness_band");
        assert_eq!(json["lower"], 50.0);
    }

    #[test]
    fn test_source_from_config() {
        let config = DetectorConfig {
            use_random_presence: true,
            random_presence_probability: 1.0,
            ..DetectorConfig::default()
        };
        let mut source = source_from_config(&config);
        // The black frame would fail the heuristic; the random source ignores pixels
        assert!(source.sample(&Frame::solid(4, 4, [0, 0, 0])));
    }
}
