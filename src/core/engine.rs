//! Mock stress and emotion engine.
//!
//! There is no vision model behind this. A latent "base stress" value is drawn
//! and every emotion score is biased from it, so the bundle is random but
//! internally consistent: stressed subjects look angry, fearful and sad, and
//! their stress level is derived from those same scores.

use crate::config::EngineConfig;
use crate::core::recommendations::{RecommendationTable, StressTier};
use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Seven independent emotion intensities. They do not sum to one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct EmotionScores {
    pub happy: f64,
    pub sad: f64,
    pub angry: f64,
    pub fearful: f64,
    pub disgusted: f64,
    pub surprised: f64,
    pub neutral: f64,
}

impl EmotionScores {
    /// Sum of the stress-linked emotions.
    pub fn stress_indicators(&self) -> f64 {
        self.angry + self.fearful + self.sad
    }

    /// Sum of the calm emotions.
    pub fn positive_indicators(&self) -> f64 {
        self.happy + self.neutral
    }

    pub fn as_pairs(&self) -> [(&'static str, f64); 7] {
        [
            ("happy", self.happy),
            ("sad", self.sad),
            ("angry", self.angry),
            ("fearful", self.fearful),
            ("disgusted", self.disgusted),
            ("surprised", self.surprised),
            ("neutral", self.neutral),
        ]
    }

    /// Strongest emotion. Ties go to the first in declaration order.
    pub fn dominant(&self) -> (&'static str, f64) {
        self.as_pairs()
            .into_iter()
            .fold(("happy", f64::MIN), |best, (name, score)| {
                if score > best.1 {
                    (name, score)
                } else {
                    best
                }
            })
    }
}

/// The bundle produced at the end of a scan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub id: Uuid,
    pub emotions: EmotionScores,
    /// 0-100
    pub stress_level: u8,
    /// 0-1
    pub confidence: f64,
    pub timestamp: DateTime<Utc>,
    pub recommendations: Vec<String>,
}

impl AnalysisResult {
    pub fn tier(&self) -> StressTier {
        StressTier::from_level(self.stress_level)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
}

/// Payload of the mock face-analysis endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FaceAnalysis {
    pub emotions: EmotionScores,
    pub confidence: f64,
    pub age: u8,
    pub gender: Gender,
    pub face_detected: bool,
}

/// Analysis failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnalysisError {
    /// Analysis was requested without a positive presence signal
    NoSubjectDetected,
}

impl AnalysisError {
    /// Banner text shown to the user.
    pub fn user_message(&self) -> String {
        match self {
            AnalysisError::NoSubjectDetected => {
                "Wajah tidak terdeteksi. Pastikan wajah Anda terlihat jelas di kamera.".to_string()
            }
        }
    }
}

impl std::fmt::Display for AnalysisError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AnalysisError::NoSubjectDetected => write!(f, "No subject detected"),
        }
    }
}

impl std::error::Error for AnalysisError {}

/// Produces analysis results from an injected random source.
pub struct MockEngine<R: Rng = StdRng> {
    rng: R,
    config: EngineConfig,
    recommendations: RecommendationTable,
}

impl MockEngine<StdRng> {
    /// Engine seeded from OS entropy.
    pub fn new(config: EngineConfig, recommendations: RecommendationTable) -> Self {
        Self::with_rng(StdRng::from_entropy(), config, recommendations)
    }

    /// Reproducible engine.
    pub fn seeded(config: EngineConfig, recommendations: RecommendationTable, seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed), config, recommendations)
    }
}

impl Default for MockEngine<StdRng> {
    fn default() -> Self {
        Self::new(EngineConfig::default(), RecommendationTable::default())
    }
}

impl<R: Rng> MockEngine<R> {
    pub fn with_rng(rng: R, config: EngineConfig, recommendations: RecommendationTable) -> Self {
        Self {
            rng,
            config,
            recommendations,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn recommendations(&self) -> &RecommendationTable {
        &self.recommendations
    }

    /// Run one analysis. Fails without a positive presence signal.
    pub fn analyze(&mut self, presence: bool) -> Result<AnalysisResult, AnalysisError> {
        if !presence {
            tracing::debug!("analysis rejected: no subject");
            return Err(AnalysisError::NoSubjectDetected);
        }
        let base_stress = self.uniform();
        Ok(self.analyze_with_base_stress(base_stress))
    }

    /// Run one analysis from a given latent stress value in [0, 1].
    pub fn analyze_with_base_stress(&mut self, base_stress: f64) -> AnalysisResult {
        let emotions = self.sample_emotions(base_stress);
        let confidence = self.draw_confidence();
        let result = self.result_from_emotions(emotions, confidence);
        tracing::debug!(
            base_stress,
            stress_level = result.stress_level,
            confidence = result.confidence,
            "analysis complete"
        );
        result
    }

    /// Build a result around scores that came from elsewhere (e.g. a remote API).
    pub fn result_from_emotions(
        &mut self,
        emotions: EmotionScores,
        confidence: f64,
    ) -> AnalysisResult {
        let stress_level = self.stress_level(&emotions);
        AnalysisResult {
            id: Uuid::new_v4(),
            emotions,
            stress_level,
            confidence: confidence.clamp(0.0, 1.0),
            timestamp: Utc::now(),
            recommendations: self.recommendations.select(stress_level).to_vec(),
        }
    }

    /// Emotion scores biased by `base_stress`, each floored at zero.
    pub fn sample_emotions(&mut self, base_stress: f64) -> EmotionScores {
        let b = base_stress.clamp(0.0, 1.0);
        let happy = 0.3 - b * 0.4 + self.uniform() * 0.2;
        let sad = b * 0.3 + self.uniform() * 0.2;
        let angry = b * 0.4 + self.uniform() * 0.2;
        let fearful = b * 0.5 + self.uniform() * 0.2;
        let disgusted = self.uniform() * 0.1;
        let surprised = self.uniform() * 0.2;
        let neutral = 0.4 - b * 0.2 + self.uniform() * 0.3;

        EmotionScores {
            happy: happy.max(0.0),
            sad: sad.max(0.0),
            angry: angry.max(0.0),
            fearful: fearful.max(0.0),
            disgusted: disgusted.max(0.0),
            surprised: surprised.max(0.0),
            neutral: neutral.max(0.0),
        }
    }

    /// Stress from the ratio of stress-linked to calm emotions, plus noise.
    pub fn stress_level(&mut self, emotions: &EmotionScores) -> u8 {
        let stress = emotions.stress_indicators().max(0.0);
        let calm = emotions.positive_indicators().max(0.0);
        let raw = (stress * 100.0) / (stress + calm + 0.1);
        let noise = (self.uniform() - 0.5) * 2.0 * self.config.stress_noise;

        let (floor, ceiling) = self.config.stress_bounds();
        (raw + noise).clamp(floor, ceiling).round() as u8
    }

    /// Confidence drawn inside the configured bounds.
    pub fn draw_confidence(&mut self) -> f64 {
        let (lo, hi) = self.config.confidence_bounds();
        lo + self.uniform() * (hi - lo)
    }

    /// Endpoint payload. Without a face the scores and confidence are zero.
    pub fn face_analysis(&mut self, face_detected: bool) -> FaceAnalysis {
        let age = 25 + self.rng.gen_range(0..20u8);
        let gender = if self.uniform() > 0.5 {
            Gender::Male
        } else {
            Gender::Female
        };

        let (emotions, confidence) = if face_detected {
            let base_stress = self.uniform();
            (self.sample_emotions(base_stress), self.draw_confidence())
        } else {
            (EmotionScores::default(), 0.0)
        };

        FaceAnalysis {
            emotions,
            confidence,
            age,
            gender,
            face_detected,
        }
    }

    fn uniform(&mut self) -> f64 {
        self.rng.gen::<f64>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::mock::StepRng;

    /// Every uniform draw lands on 0.5, so noise terms cancel.
    fn midpoint_engine() -> MockEngine<StepRng> {
        MockEngine::with_rng(
            StepRng::new(1 << 63, 0),
            EngineConfig::default(),
            RecommendationTable::default(),
        )
    }

    #[test]
    fn test_no_presence_always_fails() {
        let mut engine =
            MockEngine::seeded(EngineConfig::default(), RecommendationTable::default(), 3);
        for _ in 0..100 {
            assert_eq!(engine.analyze(false), Err(AnalysisError::NoSubjectDetected));
        }
    }

    #[test]
    fn test_result_bounds() {
        let mut engine =
            MockEngine::seeded(EngineConfig::default(), RecommendationTable::default(), 11);
        for _ in 0..2_000 {
            let result = engine.analyze(true).unwrap();
            assert!(result.stress_level <= 100);
            assert!((0.0..=1.0).contains(&result.confidence));
            for (name, score) in result.emotions.as_pairs() {
                assert!(score >= 0.0, "{name} = {score}");
            }
            assert_eq!(result.recommendations.len(), 4);
        }
    }

    #[test]
    fn test_stress_clamped_to_configured_band() {
        let mut engine =
            MockEngine::seeded(EngineConfig::default(), RecommendationTable::default(), 5);
        for _ in 0..2_000 {
            let level = engine.analyze(true).unwrap().stress_level;
            assert!((20..=90).contains(&level), "level {level}");
        }
    }

    #[test]
    fn test_high_base_stress_scenario() {
        let mut engine = midpoint_engine();
        let result = engine.analyze_with_base_stress(0.9);

        let e = result.emotions;
        assert!(e.angry > e.happy);
        assert!(e.fearful > e.neutral);
        assert!(e.sad > e.happy);
        assert_eq!(result.stress_level, 73);
        assert_eq!(result.tier(), StressTier::High);
        assert_eq!(result.recommendations.len(), 4);
        assert_eq!(result.recommendations[0], "Ambil istirahat 15-20 menit segera");
    }

    #[test]
    fn test_low_base_stress_scenario() {
        let mut engine = midpoint_engine();
        let result = engine.analyze_with_base_stress(0.1);

        assert_eq!(result.stress_level, 30);
        assert_eq!(result.tier(), StressTier::Low);
        assert_eq!(result.recommendations[0], "Pertahankan kondisi yang baik");
    }

    #[test]
    fn test_midpoint_analysis() {
        let mut engine = midpoint_engine();
        let result = engine.analyze(true).unwrap();
        assert_eq!(result.stress_level, 55);
        assert_eq!(result.tier(), StressTier::Medium);
        assert!((result.confidence - 0.925).abs() < 1e-9);
    }

    #[test]
    fn test_base_stress_biases_emotions() {
        let mut engine =
            MockEngine::seeded(EngineConfig::default(), RecommendationTable::default(), 9);
        let mean = |engine: &mut MockEngine, b: f64| {
            let mut angry = 0.0;
            let mut happy = 0.0;
            for _ in 0..500 {
                let e = engine.sample_emotions(b);
                angry += e.angry;
                happy += e.happy;
            }
            (angry / 500.0, happy / 500.0)
        };

        let (calm_angry, calm_happy) = mean(&mut engine, 0.1);
        let (tense_angry, tense_happy) = mean(&mut engine, 0.9);
        assert!(tense_angry > calm_angry);
        assert!(tense_happy < calm_happy);
    }

    #[test]
    fn test_confidence_bounds_follow_config() {
        let mut engine =
            MockEngine::seeded(EngineConfig::fallback(), RecommendationTable::default(), 2);
        for _ in 0..500 {
            let c = engine.draw_confidence();
            assert!((0.75..=0.95).contains(&c), "confidence {c}");
        }
    }

    #[test]
    fn test_face_analysis_without_face() {
        let mut engine = midpoint_engine();
        let analysis = engine.face_analysis(false);
        assert!(!analysis.face_detected);
        assert_eq!(analysis.emotions, EmotionScores::default());
        assert_eq!(analysis.confidence, 0.0);
        assert!((25..45).contains(&analysis.age));
    }

    #[test]
    fn test_face_analysis_json_shape() {
        let mut engine =
            MockEngine::seeded(EngineConfig::default(), RecommendationTable::default(), 1);
        let json = serde_json::to_value(engine.face_analysis(true)).unwrap();
        assert_eq!(json["faceDetected"], true);
        assert!(json["emotions"]["fearful"].is_number());
        assert!(matches!(json["gender"].as_str(), Some("male") | Some("female")));
    }

    #[test]
    fn test_result_serializes_camel_case() {
        let mut engine = midpoint_engine();
        let json = serde_json::to_value(engine.analyze_with_base_stress(0.5)).unwrap();
        assert!(json.get("stressLevel").is_some());
        assert!(json.get("recommendations").is_some());
    }

    #[test]
    fn test_dominant_emotion() {
        let scores = EmotionScores {
            fearful: 0.6,
            neutral: 0.4,
            ..EmotionScores::default()
        };
        assert_eq!(scores.dominant(), ("fearful", 0.6));
    }
}
