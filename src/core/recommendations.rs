//! Stress tiers and the advice shown for each.

use serde::{Deserialize, Serialize};

/// Coarse stress band used for badges and recommendations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StressTier {
    Low,
    Medium,
    High,
}

impl StressTier {
    /// `< 40` low, `40..=69` medium, `>= 70` high.
    pub fn from_level(level: u8) -> Self {
        match level {
            0..=39 => StressTier::Low,
            40..=69 => StressTier::Medium,
            _ => StressTier::High,
        }
    }

    /// Dashboard label.
    pub fn label(&self) -> &'static str {
        match self {
            StressTier::Low => "Rendah",
            StressTier::Medium => "Sedang",
            StressTier::High => "Tinggi",
        }
    }
}

impl std::fmt::Display for StressTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Static advice lists, one per tier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecommendationTable {
    pub low: Vec<String>,
    pub medium: Vec<String>,
    pub high: Vec<String>,
}

impl Default for RecommendationTable {
    fn default() -> Self {
        let owned = |items: &[&str]| items.iter().map(|s| s.to_string()).collect();
        Self {
            low: owned(&[
                "Pertahankan kondisi yang baik",
                "Tetap jaga pola istirahat",
                "Lanjutkan aktivitas normal",
                "Monitor kondisi secara berkala",
            ]),
            medium: owned(&[
                "Ambil istirahat singkat 5-10 menit",
                "Lakukan peregangan ringan",
                "Minum air putih yang cukup",
                "Atur prioritas tugas dengan baik",
            ]),
            high: owned(&[
                "Ambil istirahat 15-20 menit segera",
                "Lakukan teknik pernapasan dalam",
                "Pertimbangkan konsultasi dengan HRD",
                "Hindari tugas berat untuk sementara",
            ]),
        }
    }
}

impl RecommendationTable {
    pub fn for_tier(&self, tier: StressTier) -> &[String] {
        match tier {
            StressTier::Low => &self.low,
            StressTier::Medium => &self.medium,
            StressTier::High => &self.high,
        }
    }

    /// Advice for a stress level.
    pub fn select(&self, level: u8) -> &[String] {
        self.for_tier(StressTier::from_level(level))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tier_boundaries() {
        let cases = [
            (0, StressTier::Low),
            (39, StressTier::Low),
            (40, StressTier::Medium),
            (69, StressTier::Medium),
            (70, StressTier::High),
            (100, StressTier::High),
        ];
        for (level, tier) in cases {
            assert_eq!(StressTier::from_level(level), tier, "level {level}");
        }
    }

    #[test]
    fn test_selection_follows_tiers() {
        let table = RecommendationTable::default();
        assert_eq!(table.select(39), table.low.as_slice());
        assert_eq!(table.select(40), table.medium.as_slice());
        assert_eq!(table.select(69), table.medium.as_slice());
        assert_eq!(table.select(70), table.high.as_slice());
    }

    #[test]
    fn test_default_lists() {
        let table = RecommendationTable::default();
        for tier in [StressTier::Low, StressTier::Medium, StressTier::High] {
            assert_eq!(table.for_tier(tier).len(), 4);
        }
        assert_eq!(table.high[0], "Ambil istirahat 15-20 menit segera");
    }

    #[test]
    fn test_labels() {
        assert_eq!(StressTier::from_level(10).to_string(), "Rendah");
        assert_eq!(StressTier::from_level(55).label(), "Sedang");
        assert_eq!(StressTier::from_level(95).label(), "Tinggi");
    }
}
