use std::fmt;

use serde::{Deserialize, Serialize, Serializer};

// ──────────────────────────────────────────────
// Constants
// ──────────────────────────────────────────────

/// Disclaimer attached to every result unless the provider supplies one.
pub const DEFAULT_DISCLAIMER: &str = "Educational estimate. Not medical advice.";

/// Provider id used when a remote payload does not name itself.
pub const DEFAULT_REMOTE_SOURCE: &str = "gpt";

// ──────────────────────────────────────────────
// Image slots
// ──────────────────────────────────────────────

/// One of the three photos the intake wizard asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageSlot {
    Front,
    Left,
    Right,
}

impl ImageSlot {
    pub const ALL: [ImageSlot; 3] = [ImageSlot::Front, ImageSlot::Left, ImageSlot::Right];

    pub fn as_str(&self) -> &'static str {
        match self {
            ImageSlot::Front => "front",
            ImageSlot::Left => "left",
            ImageSlot::Right => "right",
        }
    }
}

impl fmt::Display for ImageSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ──────────────────────────────────────────────
// Classifications
// ──────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkinType {
    Oily,
    Dry,
    Combo,
    Normal,
    Uncertain,
}

impl SkinType {
    /// Lenient parse for provider strings. Anything unknown is `Uncertain`.
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "oily" => SkinType::Oily,
            "dry" => SkinType::Dry,
            "combo" | "combination" => SkinType::Combo,
            "normal" => SkinType::Normal,
            _ => SkinType::Uncertain,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SkinType::Oily => "oily",
            SkinType::Dry => "dry",
            SkinType::Combo => "combo",
            SkinType::Normal => "normal",
            SkinType::Uncertain => "uncertain",
        }
    }
}

impl fmt::Display for SkinType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Mild,
    Moderate,
    Severe,
    Uncertain,
}

impl Severity {
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "mild" => Severity::Mild,
            "moderate" => Severity::Moderate,
            "severe" => Severity::Severe,
            _ => Severity::Uncertain,
        }
    }
}

/// Qualitative severity of one face region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Bucket {
    #[default]
    None,
    Mild,
    Moderate,
    Severe,
}

impl Bucket {
    /// >70 severe, >55 moderate, >30 mild, otherwise none.
    pub fn classify(value: f64) -> Self {
        if value > 70.0 {
            Bucket::Severe
        } else if value > 55.0 {
            Bucket::Moderate
        } else if value > 30.0 {
            Bucket::Mild
        } else {
            Bucket::None
        }
    }

    pub fn from_label(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "mild" => Bucket::Mild,
            "moderate" => Bucket::Moderate,
            "severe" => Bucket::Severe,
            _ => Bucket::None,
        }
    }
}

// ──────────────────────────────────────────────
// Metrics
// ──────────────────────────────────────────────

/// The eight score attributes, in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricKey {
    Clarity,
    Redness,
    Oiliness,
    Dryness,
    Texture,
    Symmetry,
    Jawline,
    Risk,
}

impl MetricKey {
    pub const ORDER: [MetricKey; 8] = [
        MetricKey::Clarity,
        MetricKey::Redness,
        MetricKey::Oiliness,
        MetricKey::Dryness,
        MetricKey::Texture,
        MetricKey::Symmetry,
        MetricKey::Jawline,
        MetricKey::Risk,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MetricKey::Clarity => "clarity",
            MetricKey::Redness => "redness",
            MetricKey::Oiliness => "oiliness",
            MetricKey::Dryness => "dryness",
            MetricKey::Texture => "texture",
            MetricKey::Symmetry => "symmetry",
            MetricKey::Jawline => "jawline",
            MetricKey::Risk => "risk",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            MetricKey::Clarity => "Skin Clarity",
            MetricKey::Redness => "Redness",
            MetricKey::Oiliness => "Oiliness",
            MetricKey::Dryness => "Dryness",
            MetricKey::Texture => "Texture Smoothness",
            MetricKey::Symmetry => "Facial Symmetry",
            MetricKey::Jawline => "Jawline Definition",
            MetricKey::Risk => "Acne Risk (composite)",
        }
    }
}

/// Eight-attribute skin score vector.
///
/// `risk` is never accepted from outside: construct through
/// [`MetricProfile::new`], which derives it from clarity, redness and oiliness.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct MetricProfile {
    pub clarity: u32,
    pub redness: u32,
    pub oiliness: u32,
    pub dryness: u32,
    pub texture: u32,
    pub symmetry: u32,
    pub jawline: u32,
    pub risk: u32,
}

impl MetricProfile {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        clarity: u32,
        redness: u32,
        oiliness: u32,
        dryness: u32,
        texture: u32,
        symmetry: u32,
        jawline: u32,
    ) -> Self {
        Self {
            clarity,
            redness,
            oiliness,
            dryness,
            texture,
            symmetry,
            jawline,
            risk: composite_risk(clarity as f64, redness as f64, oiliness as f64),
        }
    }

    pub fn get(&self, key: MetricKey) -> u32 {
        match key {
            MetricKey::Clarity => self.clarity,
            MetricKey::Redness => self.redness,
            MetricKey::Oiliness => self.oiliness,
            MetricKey::Dryness => self.dryness,
            MetricKey::Texture => self.texture,
            MetricKey::Symmetry => self.symmetry,
            MetricKey::Jawline => self.jawline,
            MetricKey::Risk => self.risk,
        }
    }

    /// Fixed-order score list shared by every result source.
    pub fn to_scores(&self) -> Vec<ScoreEntry> {
        MetricKey::ORDER
            .iter()
            .map(|&key| ScoreEntry {
                key,
                label: key.label(),
                score: self.get(key),
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScoreEntry {
    pub key: MetricKey,
    pub label: &'static str,
    pub score: u32,
}

// ──────────────────────────────────────────────
// Rounding helpers
// ──────────────────────────────────────────────

/// Round half up (toward +inf), matching the funnel page's rounding.
pub fn round_half_up(value: f64) -> f64 {
    (value + 0.5).floor()
}

/// `clamp(round(x), 5, 100)`.
pub fn map100(value: f64) -> u32 {
    round_half_up(value).clamp(5.0, 100.0) as u32
}

/// Composite acne risk: `clamp(round(0.6*(100-clarity) + 0.2*redness + 0.2*oiliness), 5, 100)`.
pub fn composite_risk(clarity: f64, redness: f64, oiliness: f64) -> u32 {
    map100(0.6 * (100.0 - clarity) + 0.2 * redness + 0.2 * oiliness)
}

// ──────────────────────────────────────────────
// Regions & counts
// ──────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct RegionDistribution {
    pub forehead: Bucket,
    pub cheeks: Bucket,
    pub nose: Bucket,
    pub jaw: Bucket,
}

/// Estimated lesion counts. Keys stay snake_case on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct LesionCounts {
    pub non_inflamed: u32,
    pub inflamed: u32,
    pub nodules_cysts: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct RoutineOutline {
    #[serde(rename = "AM")]
    pub am: Vec<String>,
    #[serde(rename = "PM")]
    pub pm: Vec<String>,
}

// ──────────────────────────────────────────────
// Source
// ──────────────────────────────────────────────

/// Where a result came from: the on-device estimator or a named provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResultSource {
    Local,
    Remote(String),
}

impl ResultSource {
    pub fn as_str(&self) -> &str {
        match self {
            ResultSource::Local => "local",
            ResultSource::Remote(id) => id,
        }
    }

    pub fn is_local(&self) -> bool {
        matches!(self, ResultSource::Local)
    }
}

impl Serialize for ResultSource {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl fmt::Display for ResultSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ──────────────────────────────────────────────
// AnalysisResult
// ──────────────────────────────────────────────

/// Canonical analysis output. Built once per attempt and never mutated.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub skin_type: SkinType,
    pub severity: Severity,
    pub scores: Vec<ScoreEntry>,
    pub metrics: MetricProfile,
    pub flags: Vec<String>,
    pub summary_points: Vec<String>,
    pub summary: String,
    pub overall_rating: u32,
    pub potential_rating: u32,
    pub distribution: RegionDistribution,
    pub counts: LesionCounts,
    pub possible_triggers: Vec<String>,
    pub non_medical_actions: Vec<String>,
    pub routine_outline: RoutineOutline,
    pub source: ResultSource,
    pub disclaimer: String,
}

impl AnalysisResult {
    pub fn score(&self, key: MetricKey) -> Option<u32> {
        self.scores.iter().find(|s| s.key == key).map(|s| s.score)
    }
}
