//! On-device estimator: expands a 32-bit seed into a full `AnalysisResult`.
//!
//! Each metric reads a different window of the seed (`seed >> shift`), so a
//! single hash drives eight loosely decorrelated scores. The weights and
//! shifts are tuning constants; results must stay bit-identical across
//! releases, so do not adjust them.

use super::findings::generate_concern_summary;
use super::types::{
    map100, round_half_up, AnalysisResult, Bucket, LesionCounts, MetricProfile,
    RegionDistribution, ResultSource, RoutineOutline, Severity, SkinType, DEFAULT_DISCLAIMER,
};

// ──────────────────────────────────────────────
// Seed extraction
// ──────────────────────────────────────────────

/// Default clamp range for `percent_from`.
pub const PERCENT_MIN: u32 = 10;
pub const PERCENT_MAX: u32 = 98;

const SHIFT_CLARITY: u32 = 3;
const SHIFT_REDNESS: u32 = 7;
const SHIFT_OILINESS: u32 = 11;
const SHIFT_DRYNESS: u32 = 17;
const SHIFT_TEXTURE: u32 = 19;
const SHIFT_SYMMETRY: u32 = 23;
const SHIFT_JAWLINE: u32 = 27;

/// `seed % 4`: oily, dry, combo, normal.
pub fn derive_skin_type(seed: u32) -> SkinType {
    match seed % 4 {
        0 => SkinType::Oily,
        1 => SkinType::Dry,
        2 => SkinType::Combo,
        _ => SkinType::Normal,
    }
}

/// `clamp((seed >> shift) % 100, min, max)`.
pub fn percent_from(seed: u32, shift: u32, min: u32, max: u32) -> u32 {
    ((seed >> shift) % 100).clamp(min, max)
}

fn percent(seed: u32, shift: u32) -> u32 {
    percent_from(seed, shift, PERCENT_MIN, PERCENT_MAX)
}

/// Raw (pre-`map100`) metrics pulled out of a seed.
#[derive(Debug, Clone, Copy, PartialEq)]
struct RawMetrics {
    clarity: f64,
    redness: f64,
    oiliness: f64,
    dryness: f64,
    texture: f64,
    symmetry: f64,
    jawline: f64,
}

impl RawMetrics {
    fn from_seed(seed: u32) -> Self {
        Self {
            clarity: f64::from(100 - percent_from(seed, SHIFT_CLARITY, 20, 95)),
            redness: f64::from(percent(seed, SHIFT_REDNESS)),
            oiliness: f64::from(percent(seed, SHIFT_OILINESS)),
            dryness: f64::from(percent(seed, SHIFT_DRYNESS)),
            texture: f64::from(100 - percent_from(seed, SHIFT_TEXTURE, 25, 90)),
            symmetry: f64::from(percent_from(seed, SHIFT_SYMMETRY, 40, 96)),
            jawline: f64::from(percent_from(seed, SHIFT_JAWLINE, 35, 97)),
        }
    }

    fn profile(&self) -> MetricProfile {
        MetricProfile::new(
            map100(self.clarity),
            map100(self.redness),
            map100(self.oiliness),
            map100(self.dryness),
            map100(self.texture),
            map100(self.symmetry),
            map100(self.jawline),
        )
    }
}

// ──────────────────────────────────────────────
// Derived sections
// ──────────────────────────────────────────────

fn regimen_flags(m: &RawMetrics) -> Vec<String> {
    let checks = [
        (m.clarity < 60.0, "Active regimen for clarity"),
        (m.redness > 60.0, "Calm redness & barrier"),
        (m.oiliness > 65.0, "Oil control"),
        (m.dryness > 65.0, "Barrier repair"),
        (m.texture < 60.0, "Texture smoothing"),
    ];
    checks
        .iter()
        .filter(|(hit, _)| *hit)
        .map(|(_, text)| text.to_string())
        .collect()
}

fn distribution(m: &RawMetrics) -> RegionDistribution {
    let blemish = 100.0 - m.clarity;
    RegionDistribution {
        forehead: Bucket::classify(blemish + m.oiliness * 0.2),
        cheeks: Bucket::classify(blemish * 0.6 + m.redness * 0.6),
        nose: Bucket::classify(m.oiliness),
        jaw: Bucket::classify(m.redness * 0.4 + blemish * 0.3),
    }
}

fn lesion_counts(m: &RawMetrics) -> LesionCounts {
    LesionCounts {
        non_inflamed: round_half_up((100.0 - m.clarity) * 0.4).max(5.0) as u32,
        inflamed: round_half_up(m.redness * 0.2).max(0.0) as u32,
        nodules_cysts: round_half_up((100.0 - m.texture) * 0.05 - 1.0).max(0.0) as u32,
    }
}

/// `0.4*clarity + 0.25*texture + 0.2*(100-redness) + 0.15*(100-min(oiliness,90))`, mapped to [5,100].
pub fn overall_rating(clarity: f64, texture: f64, redness: f64, oiliness: f64) -> u32 {
    map100(
        0.4 * clarity
            + 0.25 * texture
            + 0.2 * (100.0 - redness)
            + 0.15 * (100.0 - oiliness.min(90.0)),
    )
}

/// At least eight points above `overall`, more the lower it starts; capped at 100.
pub fn potential_rating(overall: u32) -> u32 {
    let overall = f64::from(overall);
    let lift = ((100.0 - overall) * 0.35).max(8.0);
    (round_half_up(overall + lift) as u32).min(100)
}

fn possible_triggers(m: &RawMetrics) -> Vec<String> {
    vec![
        if m.oiliness > 65.0 {
            "Occlusive hair products / helmets"
        } else {
            "Irregular cleansing"
        }
        .to_string(),
        if m.redness > 60.0 {
            "Over-exfoliation / fragrance irritation"
        } else {
            "Sweat + friction"
        }
        .to_string(),
    ]
}

fn non_medical_actions() -> Vec<String> {
    [
        "SPF 50 daily (2-finger)",
        "Gentle foaming cleanse (2×/day)",
        "BPO 2.5% wash AM 3–4×/wk",
        "Adapalene 0.1% pea-size PM ramp",
        "Fragrance-free moisturizer",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn routine_outline() -> RoutineOutline {
    RoutineOutline {
        am: ["Cleanse", "(Optional) BPO wash", "Gel/Ceramide moisturizer", "SPF 50"]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        pm: ["Cleanse", "Adapalene pea-size", "Moisturizer"]
            .iter()
            .map(|s| s.to_string())
            .collect(),
    }
}

/// `Type: <skin>. Priorities → <flags | "Maintain & protect.">`
fn local_summary(skin_type: SkinType, flags: &[String]) -> String {
    let priorities = if flags.is_empty() {
        "Maintain & protect.".to_string()
    } else {
        flags.join(", ")
    };
    format!("Type: {skin_type}. Priorities → {priorities}")
}

// ──────────────────────────────────────────────
// Entry point
// ──────────────────────────────────────────────

/// Build the complete local estimate for `seed`. Pure; never fails.
pub fn build_local_result(seed: u32) -> AnalysisResult {
    let skin_type = derive_skin_type(seed);
    let raw = RawMetrics::from_seed(seed);
    let metrics = raw.profile();
    let flags = regimen_flags(&raw);
    let overall = overall_rating(raw.clarity, raw.texture, raw.redness, raw.oiliness);

    AnalysisResult {
        skin_type,
        // the local estimate never grades severity above mild
        severity: Severity::Mild,
        scores: metrics.to_scores(),
        metrics,
        summary: local_summary(skin_type, &flags),
        summary_points: generate_concern_summary(&metrics),
        flags,
        overall_rating: overall,
        potential_rating: potential_rating(overall),
        distribution: distribution(&raw),
        counts: lesion_counts(&raw),
        possible_triggers: possible_triggers(&raw),
        non_medical_actions: non_medical_actions(),
        routine_outline: routine_outline(),
        source: ResultSource::Local,
        disclaimer: DEFAULT_DISCLAIMER.to_string(),
    }
}
