//! Adapter from loosely-typed remote scoring payloads to `AnalysisResult`.
//!
//! Providers disagree on field naming (`skinType` vs `skin_type`, ...) and on
//! value types (numbers sent as strings, missing sections). This is the only
//! module allowed to know about those variants; everything downstream reads
//! the canonical result.

use serde_json::{Map, Value};

use super::findings::generate_concern_summary;
use super::types::{
    round_half_up, AnalysisResult, Bucket, LesionCounts, MetricProfile, RegionDistribution,
    ResultSource, RoutineOutline, Severity, SkinType, DEFAULT_DISCLAIMER, DEFAULT_REMOTE_SOURCE,
};

// ──────────────────────────────────────────────
// Field name variants
// ──────────────────────────────────────────────

const SKIN_TYPE: &[&str] = &["skinType", "skin_type"];
const SEVERITY: &[&str] = &["severity", "estimated_severity", "estimatedSeverity"];
const OVERALL_RATING: &[&str] = &["overallRating", "overall_rating"];
const POTENTIAL_RATING: &[&str] = &[
    "potentialRating8w",
    "potential_rating_8w",
    "potential_rating_14d",
    "potentialRating14d",
    "potentialRating",
    "potential_rating",
];
const ROUTINE_OUTLINE: &[&str] = &["routineOutline", "routine_outline"];
const NON_MEDICAL_ACTIONS: &[&str] = &["nonMedicalActions", "non_medical_actions"];
const POSSIBLE_TRIGGERS: &[&str] = &["possibleTriggers", "possible_triggers"];
const SUMMARY_POINTS: &[&str] = &["summaryPoints", "summary_points"];
const NON_INFLAMED: &[&str] = &["non_inflamed", "nonInflamed"];
const NODULES_CYSTS: &[&str] = &["nodules_cysts", "nodulesCysts"];

// ──────────────────────────────────────────────
// Lenient readers
// ──────────────────────────────────────────────

/// Read-only view over one JSON object that tolerates missing fields.
struct Lenient<'a> {
    fields: Option<&'a Map<String, Value>>,
}

impl<'a> Lenient<'a> {
    fn new(value: Option<&'a Value>) -> Self {
        Self {
            fields: value.and_then(Value::as_object),
        }
    }

    /// First present, non-null field among `names`.
    fn pick(&self, names: &[&str]) -> Option<&'a Value> {
        let fields = self.fields?;
        names
            .iter()
            .filter_map(|name| fields.get(*name))
            .find(|v| !v.is_null())
    }

    /// First field among `names` holding a non-empty string.
    fn text(&self, names: &[&str]) -> Option<&'a str> {
        let fields = self.fields?;
        names
            .iter()
            .filter_map(|name| fields.get(*name).and_then(Value::as_str))
            .find(|s| !s.is_empty())
    }

    fn number(&self, names: &[&str]) -> f64 {
        self.pick(names).map(number_or_zero).unwrap_or(0.0)
    }

    fn object(&self, names: &[&str]) -> Lenient<'a> {
        Lenient::new(self.pick(names))
    }

    fn strings(&self, names: &[&str]) -> Vec<String> {
        self.pick(names).map(string_list).unwrap_or_default()
    }
}

/// `Number(x) || 0`: numbers and numeric strings parse, everything else is 0.
fn number_or_zero(value: &Value) -> f64 {
    let parsed = match value {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                0.0
            } else {
                trimmed.parse::<f64>().unwrap_or(0.0)
            }
        }
        Value::Bool(true) => 1.0,
        _ => 0.0,
    };
    if parsed.is_finite() {
        parsed
    } else {
        0.0
    }
}

/// Keep the string entries of an array; anything else is an empty list.
fn string_list(value: &Value) -> Vec<String> {
    value
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// Provider metric → integer in [0,100].
fn metric(value: f64) -> u32 {
    round_half_up(value).clamp(0.0, 100.0) as u32
}

fn non_negative(value: f64) -> u32 {
    round_half_up(value).max(0.0) as u32
}

// ──────────────────────────────────────────────
// Sections
// ──────────────────────────────────────────────

fn metrics(payload: &Lenient<'_>) -> MetricProfile {
    let m = payload.object(&["metrics"]);
    MetricProfile::new(
        metric(m.number(&["clarity"])),
        metric(m.number(&["redness"])),
        metric(m.number(&["oiliness"])),
        metric(m.number(&["dryness"])),
        metric(m.number(&["texture"])),
        metric(m.number(&["symmetry"])),
        metric(m.number(&["jawline"])),
    )
}

fn distribution(payload: &Lenient<'_>) -> RegionDistribution {
    let d = payload.object(&["distribution"]);
    let region = |name: &str| d.text(&[name]).map(Bucket::from_label).unwrap_or_default();
    RegionDistribution {
        forehead: region("forehead"),
        cheeks: region("cheeks"),
        nose: region("nose"),
        jaw: region("jaw"),
    }
}

fn counts(payload: &Lenient<'_>) -> LesionCounts {
    let c = payload.object(&["counts"]);
    LesionCounts {
        non_inflamed: non_negative(c.number(NON_INFLAMED)),
        inflamed: non_negative(c.number(&["inflamed"])),
        nodules_cysts: non_negative(c.number(NODULES_CYSTS)),
    }
}

fn routine(payload: &Lenient<'_>) -> RoutineOutline {
    let r = payload.object(ROUTINE_OUTLINE);
    RoutineOutline {
        am: r.strings(&["AM", "am"]),
        pm: r.strings(&["PM", "pm"]),
    }
}

fn source(payload: &Lenient<'_>) -> ResultSource {
    match payload.text(&["source"]) {
        Some("local") => ResultSource::Local,
        Some(id) => ResultSource::Remote(id.to_string()),
        None => ResultSource::Remote(DEFAULT_REMOTE_SOURCE.to_string()),
    }
}

/// `Type: <skin>. Priorities → <first flag | "clarity first">…`
fn remote_summary(skin_type: SkinType, flags: &[String]) -> String {
    let lead = flags.first().map(String::as_str).unwrap_or("clarity first");
    format!("Type: {skin_type}. Priorities → {lead}…")
}

// ──────────────────────────────────────────────
// Entry point
// ──────────────────────────────────────────────

/// Normalize a remote payload. Never fails: absent or malformed input
/// produces a valid result with zero metrics.
///
/// The composite risk is always recomputed from clarity, redness and
/// oiliness; a provider-supplied risk is ignored.
pub fn normalize_server_out(raw: Option<&Value>) -> AnalysisResult {
    let payload = Lenient::new(raw);

    let metrics = metrics(&payload);
    let skin_type = payload
        .text(SKIN_TYPE)
        .map(SkinType::from_label)
        .unwrap_or(SkinType::Uncertain);
    let severity = payload
        .text(SEVERITY)
        .map(Severity::from_label)
        .unwrap_or(Severity::Uncertain);
    let flags = payload.strings(&["flags"]);

    let mut summary_points = payload.strings(SUMMARY_POINTS);
    if summary_points.is_empty() {
        summary_points = generate_concern_summary(&metrics);
    }

    AnalysisResult {
        skin_type,
        severity,
        scores: metrics.to_scores(),
        metrics,
        summary: remote_summary(skin_type, &flags),
        flags,
        summary_points,
        overall_rating: metric(payload.number(OVERALL_RATING)),
        potential_rating: metric(payload.number(POTENTIAL_RATING)),
        distribution: distribution(&payload),
        counts: counts(&payload),
        possible_triggers: payload.strings(POSSIBLE_TRIGGERS),
        non_medical_actions: payload.strings(NON_MEDICAL_ACTIONS),
        routine_outline: routine(&payload),
        source: source(&payload),
        disclaimer: payload
            .text(&["disclaimer"])
            .unwrap_or(DEFAULT_DISCLAIMER)
            .to_string(),
    }
}
