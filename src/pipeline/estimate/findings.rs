//! Concern summary: ranks threshold rules by how far each metric is past
//! its limit and turns the worst ones into short findings.

use std::cmp::Reverse;

use super::types::{composite_risk, MetricKey, MetricProfile};

/// Minimum number of findings before backfilling from untriggered rules.
const MIN_FINDINGS: usize = 4;

/// Hard cap on findings returned.
const MAX_FINDINGS: usize = 5;

/// Emitted only when the rule table is empty.
pub const STABLE_SKIN_FINDING: &str =
    "Skin is stable, but consistency is key to prevent future issues.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Triggers when the score is above the threshold.
    Up,
    /// Triggers when the score is below the threshold.
    Down,
}

#[derive(Debug, Clone, Copy)]
pub struct ConcernRule {
    pub metric: MetricKey,
    pub threshold: i64,
    pub direction: Direction,
    pub text: &'static str,
}

pub const CONCERN_RULES: &[ConcernRule] = &[
    ConcernRule {
        metric: MetricKey::Oiliness,
        threshold: 70,
        direction: Direction::Up,
        text: "High oiliness risks clogged pores and more breakouts.",
    },
    ConcernRule {
        metric: MetricKey::Redness,
        threshold: 65,
        direction: Direction::Up,
        text: "Significant redness indicates a damaged, vulnerable skin barrier.",
    },
    ConcernRule {
        metric: MetricKey::Clarity,
        threshold: 60,
        direction: Direction::Down,
        text: "Low skin clarity signals risk of future marks.",
    },
    ConcernRule {
        metric: MetricKey::Texture,
        threshold: 60,
        direction: Direction::Down,
        text: "Uneven texture could worsen without proper exfoliation.",
    },
    ConcernRule {
        metric: MetricKey::Dryness,
        threshold: 65,
        direction: Direction::Up,
        text: "Severe dryness can trigger even more oil production.",
    },
    ConcernRule {
        metric: MetricKey::Symmetry,
        threshold: 60,
        direction: Direction::Down,
        text: "Asymmetry may point to lifestyle factors needing correction.",
    },
    ConcernRule {
        metric: MetricKey::Jawline,
        threshold: 60,
        direction: Direction::Down,
        text: "Jawline inflammation often linked to hormonal triggers.",
    },
    ConcernRule {
        metric: MetricKey::Risk,
        threshold: 70,
        direction: Direction::Up,
        text: "High composite risk score indicates future breakout likelihood.",
    },
];

impl ConcernRule {
    /// Signed distance past the threshold; positive means triggered.
    fn margin(&self, score: i64) -> i64 {
        match self.direction {
            Direction::Up => score - self.threshold,
            Direction::Down => self.threshold - score,
        }
    }
}

/// Score a rule reads. Risk is recomputed from the profile so a stale
/// composite can never skew the ranking.
fn rule_score(metrics: &MetricProfile, key: MetricKey) -> i64 {
    match key {
        MetricKey::Risk => i64::from(composite_risk(
            metrics.clarity as f64,
            metrics.redness as f64,
            metrics.oiliness as f64,
        )),
        other => i64::from(metrics.get(other)),
    }
}

/// Findings for `metrics` using the built-in rule table.
pub fn generate_concern_summary(metrics: &MetricProfile) -> Vec<String> {
    summarize_with_rules(metrics, CONCERN_RULES)
}

/// Most severe first, at least four when the table allows, at most five.
pub fn summarize_with_rules(metrics: &MetricProfile, rules: &[ConcernRule]) -> Vec<String> {
    // Stable sort: equal margins keep table order.
    let mut ranked: Vec<(&ConcernRule, i64)> = rules
        .iter()
        .map(|rule| (rule, rule.margin(rule_score(metrics, rule.metric))))
        .collect();
    ranked.sort_by_key(|&(_, margin)| Reverse(margin));

    let mut points: Vec<String> = ranked
        .iter()
        .filter(|&&(_, margin)| margin > 0)
        .map(|(rule, _)| rule.text.to_string())
        .collect();

    if points.len() < MIN_FINDINGS {
        let needed = MIN_FINDINGS - points.len();
        let backfill: Vec<String> = ranked
            .iter()
            .map(|(rule, _)| rule.text)
            .filter(|text| !points.iter().any(|p| p == text))
            .take(needed)
            .map(str::to_string)
            .collect();
        points.extend(backfill);
    }

    if points.is_empty() {
        points.push(STABLE_SKIN_FINDING.to_string());
    }

    points.truncate(MAX_FINDINGS);
    points
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text_for(metric: MetricKey) -> &'static str {
        CONCERN_RULES
            .iter()
            .find(|r| r.metric == metric)
            .map(|r| r.text)
            .unwrap()
    }

    #[test]
    fn oiliness_finding_ranks_first() {
        let metrics = MetricProfile::new(90, 20, 95, 10, 90, 90, 90);
        let points = generate_concern_summary(&metrics);
        assert_eq!(points[0], text_for(MetricKey::Oiliness));
    }

    #[test]
    fn backfills_to_four_when_few_triggered() {
        let metrics = MetricProfile::new(90, 20, 95, 10, 90, 90, 90);
        let points = generate_concern_summary(&metrics);
        assert_eq!(points.len(), 4);
        // no duplicates
        for (i, p) in points.iter().enumerate() {
            assert!(!points[i + 1..].contains(p), "duplicate finding: {p}");
        }
    }

    #[test]
    fn triggered_sorted_by_margin() {
        // clarity 5 (margin 55), jawline 35 (25), symmetry 40 (20); risk 68 just below 70
        let metrics = MetricProfile::new(5, 18, 38, 10, 75, 40, 35);
        let points = generate_concern_summary(&metrics);
        assert_eq!(
            points,
            vec![
                text_for(MetricKey::Clarity),
                text_for(MetricKey::Jawline),
                text_for(MetricKey::Symmetry),
                text_for(MetricKey::Risk),
            ]
        );
    }

    #[test]
    fn capped_at_five_when_everything_triggers() {
        let metrics = MetricProfile::new(5, 100, 100, 100, 5, 5, 5);
        let points = generate_concern_summary(&metrics);
        assert_eq!(points.len(), 5);
        // clarity margin 55 is the largest
        assert_eq!(points[0], text_for(MetricKey::Clarity));
    }

    #[test]
    fn equal_margins_keep_table_order() {
        // texture, symmetry and jawline all sit 10 below their threshold of 60
        let metrics = MetricProfile::new(100, 0, 0, 0, 50, 50, 50);
        let points = generate_concern_summary(&metrics);
        assert_eq!(points[0], text_for(MetricKey::Texture));
        assert_eq!(points[1], text_for(MetricKey::Symmetry));
        assert_eq!(points[2], text_for(MetricKey::Jawline));
    }

    #[test]
    fn risk_rule_ignores_stored_risk() {
        let mut metrics = MetricProfile::new(5, 100, 100, 0, 100, 100, 100);
        metrics.risk = 0;
        let points = generate_concern_summary(&metrics);
        assert!(points.contains(&text_for(MetricKey::Risk).to_string()));
    }

    #[test]
    fn empty_rule_table_yields_stable_line() {
        let metrics = MetricProfile::new(90, 10, 10, 10, 90, 90, 90);
        let points = summarize_with_rules(&metrics, &[]);
        assert_eq!(points, vec![STABLE_SKIN_FINDING.to_string()]);
    }

    #[test]
    fn identical_metrics_identical_findings() {
        let metrics = MetricProfile::new(44, 70, 71, 66, 59, 61, 58);
        assert_eq!(generate_concern_summary(&metrics), generate_concern_summary(&metrics));
    }
}
