//! Confidence scoring for alignment results.
//!
//! Combines three normalized quality factors into a single scalar so callers
//! can gate downstream processing per stream. All functions are pure - no
//! I/O, no side effects.

use crate::config::QualitySettings;
use crate::models::{AlignmentResult, PulseEdge};

/// Score an alignment result into a confidence value in [0, 1].
///
/// Geometric mean of three factors:
/// - match ratio: matched pairs over the reference edges that fall inside the
///   secondary's mapped time span, so missed pulses lower the score while a
///   shorter recording does not,
/// - residual quality: how far the residual RMS sits below the match
///   tolerance,
/// - scale plausibility: how close the fitted scale is to 1.0.
///
/// Any factor at zero zeroes the whole score; a result can not buy back a
/// hopeless residual with a good match ratio.
pub fn score(
    result: &AlignmentResult,
    reference_edges: &[PulseEdge],
    secondary_edges: &[PulseEdge],
    match_tolerance_sec: f64,
    settings: &QualitySettings,
) -> f64 {
    if match_tolerance_sec <= 0.0 {
        return 0.0;
    }
    let expected = expected_matches(result, reference_edges, secondary_edges, match_tolerance_sec);
    if expected == 0 {
        return 0.0;
    }

    let match_ratio = (result.matched_edge_count as f64 / expected as f64).clamp(0.0, 1.0);
    let residual_quality = (1.0 - result.residual_rms_sec / match_tolerance_sec).max(0.0);
    let scale_plausibility =
        (1.0 - (result.mapping.scale - 1.0).abs() / settings.scale_tolerance).max(0.0);

    (match_ratio * residual_quality * scale_plausibility).cbrt()
}

/// Reference edges that could have matched: those inside the secondary's
/// recorded span once mapped onto the reference clock.
fn expected_matches(
    result: &AlignmentResult,
    reference_edges: &[PulseEdge],
    secondary_edges: &[PulseEdge],
    match_tolerance_sec: f64,
) -> usize {
    let (first, last) = match (secondary_edges.first(), secondary_edges.last()) {
        (Some(f), Some(l)) => (f.timestamp_sec, l.timestamp_sec),
        _ => return 0,
    };
    let window_lo = result.mapping.to_reference(first) - match_tolerance_sec;
    let window_hi = result.mapping.to_reference(last) + match_tolerance_sec;

    reference_edges
        .iter()
        .filter(|e| e.timestamp_sec >= window_lo && e.timestamp_sec <= window_hi)
        .count()
}

/// Whether a confidence score clears the acceptance threshold.
pub fn is_accepted(confidence: f64, settings: &QualitySettings) -> bool {
    confidence >= settings.acceptance_threshold
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Polarity, StreamId, TimeMapping};

    fn train(times: &[f64]) -> Vec<PulseEdge> {
        times
            .iter()
            .map(|&t| PulseEdge::new(t, Polarity::Rising))
            .collect()
    }

    fn result(matched: usize, residual_rms_sec: f64, scale: f64) -> AlignmentResult {
        AlignmentResult::new(
            StreamId::new("cam1"),
            TimeMapping::new(0.0, scale),
            matched,
            residual_rms_sec,
        )
    }

    fn seconds(n: usize) -> Vec<f64> {
        (0..n).map(|k| k as f64).collect()
    }

    #[test]
    fn perfect_alignment_scores_one() {
        let edges = train(&seconds(10));
        let confidence = score(
            &result(10, 0.0, 1.0),
            &edges,
            &edges,
            0.005,
            &QualitySettings::default(),
        );
        assert!((confidence - 1.0).abs() < 1e-9);
    }

    #[test]
    fn missed_pulses_lower_the_score() {
        let settings = QualitySettings::default();
        let reference = train(&seconds(12));
        let full = train(&seconds(12));
        // Every third pulse missed; the surviving edges still span the train.
        let sparse: Vec<PulseEdge> = full
            .iter()
            .enumerate()
            .filter(|(k, _)| k % 3 != 2)
            .map(|(_, e)| *e)
            .collect();

        let full_conf = score(&result(12, 0.0, 1.0), &reference, &full, 0.005, &settings);
        let sparse_conf = score(&result(8, 0.0, 1.0), &reference, &sparse, 0.005, &settings);

        assert!(
            sparse_conf < full_conf,
            "dropout confidence {sparse_conf} not below {full_conf}"
        );
        assert!(sparse_conf > 0.0);
    }

    #[test]
    fn shorter_recording_is_not_punished() {
        // Secondary only covers the first half of the reference; every edge
        // it does cover is matched.
        let reference = train(&seconds(20));
        let secondary = train(&seconds(10));

        let confidence = score(
            &result(10, 0.0, 1.0),
            &reference,
            &secondary,
            0.005,
            &QualitySettings::default(),
        );
        assert!((confidence - 1.0).abs() < 1e-9);
    }

    #[test]
    fn residual_at_tolerance_zeroes_the_score() {
        let edges = train(&seconds(10));
        let confidence = score(
            &result(10, 0.005, 1.0),
            &edges,
            &edges,
            0.005,
            &QualitySettings::default(),
        );
        assert_eq!(confidence, 0.0);
    }

    #[test]
    fn scale_at_tolerance_zeroes_the_score() {
        let edges = train(&seconds(10));
        let confidence = score(
            &result(10, 0.0, 1.01),
            &edges,
            &edges,
            0.005,
            &QualitySettings::default(),
        );
        assert!(confidence < 1e-6);
    }

    #[test]
    fn score_stays_in_unit_interval() {
        let edges = train(&seconds(10));
        let confidence = score(
            &result(15, 0.001, 1.0005),
            &edges,
            &edges,
            0.005,
            &QualitySettings::default(),
        );
        assert!((0.0..=1.0).contains(&confidence));
    }

    #[test]
    fn empty_secondary_scores_zero() {
        let reference = train(&seconds(10));
        let confidence = score(
            &result(0, 0.0, 1.0),
            &reference,
            &[],
            0.005,
            &QualitySettings::default(),
        );
        assert_eq!(confidence, 0.0);
    }

    #[test]
    fn acceptance_uses_threshold() {
        let settings = QualitySettings::default();
        assert!(is_accepted(0.7, &settings));
        assert!(is_accepted(0.95, &settings));
        assert!(!is_accepted(0.69, &settings));
    }
}
