//! Offset and clock-drift estimation between pulse-edge trains.
//!
//! Alignment is an approximate sequence-matching problem: the two edge lists
//! may have different counts (missed pulses, extra noise edges) and an
//! unknown relative offset and clock-rate scale. A coarse cross-correlation
//! seeds the offset; iterative reweighted least squares then pairs edges
//! under the current mapping, refits the affine clock model by linear
//! regression, and repeats until the matched-pair set stabilizes.
//!
//! Pure functions over edge slices, no I/O.

use crate::config::AlignmentSettings;
use crate::models::{AlignmentResult, PulseEdge, StreamId, TimeMapping};

use super::correlation::coarse_offset;
use super::types::{SyncError, SyncResult};

/// Align a secondary edge train against the reference train.
///
/// Returns the fitted local-to-reference `TimeMapping` together with the
/// surviving match count and residual RMS. The confidence field is left for
/// the quality scorer.
///
/// # Errors
/// `TooFewMatches` when fewer than the configured minimum of edge pairs
/// survive refinement; `ImplausibleScale` when the fitted scale falls outside
/// the configured window (a scale far from 1.0 signals a bad match rather
/// than legitimate drift).
pub fn align(
    stream_id: &StreamId,
    reference: &[PulseEdge],
    secondary: &[PulseEdge],
    settings: &AlignmentSettings,
) -> SyncResult<AlignmentResult> {
    let seed_offset = coarse_offset(reference, secondary, settings.bin_width_sec())?;
    let mut mapping = TimeMapping::new(seed_offset, 1.0);

    tracing::debug!(
        "aligning '{}': {} reference edges, {} secondary edges, seed offset {:.4}s",
        stream_id,
        reference.len(),
        secondary.len(),
        seed_offset
    );

    let ref_times: Vec<f64> = reference.iter().map(|e| e.timestamp_sec).collect();
    let sec_times: Vec<f64> = secondary.iter().map(|e| e.timestamp_sec).collect();
    let tolerance = settings.match_tolerance_sec();

    let mut previous_pairs: Vec<(usize, usize)> = Vec::new();
    for iteration in 0..settings.max_iterations {
        let pairs = match_pairs(&ref_times, &sec_times, &mapping, tolerance);

        if pairs == previous_pairs && iteration > 0 {
            tracing::debug!(
                "'{}' converged after {} iterations with {} pairs",
                stream_id,
                iteration,
                pairs.len()
            );
            break;
        }
        if pairs.len() < 2 {
            break;
        }

        let x: Vec<f64> = pairs.iter().map(|&(_, j)| sec_times[j]).collect();
        let y: Vec<f64> = pairs.iter().map(|&(i, _)| ref_times[i]).collect();
        let (slope, intercept, r_squared) = linear_regression(&x, &y);

        // A non-positive slope breaks the sorted-mapping invariant the
        // pairing relies on; keep the last good mapping and stop.
        if slope <= 0.0 {
            tracing::warn!(
                "'{}' regression degenerated (slope {:.4}) at iteration {}",
                stream_id,
                slope,
                iteration
            );
            break;
        }

        mapping = TimeMapping::new(intercept, slope);
        previous_pairs = pairs;

        tracing::trace!(
            "'{}' iteration {}: {} pairs, scale {:.6}, offset {:.4}s, r2 {:.4}",
            stream_id,
            iteration,
            previous_pairs.len(),
            slope,
            intercept,
            r_squared
        );
    }

    // Final pairing under the final mapping. On convergence this equals the
    // last refit set.
    let pairs = match_pairs(&ref_times, &sec_times, &mapping, tolerance);
    let matched = pairs.len();

    if matched < settings.min_matched_edges {
        return Err(SyncError::TooFewMatches {
            matched,
            required: settings.min_matched_edges,
        });
    }
    if mapping.scale < settings.min_scale || mapping.scale > settings.max_scale {
        return Err(SyncError::ImplausibleScale {
            scale: mapping.scale,
            min: settings.min_scale,
            max: settings.max_scale,
        });
    }

    let sum_sq: f64 = pairs
        .iter()
        .map(|&(i, j)| {
            let residual = ref_times[i] - mapping.to_reference(sec_times[j]);
            residual * residual
        })
        .sum();
    let residual_rms_sec = (sum_sq / matched as f64).sqrt();

    Ok(AlignmentResult::new(
        stream_id.clone(),
        mapping,
        matched,
        residual_rms_sec,
    ))
}

/// Pair each reference edge with the nearest mapped secondary edge within
/// tolerance. Returns `(reference_index, secondary_index)` pairs.
fn match_pairs(
    ref_times: &[f64],
    sec_times: &[f64],
    mapping: &TimeMapping,
    tolerance_sec: f64,
) -> Vec<(usize, usize)> {
    // Scale is strictly positive here, so mapped times stay sorted.
    let mapped: Vec<f64> = sec_times.iter().map(|&t| mapping.to_reference(t)).collect();

    let mut pairs = Vec::new();
    for (i, &r) in ref_times.iter().enumerate() {
        let j = nearest_index(&mapped, r);
        if (r - mapped[j]).abs() <= tolerance_sec {
            pairs.push((i, j));
        }
    }
    pairs
}

/// Index of the element of a sorted slice closest to `target`.
fn nearest_index(sorted: &[f64], target: f64) -> usize {
    let idx = sorted.partition_point(|&t| t < target);
    if idx == 0 {
        return 0;
    }
    if idx == sorted.len() {
        return sorted.len() - 1;
    }
    if target - sorted[idx - 1] <= sorted[idx] - target {
        idx - 1
    } else {
        idx
    }
}

/// Simple linear regression: y = slope * x + intercept.
///
/// Returns (slope, intercept, r_squared).
fn linear_regression(x: &[f64], y: &[f64]) -> (f64, f64, f64) {
    if x.len() < 2 || x.len() != y.len() {
        return (0.0, 0.0, 0.0);
    }

    let n = x.len() as f64;
    let x_mean = x.iter().sum::<f64>() / n;
    let y_mean = y.iter().sum::<f64>() / n;

    let mut numerator = 0.0;
    let mut denominator = 0.0;
    for i in 0..x.len() {
        let x_diff = x[i] - x_mean;
        let y_diff = y[i] - y_mean;
        numerator += x_diff * y_diff;
        denominator += x_diff * x_diff;
    }

    if denominator.abs() < 1e-10 {
        return (0.0, y_mean, 0.0);
    }

    let slope = numerator / denominator;
    let intercept = y_mean - slope * x_mean;

    let mut ss_res = 0.0;
    let mut ss_tot = 0.0;
    for i in 0..x.len() {
        let y_pred = slope * x[i] + intercept;
        ss_res += (y[i] - y_pred).powi(2);
        ss_tot += (y[i] - y_mean).powi(2);
    }

    let r_squared = if ss_tot.abs() < 1e-10 {
        1.0
    } else {
        1.0 - (ss_res / ss_tot)
    };

    (slope, intercept, r_squared.max(0.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Polarity;

    fn train(times: &[f64]) -> Vec<PulseEdge> {
        times
            .iter()
            .map(|&t| PulseEdge::new(t, Polarity::Rising))
            .collect()
    }

    fn seconds(range: std::ops::Range<usize>) -> Vec<f64> {
        range.map(|k| k as f64).collect()
    }

    fn id() -> StreamId {
        StreamId::new("cam1")
    }

    #[test]
    fn identity_alignment_recovers_identity_mapping() {
        let edges = train(&seconds(0..10));
        let result = align(&id(), &edges, &edges, &AlignmentSettings::default()).unwrap();

        assert!(result.mapping.offset_sec.abs() < 1e-6);
        assert!((result.mapping.scale - 1.0).abs() < 1e-6);
        assert_eq!(result.matched_edge_count, 10);
        assert!(result.residual_rms_sec < 1e-9);
    }

    #[test]
    fn recovers_pure_offset() {
        let reference = train(&seconds(0..10));
        let secondary: Vec<PulseEdge> = train(
            &seconds(0..10)
                .iter()
                .map(|t| t - 0.25)
                .collect::<Vec<_>>(),
        );

        let result = align(&id(), &reference, &secondary, &AlignmentSettings::default()).unwrap();

        assert!(
            (result.mapping.offset_sec - 0.25).abs() < 0.001,
            "offset {} not ~0.25",
            result.mapping.offset_sec
        );
        assert!((result.mapping.scale - 1.0).abs() < 0.001);
        assert_eq!(result.matched_edge_count, 10);
    }

    #[test]
    fn recovers_clock_drift() {
        // reference_time = 1.0001 * local + 0.1
        let reference = train(&seconds(0..10));
        let local: Vec<f64> = seconds(0..10).iter().map(|r| (r - 0.1) / 1.0001).collect();
        let secondary = train(&local);

        let result = align(&id(), &reference, &secondary, &AlignmentSettings::default()).unwrap();

        assert!(
            (result.mapping.scale - 1.0001).abs() < 0.0005,
            "scale {} not ~1.0001",
            result.mapping.scale
        );
        assert!(
            (result.mapping.offset_sec - 0.1).abs() < 0.001,
            "offset {} not ~0.1",
            result.mapping.offset_sec
        );
        assert!((result.mapping.drift_ppm() - 100.0).abs() < 500.0);
    }

    #[test]
    fn survives_missing_pulses() {
        let reference = train(&seconds(0..12));
        // Every third edge missed by the secondary recorder.
        let local: Vec<f64> = seconds(0..12)
            .iter()
            .enumerate()
            .filter(|(k, _)| k % 3 != 2)
            .map(|(_, t)| t - 0.25)
            .collect();
        let secondary = train(&local);

        let result = align(&id(), &reference, &secondary, &AlignmentSettings::default()).unwrap();

        assert_eq!(result.matched_edge_count, 8);
        assert!((result.mapping.offset_sec - 0.25).abs() < 0.001);
        assert!((result.mapping.scale - 1.0).abs() < 0.001);
    }

    #[test]
    fn implausible_scale_is_rejected() {
        // Secondary recorded at 1.5x the reference rate with aperiodic pulse
        // gaps, so no subsampled interpretation at scale ~1 exists.
        let ref_times = [0.0, 1.1, 2.3, 3.6, 5.0, 6.5, 8.1, 9.8, 11.6, 13.5];
        let local: Vec<f64> = ref_times.iter().map(|r| (r - 0.2) / 1.5).collect();
        let reference = train(&ref_times);
        let secondary = train(&local);

        let err = align(&id(), &reference, &secondary, &AlignmentSettings::default()).unwrap_err();
        assert!(
            matches!(
                err,
                SyncError::ImplausibleScale { .. } | SyncError::TooFewMatches { .. }
            ),
            "unexpected error {err:?}"
        );
    }

    #[test]
    fn scale_just_outside_window_is_rejected() {
        // 1.5% drift: enough early matches to recover the true slope, which
        // then trips the plausibility gate.
        let ref_times: Vec<f64> = (0..10).map(|k| k as f64 * 0.1).collect();
        let local: Vec<f64> = ref_times.iter().map(|r| (r - 0.001) / 1.015).collect();
        let reference = train(&ref_times);
        let secondary = train(&local);

        let err = align(&id(), &reference, &secondary, &AlignmentSettings::default()).unwrap_err();
        assert!(
            matches!(err, SyncError::ImplausibleScale { scale, .. } if (scale - 1.015).abs() < 0.005),
            "unexpected error {err:?}"
        );
    }

    #[test]
    fn too_few_edges_fail() {
        let reference = train(&[0.0, 5.0]);
        let secondary = train(&[0.0, 5.0]);

        // Two pairs match perfectly but stay below the three-pair minimum.
        let err = align(&id(), &reference, &secondary, &AlignmentSettings::default()).unwrap_err();
        assert!(matches!(err, SyncError::TooFewMatches { matched: 2, .. }));
    }

    #[test]
    fn nearest_index_picks_closest() {
        let sorted = [0.0, 1.0, 2.0, 3.0];
        assert_eq!(nearest_index(&sorted, -5.0), 0);
        assert_eq!(nearest_index(&sorted, 0.4), 0);
        assert_eq!(nearest_index(&sorted, 0.6), 1);
        assert_eq!(nearest_index(&sorted, 2.5), 2);
        assert_eq!(nearest_index(&sorted, 99.0), 3);
    }

    #[test]
    fn linear_regression_fits_exact_line() {
        let x = vec![0.0, 1.0, 2.0, 3.0, 4.0];
        let y: Vec<f64> = x.iter().map(|v| 2.0 * v + 10.0).collect();

        let (slope, intercept, r_squared) = linear_regression(&x, &y);
        assert!((slope - 2.0).abs() < 1e-9);
        assert!((intercept - 10.0).abs() < 1e-9);
        assert!((r_squared - 1.0).abs() < 1e-9);
    }
}
