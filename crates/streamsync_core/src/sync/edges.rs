//! Pulse edge extraction from raw samples.
//!
//! Converts a channel of raw numeric samples into a discrete sequence of
//! threshold-crossing edges. Edge times are linearly interpolated between the
//! bracketing samples for sub-sample precision, and crossings inside a
//! refractory window of the previous edge are treated as bounce and dropped.
//! Pure functions over sample slices, no I/O.

use crate::config::EdgeSettings;
use crate::models::{Polarity, PulseEdge};

use super::types::{SyncError, SyncResult};

/// Minimum number of edges required to fit offset plus scale.
pub const MIN_EDGES: usize = 2;

/// Estimate a crossing threshold from the signal itself.
///
/// Uses the midpoint of the lower/upper percentiles rather than raw min/max
/// so isolated outlier samples do not drag the threshold.
pub fn estimate_threshold(samples: &[f64], lower_percentile: f64, upper_percentile: f64) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }

    let mut sorted = samples.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let lo = percentile_of_sorted(&sorted, lower_percentile);
    let hi = percentile_of_sorted(&sorted, upper_percentile);
    (lo + hi) / 2.0
}

fn percentile_of_sorted(sorted: &[f64], pct: f64) -> f64 {
    let last = sorted.len() - 1;
    let idx = ((pct / 100.0) * last as f64).round() as usize;
    sorted[idx.min(last)]
}

/// Extract pulse edges from a channel of raw samples.
///
/// # Arguments
/// * `samples` - Raw channel samples
/// * `sample_rate_hz` - Sample rate of the channel
/// * `threshold` - Crossing threshold; estimated from the signal when `None`
/// * `settings` - Percentiles for threshold estimation and refractory period
///
/// # Returns
/// Strictly time-increasing edge sequence, or `InsufficientSignal` when fewer
/// than two edges were found.
pub fn extract_edges(
    samples: &[f64],
    sample_rate_hz: f64,
    threshold: Option<f64>,
    settings: &EdgeSettings,
) -> SyncResult<Vec<PulseEdge>> {
    let threshold = threshold.unwrap_or_else(|| {
        estimate_threshold(
            samples,
            settings.lower_percentile,
            settings.upper_percentile,
        )
    });
    let refractory_sec = settings.refractory_sec();

    let mut edges = Vec::new();
    let mut last_kept: Option<f64> = None;

    for i in 1..samples.len() {
        let prev = samples[i - 1];
        let cur = samples[i];

        let was_above = prev >= threshold;
        let is_above = cur >= threshold;
        if was_above == is_above {
            continue;
        }

        // Linear interpolation between the bracketing samples. The crossing
        // guarantees prev != cur, so the denominator is nonzero.
        let frac = (threshold - prev) / (cur - prev);
        let timestamp_sec = ((i - 1) as f64 + frac) / sample_rate_hz;

        if let Some(last) = last_kept {
            if timestamp_sec - last < refractory_sec {
                tracing::trace!(
                    "discarding bounce edge at {:.6}s ({:.3}ms after previous)",
                    timestamp_sec,
                    (timestamp_sec - last) * 1e3
                );
                continue;
            }
        }

        let polarity = if is_above {
            Polarity::Rising
        } else {
            Polarity::Falling
        };
        edges.push(PulseEdge::new(timestamp_sec, polarity));
        last_kept = Some(timestamp_sec);
    }

    if edges.len() < MIN_EDGES {
        return Err(SyncError::InsufficientSignal {
            found: edges.len(),
            required: MIN_EDGES,
        });
    }

    tracing::debug!(
        "extracted {} edges (threshold {:.4}, refractory {:.1}ms)",
        edges.len(),
        threshold,
        refractory_sec * 1e3
    );

    Ok(edges)
}
