//! Coarse offset search between two pulse-edge trains.
//!
//! Discretizes both trains as impulse counts on a common fine time grid and
//! cross-correlates them with an FFT. The lag with the strongest correlation
//! seeds the alignment refinement; near-equal peaks (periodic pulse trains)
//! resolve toward the lag nearest zero, since secondary streams are assumed
//! to start close in time to the reference.

use rustfft::{num_complex::Complex, FftPlanner};

use crate::models::PulseEdge;

use super::peak_fit::refine_peak;
use super::types::{SyncError, SyncResult};

/// Peaks within this relative margin of the maximum count as ties.
const NEAR_TIE_REL: f64 = 1e-3;

/// Estimate the coarse time offset between two edge trains.
///
/// Returns the offset in seconds such that
/// `reference_time ≈ secondary_time + offset` at unit scale, refined below
/// bin resolution by parabolic peak interpolation.
pub(crate) fn coarse_offset(
    reference: &[PulseEdge],
    secondary: &[PulseEdge],
    bin_width_sec: f64,
) -> SyncResult<f64> {
    let (first_ref, last_ref) = match (reference.first(), reference.last()) {
        (Some(f), Some(l)) => (f.timestamp_sec, l.timestamp_sec),
        _ => return Err(SyncError::NoCorrelationPeak),
    };
    let (first_sec, last_sec) = match (secondary.first(), secondary.last()) {
        (Some(f), Some(l)) => (f.timestamp_sec, l.timestamp_sec),
        _ => return Err(SyncError::NoCorrelationPeak),
    };

    let t0 = first_ref.min(first_sec);
    let t_end = last_ref.max(last_sec);
    let n_bins = ((t_end - t0) / bin_width_sec).round() as usize + 1;

    let ref_train = bin_edges(reference, t0, bin_width_sec, n_bins);
    let sec_train = bin_edges(secondary, t0, bin_width_sec, n_bins);

    let correlation = cross_correlate(&ref_train, &sec_train);
    let center = correlation.len() / 2;

    let peak_value = correlation
        .iter()
        .cloned()
        .fold(f64::NEG_INFINITY, f64::max);
    if !(peak_value.is_finite() && peak_value > 0.5) {
        return Err(SyncError::NoCorrelationPeak);
    }

    // Among near-equal peaks, take the lag closest to zero.
    let cutoff = peak_value * (1.0 - NEAR_TIE_REL);
    let peak_index = correlation
        .iter()
        .enumerate()
        .filter(|(_, &v)| v >= cutoff)
        .min_by_key(|(i, _)| (*i as isize - center as isize).abs())
        .map(|(i, _)| i)
        .unwrap_or(center);

    let refined_index = refine_peak(&correlation, peak_index);
    let lag_bins = refined_index - center as f64;

    Ok(lag_bins * bin_width_sec)
}

/// Discretize an edge train as impulse counts on a fixed grid.
fn bin_edges(edges: &[PulseEdge], t0: f64, bin_width_sec: f64, n_bins: usize) -> Vec<f64> {
    let mut train = vec![0.0; n_bins];
    for edge in edges {
        let idx = ((edge.timestamp_sec - t0) / bin_width_sec).round() as usize;
        train[idx.min(n_bins - 1)] += 1.0;
    }
    train
}

/// FFT cross-correlation with a centered lag axis.
///
/// Output index `center + L` holds the correlation at lag `L` bins, where a
/// positive lag means the reference train sits later on the grid.
fn cross_correlate(reference: &[f64], secondary: &[f64]) -> Vec<f64> {
    // Pad so the full +/-(n-1) lag range exists without circular aliasing.
    let correlation_len = reference.len() + secondary.len() - 1;
    let fft_len = correlation_len.next_power_of_two();

    let mut planner = FftPlanner::<f64>::new();
    let fft = planner.plan_fft_forward(fft_len);
    let ifft = planner.plan_fft_inverse(fft_len);

    let mut ref_complex: Vec<Complex<f64>> =
        reference.iter().map(|&x| Complex::new(x, 0.0)).collect();
    ref_complex.resize(fft_len, Complex::new(0.0, 0.0));

    let mut sec_complex: Vec<Complex<f64>> =
        secondary.iter().map(|&x| Complex::new(x, 0.0)).collect();
    sec_complex.resize(fft_len, Complex::new(0.0, 0.0));

    fft.process(&mut ref_complex);
    fft.process(&mut sec_complex);

    // Correlation in the frequency domain: ref times conjugate of secondary.
    let mut product: Vec<Complex<f64>> = ref_complex
        .iter()
        .zip(sec_complex.iter())
        .map(|(a, b)| a * b.conj())
        .collect();

    ifft.process(&mut product);

    let scale = 1.0 / fft_len as f64;
    let correlation: Vec<f64> = product.iter().map(|c| c.re * scale).collect();

    // Rearrange so zero lag sits at the center index.
    let half = fft_len / 2;
    let mut centered = vec![0.0; fft_len];
    for (i, &value) in correlation.iter().enumerate() {
        centered[(i + half) % fft_len] = value;
    }

    centered
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

    #[test]
    fn identical_trains_have_zero_offset() {
        let edges = train(&[0.0, 1.0, 2.0, 3.0, 4.0, 5.0]);
        let offset = coarse_offset(&edges, &edges, 0.001).unwrap();
        assert!(offset.abs() < 0.001, "expected ~0, got {offset}");
    }

    #[test]
    fn recovers_known_offset() {
        let reference = train(&[0.25, 1.25, 2.25, 3.25, 4.25, 5.25]);
        let secondary = train(&[0.0, 1.0, 2.0, 3.0, 4.0, 5.0]);

        let offset = coarse_offset(&reference, &secondary, 0.001).unwrap();
        assert!(
            (offset - 0.25).abs() < 0.002,
            "expected ~0.25, got {offset}"
        );
    }

    #[test]
    fn recovers_negative_offset() {
        let reference = train(&[0.0, 1.0, 2.0, 3.0, 4.0, 5.0]);
        let secondary = train(&[0.4, 1.4, 2.4, 3.4, 4.4, 5.4]);

        let offset = coarse_offset(&reference, &secondary, 0.001).unwrap();
        assert!(
            (offset + 0.4).abs() < 0.002,
            "expected ~-0.4, got {offset}"
        );
    }

    #[test]
    fn tied_peaks_prefer_lag_nearest_zero() {
        // Two reference edges against a longer periodic train: lags 0, -1 and
        // -2 seconds all overlap both edges equally.
        let reference = train(&[0.0, 1.0]);
        let secondary = train(&[0.0, 1.0, 2.0, 3.0]);

        let offset = coarse_offset(&reference, &secondary, 0.01).unwrap();
        assert!(offset.abs() < 0.02, "expected ~0, got {offset}");
    }

    #[test]
    fn empty_train_is_an_error() {
        let edges = train(&[0.0, 1.0]);
        assert!(coarse_offset(&edges, &[], 0.001).is_err());
        assert!(coarse_offset(&[], &edges, 0.001).is_err());
    }
}
