//! Sub-bin peak refinement for the coarse correlation stage.
//!
//! Uses quadratic (parabolic) interpolation over the peak and its two
//! neighbors to locate the true maximum between grid bins.

/// Refine a discrete correlation peak to a fractional index.
///
/// Fits a parabola through `(peak_index - 1, peak_index, peak_index + 1)` and
/// returns the fractional index of its maximum. At the array edges no
/// interpolation is possible and the discrete index is returned.
pub(crate) fn refine_peak(correlation: &[f64], peak_index: usize) -> f64 {
    if peak_index == 0 || peak_index >= correlation.len().saturating_sub(1) {
        return peak_index as f64;
    }

    let y0 = correlation[peak_index - 1];
    let y1 = correlation[peak_index];
    let y2 = correlation[peak_index + 1];

    // Parabola through three points: peak at x = -b / 2a with
    // a = (y0 + y2)/2 - y1, b = (y2 - y0)/2.
    let a = (y0 + y2) / 2.0 - y1;
    let b = (y2 - y0) / 2.0;

    let delta = if a.abs() > 1e-12 { -b / (2.0 * a) } else { 0.0 };

    // A real peak keeps the refinement inside one bin of the discrete maximum.
    peak_index as f64 + delta.clamp(-1.0, 1.0)
}
