//! Error types for the synchronization engine.

use thiserror::Error;

/// Per-stream signal-quality failures.
///
/// These never escape the orchestration boundary: the pipeline converts them
/// into failure records inside the report so one bad stream cannot block the
/// others. `InsufficientSignal` comes out of pulse extraction; the remaining
/// variants come out of alignment.
#[derive(Debug, Clone, Error)]
pub enum SyncError {
    /// Pulse extraction found too few edges to fit offset and scale.
    #[error("insufficient pulse signal: found {found} edges, need at least {required}")]
    InsufficientSignal { found: usize, required: usize },

    /// Cross-correlation produced no usable peak between the edge trains.
    #[error("no correlation peak between edge trains")]
    NoCorrelationPeak,

    /// Too few edge pairs survived tolerance gating after refinement.
    #[error("only {matched} edge pairs matched after refinement, need at least {required}")]
    TooFewMatches { matched: usize, required: usize },

    /// The fitted clock scale is far enough from 1.0 to signal a bad match
    /// rather than legitimate drift.
    #[error("fitted clock scale {scale:.6} outside plausible range [{min}, {max}]")]
    ImplausibleScale { scale: f64, min: f64, max: f64 },
}

/// Result alias for engine-internal operations.
pub type SyncResult<T> = Result<T, SyncError>;
