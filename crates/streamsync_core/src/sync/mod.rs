//! The synchronization engine.
//!
//! This module contains the algorithmic core as pure functions that the
//! orchestrator composes together:
//!
//! 1. **Edge extraction** (`edges`): threshold raw pulse-channel samples into
//!    a discrete sequence of sub-sample-accurate edge timestamps.
//!
//! 2. **Coarse correlation** (`correlation`): FFT cross-correlation of binned
//!    edge trains to seed the relative offset.
//!
//! 3. **Alignment** (`aligner`): iterative reweighted least squares refining
//!    offset and clock-rate scale from matched edge pairs.
//!
//! 4. **Quality scoring** (`quality`): fold match ratio, residual RMS and
//!    scale plausibility into one confidence value.
//!
//! 5. **Event projection** (`projection`): map local-clock events onto the
//!    reference clock through the fitted mapping.
//!
//! # Usage
//!
//! ```ignore
//! use streamsync_core::config::Settings;
//! use streamsync_core::sync::{align, extract_edges, project, quality};
//!
//! let settings = Settings::default();
//! let ref_edges = extract_edges(ref_samples, 1000.0, None, &settings.edges)?;
//! let cam_edges = extract_edges(cam_samples, 44_100.0, None, &settings.edges)?;
//!
//! let result = align(&stream_id, &ref_edges, &cam_edges, &settings.alignment)?;
//! let confidence = quality::score(
//!     &result,
//!     &ref_edges,
//!     &cam_edges,
//!     settings.alignment.match_tolerance_sec(),
//!     &settings.quality,
//! );
//! let annotations = project(&events, &result.mapping);
//! ```

mod aligner;
mod correlation;
mod edges;
mod peak_fit;
mod projection;
pub mod quality;
mod types;

pub use aligner::align;
pub use edges::{estimate_threshold, extract_edges, MIN_EDGES};
pub use projection::project;
pub use quality::{is_accepted, score};
pub use types::{SyncError, SyncResult};
