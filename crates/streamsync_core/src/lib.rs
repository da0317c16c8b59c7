//! StreamSync Core - pulse-based multi-stream synchronization.
//!
//! Aligns independently-recorded data streams (a reference recording plus
//! camera-derived audio tracks and event logs) onto a single reference
//! timeline, using a shared pulse-sequence signal embedded in each stream.
//!
//! This crate contains the synchronization engine only, with zero UI and zero
//! file-format dependencies: readers for native containers, audio extraction,
//! plotting, and persistence all live upstream or downstream of it.
//!
//! # Pipeline
//!
//! ```no_run
//! use std::collections::HashMap;
//! use streamsync_core::config::Settings;
//! use streamsync_core::models::{Stream, StreamRegistry};
//! use streamsync_core::synchronize;
//!
//! # fn load_samples() -> Vec<f64> { Vec::new() }
//! let reference = Stream::new("meg", 1000.0, load_samples()).unwrap();
//! let camera = Stream::new("cam1", 44_100.0, load_samples()).unwrap();
//! let registry = StreamRegistry::new(reference, vec![camera]).unwrap();
//!
//! let report = synchronize(&registry, &HashMap::new(), &Settings::default()).unwrap();
//! for entry in &report.streams {
//!     println!("{}: confidence {:.3}", entry.stream_id, entry.confidence);
//! }
//! ```

pub mod config;
pub mod logging;
pub mod models;
pub mod orchestrator;
pub mod sync;

pub use orchestrator::synchronize;

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
