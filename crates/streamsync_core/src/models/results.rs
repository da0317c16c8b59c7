//! Derived synchronization values: edges, time mappings, results, reports.
//!
//! Everything here is a pure-function output with no back-reference to the
//! streams that produced it. All types are immutable once produced and
//! serializable so downstream consumers (persistence, plotting) can take them
//! as JSON.

use serde::{Deserialize, Serialize};

use super::stream::StreamId;

/// Direction of a threshold crossing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Polarity {
    /// Signal crossed the threshold upward.
    Rising,
    /// Signal crossed the threshold downward.
    Falling,
}

/// A single detected pulse edge.
///
/// Edge sequences within a stream are strictly increasing in `timestamp_sec`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PulseEdge {
    /// Edge time on the stream's local clock, in seconds.
    pub timestamp_sec: f64,
    /// Crossing direction.
    pub polarity: Polarity,
}

impl PulseEdge {
    /// Create a new pulse edge.
    pub fn new(timestamp_sec: f64, polarity: Polarity) -> Self {
        Self {
            timestamp_sec,
            polarity,
        }
    }
}

/// Affine map from a stream's local clock to the reference clock:
/// `reference_time = scale * local_time + offset_sec`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeMapping {
    /// Constant offset in seconds.
    pub offset_sec: f64,
    /// Clock-rate scale factor. Strictly positive and close to 1.0 for any
    /// plausible device pair.
    pub scale: f64,
}

impl TimeMapping {
    /// Create a new time mapping.
    pub fn new(offset_sec: f64, scale: f64) -> Self {
        Self { offset_sec, scale }
    }

    /// The identity mapping (no offset, no drift).
    pub fn identity() -> Self {
        Self {
            offset_sec: 0.0,
            scale: 1.0,
        }
    }

    /// Map a local-clock time onto the reference clock.
    pub fn to_reference(&self, local_time_sec: f64) -> f64 {
        self.scale * local_time_sec + self.offset_sec
    }

    /// Clock drift expressed in parts per million.
    pub fn drift_ppm(&self) -> f64 {
        (self.scale - 1.0) * 1e6
    }
}

impl Default for TimeMapping {
    fn default() -> Self {
        Self::identity()
    }
}

/// Result of aligning one secondary stream against the reference.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlignmentResult {
    /// Id of the secondary stream.
    pub stream_id: StreamId,
    /// Fitted local-to-reference time mapping.
    pub mapping: TimeMapping,
    /// Confidence score in [0, 1].
    pub confidence: f64,
    /// Edge pairs surviving the final match tolerance.
    pub matched_edge_count: usize,
    /// Root-mean-square of matched-pair residuals after the final fit, in
    /// seconds.
    pub residual_rms_sec: f64,
}

impl AlignmentResult {
    /// Create a result with the confidence not yet scored.
    pub fn new(
        stream_id: StreamId,
        mapping: TimeMapping,
        matched_edge_count: usize,
        residual_rms_sec: f64,
    ) -> Self {
        Self {
            stream_id,
            mapping,
            confidence: 0.0,
            matched_edge_count,
            residual_rms_sec,
        }
    }

    /// Set the confidence score.
    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = confidence;
        self
    }
}

/// A timestamped event on a secondary stream's local clock.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CameraEvent {
    /// Event onset on the stream's local clock, in seconds.
    pub timestamp_sec: f64,
    /// Event duration in seconds (zero for instantaneous events).
    #[serde(default)]
    pub duration_sec: f64,
    /// Event label.
    pub label: String,
}

impl CameraEvent {
    /// Create an instantaneous event.
    pub fn new(timestamp_sec: f64, label: impl Into<String>) -> Self {
        Self {
            timestamp_sec,
            duration_sec: 0.0,
            label: label.into(),
        }
    }

    /// Set the event duration.
    pub fn with_duration(mut self, duration_sec: f64) -> Self {
        self.duration_sec = duration_sec;
        self
    }
}

/// A labeled interval expressed on the reference clock.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    /// Onset on the reference clock, in seconds.
    pub onset_sec: f64,
    /// Duration in seconds, never negative.
    pub duration_sec: f64,
    /// Annotation label.
    pub label: String,
}

/// Per-stream synchronization outcome.
///
/// Every secondary stream supplied to the pipeline gets exactly one report
/// entry: either a successful alignment with its quality score and projected
/// annotations, or a failure record with a human-readable reason and
/// `confidence = 0.0`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamReport {
    /// Id of the secondary stream.
    pub stream_id: StreamId,
    /// Alignment result, present when alignment succeeded.
    pub alignment: Option<AlignmentResult>,
    /// Confidence score in [0, 1]; 0.0 for failed streams.
    pub confidence: f64,
    /// Whether the score cleared the acceptance threshold.
    pub accepted: bool,
    /// Failure reason for streams that could not be aligned or were rejected
    /// by the quality gate.
    pub failure_reason: Option<String>,
    /// Events projected onto the reference clock. Empty when the stream was
    /// not accepted or had no events.
    pub annotations: Vec<Annotation>,
    /// Edges detected in the reference stream.
    pub reference_edge_count: usize,
    /// Edges detected in this stream.
    pub stream_edge_count: usize,
}

impl StreamReport {
    /// Create a report entry for an accepted alignment.
    pub fn accepted(
        result: AlignmentResult,
        reference_edge_count: usize,
        stream_edge_count: usize,
        annotations: Vec<Annotation>,
    ) -> Self {
        Self {
            stream_id: result.stream_id.clone(),
            confidence: result.confidence,
            alignment: Some(result),
            accepted: true,
            failure_reason: None,
            annotations,
            reference_edge_count,
            stream_edge_count,
        }
    }

    /// Create a report entry for an alignment that succeeded numerically but
    /// fell below the acceptance threshold.
    pub fn rejected(
        result: AlignmentResult,
        reference_edge_count: usize,
        stream_edge_count: usize,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            stream_id: result.stream_id.clone(),
            confidence: result.confidence,
            alignment: Some(result),
            accepted: false,
            failure_reason: Some(reason.into()),
            annotations: Vec::new(),
            reference_edge_count,
            stream_edge_count,
        }
    }

    /// Create a report entry for a stream that could not be aligned.
    pub fn failed(
        stream_id: StreamId,
        reference_edge_count: usize,
        stream_edge_count: usize,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            stream_id,
            alignment: None,
            confidence: 0.0,
            accepted: false,
            failure_reason: Some(reason.into()),
            annotations: Vec::new(),
            reference_edge_count,
            stream_edge_count,
        }
    }
}

/// Full synchronization report, one entry per secondary stream in
/// caller-supplied order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncReport {
    /// Per-stream outcomes.
    pub streams: Vec<StreamReport>,
}

impl SyncReport {
    /// Create a report from per-stream entries.
    pub fn new(streams: Vec<StreamReport>) -> Self {
        Self { streams }
    }

    /// Look up the report entry for a stream id.
    pub fn get(&self, id: &StreamId) -> Option<&StreamReport> {
        self.streams.iter().find(|r| &r.stream_id == id)
    }

    /// Number of streams that cleared the acceptance threshold.
    pub fn accepted_count(&self) -> usize {
        self.streams.iter().filter(|r| r.accepted).count()
    }

    /// Number of streams that failed alignment or were rejected.
    pub fn failed_count(&self) -> usize {
        self.streams.len() - self.accepted_count()
    }

    /// Whether every secondary stream was accepted.
    pub fn is_fully_synced(&self) -> bool {
        self.streams.iter().all(|r| r.accepted)
    }

    /// Number of report entries.
    pub fn len(&self) -> usize {
        self.streams.len()
    }

    /// Whether the report is empty.
    pub fn is_empty(&self) -> bool {
        self.streams.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_mapping_is_identity() {
        let mapping = TimeMapping::identity();
        assert_eq!(mapping.to_reference(12.345), 12.345);
        assert_eq!(mapping.drift_ppm(), 0.0);
    }

    #[test]
    fn mapping_applies_scale_and_offset() {
        let mapping = TimeMapping::new(0.25, 1.0001);
        let projected = mapping.to_reference(10.0);
        assert!((projected - 10.251).abs() < 1e-9);
    }

    #[test]
    fn drift_ppm_from_scale() {
        let mapping = TimeMapping::new(0.0, 1.0001);
        assert!((mapping.drift_ppm() - 100.0).abs() < 1e-6);
    }

    #[test]
    fn failed_report_has_zero_confidence() {
        let report = StreamReport::failed(StreamId::new("cam1"), 40, 0, "no pulse signal");
        assert_eq!(report.confidence, 0.0);
        assert!(!report.accepted);
        assert!(report.alignment.is_none());
        assert!(report.failure_reason.is_some());
    }

    #[test]
    fn sync_report_counts_outcomes() {
        let ok = AlignmentResult::new(StreamId::new("cam1"), TimeMapping::identity(), 20, 0.001)
            .with_confidence(0.95);
        let report = SyncReport::new(vec![
            StreamReport::accepted(ok, 20, 20, Vec::new()),
            StreamReport::failed(StreamId::new("cam2"), 20, 1, "insufficient signal"),
        ]);

        assert_eq!(report.len(), 2);
        assert_eq!(report.accepted_count(), 1);
        assert_eq!(report.failed_count(), 1);
        assert!(!report.is_fully_synced());
        assert!(report.get(&StreamId::new("cam2")).is_some());
    }

    #[test]
    fn report_round_trips_through_json() {
        let result = AlignmentResult::new(
            StreamId::new("cam1"),
            TimeMapping::new(0.25, 1.0001),
            18,
            0.0004,
        )
        .with_confidence(0.91);
        let report = SyncReport::new(vec![StreamReport::accepted(
            result,
            20,
            19,
            vec![Annotation {
                onset_sec: 1.5,
                duration_sec: 0.0,
                label: "trial_start".to_string(),
            }],
        )]);

        let json = serde_json::to_string(&report).unwrap();
        let back: SyncReport = serde_json::from_str(&json).unwrap();
        assert_eq!(back.len(), 1);
        let entry = &back.streams[0];
        assert!(entry.accepted);
        assert_eq!(entry.annotations.len(), 1);
        let mapping = entry.alignment.as_ref().unwrap().mapping;
        assert!((mapping.offset_sec - 0.25).abs() < 1e-12);
    }
}
