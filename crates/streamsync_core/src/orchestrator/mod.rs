//! The registry-driven synchronization pipeline.
//!
//! For each secondary stream, independently: extract edges, align against the
//! reference, score, and project that stream's events onto the reference
//! clock. Per-stream work is pure computation over immutable inputs with no
//! shared mutable state, so the streams fan out across a rayon thread pool;
//! the collected report preserves caller-supplied stream order regardless of
//! completion order.
//!
//! Per-stream signal problems never escape as errors. Every secondary stream
//! supplied gets exactly one report entry: a successful alignment or a
//! failure record with a human-readable reason, so a caller synchronizing ten
//! streams can see that nine succeeded and act on the one that failed.

use std::collections::HashMap;

use rayon::prelude::*;

use crate::config::{ConfigError, Settings};
use crate::models::{
    CameraEvent, PulseEdge, Stream, StreamId, StreamRegistry, StreamReport, SyncReport,
};
use crate::sync::{align, extract_edges, project, quality, SyncError};

/// Synchronize every secondary stream in the registry against the reference.
///
/// `events_by_stream` carries each secondary's local-clock events; ids with
/// no entry simply get no annotations.
///
/// # Errors
/// Only invalid settings fail the call. Signal-quality problems, including an
/// unusable reference pulse channel, are reported per stream.
pub fn synchronize(
    registry: &StreamRegistry,
    events_by_stream: &HashMap<StreamId, Vec<CameraEvent>>,
    settings: &Settings,
) -> Result<SyncReport, ConfigError> {
    settings.validate()?;

    let reference = registry.reference();
    let reference_edges = match extract_edges(
        reference.pulse_samples(),
        reference.sample_rate_hz(),
        None,
        &settings.edges,
    ) {
        Ok(edges) => edges,
        Err(e) => {
            tracing::warn!("reference stream '{}' unusable: {}", reference.id(), e);
            let reason = format!("reference stream '{}': {e}", reference.id());
            let streams = registry
                .secondaries()
                .iter()
                .map(|s| StreamReport::failed(s.id().clone(), 0, 0, reason.clone()))
                .collect();
            return Ok(SyncReport::new(streams));
        }
    };

    tracing::info!(
        "synchronizing {} secondary streams against '{}' ({} reference edges)",
        registry.secondary_count(),
        reference.id(),
        reference_edges.len()
    );

    let streams: Vec<StreamReport> = registry
        .secondaries()
        .par_iter()
        .map(|stream| {
            let events = events_by_stream
                .get(stream.id())
                .map(Vec::as_slice)
                .unwrap_or(&[]);
            sync_stream(stream, &reference_edges, events, settings)
        })
        .collect();

    let report = SyncReport::new(streams);
    tracing::info!(
        "synchronization finished: {} accepted, {} failed",
        report.accepted_count(),
        report.failed_count()
    );

    Ok(report)
}

/// Run the full per-stream pipeline for one secondary.
fn sync_stream(
    stream: &Stream,
    reference_edges: &[PulseEdge],
    events: &[CameraEvent],
    settings: &Settings,
) -> StreamReport {
    let ref_count = reference_edges.len();

    let edges = match extract_edges(
        stream.pulse_samples(),
        stream.sample_rate_hz(),
        None,
        &settings.edges,
    ) {
        Ok(edges) => edges,
        Err(e) => {
            tracing::warn!("stream '{}' failed edge extraction: {}", stream.id(), e);
            let found = match e {
                SyncError::InsufficientSignal { found, .. } => found,
                _ => 0,
            };
            return StreamReport::failed(stream.id().clone(), ref_count, found, e.to_string());
        }
    };
    let edge_count = edges.len();

    let result = match align(stream.id(), reference_edges, &edges, &settings.alignment) {
        Ok(result) => result,
        Err(e) => {
            tracing::warn!("stream '{}' failed alignment: {}", stream.id(), e);
            return StreamReport::failed(stream.id().clone(), ref_count, edge_count, e.to_string());
        }
    };

    let confidence = quality::score(
        &result,
        reference_edges,
        &edges,
        settings.alignment.match_tolerance_sec(),
        &settings.quality,
    );
    let result = result.with_confidence(confidence);

    if !quality::is_accepted(confidence, &settings.quality) {
        tracing::warn!(
            "stream '{}' sync failed: confidence {:.3} below threshold {:.2}",
            stream.id(),
            confidence,
            settings.quality.acceptance_threshold
        );
        return StreamReport::rejected(
            result,
            ref_count,
            edge_count,
            format!(
                "confidence {confidence:.3} below acceptance threshold {:.2}",
                settings.quality.acceptance_threshold
            ),
        );
    }

    let annotations = project(events, &result.mapping);
    tracing::info!(
        "stream '{}' synchronized: offset {:.4}s, drift {:.1} ppm, confidence {:.3}, {} annotations",
        stream.id(),
        result.mapping.offset_sec,
        result.mapping.drift_ppm(),
        confidence,
        annotations.len()
    );

    StreamReport::accepted(result, ref_count, edge_count, annotations)
}
