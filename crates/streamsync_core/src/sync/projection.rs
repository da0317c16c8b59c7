//! Projection of local-clock events onto the reference clock.
//!
//! Pure application of a fitted affine time mapping to each event. Order is
//! preserved and nothing is filtered: whether a projected annotation falls
//! inside the reference recording's range is the caller's concern.

use crate::models::{Annotation, CameraEvent, TimeMapping};

/// Project events from a secondary stream's local clock onto the reference
/// clock.
///
/// Onsets go through the affine map; interval lengths scale with the clock
/// rate, so an event spanning `[t, t + d]` locally lands on
/// `[f(t), f(t) + scale * d]`.
pub fn project(events: &[CameraEvent], mapping: &TimeMapping) -> Vec<Annotation> {
    events
        .iter()
        .map(|event| Annotation {
            onset_sec: mapping.to_reference(event.timestamp_sec),
            duration_sec: event.duration_sec * mapping.scale,
            label: event.label.clone(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_mapping_projects_unchanged() {
        let events = vec![
            CameraEvent::new(1.5, "blink"),
            CameraEvent::new(3.0, "reach").with_duration(0.4),
        ];

        let annotations = project(&events, &TimeMapping::identity());

        assert_eq!(annotations.len(), 2);
        assert_eq!(annotations[0].onset_sec, 1.5);
        assert_eq!(annotations[1].onset_sec, 3.0);
        assert_eq!(annotations[1].duration_sec, 0.4);
        assert_eq!(annotations[1].label, "reach");
    }

    #[test]
    fn projection_applies_affine_map() {
        let mapping = TimeMapping::new(0.25, 1.0001);
        let events = vec![CameraEvent::new(10.0, "trial")];

        let annotations = project(&events, &mapping);

        assert!((annotations[0].onset_sec - (1.0001 * 10.0 + 0.25)).abs() < 1e-9);
    }

    #[test]
    fn durations_scale_with_clock_rate() {
        let mapping = TimeMapping::new(0.0, 1.001);
        let events = vec![CameraEvent::new(0.0, "span").with_duration(2.0)];

        let annotations = project(&events, &mapping);
        assert!((annotations[0].duration_sec - 2.002).abs() < 1e-9);
    }

    #[test]
    fn order_is_preserved_and_nothing_is_filtered() {
        // Out-of-range (negative) timestamps pass through untouched.
        let mapping = TimeMapping::new(-5.0, 1.0);
        let events = vec![
            CameraEvent::new(1.0, "a"),
            CameraEvent::new(2.0, "b"),
            CameraEvent::new(3.0, "c"),
        ];

        let annotations = project(&events, &mapping);

        let labels: Vec<&str> = annotations.iter().map(|a| a.label.as_str()).collect();
        assert_eq!(labels, vec!["a", "b", "c"]);
        assert!(annotations[0].onset_sec < 0.0);
    }

    #[test]
    fn empty_events_project_to_empty() {
        let annotations = project(&[], &TimeMapping::identity());
        assert!(annotations.is_empty());
    }
}
