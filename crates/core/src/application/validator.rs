//! Pre-flight validation of caller input
//!
//! One pure function per user-facing command shape. Each returns a
//! `ValidationReport` with field-level messages and never throws for
//! ordinary bad input. This is a different layer from the invariant
//! checks inside the entities: validators catch user-input-shaped errors
//! early with field detail; the entities stay correct regardless of what
//! called them.

use crate::domain::error::ValidationReport;
use crate::domain::track::{TrackRouting, MAX_VOLUME, MIN_VOLUME};

pub fn validate_create_track(name: &str) -> ValidationReport {
    let mut report = ValidationReport::new();
    check_name(&mut report, name);
    report
}

pub fn validate_rename_track(name: &str) -> ValidationReport {
    let mut report = ValidationReport::new();
    check_name(&mut report, name);
    report
}

pub fn validate_volume(volume: f32) -> ValidationReport {
    let mut report = ValidationReport::new();
    if !volume.is_finite() || !(MIN_VOLUME..=MAX_VOLUME).contains(&volume) {
        report.push(
            "volume",
            format!("must be between {MIN_VOLUME} and {MAX_VOLUME}"),
        );
    }
    report
}

pub fn validate_routing(routing: &TrackRouting) -> ValidationReport {
    let mut report = ValidationReport::new();
    if let Some(input) = &routing.input {
        if input.trim().is_empty() {
            report.push("routing.input", "must not be blank when set");
        }
    }
    if let Some(output) = &routing.output {
        if output.trim().is_empty() {
            report.push("routing.output", "must not be blank when set");
        }
    }
    report
}

pub fn validate_plugin(plugin: &str) -> ValidationReport {
    let mut report = ValidationReport::new();
    if plugin.trim().is_empty() {
        report.push("plugin", "must not be empty");
    }
    report
}

pub fn validate_audio_clip(
    sample_id: &str,
    start_time: f64,
    duration: f64,
    offset: f64,
) -> ValidationReport {
    let mut report = ValidationReport::new();
    if sample_id.trim().is_empty() {
        report.push("sample_id", "must not be empty");
    }
    if !start_time.is_finite() || start_time < 0.0 {
        report.push("start_time", "must be non-negative");
    }
    if !duration.is_finite() || duration <= 0.0 {
        report.push("duration", "must be positive");
    }
    if !offset.is_finite() || offset < 0.0 {
        report.push("offset", "must be non-negative");
    }
    report
}

pub fn validate_midi_clip(
    numerator: u32,
    denominator: u32,
    start_time: f64,
    duration: f64,
) -> ValidationReport {
    let mut report = ValidationReport::new();
    merge_time_signature(&mut report, numerator, denominator);
    if !start_time.is_finite() || start_time < 0.0 {
        report.push("start_time", "must be non-negative");
    }
    if !duration.is_finite() || duration <= 0.0 {
        report.push("duration", "must be positive");
    }
    report
}

pub fn validate_time_signature(numerator: u32, denominator: u32) -> ValidationReport {
    let mut report = ValidationReport::new();
    merge_time_signature(&mut report, numerator, denominator);
    report
}

pub fn validate_fade(duration: f64) -> ValidationReport {
    let mut report = ValidationReport::new();
    if !duration.is_finite() || duration <= 0.0 {
        report.push("fade.duration", "must be positive");
    }
    report
}

pub fn validate_note(
    note_number: u8,
    velocity: u8,
    start_time: f64,
    duration: f64,
) -> ValidationReport {
    let mut report = ValidationReport::new();
    if note_number > 127 {
        report.push("note_number", "must be between 0 and 127");
    }
    if velocity > 127 {
        report.push("velocity", "must be between 0 and 127");
    }
    if !start_time.is_finite() || start_time < 0.0 {
        report.push("start_time", "must be non-negative");
    }
    if !duration.is_finite() || duration <= 0.0 {
        report.push("duration", "must be positive");
    }
    report
}

pub fn validate_send_level_pan(level: f32, pan: f32) -> ValidationReport {
    let mut report = ValidationReport::new();
    if !level.is_finite() || !(0.0..=1.0).contains(&level) {
        report.push("level", "must be between 0.0 and 1.0");
    }
    if !pan.is_finite() || !(-1.0..=1.0).contains(&pan) {
        report.push("pan", "must be between -1.0 and 1.0");
    }
    report
}

fn check_name(report: &mut ValidationReport, name: &str) {
    if name.trim().is_empty() {
        report.push("name", "must not be empty");
    }
}

fn merge_time_signature(report: &mut ValidationReport, numerator: u32, denominator: u32) {
    if numerator == 0 {
        report.push("numerator", "must be positive");
    }
    if denominator == 0 || !denominator.is_power_of_two() {
        report.push("denominator", "must be a power of 2");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_track_name() {
        assert!(validate_create_track("Guitar").is_valid());
        assert!(validate_create_track("  Guitar  ").is_valid());

        let report = validate_create_track("   ");
        assert!(!report.is_valid());
        assert_eq!(report.errors()[0].field, "name");
    }

    #[test]
    fn test_volume_range() {
        assert!(validate_volume(0.0).is_valid());
        assert!(validate_volume(2.0).is_valid());
        assert!(!validate_volume(-0.01).is_valid());
        assert!(!validate_volume(2.01).is_valid());
        assert!(!validate_volume(f32::INFINITY).is_valid());
    }

    #[test]
    fn test_routing_blank_sides() {
        assert!(validate_routing(&TrackRouting::default()).is_valid());
        assert!(
            validate_routing(&TrackRouting::new(Some("in".to_string()), None)).is_valid()
        );
        let report = validate_routing(&TrackRouting::new(Some("  ".to_string()), None));
        assert!(!report.is_valid());
        assert_eq!(report.errors()[0].field, "routing.input");
    }

    #[test]
    fn test_audio_clip_collects_all_errors() {
        let report = validate_audio_clip("", -1.0, 0.0, -2.0);
        assert_eq!(report.errors().len(), 4);
    }

    #[test]
    fn test_midi_clip_time_signature() {
        assert!(validate_midi_clip(4, 4, 0.0, 8.0).is_valid());

        let report = validate_midi_clip(4, 3, 0.0, 8.0);
        assert!(!report.is_valid());
        assert_eq!(report.errors()[0].field, "denominator");
        assert_eq!(report.errors()[0].message, "must be a power of 2");
    }

    #[test]
    fn test_note_fields() {
        assert!(validate_note(60, 100, 0.0, 1.0).is_valid());
        assert!(!validate_note(200, 100, 0.0, 1.0).is_valid());
        assert!(!validate_note(60, 100, -1.0, 0.0).is_valid());
    }

    #[test]
    fn test_send_level_pan() {
        assert!(validate_send_level_pan(1.0, -1.0).is_valid());
        assert!(!validate_send_level_pan(1.5, 0.0).is_valid());
        assert!(!validate_send_level_pan(0.5, 2.0).is_valid());
    }
}
