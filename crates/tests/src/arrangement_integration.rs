//! Integration tests for the arrangement model
//!
//! These tests drive complete scenarios through the mediator: track
//! lifecycle, clip placement, bus wiring, note editing, persistence,
//! and the event stream the handlers publish along the way.

use ostinato_core::application::ports::{ClipRepository, TrackRepository};
use ostinato_core::application::{Command, Mediator, NoteSpec, Query};
use ostinato_core::domain::error::DomainError;
use ostinato_core::domain::ids::{ClipId, TrackId};
use ostinato_core::domain::snapshot::ArrangementFile;
use ostinato_core::domain::track::bus::MAX_INPUT_TRACKS;
use ostinato_core::domain::TrackType;
use ostinato_infra::{MemoryClipRepository, MemoryEventBus, MemoryTrackRepository};
use std::sync::Arc;

struct Harness {
    mediator: Mediator,
    tracks: Arc<MemoryTrackRepository>,
    clips: Arc<MemoryClipRepository>,
    events: Arc<MemoryEventBus>,
}

fn harness() -> Harness {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    let tracks = Arc::new(MemoryTrackRepository::new());
    let clips = Arc::new(MemoryClipRepository::new());
    let events = Arc::new(MemoryEventBus::new());
    let mediator = Mediator::wire(tracks.clone(), clips.clone(), events.clone());
    Harness {
        mediator,
        tracks,
        clips,
        events,
    }
}

impl Harness {
    async fn create_track(&self, name: &str, track_type: TrackType) -> TrackId {
        self.mediator
            .dispatch(Command::CreateTrack {
                name: name.to_string(),
                track_type,
                routing: None,
            })
            .await
            .unwrap()
            .created_track()
            .unwrap()
    }

    async fn create_midi_clip(&self, track_id: TrackId, duration: f64) -> ClipId {
        self.mediator
            .dispatch(Command::CreateMidiClip {
                track_id,
                numerator: 4,
                denominator: 4,
                start_time: 0.0,
                duration,
            })
            .await
            .unwrap()
            .created_clip()
            .unwrap()
    }

    async fn event_kinds(&self) -> Vec<&'static str> {
        self.events
            .recorded()
            .await
            .iter()
            .map(|e| e.kind())
            .collect()
    }
}

fn note(start_time: f64, duration: f64) -> NoteSpec {
    NoteSpec {
        note_number: 60,
        velocity: 100,
        start_time,
        duration,
    }
}

// ============================================================================
// TRACK AND CLIP LIFECYCLE
// ============================================================================

#[tokio::test]
async fn test_guitar_session_flow_and_event_order() {
    let h = harness();
    let guitar = h.create_track("Guitar", TrackType::Audio).await;

    h.mediator
        .dispatch(Command::SetTrackVolume {
            track_id: guitar,
            volume: 0.8,
        })
        .await
        .unwrap();
    h.mediator
        .dispatch(Command::AddPlugin {
            track_id: guitar,
            plugin: "amp-sim".to_string(),
        })
        .await
        .unwrap();
    let clip = h
        .mediator
        .dispatch(Command::CreateAudioClip {
            track_id: guitar,
            sample_id: "riff-take-3".to_string(),
            start_time: 0.0,
            duration: 8.0,
            offset: 0.0,
        })
        .await
        .unwrap()
        .created_clip()
        .unwrap();

    assert_eq!(
        h.event_kinds().await,
        vec![
            "track:created",
            "track:volume:changed",
            "track:plugin:added",
            "clip:created",
            "track:clip:added",
        ]
    );

    let outcome = h
        .mediator
        .query(Query::GetTrackClips { track_id: guitar })
        .await
        .unwrap();
    let clips = outcome.as_clips().unwrap();
    assert_eq!(clips.len(), 1);
    assert_eq!(clips[0].id, clip.to_string());
    assert_eq!(clips[0].sample_id.as_deref(), Some("riff-take-3"));

    let outcome = h
        .mediator
        .query(Query::GetTrack { track_id: guitar })
        .await
        .unwrap();
    let track = outcome.as_track().unwrap();
    assert_eq!(track.volume, 0.8);
    assert_eq!(track.plugins, vec!["amp-sim".to_string()]);
}

#[tokio::test]
async fn test_delete_track_deletes_its_clips() {
    let h = harness();
    let keys = h.create_track("Keys", TrackType::Midi).await;
    let clip = h.create_midi_clip(keys, 8.0).await;

    h.mediator
        .dispatch(Command::DeleteTrack { track_id: keys })
        .await
        .unwrap();

    let err = h
        .mediator
        .query(Query::GetClip { clip_id: clip })
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::NotFound { .. }));
    assert!(h.event_kinds().await.contains(&"track:deleted"));
    assert!(h.event_kinds().await.contains(&"clip:deleted"));
}

#[tokio::test]
async fn test_clone_copies_settings_but_not_clips() {
    let h = harness();
    let source = h.create_track("Guitar", TrackType::Audio).await;
    h.mediator
        .dispatch(Command::SetTrackVolume {
            track_id: source,
            volume: 1.5,
        })
        .await
        .unwrap();
    h.mediator
        .dispatch(Command::AddPlugin {
            track_id: source,
            plugin: "amp-sim".to_string(),
        })
        .await
        .unwrap();
    h.mediator
        .dispatch(Command::CreateAudioClip {
            track_id: source,
            sample_id: "riff".to_string(),
            start_time: 0.0,
            duration: 4.0,
            offset: 0.0,
        })
        .await
        .unwrap();

    let copy = h
        .mediator
        .dispatch(Command::CloneTrack {
            track_id: source,
            new_name: Some("Guitar (copy)".to_string()),
        })
        .await
        .unwrap()
        .created_track()
        .unwrap();
    assert_ne!(copy, source);

    let outcome = h
        .mediator
        .query(Query::GetTrack { track_id: copy })
        .await
        .unwrap();
    let dto = outcome.as_track().unwrap();
    assert_eq!(dto.name, "Guitar (copy)");
    assert_eq!(dto.volume, 1.5);
    assert_eq!(dto.plugins, vec!["amp-sim".to_string()]);
    assert!(dto.clip_ids.is_empty());
    assert_eq!(dto.version, 1);
}

#[tokio::test]
async fn test_move_clip_between_tracks() {
    let h = harness();
    let from = h.create_track("Keys", TrackType::Midi).await;
    let to = h.create_track("Pads", TrackType::Midi).await;
    let clip = h.create_midi_clip(from, 8.0).await;

    h.mediator
        .dispatch(Command::MoveClip {
            clip_id: clip,
            from_track: from,
            to_track: to,
        })
        .await
        .unwrap();

    let from_clips = h
        .mediator
        .query(Query::GetTrackClips { track_id: from })
        .await
        .unwrap();
    assert!(from_clips.as_clips().unwrap().is_empty());

    let to_clips = h
        .mediator
        .query(Query::GetTrackClips { track_id: to })
        .await
        .unwrap();
    assert_eq!(to_clips.as_clips().unwrap().len(), 1);
    assert!(h.event_kinds().await.contains(&"track:clip:moved"));
}

#[tokio::test]
async fn test_move_clip_to_its_own_track_is_a_noop() {
    let h = harness();
    let keys = h.create_track("Keys", TrackType::Midi).await;
    let clip = h.create_midi_clip(keys, 8.0).await;
    let events_before = h.event_kinds().await.len();

    h.mediator
        .dispatch(Command::MoveClip {
            clip_id: clip,
            from_track: keys,
            to_track: keys,
        })
        .await
        .unwrap();

    // The clip stays put and nothing is published
    let clips = h
        .mediator
        .query(Query::GetTrackClips { track_id: keys })
        .await
        .unwrap();
    assert_eq!(clips.as_clips().unwrap().len(), 1);
    assert_eq!(h.event_kinds().await.len(), events_before);

    // The stored aggregate is untouched; a later write still lands
    h.mediator
        .dispatch(Command::RenameTrack {
            track_id: keys,
            name: "Lead Keys".to_string(),
        })
        .await
        .unwrap();
    let track = h.tracks.find_by_id(&keys).await.unwrap().unwrap();
    assert_eq!(track.name(), "Lead Keys");
    assert_eq!(track.clips().len(), 1);

    // Same-track move of a clip the track does not hold is an error
    let err = h
        .mediator
        .dispatch(Command::MoveClip {
            clip_id: ClipId::new(),
            from_track: keys,
            to_track: keys,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Invariant(_)));
}

#[tokio::test]
async fn test_copy_clip_duplicates_content_on_target() {
    let h = harness();
    let keys = h.create_track("Keys", TrackType::Midi).await;
    let pads = h.create_track("Pads", TrackType::Midi).await;
    let clip = h.create_midi_clip(keys, 8.0).await;
    h.mediator
        .dispatch(Command::AddNote {
            clip_id: clip,
            note: note(0.0, 1.0),
        })
        .await
        .unwrap();

    let copy = h
        .mediator
        .dispatch(Command::CopyClip {
            clip_id: clip,
            to_track: pads,
        })
        .await
        .unwrap()
        .created_clip()
        .unwrap();
    assert_ne!(copy, clip);

    let notes = h
        .mediator
        .query(Query::GetClipNotes { clip_id: copy })
        .await
        .unwrap();
    assert_eq!(notes.as_notes().unwrap().len(), 1);

    // The source keeps its own copy
    let notes = h
        .mediator
        .query(Query::GetClipNotes { clip_id: clip })
        .await
        .unwrap();
    assert_eq!(notes.as_notes().unwrap().len(), 1);
}

// ============================================================================
// VALIDATION AND INVARIANTS
// ============================================================================

#[tokio::test]
async fn test_volume_out_of_range_is_rejected_before_any_write() {
    let h = harness();
    let guitar = h.create_track("Guitar", TrackType::Audio).await;

    let err = h
        .mediator
        .dispatch(Command::SetTrackVolume {
            track_id: guitar,
            volume: 2.5,
        })
        .await
        .unwrap_err();
    match err {
        DomainError::Validation(report) => {
            assert_eq!(report.errors()[0].field, "volume");
        }
        other => panic!("expected a validation error, got {other:?}"),
    }

    let outcome = h
        .mediator
        .query(Query::GetTrack { track_id: guitar })
        .await
        .unwrap();
    assert_eq!(outcome.as_track().unwrap().volume, 1.0);
    assert_eq!(h.event_kinds().await, vec!["track:created"]);
}

#[tokio::test]
async fn test_duplicate_plugin_rejected_and_version_untouched() {
    let h = harness();
    let guitar = h.create_track("Guitar", TrackType::Audio).await;
    h.mediator
        .dispatch(Command::AddPlugin {
            track_id: guitar,
            plugin: "amp-sim".to_string(),
        })
        .await
        .unwrap();

    let before = h
        .mediator
        .query(Query::GetTrack { track_id: guitar })
        .await
        .unwrap()
        .as_track()
        .unwrap()
        .version;

    let err = h
        .mediator
        .dispatch(Command::AddPlugin {
            track_id: guitar,
            plugin: "amp-sim".to_string(),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Invariant(_)));

    let after = h
        .mediator
        .query(Query::GetTrack { track_id: guitar })
        .await
        .unwrap()
        .as_track()
        .unwrap()
        .version;
    assert_eq!(after, before);
}

#[tokio::test]
async fn test_bad_time_signature_creates_nothing() {
    let h = harness();
    let keys = h.create_track("Keys", TrackType::Midi).await;

    let err = h
        .mediator
        .dispatch(Command::CreateMidiClip {
            track_id: keys,
            numerator: 4,
            denominator: 3,
            start_time: 0.0,
            duration: 8.0,
        })
        .await
        .unwrap_err();
    match err {
        DomainError::Validation(report) => {
            assert_eq!(report.errors()[0].field, "denominator");
            assert_eq!(report.errors()[0].message, "must be a power of 2");
        }
        other => panic!("expected a validation error, got {other:?}"),
    }

    let outcome = h
        .mediator
        .query(Query::GetTrackClips { track_id: keys })
        .await
        .unwrap();
    assert!(outcome.as_clips().unwrap().is_empty());
    assert_eq!(h.event_kinds().await, vec!["track:created"]);
}

#[tokio::test]
async fn test_bus_rejects_seventeenth_input_track() {
    let h = harness();
    let bus = h.create_track("Mix Bus", TrackType::Bus).await;

    let mut inputs = Vec::new();
    for i in 0..=MAX_INPUT_TRACKS {
        inputs.push(h.create_track(&format!("Input {i}"), TrackType::Audio).await);
    }

    for input in inputs.iter().take(MAX_INPUT_TRACKS) {
        h.mediator
            .dispatch(Command::AddInputTrack {
                bus_id: bus,
                input: *input,
            })
            .await
            .unwrap();
    }

    let err = h
        .mediator
        .dispatch(Command::AddInputTrack {
            bus_id: bus,
            input: inputs[MAX_INPUT_TRACKS],
        })
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Cannot add more than 16 input tracks");

    let track = h.tracks.find_by_id(&bus).await.unwrap().unwrap();
    assert_eq!(track.as_bus().unwrap().input_tracks().len(), MAX_INPUT_TRACKS);
}

#[tokio::test]
async fn test_bus_cannot_hold_clips() {
    let h = harness();
    let bus = h.create_track("Mix Bus", TrackType::Bus).await;

    let err = h
        .mediator
        .dispatch(Command::CreateAudioClip {
            track_id: bus,
            sample_id: "riff".to_string(),
            start_time: 0.0,
            duration: 4.0,
            offset: 0.0,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Invariant(_)));
    assert!(err.to_string().contains("Bus tracks cannot hold clips"));

    // No orphaned clip may survive the failed placement
    let outcome = h
        .mediator
        .query(Query::GetTrackClips { track_id: bus })
        .await
        .unwrap();
    assert!(outcome.as_clips().unwrap().is_empty());
}

// ============================================================================
// NOTES AND OVERLAP
// ============================================================================

#[tokio::test]
async fn test_note_overlap_rejected_adjacent_allowed() {
    let h = harness();
    let keys = h.create_track("Keys", TrackType::Midi).await;
    let clip = h.create_midi_clip(keys, 8.0).await;

    h.mediator
        .dispatch(Command::AddNote {
            clip_id: clip,
            note: note(0.0, 1.0),
        })
        .await
        .unwrap();

    // [0.5, 1.5) intersects [0, 1)
    let err = h
        .mediator
        .dispatch(Command::AddNote {
            clip_id: clip,
            note: note(0.5, 1.0),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Invariant(_)));

    // [1, 2) only touches the boundary; half-open intervals do not overlap
    h.mediator
        .dispatch(Command::AddNote {
            clip_id: clip,
            note: note(1.0, 1.0),
        })
        .await
        .unwrap();

    let notes = h
        .mediator
        .query(Query::GetClipNotes { clip_id: clip })
        .await
        .unwrap();
    assert_eq!(notes.as_notes().unwrap().len(), 2);
}

#[tokio::test]
async fn test_note_fits_query_reads_failures_as_false() {
    let h = harness();
    let keys = h.create_track("Keys", TrackType::Midi).await;
    let clip = h.create_midi_clip(keys, 8.0).await;
    h.mediator
        .dispatch(Command::AddNote {
            clip_id: clip,
            note: note(0.0, 2.0),
        })
        .await
        .unwrap();

    let fits = |clip_id, start_time, duration| {
        h.mediator.query(Query::NoteFits {
            clip_id,
            start_time,
            duration,
        })
    };

    assert_eq!(fits(clip, 2.0, 1.0).await.unwrap().as_bool(), Some(true));
    assert_eq!(fits(clip, 1.0, 1.0).await.unwrap().as_bool(), Some(false));
    // Extends past the clip
    assert_eq!(fits(clip, 7.5, 1.0).await.unwrap().as_bool(), Some(false));
    // Missing clip
    assert_eq!(
        fits(ClipId::new(), 0.0, 1.0).await.unwrap().as_bool(),
        Some(false)
    );
}

#[tokio::test]
async fn test_update_note_may_keep_its_own_slot() {
    let h = harness();
    let keys = h.create_track("Keys", TrackType::Midi).await;
    let clip = h.create_midi_clip(keys, 8.0).await;
    h.mediator
        .dispatch(Command::AddNote {
            clip_id: clip,
            note: note(0.0, 1.0),
        })
        .await
        .unwrap();

    // Same span, new velocity: must not collide with itself
    h.mediator
        .dispatch(Command::UpdateNote {
            clip_id: clip,
            index: 0,
            note: NoteSpec {
                note_number: 62,
                velocity: 80,
                start_time: 0.0,
                duration: 1.0,
            },
        })
        .await
        .unwrap();

    let notes = h
        .mediator
        .query(Query::GetClipNotes { clip_id: clip })
        .await
        .unwrap();
    let notes = notes.as_notes().unwrap();
    assert_eq!(notes[0].note_number, 62);
    assert_eq!(notes[0].velocity, 80);
}

// ============================================================================
// PERSISTENCE AND CONCURRENCY
// ============================================================================

#[tokio::test]
async fn test_arrangement_snapshot_round_trip() {
    let h = harness();
    let guitar = h.create_track("Guitar", TrackType::Audio).await;
    h.mediator
        .dispatch(Command::CreateAudioClip {
            track_id: guitar,
            sample_id: "riff".to_string(),
            start_time: 1.0,
            duration: 4.0,
            offset: 0.5,
        })
        .await
        .unwrap();

    let track = h.tracks.find_by_id(&guitar).await.unwrap().unwrap();
    let clip_id = track.clips()[0];
    let clip = h.clips.find_by_id(&clip_id).await.unwrap().unwrap();

    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("session.toml");
    let file = ArrangementFile::capture([&track], [&clip]);
    file.save_to_file(&path).await.unwrap();

    let loaded = ArrangementFile::load_from_file(&path).await.unwrap();
    let tracks = loaded
        .tracks
        .iter()
        .map(|s| s.to_track().unwrap())
        .collect::<Vec<_>>();
    let clips = loaded
        .clips
        .iter()
        .map(|s| s.to_clip().unwrap())
        .collect::<Vec<_>>();

    assert_eq!(tracks[0], track);
    assert_eq!(tracks[0].name(), "Guitar");
    assert_eq!(tracks[0].version(), track.version());
    assert_eq!(clips[0].id(), clip.id());
    assert_eq!(clips[0].start_time(), 1.0);
}

#[tokio::test]
async fn test_stale_writer_loses_the_race() {
    let h = harness();
    let guitar = h.create_track("Guitar", TrackType::Audio).await;

    // Two writers load the same version
    let mut fast = h.tracks.find_by_id(&guitar).await.unwrap().unwrap();
    let mut slow = h.tracks.find_by_id(&guitar).await.unwrap().unwrap();

    // The fast writer lands two mutations before the slow one saves
    fast.set_volume(0.5).unwrap();
    fast.set_muted(true);
    h.tracks.save(&fast).await.unwrap();

    // The slow writer's copy is now behind the stored version
    slow.rename("Lead").unwrap();
    let err = h.tracks.save(&slow).await.unwrap_err();
    assert!(err.to_string().contains("stale write"));

    let stored = h.tracks.find_by_id(&guitar).await.unwrap().unwrap();
    assert_eq!(stored.name(), "Guitar");
    assert_eq!(stored.volume(), 0.5);
}
