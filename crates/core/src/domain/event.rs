//! Domain events
//!
//! An event is an immutable record of a state transition that already
//! happened: which aggregate it concerns, when it occurred, and a payload
//! scoped to that transition. Handlers publish events after a successful
//! save; nothing in the core consumes them.

use crate::domain::clip::{ClipKind, FadeSettings, MidiNote};
use crate::domain::ids::{ClipId, TrackId};
use crate::domain::track::{TrackRouting, TrackType};
use serde::{Deserialize, Serialize};
use std::time::SystemTime;

/// Payload of a single state transition
///
/// Closed set; the serde tag doubles as the wire discriminant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum EventPayload {
    TrackCreated {
        name: String,
        track_type: TrackType,
    },
    TrackRenamed {
        old_name: String,
        new_name: String,
    },
    TrackDeleted,
    TrackCloned {
        source_id: TrackId,
    },
    TrackVolumeChanged {
        old_volume: f32,
        new_volume: f32,
    },
    TrackMuteChanged {
        old_muted: bool,
        new_muted: bool,
    },
    TrackSoloChanged {
        old_solo: bool,
        new_solo: bool,
    },
    TrackRoutingChanged {
        old_routing: TrackRouting,
        new_routing: TrackRouting,
    },
    PluginAdded {
        plugin: String,
    },
    PluginRemoved {
        plugin: String,
    },
    TrackClipAdded {
        clip_id: ClipId,
    },
    TrackClipRemoved {
        clip_id: ClipId,
    },
    ClipMoved {
        clip_id: ClipId,
        from_track: TrackId,
        to_track: TrackId,
    },
    ClipCopied {
        source_clip: ClipId,
        new_clip: ClipId,
        to_track: TrackId,
    },
    SendAdded {
        target: TrackId,
    },
    SendRemoved {
        target: TrackId,
    },
    ReturnAdded {
        source: TrackId,
    },
    ReturnRemoved {
        source: TrackId,
    },
    InputTrackAdded {
        input: TrackId,
    },
    InputTrackRemoved {
        input: TrackId,
    },
    ClipCreated {
        kind: ClipKind,
    },
    ClipDeleted,
    ClipGainChanged {
        old_gain: f32,
        new_gain: f32,
    },
    ClipStartChanged {
        old_start: f64,
        new_start: f64,
    },
    ClipFadeInChanged {
        fade: Option<FadeSettings>,
    },
    ClipFadeOutChanged {
        fade: Option<FadeSettings>,
    },
    NoteAdded {
        index: usize,
        note: MidiNote,
    },
    NoteUpdated {
        index: usize,
        old_note: MidiNote,
        new_note: MidiNote,
    },
    NoteRemoved {
        index: usize,
        note: MidiNote,
    },
}

impl EventPayload {
    /// Colon-namespaced kind string for this transition
    pub fn kind(&self) -> &'static str {
        match self {
            EventPayload::TrackCreated { .. } => "track:created",
            EventPayload::TrackRenamed { .. } => "track:renamed",
            EventPayload::TrackDeleted => "track:deleted",
            EventPayload::TrackCloned { .. } => "track:cloned",
            EventPayload::TrackVolumeChanged { .. } => "track:volume:changed",
            EventPayload::TrackMuteChanged { .. } => "track:mute:changed",
            EventPayload::TrackSoloChanged { .. } => "track:solo:changed",
            EventPayload::TrackRoutingChanged { .. } => "track:routing:changed",
            EventPayload::PluginAdded { .. } => "track:plugin:added",
            EventPayload::PluginRemoved { .. } => "track:plugin:removed",
            EventPayload::TrackClipAdded { .. } => "track:clip:added",
            EventPayload::TrackClipRemoved { .. } => "track:clip:removed",
            EventPayload::ClipMoved { .. } => "track:clip:moved",
            EventPayload::ClipCopied { .. } => "track:clip:copied",
            EventPayload::SendAdded { .. } => "track:send:added",
            EventPayload::SendRemoved { .. } => "track:send:removed",
            EventPayload::ReturnAdded { .. } => "track:return:added",
            EventPayload::ReturnRemoved { .. } => "track:return:removed",
            EventPayload::InputTrackAdded { .. } => "track:input:added",
            EventPayload::InputTrackRemoved { .. } => "track:input:removed",
            EventPayload::ClipCreated { .. } => "clip:created",
            EventPayload::ClipDeleted => "clip:deleted",
            EventPayload::ClipGainChanged { .. } => "clip:gain:changed",
            EventPayload::ClipStartChanged { .. } => "clip:start:changed",
            EventPayload::ClipFadeInChanged { .. } => "clip:fade_in:changed",
            EventPayload::ClipFadeOutChanged { .. } => "clip:fade_out:changed",
            EventPayload::NoteAdded { .. } => "clip:note:added",
            EventPayload::NoteUpdated { .. } => "clip:note:updated",
            EventPayload::NoteRemoved { .. } => "clip:note:removed",
        }
    }
}

/// An immutable record of a completed state transition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainEvent {
    aggregate_id: String,
    occurred_at: SystemTime,
    payload: EventPayload,
}

impl DomainEvent {
    pub fn for_track(track_id: TrackId, payload: EventPayload) -> Self {
        Self::new(track_id.to_string(), payload)
    }

    pub fn for_clip(clip_id: ClipId, payload: EventPayload) -> Self {
        Self::new(clip_id.to_string(), payload)
    }

    fn new(aggregate_id: String, payload: EventPayload) -> Self {
        Self {
            aggregate_id,
            occurred_at: SystemTime::now(),
            payload,
        }
    }

    pub fn kind(&self) -> &'static str {
        self.payload.kind()
    }

    pub fn aggregate_id(&self) -> &str {
        &self.aggregate_id
    }

    pub fn occurred_at(&self) -> SystemTime {
        self.occurred_at
    }

    pub fn payload(&self) -> &EventPayload {
        &self.payload
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_strings() {
        let id = TrackId::new();
        let event = DomainEvent::for_track(
            id,
            EventPayload::TrackCreated {
                name: "Guitar".to_string(),
                track_type: TrackType::Audio,
            },
        );
        assert_eq!(event.kind(), "track:created");
        assert_eq!(event.aggregate_id(), id.to_string());
    }

    #[test]
    fn test_rename_carries_old_and_new() {
        let event = DomainEvent::for_track(
            TrackId::new(),
            EventPayload::TrackRenamed {
                old_name: "Guitar".to_string(),
                new_name: "Lead".to_string(),
            },
        );
        match event.payload() {
            EventPayload::TrackRenamed { old_name, new_name } => {
                assert_eq!(old_name, "Guitar");
                assert_eq!(new_name, "Lead");
            }
            other => panic!("unexpected payload: {other:?}"),
        }
    }

    #[test]
    fn test_event_serializes_with_discriminant() {
        let event = DomainEvent::for_clip(ClipId::new(), EventPayload::ClipDeleted);
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"event\":\"clip_deleted\""));

        let back: DomainEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(back, event);
    }
}
