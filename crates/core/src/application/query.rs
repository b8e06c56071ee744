//! Queries and their read-only DTOs
//!
//! Queries never mutate. Each returns a plain data shape decoupled from
//! the live aggregates so callers cannot reach back into entity state.

use crate::domain::clip::{Clip, ClipKind, MidiNote};
use crate::domain::ids::{ClipId, TrackId};
use crate::domain::track::{Track, TrackRouting, TrackType};
use serde::{Deserialize, Serialize};

/// Every read the arrangement model supports
#[derive(Debug, Clone, PartialEq)]
pub enum Query {
    GetTrack {
        track_id: TrackId,
    },
    GetClip {
        clip_id: ClipId,
    },
    /// All clips placed on a track, loaded in placement order
    GetTrackClips {
        track_id: TrackId,
    },
    GetClipNotes {
        clip_id: ClipId,
    },
    /// Would a note with this span fit the clip right now? Failures of
    /// any kind (missing clip, wrong kind, overlap) read as `false`.
    NoteFits {
        clip_id: ClipId,
        start_time: f64,
        duration: f64,
    },
}

/// Discriminant used as the dispatch-table key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryKind {
    GetTrack,
    GetClip,
    GetTrackClips,
    GetClipNotes,
    NoteFits,
}

impl Query {
    pub fn kind(&self) -> QueryKind {
        match self {
            Query::GetTrack { .. } => QueryKind::GetTrack,
            Query::GetClip { .. } => QueryKind::GetClip,
            Query::GetTrackClips { .. } => QueryKind::GetTrackClips,
            Query::GetClipNotes { .. } => QueryKind::GetClipNotes,
            Query::NoteFits { .. } => QueryKind::NoteFits,
        }
    }
}

/// Read-only view of a track
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackDto {
    pub id: String,
    pub name: String,
    pub track_type: TrackType,
    pub routing: TrackRouting,
    pub plugins: Vec<String>,
    pub muted: bool,
    pub solo: bool,
    pub volume: f32,
    pub version: u64,
    pub clip_ids: Vec<String>,
}

impl From<&Track> for TrackDto {
    fn from(track: &Track) -> Self {
        Self {
            id: track.id().to_string(),
            name: track.name().to_string(),
            track_type: track.track_type(),
            routing: track.routing().clone(),
            plugins: track.plugins().iter().map(|p| p.as_str().to_string()).collect(),
            muted: track.is_muted(),
            solo: track.is_solo(),
            volume: track.volume(),
            version: track.version(),
            clip_ids: track.clips().iter().map(|c| c.to_string()).collect(),
        }
    }
}

/// Read-only view of a clip
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClipDto {
    pub id: String,
    pub kind: ClipKind,
    pub start_time: f64,
    pub duration: f64,
    pub gain: f32,
    pub version: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sample_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note_count: Option<usize>,
}

impl From<&Clip> for ClipDto {
    fn from(clip: &Clip) -> Self {
        let mut dto = Self {
            id: clip.id().to_string(),
            kind: clip.kind(),
            start_time: clip.start_time(),
            duration: clip.duration(),
            gain: clip.gain(),
            version: clip.version(),
            sample_id: None,
            offset: None,
            note_count: None,
        };
        match clip {
            Clip::Audio(audio) => {
                dto.sample_id = Some(audio.sample_id().to_string());
                dto.offset = Some(audio.offset());
            }
            Clip::Midi(midi) => {
                dto.note_count = Some(midi.notes().len());
            }
        }
        dto
    }
}

/// Read-only view of a note
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NoteDto {
    pub note_number: u8,
    pub velocity: u8,
    pub start_time: f64,
    pub duration: f64,
}

impl From<&MidiNote> for NoteDto {
    fn from(note: &MidiNote) -> Self {
        Self {
            note_number: note.note_number(),
            velocity: note.velocity(),
            start_time: note.start_time(),
            duration: note.duration(),
        }
    }
}

/// Plain result of a query
#[derive(Debug, Clone, PartialEq)]
pub enum QueryOutcome {
    Track(TrackDto),
    Clip(ClipDto),
    Clips(Vec<ClipDto>),
    Notes(Vec<NoteDto>),
    Bool(bool),
}

impl QueryOutcome {
    pub fn as_track(&self) -> Option<&TrackDto> {
        match self {
            QueryOutcome::Track(dto) => Some(dto),
            _ => None,
        }
    }

    pub fn as_clip(&self) -> Option<&ClipDto> {
        match self {
            QueryOutcome::Clip(dto) => Some(dto),
            _ => None,
        }
    }

    pub fn as_clips(&self) -> Option<&[ClipDto]> {
        match self {
            QueryOutcome::Clips(dtos) => Some(dtos),
            _ => None,
        }
    }

    pub fn as_notes(&self) -> Option<&[NoteDto]> {
        match self {
            QueryOutcome::Notes(dtos) => Some(dtos),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            QueryOutcome::Bool(value) => Some(*value),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::clip::{AudioClip, MidiClip, TimeSignature};
    use crate::domain::factory::TrackFactory;

    #[test]
    fn test_track_dto_captures_state() {
        let track = TrackFactory::new(TrackType::Audio)
            .create("Guitar", None, Vec::new())
            .unwrap();
        let dto = TrackDto::from(&track);
        assert_eq!(dto.name, "Guitar");
        assert_eq!(dto.track_type, TrackType::Audio);
        assert_eq!(dto.id, track.id().to_string());
        assert!(dto.clip_ids.is_empty());
    }

    #[test]
    fn test_clip_dto_per_kind() {
        let audio = Clip::Audio(AudioClip::new(ClipId::new(), "s1", 0.0, 4.0, 0.0).unwrap());
        let dto = ClipDto::from(&audio);
        assert_eq!(dto.sample_id.as_deref(), Some("s1"));
        assert_eq!(dto.note_count, None);

        let midi = Clip::Midi(
            MidiClip::new(ClipId::new(), TimeSignature::new(4, 4).unwrap(), 0.0, 4.0).unwrap(),
        );
        let dto = ClipDto::from(&midi);
        assert_eq!(dto.sample_id, None);
        assert_eq!(dto.note_count, Some(0));
    }

    #[test]
    fn test_query_kind() {
        let query = Query::GetTrack {
            track_id: TrackId::new(),
        };
        assert_eq!(query.kind(), QueryKind::GetTrack);
    }
}
