//! Commands: immutable carriers of one mutation each
//!
//! A command holds exactly the parameters its handler needs and no
//! behavior. The `CommandKind` discriminant is what the mediator's
//! dispatch table is keyed by.

use crate::domain::clip::FadeCurve;
use crate::domain::ids::{ClipId, TrackId};
use crate::domain::track::{TrackRouting, TrackType};

/// Fade parameters as supplied by a caller, validated when applied
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FadeSpec {
    pub duration: f64,
    pub curve: FadeCurve,
}

/// Note parameters as supplied by a caller
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NoteSpec {
    pub note_number: u8,
    pub velocity: u8,
    pub start_time: f64,
    pub duration: f64,
}

/// Every mutation the arrangement model supports
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    // Track lifecycle
    CreateTrack {
        name: String,
        track_type: TrackType,
        routing: Option<TrackRouting>,
    },
    RenameTrack {
        track_id: TrackId,
        name: String,
    },
    DeleteTrack {
        track_id: TrackId,
    },
    CloneTrack {
        track_id: TrackId,
        new_name: Option<String>,
    },

    // Mix state
    SetTrackVolume {
        track_id: TrackId,
        volume: f32,
    },
    SetTrackMute {
        track_id: TrackId,
        muted: bool,
    },
    SetTrackSolo {
        track_id: TrackId,
        solo: bool,
    },
    ChangeTrackRouting {
        track_id: TrackId,
        routing: TrackRouting,
    },

    // Plugin chain
    AddPlugin {
        track_id: TrackId,
        plugin: String,
    },
    RemovePlugin {
        track_id: TrackId,
        plugin: String,
    },

    // Clip placement
    AddClipToTrack {
        track_id: TrackId,
        clip_id: ClipId,
    },
    RemoveClipFromTrack {
        track_id: TrackId,
        clip_id: ClipId,
    },
    MoveClip {
        clip_id: ClipId,
        from_track: TrackId,
        to_track: TrackId,
    },
    CopyClip {
        clip_id: ClipId,
        to_track: TrackId,
    },

    // Bus settings
    AddSend {
        bus_id: TrackId,
        target: TrackId,
        level: f32,
        pan: f32,
    },
    RemoveSend {
        bus_id: TrackId,
        target: TrackId,
    },
    AddReturn {
        bus_id: TrackId,
        source: TrackId,
        level: f32,
        pan: f32,
    },
    RemoveReturn {
        bus_id: TrackId,
        source: TrackId,
    },
    AddInputTrack {
        bus_id: TrackId,
        input: TrackId,
    },
    RemoveInputTrack {
        bus_id: TrackId,
        input: TrackId,
    },

    // Clip lifecycle
    CreateAudioClip {
        track_id: TrackId,
        sample_id: String,
        start_time: f64,
        duration: f64,
        offset: f64,
    },
    CreateMidiClip {
        track_id: TrackId,
        numerator: u32,
        denominator: u32,
        start_time: f64,
        duration: f64,
    },
    DeleteClip {
        track_id: TrackId,
        clip_id: ClipId,
    },

    // Clip state
    SetClipGain {
        clip_id: ClipId,
        gain: f32,
    },
    SetClipStart {
        clip_id: ClipId,
        start_time: f64,
    },
    SetFadeIn {
        clip_id: ClipId,
        fade: Option<FadeSpec>,
    },
    SetFadeOut {
        clip_id: ClipId,
        fade: Option<FadeSpec>,
    },

    // Notes
    AddNote {
        clip_id: ClipId,
        note: NoteSpec,
    },
    UpdateNote {
        clip_id: ClipId,
        index: usize,
        note: NoteSpec,
    },
    RemoveNote {
        clip_id: ClipId,
        index: usize,
    },
}

/// Discriminant used as the dispatch-table key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandKind {
    CreateTrack,
    RenameTrack,
    DeleteTrack,
    CloneTrack,
    SetTrackVolume,
    SetTrackMute,
    SetTrackSolo,
    ChangeTrackRouting,
    AddPlugin,
    RemovePlugin,
    AddClipToTrack,
    RemoveClipFromTrack,
    MoveClip,
    CopyClip,
    AddSend,
    RemoveSend,
    AddReturn,
    RemoveReturn,
    AddInputTrack,
    RemoveInputTrack,
    CreateAudioClip,
    CreateMidiClip,
    DeleteClip,
    SetClipGain,
    SetClipStart,
    SetFadeIn,
    SetFadeOut,
    AddNote,
    UpdateNote,
    RemoveNote,
}

impl Command {
    pub fn kind(&self) -> CommandKind {
        match self {
            Command::CreateTrack { .. } => CommandKind::CreateTrack,
            Command::RenameTrack { .. } => CommandKind::RenameTrack,
            Command::DeleteTrack { .. } => CommandKind::DeleteTrack,
            Command::CloneTrack { .. } => CommandKind::CloneTrack,
            Command::SetTrackVolume { .. } => CommandKind::SetTrackVolume,
            Command::SetTrackMute { .. } => CommandKind::SetTrackMute,
            Command::SetTrackSolo { .. } => CommandKind::SetTrackSolo,
            Command::ChangeTrackRouting { .. } => CommandKind::ChangeTrackRouting,
            Command::AddPlugin { .. } => CommandKind::AddPlugin,
            Command::RemovePlugin { .. } => CommandKind::RemovePlugin,
            Command::AddClipToTrack { .. } => CommandKind::AddClipToTrack,
            Command::RemoveClipFromTrack { .. } => CommandKind::RemoveClipFromTrack,
            Command::MoveClip { .. } => CommandKind::MoveClip,
            Command::CopyClip { .. } => CommandKind::CopyClip,
            Command::AddSend { .. } => CommandKind::AddSend,
            Command::RemoveSend { .. } => CommandKind::RemoveSend,
            Command::AddReturn { .. } => CommandKind::AddReturn,
            Command::RemoveReturn { .. } => CommandKind::RemoveReturn,
            Command::AddInputTrack { .. } => CommandKind::AddInputTrack,
            Command::RemoveInputTrack { .. } => CommandKind::RemoveInputTrack,
            Command::CreateAudioClip { .. } => CommandKind::CreateAudioClip,
            Command::CreateMidiClip { .. } => CommandKind::CreateMidiClip,
            Command::DeleteClip { .. } => CommandKind::DeleteClip,
            Command::SetClipGain { .. } => CommandKind::SetClipGain,
            Command::SetClipStart { .. } => CommandKind::SetClipStart,
            Command::SetFadeIn { .. } => CommandKind::SetFadeIn,
            Command::SetFadeOut { .. } => CommandKind::SetFadeOut,
            Command::AddNote { .. } => CommandKind::AddNote,
            Command::UpdateNote { .. } => CommandKind::UpdateNote,
            Command::RemoveNote { .. } => CommandKind::RemoveNote,
        }
    }
}

/// Plain result handed back through the mediator
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutcome {
    /// A new track aggregate was created
    TrackCreated(TrackId),
    /// A new clip aggregate was created
    ClipCreated(ClipId),
    /// The mutation completed with nothing to return
    Done,
}

impl CommandOutcome {
    pub fn created_track(&self) -> Option<TrackId> {
        match self {
            CommandOutcome::TrackCreated(id) => Some(*id),
            _ => None,
        }
    }

    pub fn created_clip(&self) -> Option<ClipId> {
        match self {
            CommandOutcome::ClipCreated(id) => Some(*id),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_matches_variant() {
        let cmd = Command::CreateTrack {
            name: "Guitar".to_string(),
            track_type: TrackType::Audio,
            routing: None,
        };
        assert_eq!(cmd.kind(), CommandKind::CreateTrack);

        let cmd = Command::RemoveNote {
            clip_id: ClipId::new(),
            index: 0,
        };
        assert_eq!(cmd.kind(), CommandKind::RemoveNote);
    }

    #[test]
    fn test_outcome_accessors() {
        let id = TrackId::new();
        assert_eq!(
            CommandOutcome::TrackCreated(id).created_track(),
            Some(id)
        );
        assert_eq!(CommandOutcome::Done.created_track(), None);
        assert_eq!(CommandOutcome::Done.created_clip(), None);
    }
}
