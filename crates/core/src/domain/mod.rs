//! Domain entities and business rules

pub mod clip;
pub mod error;
pub mod event;
pub mod factory;
pub mod ids;
pub mod snapshot;
pub mod track;

// Re-export specific items to avoid ambiguous glob imports
pub use clip::{
    AudioClip, Clip, ClipKind, FadeCurve, FadeSettings, MidiClip, MidiNote, TimeSignature,
    spans_overlap,
};
pub use error::{DomainError, FieldError, Result, ValidationReport};
pub use event::{DomainEvent, EventPayload};
pub use factory::TrackFactory;
pub use ids::{ClipId, TrackId};
pub use snapshot::{ArrangementFile, ClipSnapshot, SnapshotError, TrackSnapshot};
pub use track::{
    AudioTrack, BusTrack, MidiTrack, PluginReference, ReturnSetting, SendSetting, Track,
    TrackRouting, TrackType, MAX_PLUGINS, MAX_VOLUME, MIN_VOLUME,
};
