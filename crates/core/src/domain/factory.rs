//! Track construction and cloning, keyed by track type

use crate::domain::error::{DomainError, Result};
use crate::domain::ids::TrackId;
use crate::domain::track::{
    AudioTrack, BusTrack, MidiTrack, PluginReference, Track, TrackRouting, TrackType,
};
use tracing::debug;

/// Builds tracks of one fixed type
///
/// A factory handle is obtained per type; cloning through a handle whose
/// type does not match the source is rejected.
#[derive(Debug, Clone, Copy)]
pub struct TrackFactory {
    track_type: TrackType,
}

impl TrackFactory {
    pub fn new(track_type: TrackType) -> Self {
        Self { track_type }
    }

    pub fn track_type(&self) -> TrackType {
        self.track_type
    }

    /// Create a track with a fresh id
    pub fn create(
        &self,
        name: &str,
        routing: Option<TrackRouting>,
        plugins: Vec<PluginReference>,
    ) -> Result<Track> {
        self.create_with_id(TrackId::new(), name, routing, plugins)
    }

    /// Create a track with a caller-supplied id
    pub fn create_with_id(
        &self,
        id: TrackId,
        name: &str,
        routing: Option<TrackRouting>,
        plugins: Vec<PluginReference>,
    ) -> Result<Track> {
        let routing = routing.unwrap_or_default();
        let mut track = match self.track_type {
            TrackType::Audio => Track::Audio(AudioTrack::new(id, name, routing)?),
            TrackType::Midi => Track::Midi(MidiTrack::new(id, name, routing)?),
            TrackType::Bus => Track::Bus(BusTrack::new(id, name, routing)?),
        };
        for plugin in plugins {
            track.add_plugin(plugin)?;
        }
        debug!(track = %track.id(), track_type = %self.track_type, "Track created");
        Ok(track)
    }

    /// Clone a track's mix state and plugin chain under a new id
    ///
    /// Clip references are not carried over: a clip belongs to exactly
    /// one track, so duplicating content is the copy-clip operation's
    /// job. The source is left untouched.
    pub fn clone_from(&self, source: &Track, new_name: Option<&str>) -> Result<Track> {
        if source.track_type() != self.track_type {
            return Err(DomainError::invariant(format!(
                "cannot clone a {} track with a {} factory",
                source.track_type(),
                self.track_type
            )));
        }

        let name = new_name.unwrap_or_else(|| source.name());
        let mut clone = self.create(name, Some(source.routing().clone()), Vec::new())?;
        for plugin in source.plugins() {
            clone.add_plugin(plugin.clone())?;
        }
        if source.volume() != clone.volume() {
            clone.set_volume(source.volume())?;
        }
        if source.is_muted() {
            clone.set_muted(true);
        }
        if source.is_solo() {
            clone.set_solo(true);
        }
        // The clone starts its own history
        clone.reset_version();
        debug!(source = %source.id(), clone = %clone.id(), "Track cloned");
        Ok(clone)
    }
}
