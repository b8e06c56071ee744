//! Track aggregates and shared mixable state
//!
//! A track is the aggregate root of the arrangement model: it owns its
//! clip references, plugin chain, routing, and mix state. The three track
//! kinds (audio, MIDI, bus) share one `TrackState` and differ only in
//! which clips they accept and which extra settings they carry.
//!
//! Every mutator validates its arguments before touching state; a failed
//! call leaves the aggregate exactly as it was. Successful mutations bump
//! the version counter exactly once.

pub mod bus;

use crate::domain::clip::ClipKind;
use crate::domain::error::{DomainError, Result};
use crate::domain::ids::{ClipId, TrackId};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, trace};

pub use bus::{BusTrack, ReturnSetting, SendSetting};

/// Maximum number of plugins on a single track
pub const MAX_PLUGINS: usize = 10;

/// Inclusive linear volume range
pub const MIN_VOLUME: f32 = 0.0;
pub const MAX_VOLUME: f32 = 2.0;

/// Version every freshly constructed aggregate starts at
pub(crate) const BASE_VERSION: u64 = 1;

/// The closed set of track kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackType {
    Audio,
    Midi,
    Bus,
}

impl TrackType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrackType::Audio => "audio",
            TrackType::Midi => "midi",
            TrackType::Bus => "bus",
        }
    }
}

impl fmt::Display for TrackType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Input/output routing references, each side independently optional
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackRouting {
    #[serde(default)]
    pub input: Option<String>,
    #[serde(default)]
    pub output: Option<String>,
}

impl TrackRouting {
    pub fn new(input: Option<String>, output: Option<String>) -> Self {
        Self { input, output }
    }
}

/// Reference to a plugin in a track's chain
///
/// Equality is by value; a track rejects the same reference twice.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PluginReference(String);

impl PluginReference {
    pub fn new(reference: impl Into<String>) -> Result<Self> {
        let reference = reference.into();
        let trimmed = reference.trim();
        if trimmed.is_empty() {
            return Err(DomainError::validation("plugin", "must not be empty"));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PluginReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Mix state shared by every track kind
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackState {
    id: TrackId,
    name: String,
    routing: TrackRouting,
    plugins: Vec<PluginReference>,
    muted: bool,
    solo: bool,
    volume: f32,
    version: u64,
}

impl TrackState {
    fn new(id: TrackId, name: &str, routing: TrackRouting) -> Result<Self> {
        let name = valid_name(name)?;
        Ok(Self {
            id,
            name,
            routing,
            plugins: Vec::new(),
            muted: false,
            solo: false,
            volume: 1.0,
            version: BASE_VERSION,
        })
    }

    /// Rebuild state from persisted parts, re-validating every field
    pub(crate) fn restore(
        id: TrackId,
        name: &str,
        routing: TrackRouting,
        plugins: Vec<PluginReference>,
        muted: bool,
        solo: bool,
        volume: f32,
        version: u64,
    ) -> Result<Self> {
        let name = valid_name(name)?;
        if plugins.len() > MAX_PLUGINS {
            return Err(DomainError::invariant(format!(
                "Cannot add more than {MAX_PLUGINS} plugins"
            )));
        }
        for (i, plugin) in plugins.iter().enumerate() {
            if plugins[..i].contains(plugin) {
                return Err(DomainError::invariant(format!(
                    "plugin already on track: {plugin}"
                )));
            }
        }
        if !(MIN_VOLUME..=MAX_VOLUME).contains(&volume) {
            return Err(DomainError::invariant(format!(
                "volume must be between {MIN_VOLUME} and {MAX_VOLUME}, got {volume}"
            )));
        }
        Ok(Self {
            id,
            name,
            routing,
            plugins,
            muted,
            solo,
            volume,
            version: version.max(BASE_VERSION),
        })
    }

    pub fn id(&self) -> TrackId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn routing(&self) -> &TrackRouting {
        &self.routing
    }

    pub fn plugins(&self) -> &[PluginReference] {
        &self.plugins
    }

    pub fn is_muted(&self) -> bool {
        self.muted
    }

    pub fn is_solo(&self) -> bool {
        self.solo
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    fn bump(&mut self) {
        self.version += 1;
    }

    /// Drop back to the baseline version; used when a freshly built
    /// aggregate (a clone) must start its own history
    pub(crate) fn reset_version(&mut self) {
        self.version = BASE_VERSION;
    }

    fn rename(&mut self, name: &str) -> Result<()> {
        let name = valid_name(name)?;
        trace!(track = %self.id, old = %self.name, new = %name, "Renaming track");
        self.name = name;
        self.bump();
        Ok(())
    }

    fn set_volume(&mut self, volume: f32) -> Result<()> {
        if !volume.is_finite() || !(MIN_VOLUME..=MAX_VOLUME).contains(&volume) {
            return Err(DomainError::invariant(format!(
                "volume must be between {MIN_VOLUME} and {MAX_VOLUME}, got {volume}"
            )));
        }
        self.volume = volume;
        self.bump();
        Ok(())
    }

    fn set_muted(&mut self, muted: bool) {
        debug!(track = %self.id, muted, "Track mute changed");
        self.muted = muted;
        self.bump();
    }

    fn set_solo(&mut self, solo: bool) {
        debug!(track = %self.id, solo, "Track solo changed");
        self.solo = solo;
        self.bump();
    }

    fn set_routing(&mut self, routing: TrackRouting) {
        self.routing = routing;
        self.bump();
    }

    fn add_plugin(&mut self, plugin: PluginReference) -> Result<()> {
        if self.plugins.len() >= MAX_PLUGINS {
            return Err(DomainError::invariant(format!(
                "Cannot add more than {MAX_PLUGINS} plugins"
            )));
        }
        if self.plugins.contains(&plugin) {
            return Err(DomainError::invariant(format!(
                "plugin already on track: {plugin}"
            )));
        }
        debug!(track = %self.id, plugin = %plugin, "Plugin added");
        self.plugins.push(plugin);
        self.bump();
        Ok(())
    }

    fn remove_plugin(&mut self, plugin: &PluginReference) -> Result<()> {
        let position = self
            .plugins
            .iter()
            .position(|p| p == plugin)
            .ok_or_else(|| DomainError::invariant(format!("plugin not on track: {plugin}")))?;
        self.plugins.remove(position);
        self.bump();
        Ok(())
    }
}

fn valid_name(name: &str) -> Result<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(DomainError::invariant("track name must not be empty"));
    }
    Ok(trimmed.to_string())
}

fn unique_clips(clips: &[ClipId]) -> Result<()> {
    for (i, clip) in clips.iter().enumerate() {
        if clips[..i].contains(clip) {
            return Err(DomainError::invariant(format!(
                "duplicate clip on track: {clip}"
            )));
        }
    }
    Ok(())
}

/// Track holding audio clips
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioTrack {
    state: TrackState,
    clips: Vec<ClipId>,
}

impl AudioTrack {
    pub fn new(id: TrackId, name: &str, routing: TrackRouting) -> Result<Self> {
        Ok(Self {
            state: TrackState::new(id, name, routing)?,
            clips: Vec::new(),
        })
    }

    pub(crate) fn restore(state: TrackState, clips: Vec<ClipId>) -> Result<Self> {
        unique_clips(&clips)?;
        Ok(Self { state, clips })
    }

    pub fn clips(&self) -> &[ClipId] {
        &self.clips
    }

    /// Attach a clip id; re-adding an existing id is a silent no-op
    fn add_clip(&mut self, clip: ClipId) {
        if self.clips.contains(&clip) {
            trace!(track = %self.state.id, clip = %clip, "Clip already on track, ignoring");
            return;
        }
        self.clips.push(clip);
        self.state.bump();
    }

    fn remove_clip(&mut self, clip: &ClipId) -> Result<()> {
        let position = self
            .clips
            .iter()
            .position(|c| c == clip)
            .ok_or_else(|| DomainError::invariant(format!("clip not on track: {clip}")))?;
        self.clips.remove(position);
        self.state.bump();
        Ok(())
    }
}

/// Track holding MIDI clips
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MidiTrack {
    state: TrackState,
    clips: Vec<ClipId>,
}

impl MidiTrack {
    pub fn new(id: TrackId, name: &str, routing: TrackRouting) -> Result<Self> {
        Ok(Self {
            state: TrackState::new(id, name, routing)?,
            clips: Vec::new(),
        })
    }

    pub(crate) fn restore(state: TrackState, clips: Vec<ClipId>) -> Result<Self> {
        unique_clips(&clips)?;
        Ok(Self { state, clips })
    }

    pub fn clips(&self) -> &[ClipId] {
        &self.clips
    }

    fn add_clip(&mut self, clip: ClipId) {
        if self.clips.contains(&clip) {
            trace!(track = %self.state.id, clip = %clip, "Clip already on track, ignoring");
            return;
        }
        self.clips.push(clip);
        self.state.bump();
    }

    fn remove_clip(&mut self, clip: &ClipId) -> Result<()> {
        let position = self
            .clips
            .iter()
            .position(|c| c == clip)
            .ok_or_else(|| DomainError::invariant(format!("clip not on track: {clip}")))?;
        self.clips.remove(position);
        self.state.bump();
        Ok(())
    }
}

/// A track aggregate: one of the three closed kinds
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Track {
    Audio(AudioTrack),
    Midi(MidiTrack),
    Bus(BusTrack),
}

impl Track {
    pub fn track_type(&self) -> TrackType {
        match self {
            Track::Audio(_) => TrackType::Audio,
            Track::Midi(_) => TrackType::Midi,
            Track::Bus(_) => TrackType::Bus,
        }
    }

    fn state(&self) -> &TrackState {
        match self {
            Track::Audio(t) => &t.state,
            Track::Midi(t) => &t.state,
            Track::Bus(t) => t.state(),
        }
    }

    fn state_mut(&mut self) -> &mut TrackState {
        match self {
            Track::Audio(t) => &mut t.state,
            Track::Midi(t) => &mut t.state,
            Track::Bus(t) => t.state_mut(),
        }
    }

    pub fn id(&self) -> TrackId {
        self.state().id()
    }

    pub fn name(&self) -> &str {
        self.state().name()
    }

    pub fn routing(&self) -> &TrackRouting {
        self.state().routing()
    }

    pub fn plugins(&self) -> &[PluginReference] {
        self.state().plugins()
    }

    pub fn is_muted(&self) -> bool {
        self.state().is_muted()
    }

    pub fn is_solo(&self) -> bool {
        self.state().is_solo()
    }

    pub fn volume(&self) -> f32 {
        self.state().volume()
    }

    pub fn version(&self) -> u64 {
        self.state().version()
    }

    pub(crate) fn reset_version(&mut self) {
        self.state_mut().reset_version();
    }

    pub fn rename(&mut self, name: &str) -> Result<()> {
        self.state_mut().rename(name)
    }

    pub fn set_volume(&mut self, volume: f32) -> Result<()> {
        self.state_mut().set_volume(volume)
    }

    pub fn set_muted(&mut self, muted: bool) {
        self.state_mut().set_muted(muted);
    }

    pub fn set_solo(&mut self, solo: bool) {
        self.state_mut().set_solo(solo);
    }

    pub fn set_routing(&mut self, routing: TrackRouting) {
        self.state_mut().set_routing(routing);
    }

    pub fn add_plugin(&mut self, plugin: PluginReference) -> Result<()> {
        self.state_mut().add_plugin(plugin)
    }

    pub fn remove_plugin(&mut self, plugin: &PluginReference) -> Result<()> {
        self.state_mut().remove_plugin(plugin)
    }

    /// Clip ids on this track, in insertion order (always empty for a bus)
    pub fn clips(&self) -> &[ClipId] {
        match self {
            Track::Audio(t) => t.clips(),
            Track::Midi(t) => t.clips(),
            Track::Bus(_) => &[],
        }
    }

    /// Attach a clip of the given kind
    ///
    /// Audio tracks take audio clips, MIDI tracks take MIDI clips, and a
    /// bus takes none. A wrong-kind attempt is a kind-mismatch error, not
    /// a coercion.
    pub fn add_clip(&mut self, clip: ClipId, kind: ClipKind) -> Result<()> {
        match (self, kind) {
            (Track::Audio(t), ClipKind::Audio) => {
                t.add_clip(clip);
                Ok(())
            }
            (Track::Midi(t), ClipKind::Midi) => {
                t.add_clip(clip);
                Ok(())
            }
            (Track::Bus(_), _) => Err(DomainError::invariant("Bus tracks cannot hold clips")),
            (track, kind) => Err(DomainError::invariant(format!(
                "cannot place a {kind} clip on a {} track",
                track.track_type()
            ))),
        }
    }

    pub fn remove_clip(&mut self, clip: &ClipId) -> Result<()> {
        match self {
            Track::Audio(t) => t.remove_clip(clip),
            Track::Midi(t) => t.remove_clip(clip),
            Track::Bus(_) => Err(DomainError::invariant("Bus tracks cannot hold clips")),
        }
    }

    /// Access the bus-specific surface, failing on non-bus tracks
    pub fn as_bus(&self) -> Result<&BusTrack> {
        match self {
            Track::Bus(t) => Ok(t),
            other => Err(DomainError::invariant(format!(
                "track is a {} track, not a bus",
                other.track_type()
            ))),
        }
    }

    pub fn as_bus_mut(&mut self) -> Result<&mut BusTrack> {
        match self {
            Track::Bus(t) => Ok(t),
            other => Err(DomainError::invariant(format!(
                "track is a {} track, not a bus",
                other.track_type()
            ))),
        }
    }
}

/// Aggregate equality is identity by id, never field comparison
impl PartialEq for Track {
    fn eq(&self, other: &Self) -> bool {
        self.id() == other.id()
    }
}

impl Eq for Track {}
