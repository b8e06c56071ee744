//! Bus track: sends, returns, and input fan-in
//!
//! A bus holds no clips. It collects signal from up to 16 input tracks
//! and carries up to 8 send and 8 return settings, each keyed by the
//! track it points at and validated independently.

use crate::domain::error::{DomainError, Result};
use crate::domain::ids::TrackId;
use crate::domain::track::{TrackRouting, TrackState};
use serde::{Deserialize, Serialize};
use tracing::debug;

pub const MAX_SENDS: usize = 8;
pub const MAX_RETURNS: usize = 8;
pub const MAX_INPUT_TRACKS: usize = 16;

/// Send level/pan towards a target track
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SendSetting {
    target: TrackId,
    level: f32,
    pan: f32,
}

impl SendSetting {
    pub fn new(target: TrackId, level: f32, pan: f32) -> Result<Self> {
        validate_level_pan(level, pan)?;
        Ok(Self { target, level, pan })
    }

    pub fn target(&self) -> TrackId {
        self.target
    }

    pub fn level(&self) -> f32 {
        self.level
    }

    pub fn pan(&self) -> f32 {
        self.pan
    }
}

/// Return level/pan from a source track
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReturnSetting {
    source: TrackId,
    level: f32,
    pan: f32,
}

impl ReturnSetting {
    pub fn new(source: TrackId, level: f32, pan: f32) -> Result<Self> {
        validate_level_pan(level, pan)?;
        Ok(Self { source, level, pan })
    }

    pub fn source(&self) -> TrackId {
        self.source
    }

    pub fn level(&self) -> f32 {
        self.level
    }

    pub fn pan(&self) -> f32 {
        self.pan
    }
}

fn validate_level_pan(level: f32, pan: f32) -> Result<()> {
    if !level.is_finite() || !(0.0..=1.0).contains(&level) {
        return Err(DomainError::invariant(format!(
            "level must be between 0.0 and 1.0, got {level}"
        )));
    }
    if !pan.is_finite() || !(-1.0..=1.0).contains(&pan) {
        return Err(DomainError::invariant(format!(
            "pan must be between -1.0 and 1.0, got {pan}"
        )));
    }
    Ok(())
}

/// Bus track aggregate variant
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BusTrack {
    state: TrackState,
    sends: Vec<SendSetting>,
    returns: Vec<ReturnSetting>,
    input_tracks: Vec<TrackId>,
}

impl BusTrack {
    pub fn new(id: TrackId, name: &str, routing: TrackRouting) -> Result<Self> {
        Ok(Self {
            state: TrackState::new(id, name, routing)?,
            sends: Vec::new(),
            returns: Vec::new(),
            input_tracks: Vec::new(),
        })
    }

    pub(crate) fn restore(
        state: TrackState,
        sends: Vec<SendSetting>,
        returns: Vec<ReturnSetting>,
        input_tracks: Vec<TrackId>,
    ) -> Result<Self> {
        if sends.len() > MAX_SENDS
            || returns.len() > MAX_RETURNS
            || input_tracks.len() > MAX_INPUT_TRACKS
        {
            return Err(DomainError::invariant("bus settings exceed limits"));
        }
        Ok(Self {
            state,
            sends,
            returns,
            input_tracks,
        })
    }

    pub(crate) fn state(&self) -> &TrackState {
        &self.state
    }

    pub(crate) fn state_mut(&mut self) -> &mut TrackState {
        &mut self.state
    }

    pub fn sends(&self) -> &[SendSetting] {
        &self.sends
    }

    pub fn returns(&self) -> &[ReturnSetting] {
        &self.returns
    }

    pub fn input_tracks(&self) -> &[TrackId] {
        &self.input_tracks
    }

    pub fn add_send(&mut self, send: SendSetting) -> Result<()> {
        if self.sends.len() >= MAX_SENDS {
            return Err(DomainError::invariant(format!(
                "Cannot add more than {MAX_SENDS} sends"
            )));
        }
        if self.sends.iter().any(|s| s.target == send.target) {
            return Err(DomainError::invariant(format!(
                "send already exists for track: {}",
                send.target
            )));
        }
        debug!(bus = %self.state.id(), target = %send.target, "Send added");
        self.sends.push(send);
        self.state.bump();
        Ok(())
    }

    pub fn remove_send(&mut self, target: &TrackId) -> Result<()> {
        let position = self
            .sends
            .iter()
            .position(|s| s.target == *target)
            .ok_or_else(|| DomainError::invariant(format!("no send for track: {target}")))?;
        self.sends.remove(position);
        self.state.bump();
        Ok(())
    }

    pub fn add_return(&mut self, ret: ReturnSetting) -> Result<()> {
        if self.returns.len() >= MAX_RETURNS {
            return Err(DomainError::invariant(format!(
                "Cannot add more than {MAX_RETURNS} returns"
            )));
        }
        if self.returns.iter().any(|r| r.source == ret.source) {
            return Err(DomainError::invariant(format!(
                "return already exists for track: {}",
                ret.source
            )));
        }
        debug!(bus = %self.state.id(), source = %ret.source, "Return added");
        self.returns.push(ret);
        self.state.bump();
        Ok(())
    }

    pub fn remove_return(&mut self, source: &TrackId) -> Result<()> {
        let position = self
            .returns
            .iter()
            .position(|r| r.source == *source)
            .ok_or_else(|| DomainError::invariant(format!("no return for track: {source}")))?;
        self.returns.remove(position);
        self.state.bump();
        Ok(())
    }

    pub fn add_input_track(&mut self, input: TrackId) -> Result<()> {
        if self.input_tracks.len() >= MAX_INPUT_TRACKS {
            return Err(DomainError::invariant(format!(
                "Cannot add more than {MAX_INPUT_TRACKS} input tracks"
            )));
        }
        if self.input_tracks.contains(&input) {
            return Err(DomainError::invariant(format!(
                "input track already connected: {input}"
            )));
        }
        debug!(bus = %self.state.id(), input = %input, "Input track connected");
        self.input_tracks.push(input);
        self.state.bump();
        Ok(())
    }

    pub fn remove_input_track(&mut self, input: &TrackId) -> Result<()> {
        let position = self
            .input_tracks
            .iter()
            .position(|i| i == input)
            .ok_or_else(|| DomainError::invariant(format!("input track not connected: {input}")))?;
        self.input_tracks.remove(position);
        self.state.bump();
        Ok(())
    }
}
