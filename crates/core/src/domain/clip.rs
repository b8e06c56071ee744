//! Clip aggregates: audio clips, MIDI clips, and the note maths
//!
//! Clips are time-bounded segments placed on a track. Audio clips
//! reference a sample and may carry fades; MIDI clips own an ordered note
//! list guarded by half-open interval checks. All interval comparisons
//! use `[start, start + duration)` so that back-to-back notes touch
//! without overlapping.

use crate::domain::error::{DomainError, Result};
use crate::domain::ids::ClipId;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::trace;

use crate::domain::track::BASE_VERSION;

/// The closed set of clip kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClipKind {
    Audio,
    Midi,
}

impl fmt::Display for ClipKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClipKind::Audio => f.write_str("audio"),
            ClipKind::Midi => f.write_str("midi"),
        }
    }
}

/// Two half-open spans `[start, start + duration)` overlap iff each
/// starts before the other ends
pub fn spans_overlap(a_start: f64, a_duration: f64, b_start: f64, b_duration: f64) -> bool {
    a_start < b_start + b_duration && b_start < a_start + a_duration
}

/// Timing and gain state shared by both clip kinds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClipState {
    id: ClipId,
    start_time: f64,
    duration: f64,
    gain: f32,
    version: u64,
}

impl ClipState {
    fn new(id: ClipId, start_time: f64, duration: f64) -> Result<Self> {
        if !start_time.is_finite() || start_time < 0.0 {
            return Err(DomainError::invariant(format!(
                "clip start time must be non-negative, got {start_time}"
            )));
        }
        if !duration.is_finite() || duration <= 0.0 {
            return Err(DomainError::invariant(format!(
                "clip duration must be positive, got {duration}"
            )));
        }
        Ok(Self {
            id,
            start_time,
            duration,
            gain: 1.0,
            version: BASE_VERSION,
        })
    }

    pub(crate) fn restore(
        id: ClipId,
        start_time: f64,
        duration: f64,
        gain: f32,
        version: u64,
    ) -> Result<Self> {
        let mut state = Self::new(id, start_time, duration)?;
        state.set_gain(gain)?;
        state.version = version.max(BASE_VERSION);
        Ok(state)
    }

    pub fn id(&self) -> ClipId {
        self.id
    }

    pub fn start_time(&self) -> f64 {
        self.start_time
    }

    pub fn duration(&self) -> f64 {
        self.duration
    }

    pub fn gain(&self) -> f32 {
        self.gain
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    fn bump(&mut self) {
        self.version += 1;
    }

    fn set_start_time(&mut self, start_time: f64) -> Result<()> {
        if !start_time.is_finite() || start_time < 0.0 {
            return Err(DomainError::invariant(format!(
                "clip start time must be non-negative, got {start_time}"
            )));
        }
        self.start_time = start_time;
        self.bump();
        Ok(())
    }

    fn set_gain(&mut self, gain: f32) -> Result<()> {
        if !gain.is_finite() || gain < 0.0 {
            return Err(DomainError::invariant(format!(
                "clip gain must be non-negative, got {gain}"
            )));
        }
        self.gain = gain;
        self.bump();
        Ok(())
    }
}

/// Fade curve shapes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FadeCurve {
    Linear,
    Exponential,
    Logarithmic,
}

/// A fade-in or fade-out applied at a clip edge
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FadeSettings {
    pub duration: f64,
    pub curve: FadeCurve,
}

impl FadeSettings {
    pub fn new(duration: f64, curve: FadeCurve) -> Self {
        Self { duration, curve }
    }

    fn check_against(&self, clip_duration: f64) -> Result<()> {
        if !self.duration.is_finite() || self.duration <= 0.0 || self.duration > clip_duration {
            return Err(DomainError::invariant(format!(
                "fade duration must be positive and no longer than the clip ({clip_duration}), got {}",
                self.duration
            )));
        }
        Ok(())
    }
}

/// A clip referencing a slice of an audio sample
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioClip {
    state: ClipState,
    sample_id: String,
    offset: f64,
    fade_in: Option<FadeSettings>,
    fade_out: Option<FadeSettings>,
}

impl AudioClip {
    pub fn new(
        id: ClipId,
        sample_id: &str,
        start_time: f64,
        duration: f64,
        offset: f64,
    ) -> Result<Self> {
        let sample_id = sample_id.trim();
        if sample_id.is_empty() {
            return Err(DomainError::invariant("sample id must not be empty"));
        }
        if !offset.is_finite() || offset < 0.0 {
            return Err(DomainError::invariant(format!(
                "sample offset must be non-negative, got {offset}"
            )));
        }
        Ok(Self {
            state: ClipState::new(id, start_time, duration)?,
            sample_id: sample_id.to_string(),
            offset,
            fade_in: None,
            fade_out: None,
        })
    }

    pub(crate) fn restore(
        state: ClipState,
        sample_id: String,
        offset: f64,
        fade_in: Option<FadeSettings>,
        fade_out: Option<FadeSettings>,
    ) -> Result<Self> {
        let sample_id = sample_id.trim().to_string();
        if sample_id.is_empty() {
            return Err(DomainError::invariant("sample id must not be empty"));
        }
        if !offset.is_finite() || offset < 0.0 {
            return Err(DomainError::invariant(format!(
                "sample offset must be non-negative, got {offset}"
            )));
        }
        if let Some(fade) = &fade_in {
            fade.check_against(state.duration())?;
        }
        if let Some(fade) = &fade_out {
            fade.check_against(state.duration())?;
        }
        Ok(Self {
            state,
            sample_id,
            offset,
            fade_in,
            fade_out,
        })
    }

    pub fn sample_id(&self) -> &str {
        &self.sample_id
    }

    pub fn offset(&self) -> f64 {
        self.offset
    }

    pub fn fade_in(&self) -> Option<&FadeSettings> {
        self.fade_in.as_ref()
    }

    pub fn fade_out(&self) -> Option<&FadeSettings> {
        self.fade_out.as_ref()
    }

    /// Set or clear the fade-in; duration is checked against the clip
    pub fn set_fade_in(&mut self, fade: Option<FadeSettings>) -> Result<()> {
        if let Some(fade) = &fade {
            fade.check_against(self.state.duration())?;
        }
        self.fade_in = fade;
        self.state.bump();
        Ok(())
    }

    pub fn set_fade_out(&mut self, fade: Option<FadeSettings>) -> Result<()> {
        if let Some(fade) = &fade {
            fade.check_against(self.state.duration())?;
        }
        self.fade_out = fade;
        self.state.bump();
        Ok(())
    }
}

/// Immutable musical time signature
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSignature {
    numerator: u32,
    denominator: u32,
}

impl TimeSignature {
    pub fn new(numerator: u32, denominator: u32) -> Result<Self> {
        if numerator == 0 {
            return Err(DomainError::invariant("numerator must be positive"));
        }
        if denominator == 0 || !denominator.is_power_of_two() {
            return Err(DomainError::invariant("denominator must be a power of 2"));
        }
        Ok(Self {
            numerator,
            denominator,
        })
    }

    pub fn numerator(&self) -> u32 {
        self.numerator
    }

    pub fn denominator(&self) -> u32 {
        self.denominator
    }
}

impl fmt::Display for TimeSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.numerator, self.denominator)
    }
}

const MAX_MIDI_VALUE: u8 = 127;

/// A single note inside a MIDI clip
///
/// Immutable value object; the `with_*` constructors produce a changed
/// copy validated the same way as `new`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MidiNote {
    note_number: u8,
    velocity: u8,
    start_time: f64,
    duration: f64,
}

impl MidiNote {
    pub fn new(note_number: u8, velocity: u8, start_time: f64, duration: f64) -> Result<Self> {
        if note_number > MAX_MIDI_VALUE {
            return Err(DomainError::invariant(format!(
                "note number must be between 0 and 127, got {note_number}"
            )));
        }
        if velocity > MAX_MIDI_VALUE {
            return Err(DomainError::invariant(format!(
                "velocity must be between 0 and 127, got {velocity}"
            )));
        }
        if !start_time.is_finite() || start_time < 0.0 {
            return Err(DomainError::invariant(format!(
                "note start time must be non-negative, got {start_time}"
            )));
        }
        if !duration.is_finite() || duration <= 0.0 {
            return Err(DomainError::invariant(format!(
                "note duration must be positive, got {duration}"
            )));
        }
        Ok(Self {
            note_number,
            velocity,
            start_time,
            duration,
        })
    }

    pub fn note_number(&self) -> u8 {
        self.note_number
    }

    pub fn velocity(&self) -> u8 {
        self.velocity
    }

    pub fn start_time(&self) -> f64 {
        self.start_time
    }

    pub fn duration(&self) -> f64 {
        self.duration
    }

    /// Exclusive end of the note's half-open interval
    pub fn end_time(&self) -> f64 {
        self.start_time + self.duration
    }

    pub fn with_note_number(&self, note_number: u8) -> Result<Self> {
        Self::new(note_number, self.velocity, self.start_time, self.duration)
    }

    pub fn with_velocity(&self, velocity: u8) -> Result<Self> {
        Self::new(self.note_number, velocity, self.start_time, self.duration)
    }

    pub fn with_start_time(&self, start_time: f64) -> Result<Self> {
        Self::new(self.note_number, self.velocity, start_time, self.duration)
    }

    pub fn with_duration(&self, duration: f64) -> Result<Self> {
        Self::new(self.note_number, self.velocity, self.start_time, duration)
    }

    pub fn overlaps(&self, other: &MidiNote) -> bool {
        spans_overlap(
            self.start_time,
            self.duration,
            other.start_time,
            other.duration,
        )
    }
}

/// A clip holding MIDI notes under a fixed time signature
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MidiClip {
    state: ClipState,
    time_signature: TimeSignature,
    notes: Vec<MidiNote>,
}

impl MidiClip {
    pub fn new(
        id: ClipId,
        time_signature: TimeSignature,
        start_time: f64,
        duration: f64,
    ) -> Result<Self> {
        Ok(Self {
            state: ClipState::new(id, start_time, duration)?,
            time_signature,
            notes: Vec::new(),
        })
    }

    pub(crate) fn restore(
        state: ClipState,
        time_signature: TimeSignature,
        notes: Vec<MidiNote>,
    ) -> Result<Self> {
        let mut clip = Self {
            state,
            time_signature,
            notes: Vec::new(),
        };
        for note in notes {
            clip.check_note(&note, None)?;
            clip.notes.push(note);
        }
        Ok(clip)
    }

    pub fn time_signature(&self) -> TimeSignature {
        self.time_signature
    }

    pub fn notes(&self) -> &[MidiNote] {
        &self.notes
    }

    /// Check a candidate note against the clip range and every existing
    /// note, optionally excluding one index from the overlap scan
    fn check_note(&self, note: &MidiNote, exclude: Option<usize>) -> Result<()> {
        if note.end_time() > self.state.duration() {
            return Err(DomainError::invariant(format!(
                "note [{}, {}) extends beyond the clip duration {}",
                note.start_time(),
                note.end_time(),
                self.state.duration()
            )));
        }
        for (index, existing) in self.notes.iter().enumerate() {
            if Some(index) == exclude {
                continue;
            }
            if note.overlaps(existing) {
                return Err(DomainError::invariant(format!(
                    "note [{}, {}) overlaps existing note [{}, {})",
                    note.start_time(),
                    note.end_time(),
                    existing.start_time(),
                    existing.end_time()
                )));
            }
        }
        Ok(())
    }

    pub fn add_note(&mut self, note: MidiNote) -> Result<()> {
        self.check_note(&note, None)?;
        trace!(clip = %self.state.id(), start = note.start_time(), "Note added");
        self.notes.push(note);
        self.state.bump();
        Ok(())
    }

    /// Replace the note at `index`; the replaced note is excluded from
    /// the overlap scan
    pub fn update_note(&mut self, index: usize, note: MidiNote) -> Result<()> {
        if index >= self.notes.len() {
            return Err(DomainError::invariant(format!("no note at index {index}")));
        }
        self.check_note(&note, Some(index))?;
        self.notes[index] = note;
        self.state.bump();
        Ok(())
    }

    pub fn remove_note(&mut self, index: usize) -> Result<MidiNote> {
        if index >= self.notes.len() {
            return Err(DomainError::invariant(format!("no note at index {index}")));
        }
        let removed = self.notes.remove(index);
        self.state.bump();
        Ok(removed)
    }
}

/// A clip aggregate: one of the two closed kinds
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Clip {
    Audio(AudioClip),
    Midi(MidiClip),
}

impl Clip {
    pub fn kind(&self) -> ClipKind {
        match self {
            Clip::Audio(_) => ClipKind::Audio,
            Clip::Midi(_) => ClipKind::Midi,
        }
    }

    fn state(&self) -> &ClipState {
        match self {
            Clip::Audio(c) => &c.state,
            Clip::Midi(c) => &c.state,
        }
    }

    fn state_mut(&mut self) -> &mut ClipState {
        match self {
            Clip::Audio(c) => &mut c.state,
            Clip::Midi(c) => &mut c.state,
        }
    }

    pub fn id(&self) -> ClipId {
        self.state().id()
    }

    pub fn start_time(&self) -> f64 {
        self.state().start_time()
    }

    pub fn duration(&self) -> f64 {
        self.state().duration()
    }

    pub fn gain(&self) -> f32 {
        self.state().gain()
    }

    pub fn version(&self) -> u64 {
        self.state().version()
    }

    pub fn set_start_time(&mut self, start_time: f64) -> Result<()> {
        self.state_mut().set_start_time(start_time)
    }

    pub fn set_gain(&mut self, gain: f32) -> Result<()> {
        self.state_mut().set_gain(gain)
    }

    /// Copy this clip's content under a new id, version reset to baseline
    pub fn duplicate(&self, id: ClipId) -> Clip {
        let state = ClipState {
            id,
            start_time: self.start_time(),
            duration: self.duration(),
            gain: self.gain(),
            version: BASE_VERSION,
        };
        match self {
            Clip::Audio(c) => Clip::Audio(AudioClip {
                state,
                sample_id: c.sample_id.clone(),
                offset: c.offset,
                fade_in: c.fade_in,
                fade_out: c.fade_out,
            }),
            Clip::Midi(c) => Clip::Midi(MidiClip {
                state,
                time_signature: c.time_signature,
                notes: c.notes.clone(),
            }),
        }
    }

    pub fn as_audio(&self) -> Result<&AudioClip> {
        match self {
            Clip::Audio(c) => Ok(c),
            Clip::Midi(_) => Err(DomainError::invariant("clip is a midi clip, not audio")),
        }
    }

    pub fn as_audio_mut(&mut self) -> Result<&mut AudioClip> {
        match self {
            Clip::Audio(c) => Ok(c),
            Clip::Midi(_) => Err(DomainError::invariant("clip is a midi clip, not audio")),
        }
    }

    pub fn as_midi(&self) -> Result<&MidiClip> {
        match self {
            Clip::Midi(c) => Ok(c),
            Clip::Audio(_) => Err(DomainError::invariant("clip is an audio clip, not midi")),
        }
    }

    pub fn as_midi_mut(&mut self) -> Result<&mut MidiClip> {
        match self {
            Clip::Midi(c) => Ok(c),
            Clip::Audio(_) => Err(DomainError::invariant("clip is an audio clip, not midi")),
        }
    }
}

/// Aggregate equality is identity by id
impl PartialEq for Clip {
    fn eq(&self, other: &Self) -> bool {
        self.id() == other.id()
    }
}

impl Eq for Clip {}
