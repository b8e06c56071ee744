//! Plain snapshots of aggregates and the arrangement file format
//!
//! Snapshots are flat serde structs that round-trip every field needed to
//! reconstruct an equivalent aggregate. Reconstruction goes back through
//! the entity constructors, so a hand-edited or corrupt file cannot
//! smuggle an invalid aggregate into memory.

use crate::domain::clip::{
    AudioClip, Clip, ClipKind, ClipState, FadeSettings, MidiClip, MidiNote, TimeSignature,
};
use crate::domain::error::DomainError;
use crate::domain::ids::{ClipId, TrackId};
use crate::domain::track::{
    AudioTrack, BusTrack, MidiTrack, PluginReference, ReturnSetting, SendSetting, Track,
    TrackRouting, TrackState, TrackType,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;
use tokio::fs;
use tracing::{debug, info, instrument};

pub type Result<T> = std::result::Result<T, SnapshotError>;

/// Errors from snapshot conversion and arrangement-file IO
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("invalid snapshot: {0}")]
    Domain(#[from] DomainError),
}

/// Send setting in plain form
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SendSnapshot {
    pub target: String,
    pub level: f32,
    pub pan: f32,
}

/// Return setting in plain form
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReturnSnapshot {
    pub source: String,
    pub level: f32,
    pub pan: f32,
}

/// A track flattened to plain data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackSnapshot {
    pub id: String,
    pub name: String,
    pub track_type: TrackType,
    #[serde(default)]
    pub routing: TrackRouting,
    #[serde(default)]
    pub plugins: Vec<String>,
    pub muted: bool,
    pub solo: bool,
    pub volume: f32,
    pub version: u64,
    #[serde(default)]
    pub clips: Vec<String>,
    #[serde(default)]
    pub sends: Vec<SendSnapshot>,
    #[serde(default)]
    pub returns: Vec<ReturnSnapshot>,
    #[serde(default)]
    pub input_tracks: Vec<String>,
}

impl From<&Track> for TrackSnapshot {
    fn from(track: &Track) -> Self {
        let mut snapshot = Self {
            id: track.id().to_string(),
            name: track.name().to_string(),
            track_type: track.track_type(),
            routing: track.routing().clone(),
            plugins: track.plugins().iter().map(|p| p.as_str().to_string()).collect(),
            muted: track.is_muted(),
            solo: track.is_solo(),
            volume: track.volume(),
            version: track.version(),
            clips: track.clips().iter().map(|c| c.to_string()).collect(),
            sends: Vec::new(),
            returns: Vec::new(),
            input_tracks: Vec::new(),
        };
        if let Track::Bus(bus) = track {
            snapshot.sends = bus
                .sends()
                .iter()
                .map(|s| SendSnapshot {
                    target: s.target().to_string(),
                    level: s.level(),
                    pan: s.pan(),
                })
                .collect();
            snapshot.returns = bus
                .returns()
                .iter()
                .map(|r| ReturnSnapshot {
                    source: r.source().to_string(),
                    level: r.level(),
                    pan: r.pan(),
                })
                .collect();
            snapshot.input_tracks = bus.input_tracks().iter().map(|i| i.to_string()).collect();
        }
        snapshot
    }
}

impl TrackSnapshot {
    /// Reconstruct the track, re-validating every field
    pub fn to_track(&self) -> Result<Track> {
        let id = TrackId::parse(&self.id)?;
        let plugins = self
            .plugins
            .iter()
            .map(|p| PluginReference::new(p.clone()))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        let state = TrackState::restore(
            id,
            &self.name,
            self.routing.clone(),
            plugins,
            self.muted,
            self.solo,
            self.volume,
            self.version,
        )?;
        let clips = self
            .clips
            .iter()
            .map(|c| ClipId::parse(c))
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let track = match self.track_type {
            TrackType::Audio => Track::Audio(AudioTrack::restore(state, clips)?),
            TrackType::Midi => Track::Midi(MidiTrack::restore(state, clips)?),
            TrackType::Bus => {
                if !clips.is_empty() {
                    return Err(DomainError::invariant("Bus tracks cannot hold clips").into());
                }
                let sends = self
                    .sends
                    .iter()
                    .map(|s| SendSetting::new(TrackId::parse(&s.target)?, s.level, s.pan))
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                let returns = self
                    .returns
                    .iter()
                    .map(|r| ReturnSetting::new(TrackId::parse(&r.source)?, r.level, r.pan))
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                let input_tracks = self
                    .input_tracks
                    .iter()
                    .map(|i| TrackId::parse(i))
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Track::Bus(BusTrack::restore(state, sends, returns, input_tracks)?)
            }
        };
        Ok(track)
    }
}

/// A MIDI note in plain form
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NoteSnapshot {
    pub note_number: u8,
    pub velocity: u8,
    pub start_time: f64,
    pub duration: f64,
}

impl From<&MidiNote> for NoteSnapshot {
    fn from(note: &MidiNote) -> Self {
        Self {
            note_number: note.note_number(),
            velocity: note.velocity(),
            start_time: note.start_time(),
            duration: note.duration(),
        }
    }
}

impl NoteSnapshot {
    pub fn to_note(&self) -> std::result::Result<MidiNote, DomainError> {
        MidiNote::new(self.note_number, self.velocity, self.start_time, self.duration)
    }
}

/// Time signature in plain form
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeSignatureSnapshot {
    pub numerator: u32,
    pub denominator: u32,
}

/// A clip flattened to plain data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClipSnapshot {
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
    pub fade_in: Option<FadeSettings>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fade_out: Option<FadeSettings>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_signature: Option<TimeSignatureSnapshot>,
    #[serde(default)]
    pub notes: Vec<NoteSnapshot>,
}

impl From<&Clip> for ClipSnapshot {
    fn from(clip: &Clip) -> Self {
        let mut snapshot = Self {
            id: clip.id().to_string(),
            kind: clip.kind(),
            start_time: clip.start_time(),
            duration: clip.duration(),
            gain: clip.gain(),
            version: clip.version(),
            sample_id: None,
            offset: None,
            fade_in: None,
            fade_out: None,
            time_signature: None,
            notes: Vec::new(),
        };
        match clip {
            Clip::Audio(audio) => {
                snapshot.sample_id = Some(audio.sample_id().to_string());
                snapshot.offset = Some(audio.offset());
                snapshot.fade_in = audio.fade_in().copied();
                snapshot.fade_out = audio.fade_out().copied();
            }
            Clip::Midi(midi) => {
                snapshot.time_signature = Some(TimeSignatureSnapshot {
                    numerator: midi.time_signature().numerator(),
                    denominator: midi.time_signature().denominator(),
                });
                snapshot.notes = midi.notes().iter().map(NoteSnapshot::from).collect();
            }
        }
        snapshot
    }
}

impl ClipSnapshot {
    /// Reconstruct the clip, re-validating every field
    pub fn to_clip(&self) -> Result<Clip> {
        let id = ClipId::parse(&self.id)?;
        let state = ClipState::restore(id, self.start_time, self.duration, self.gain, self.version)?;
        let clip = match self.kind {
            ClipKind::Audio => {
                let sample_id = self
                    .sample_id
                    .clone()
                    .ok_or_else(|| DomainError::validation("sample_id", "missing for audio clip"))?;
                Clip::Audio(AudioClip::restore(
                    state,
                    sample_id,
                    self.offset.unwrap_or(0.0),
                    self.fade_in,
                    self.fade_out,
                )?)
            }
            ClipKind::Midi => {
                let signature = self.time_signature.ok_or_else(|| {
                    DomainError::validation("time_signature", "missing for midi clip")
                })?;
                let time_signature = TimeSignature::new(signature.numerator, signature.denominator)?;
                let notes = self
                    .notes
                    .iter()
                    .map(|n| n.to_note())
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Clip::Midi(MidiClip::restore(state, time_signature, notes)?)
            }
        };
        Ok(clip)
    }
}

/// A complete arrangement persisted as TOML
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ArrangementFile {
    #[serde(default)]
    pub tracks: Vec<TrackSnapshot>,
    #[serde(default)]
    pub clips: Vec<ClipSnapshot>,
}

impl ArrangementFile {
    /// Snapshot a set of live aggregates
    pub fn capture<'a>(
        tracks: impl IntoIterator<Item = &'a Track>,
        clips: impl IntoIterator<Item = &'a Clip>,
    ) -> Self {
        Self {
            tracks: tracks.into_iter().map(TrackSnapshot::from).collect(),
            clips: clips.into_iter().map(ClipSnapshot::from).collect(),
        }
    }

    /// Load an arrangement from a TOML file
    #[instrument(skip(path))]
    pub async fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!(path = %path.display(), "Loading arrangement");

        let contents = fs::read_to_string(path).await?;
        let file: Self = toml::from_str(&contents)?;

        debug!(
            tracks = file.tracks.len(),
            clips = file.clips.len(),
            "Arrangement loaded"
        );
        Ok(file)
    }

    /// Save the arrangement to a TOML file
    #[instrument(skip(self, path))]
    pub async fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        info!(path = %path.display(), "Saving arrangement");

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let toml_str = toml::to_string_pretty(self)?;
        fs::write(path, toml_str).await?;

        debug!("Arrangement saved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::clip::FadeCurve;
    use crate::domain::factory::TrackFactory;
    use tempfile::TempDir;

    fn sample_track() -> Track {
        let factory = TrackFactory::new(TrackType::Audio);
        let mut track = factory
            .create(
                "Guitar",
                Some(TrackRouting::new(None, Some("master".to_string()))),
                vec![PluginReference::new("eq").unwrap()],
            )
            .unwrap();
        track.set_volume(1.25).unwrap();
        track.set_muted(true);
        track
    }

    fn sample_clip() -> Clip {
        let mut clip = AudioClip::new(ClipId::new(), "s1", 0.0, 4.0, 0.5).unwrap();
        clip.set_fade_in(Some(FadeSettings::new(1.0, FadeCurve::Linear)))
            .unwrap();
        Clip::Audio(clip)
    }

    #[test]
    fn test_track_round_trip() {
        let track = sample_track();
        let snapshot = TrackSnapshot::from(&track);
        let restored = snapshot.to_track().unwrap();

        assert_eq!(restored.id(), track.id());
        assert_eq!(restored.name(), track.name());
        assert_eq!(restored.track_type(), track.track_type());
        assert_eq!(restored.routing(), track.routing());
        assert_eq!(restored.plugins(), track.plugins());
        assert_eq!(restored.volume(), track.volume());
        assert_eq!(restored.is_muted(), track.is_muted());
        assert_eq!(restored.version(), track.version());
    }

    #[test]
    fn test_bus_track_round_trip() {
        let factory = TrackFactory::new(TrackType::Bus);
        let mut track = factory.create("Drum Bus", None, Vec::new()).unwrap();
        {
            let bus = track.as_bus_mut().unwrap();
            bus.add_send(SendSetting::new(TrackId::new(), 0.8, -0.25).unwrap())
                .unwrap();
            bus.add_input_track(TrackId::new()).unwrap();
        }

        let restored = TrackSnapshot::from(&track).to_track().unwrap();
        let bus = restored.as_bus().unwrap();
        assert_eq!(bus.sends().len(), 1);
        assert_eq!(bus.sends()[0].level(), 0.8);
        assert_eq!(bus.input_tracks().len(), 1);
    }

    #[test]
    fn test_audio_clip_round_trip() {
        let clip = sample_clip();
        let restored = ClipSnapshot::from(&clip).to_clip().unwrap();

        assert_eq!(restored.id(), clip.id());
        assert_eq!(restored.duration(), clip.duration());
        let audio = restored.as_audio().unwrap();
        assert_eq!(audio.sample_id(), "s1");
        assert_eq!(audio.offset(), 0.5);
        assert_eq!(audio.fade_in().unwrap().duration, 1.0);
    }

    #[test]
    fn test_midi_clip_round_trip() {
        let mut midi = MidiClip::new(
            ClipId::new(),
            TimeSignature::new(7, 8).unwrap(),
            2.0,
            8.0,
        )
        .unwrap();
        midi.add_note(MidiNote::new(60, 100, 0.0, 1.0).unwrap())
            .unwrap();
        midi.add_note(MidiNote::new(64, 90, 1.0, 1.0).unwrap())
            .unwrap();
        let clip = Clip::Midi(midi);

        let restored = ClipSnapshot::from(&clip).to_clip().unwrap();
        let midi = restored.as_midi().unwrap();
        assert_eq!(midi.time_signature().numerator(), 7);
        assert_eq!(midi.notes().len(), 2);
        assert_eq!(midi.notes()[1].note_number(), 64);
    }

    #[test]
    fn test_corrupt_snapshot_rejected() {
        let mut snapshot = TrackSnapshot::from(&sample_track());
        snapshot.volume = 9.0;
        assert!(snapshot.to_track().is_err());

        let mut snapshot = ClipSnapshot::from(&sample_clip());
        snapshot.sample_id = None;
        assert!(snapshot.to_clip().is_err());

        let mut snapshot = ClipSnapshot::from(&sample_clip());
        snapshot.sample_id = Some("   ".to_string());
        assert!(snapshot.to_clip().is_err());

        let mut snapshot = ClipSnapshot::from(&sample_clip());
        snapshot.offset = Some(-5.0);
        assert!(snapshot.to_clip().is_err());
    }

    #[test]
    fn test_duplicate_clip_ids_in_file_rejected() {
        let mut track = sample_track();
        track.add_clip(ClipId::new(), ClipKind::Audio).unwrap();
        let mut snapshot = TrackSnapshot::from(&track);
        snapshot.clips.push(snapshot.clips[0].clone());

        let err = snapshot.to_track().unwrap_err();
        assert!(err.to_string().contains("duplicate clip"));
    }

    #[test]
    fn test_overlapping_notes_in_file_rejected() {
        let mut midi = MidiClip::new(
            ClipId::new(),
            TimeSignature::new(4, 4).unwrap(),
            0.0,
            8.0,
        )
        .unwrap();
        midi.add_note(MidiNote::new(60, 100, 0.0, 2.0).unwrap())
            .unwrap();
        let mut snapshot = ClipSnapshot::from(&Clip::Midi(midi));
        snapshot.notes.push(NoteSnapshot {
            note_number: 62,
            velocity: 100,
            start_time: 1.0,
            duration: 2.0,
        });
        assert!(snapshot.to_clip().is_err());
    }

    #[tokio::test]
    async fn test_arrangement_file_round_trip() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("song.toml");

        let track = sample_track();
        let clip = sample_clip();
        let file = ArrangementFile::capture([&track], [&clip]);
        file.save_to_file(&path).await.unwrap();

        let loaded = ArrangementFile::load_from_file(&path).await.unwrap();
        assert_eq!(loaded, file);

        let restored = loaded.tracks[0].to_track().unwrap();
        assert_eq!(restored.id(), track.id());
    }
}
