//! Handlers for clip lifecycle, clip state, fades, and notes

use crate::application::command::{Command, CommandOutcome, FadeSpec, NoteSpec};
use crate::application::handlers::{
    load_clip, load_track, publish, unexpected_command, CommandHandler,
};
use crate::application::ports::{ClipRepository, EventBus, TrackRepository};
use crate::application::validator;
use crate::domain::clip::{
    AudioClip, Clip, ClipKind, FadeSettings, MidiClip, MidiNote, TimeSignature,
};
use crate::domain::error::{DomainError, Result};
use crate::domain::event::{DomainEvent, EventPayload};
use crate::domain::ids::ClipId;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::instrument;

fn fade_settings(spec: Option<FadeSpec>) -> Option<FadeSettings> {
    spec.map(|s| FadeSettings::new(s.duration, s.curve))
}

fn note_from_spec(spec: NoteSpec) -> Result<MidiNote> {
    MidiNote::new(spec.note_number, spec.velocity, spec.start_time, spec.duration)
}

pub struct CreateAudioClipHandler {
    tracks: Arc<dyn TrackRepository>,
    clips: Arc<dyn ClipRepository>,
    events: Arc<dyn EventBus>,
}

impl CreateAudioClipHandler {
    pub fn new(
        tracks: Arc<dyn TrackRepository>,
        clips: Arc<dyn ClipRepository>,
        events: Arc<dyn EventBus>,
    ) -> Self {
        Self {
            tracks,
            clips,
            events,
        }
    }
}

#[async_trait]
impl CommandHandler for CreateAudioClipHandler {
    #[instrument(skip(self, command))]
    async fn handle(&self, command: Command) -> Result<CommandOutcome> {
        let Command::CreateAudioClip {
            track_id,
            sample_id,
            start_time,
            duration,
            offset,
        } = command
        else {
            return Err(unexpected_command(&command));
        };

        validator::validate_audio_clip(&sample_id, start_time, duration, offset).into_result()?;

        // Load the track before creating anything so a missing track
        // leaves no orphaned clip behind
        let mut track = load_track(self.tracks.as_ref(), &track_id).await?;
        let clip = Clip::Audio(AudioClip::new(
            ClipId::new(),
            &sample_id,
            start_time,
            duration,
            offset,
        )?);
        track.add_clip(clip.id(), clip.kind())?;

        self.clips.save(&clip).await?;
        self.tracks.save(&track).await?;
        publish(
            self.events.as_ref(),
            DomainEvent::for_clip(
                clip.id(),
                EventPayload::ClipCreated {
                    kind: ClipKind::Audio,
                },
            ),
        )
        .await?;
        publish(
            self.events.as_ref(),
            DomainEvent::for_track(track_id, EventPayload::TrackClipAdded { clip_id: clip.id() }),
        )
        .await?;
        Ok(CommandOutcome::ClipCreated(clip.id()))
    }
}

pub struct CreateMidiClipHandler {
    tracks: Arc<dyn TrackRepository>,
    clips: Arc<dyn ClipRepository>,
    events: Arc<dyn EventBus>,
}

impl CreateMidiClipHandler {
    pub fn new(
        tracks: Arc<dyn TrackRepository>,
        clips: Arc<dyn ClipRepository>,
        events: Arc<dyn EventBus>,
    ) -> Self {
        Self {
            tracks,
            clips,
            events,
        }
    }
}

#[async_trait]
impl CommandHandler for CreateMidiClipHandler {
    #[instrument(skip(self, command))]
    async fn handle(&self, command: Command) -> Result<CommandOutcome> {
        let Command::CreateMidiClip {
            track_id,
            numerator,
            denominator,
            start_time,
            duration,
        } = command
        else {
            return Err(unexpected_command(&command));
        };

        validator::validate_midi_clip(numerator, denominator, start_time, duration)
            .into_result()?;

        let mut track = load_track(self.tracks.as_ref(), &track_id).await?;
        let time_signature = TimeSignature::new(numerator, denominator)?;
        let clip = Clip::Midi(MidiClip::new(
            ClipId::new(),
            time_signature,
            start_time,
            duration,
        )?);
        track.add_clip(clip.id(), clip.kind())?;

        self.clips.save(&clip).await?;
        self.tracks.save(&track).await?;
        publish(
            self.events.as_ref(),
            DomainEvent::for_clip(
                clip.id(),
                EventPayload::ClipCreated {
                    kind: ClipKind::Midi,
                },
            ),
        )
        .await?;
        publish(
            self.events.as_ref(),
            DomainEvent::for_track(track_id, EventPayload::TrackClipAdded { clip_id: clip.id() }),
        )
        .await?;
        Ok(CommandOutcome::ClipCreated(clip.id()))
    }
}

pub struct DeleteClipHandler {
    tracks: Arc<dyn TrackRepository>,
    clips: Arc<dyn ClipRepository>,
    events: Arc<dyn EventBus>,
}

impl DeleteClipHandler {
    pub fn new(
        tracks: Arc<dyn TrackRepository>,
        clips: Arc<dyn ClipRepository>,
        events: Arc<dyn EventBus>,
    ) -> Self {
        Self {
            tracks,
            clips,
            events,
        }
    }
}

#[async_trait]
impl CommandHandler for DeleteClipHandler {
    #[instrument(skip(self, command))]
    async fn handle(&self, command: Command) -> Result<CommandOutcome> {
        let Command::DeleteClip { track_id, clip_id } = command else {
            return Err(unexpected_command(&command));
        };

        let mut track = load_track(self.tracks.as_ref(), &track_id).await?;
        track.remove_clip(&clip_id)?;

        self.tracks.save(&track).await?;
        self.clips.delete(&clip_id).await?;
        publish(
            self.events.as_ref(),
            DomainEvent::for_track(track_id, EventPayload::TrackClipRemoved { clip_id }),
        )
        .await?;
        publish(
            self.events.as_ref(),
            DomainEvent::for_clip(clip_id, EventPayload::ClipDeleted),
        )
        .await?;
        Ok(CommandOutcome::Done)
    }
}

pub struct SetClipGainHandler {
    clips: Arc<dyn ClipRepository>,
    events: Arc<dyn EventBus>,
}

impl SetClipGainHandler {
    pub fn new(clips: Arc<dyn ClipRepository>, events: Arc<dyn EventBus>) -> Self {
        Self { clips, events }
    }
}

#[async_trait]
impl CommandHandler for SetClipGainHandler {
    async fn handle(&self, command: Command) -> Result<CommandOutcome> {
        let Command::SetClipGain { clip_id, gain } = command else {
            return Err(unexpected_command(&command));
        };

        let mut clip = load_clip(self.clips.as_ref(), &clip_id).await?;
        let old_gain = clip.gain();
        clip.set_gain(gain)?;
        self.clips.save(&clip).await?;
        publish(
            self.events.as_ref(),
            DomainEvent::for_clip(
                clip_id,
                EventPayload::ClipGainChanged {
                    old_gain,
                    new_gain: gain,
                },
            ),
        )
        .await?;
        Ok(CommandOutcome::Done)
    }
}

pub struct SetClipStartHandler {
    clips: Arc<dyn ClipRepository>,
    events: Arc<dyn EventBus>,
}

impl SetClipStartHandler {
    pub fn new(clips: Arc<dyn ClipRepository>, events: Arc<dyn EventBus>) -> Self {
        Self { clips, events }
    }
}

#[async_trait]
impl CommandHandler for SetClipStartHandler {
    async fn handle(&self, command: Command) -> Result<CommandOutcome> {
        let Command::SetClipStart {
            clip_id,
            start_time,
        } = command
        else {
            return Err(unexpected_command(&command));
        };

        let mut clip = load_clip(self.clips.as_ref(), &clip_id).await?;
        let old_start = clip.start_time();
        clip.set_start_time(start_time)?;
        self.clips.save(&clip).await?;
        publish(
            self.events.as_ref(),
            DomainEvent::for_clip(
                clip_id,
                EventPayload::ClipStartChanged {
                    old_start,
                    new_start: start_time,
                },
            ),
        )
        .await?;
        Ok(CommandOutcome::Done)
    }
}

pub struct SetFadeInHandler {
    clips: Arc<dyn ClipRepository>,
    events: Arc<dyn EventBus>,
}

impl SetFadeInHandler {
    pub fn new(clips: Arc<dyn ClipRepository>, events: Arc<dyn EventBus>) -> Self {
        Self { clips, events }
    }
}

#[async_trait]
impl CommandHandler for SetFadeInHandler {
    async fn handle(&self, command: Command) -> Result<CommandOutcome> {
        let Command::SetFadeIn { clip_id, fade } = command else {
            return Err(unexpected_command(&command));
        };

        if let Some(spec) = &fade {
            validator::validate_fade(spec.duration).into_result()?;
        }

        let mut clip = load_clip(self.clips.as_ref(), &clip_id).await?;
        let settings = fade_settings(fade);
        clip.as_audio_mut()?.set_fade_in(settings)?;
        self.clips.save(&clip).await?;
        publish(
            self.events.as_ref(),
            DomainEvent::for_clip(clip_id, EventPayload::ClipFadeInChanged { fade: settings }),
        )
        .await?;
        Ok(CommandOutcome::Done)
    }
}

pub struct SetFadeOutHandler {
    clips: Arc<dyn ClipRepository>,
    events: Arc<dyn EventBus>,
}

impl SetFadeOutHandler {
    pub fn new(clips: Arc<dyn ClipRepository>, events: Arc<dyn EventBus>) -> Self {
        Self { clips, events }
    }
}

#[async_trait]
impl CommandHandler for SetFadeOutHandler {
    async fn handle(&self, command: Command) -> Result<CommandOutcome> {
        let Command::SetFadeOut { clip_id, fade } = command else {
            return Err(unexpected_command(&command));
        };

        if let Some(spec) = &fade {
            validator::validate_fade(spec.duration).into_result()?;
        }

        let mut clip = load_clip(self.clips.as_ref(), &clip_id).await?;
        let settings = fade_settings(fade);
        clip.as_audio_mut()?.set_fade_out(settings)?;
        self.clips.save(&clip).await?;
        publish(
            self.events.as_ref(),
            DomainEvent::for_clip(clip_id, EventPayload::ClipFadeOutChanged { fade: settings }),
        )
        .await?;
        Ok(CommandOutcome::Done)
    }
}

pub struct AddNoteHandler {
    clips: Arc<dyn ClipRepository>,
    events: Arc<dyn EventBus>,
}

impl AddNoteHandler {
    pub fn new(clips: Arc<dyn ClipRepository>, events: Arc<dyn EventBus>) -> Self {
        Self { clips, events }
    }
}

#[async_trait]
impl CommandHandler for AddNoteHandler {
    async fn handle(&self, command: Command) -> Result<CommandOutcome> {
        let Command::AddNote { clip_id, note } = command else {
            return Err(unexpected_command(&command));
        };

        validator::validate_note(note.note_number, note.velocity, note.start_time, note.duration)
            .into_result()?;

        let mut clip = load_clip(self.clips.as_ref(), &clip_id).await?;
        let note = note_from_spec(note)?;
        let midi = clip.as_midi_mut()?;
        midi.add_note(note)?;
        let index = midi.notes().len() - 1;
        self.clips.save(&clip).await?;
        publish(
            self.events.as_ref(),
            DomainEvent::for_clip(clip_id, EventPayload::NoteAdded { index, note }),
        )
        .await?;
        Ok(CommandOutcome::Done)
    }
}

pub struct UpdateNoteHandler {
    clips: Arc<dyn ClipRepository>,
    events: Arc<dyn EventBus>,
}

impl UpdateNoteHandler {
    pub fn new(clips: Arc<dyn ClipRepository>, events: Arc<dyn EventBus>) -> Self {
        Self { clips, events }
    }
}

#[async_trait]
impl CommandHandler for UpdateNoteHandler {
    async fn handle(&self, command: Command) -> Result<CommandOutcome> {
        let Command::UpdateNote {
            clip_id,
            index,
            note,
        } = command
        else {
            return Err(unexpected_command(&command));
        };

        validator::validate_note(note.note_number, note.velocity, note.start_time, note.duration)
            .into_result()?;

        let mut clip = load_clip(self.clips.as_ref(), &clip_id).await?;
        let new_note = note_from_spec(note)?;
        let midi = clip.as_midi_mut()?;
        let old_note = midi
            .notes()
            .get(index)
            .copied()
            .ok_or_else(|| DomainError::invariant(format!("no note at index {index}")))?;
        midi.update_note(index, new_note)?;
        self.clips.save(&clip).await?;
        publish(
            self.events.as_ref(),
            DomainEvent::for_clip(
                clip_id,
                EventPayload::NoteUpdated {
                    index,
                    old_note,
                    new_note,
                },
            ),
        )
        .await?;
        Ok(CommandOutcome::Done)
    }
}

pub struct RemoveNoteHandler {
    clips: Arc<dyn ClipRepository>,
    events: Arc<dyn EventBus>,
}

impl RemoveNoteHandler {
    pub fn new(clips: Arc<dyn ClipRepository>, events: Arc<dyn EventBus>) -> Self {
        Self { clips, events }
    }
}

#[async_trait]
impl CommandHandler for RemoveNoteHandler {
    async fn handle(&self, command: Command) -> Result<CommandOutcome> {
        let Command::RemoveNote { clip_id, index } = command else {
            return Err(unexpected_command(&command));
        };

        let mut clip = load_clip(self.clips.as_ref(), &clip_id).await?;
        let note = clip.as_midi_mut()?.remove_note(index)?;
        self.clips.save(&clip).await?;
        publish(
            self.events.as_ref(),
            DomainEvent::for_clip(clip_id, EventPayload::NoteRemoved { index, note }),
        )
        .await?;
        Ok(CommandOutcome::Done)
    }
}
