//! Handlers for track lifecycle, mix state, plugins, and clip placement

use crate::application::command::{Command, CommandOutcome};
use crate::application::handlers::{
    load_clip, load_track, publish, unexpected_command, CommandHandler,
};
use crate::application::ports::{ClipRepository, EventBus, TrackRepository};
use crate::application::validator;
use crate::domain::error::{DomainError, Result};
use crate::domain::event::{DomainEvent, EventPayload};
use crate::domain::factory::TrackFactory;
use crate::domain::ids::ClipId;
use crate::domain::track::PluginReference;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::instrument;

pub struct CreateTrackHandler {
    tracks: Arc<dyn TrackRepository>,
    events: Arc<dyn EventBus>,
}

impl CreateTrackHandler {
    pub fn new(tracks: Arc<dyn TrackRepository>, events: Arc<dyn EventBus>) -> Self {
        Self { tracks, events }
    }
}

#[async_trait]
impl CommandHandler for CreateTrackHandler {
    #[instrument(skip(self, command))]
    async fn handle(&self, command: Command) -> Result<CommandOutcome> {
        let Command::CreateTrack {
            name,
            track_type,
            routing,
        } = command
        else {
            return Err(unexpected_command(&command));
        };

        validator::validate_create_track(&name).into_result()?;
        if let Some(routing) = &routing {
            validator::validate_routing(routing).into_result()?;
        }

        let track = TrackFactory::new(track_type).create(&name, routing, Vec::new())?;
        self.tracks.save(&track).await?;
        publish(
            self.events.as_ref(),
            DomainEvent::for_track(
                track.id(),
                EventPayload::TrackCreated {
                    name: track.name().to_string(),
                    track_type,
                },
            ),
        )
        .await?;
        Ok(CommandOutcome::TrackCreated(track.id()))
    }
}

pub struct RenameTrackHandler {
    tracks: Arc<dyn TrackRepository>,
    events: Arc<dyn EventBus>,
}

impl RenameTrackHandler {
    pub fn new(tracks: Arc<dyn TrackRepository>, events: Arc<dyn EventBus>) -> Self {
        Self { tracks, events }
    }
}

#[async_trait]
impl CommandHandler for RenameTrackHandler {
    async fn handle(&self, command: Command) -> Result<CommandOutcome> {
        let Command::RenameTrack { track_id, name } = command else {
            return Err(unexpected_command(&command));
        };

        validator::validate_rename_track(&name).into_result()?;

        let mut track = load_track(self.tracks.as_ref(), &track_id).await?;
        let old_name = track.name().to_string();
        track.rename(&name)?;
        self.tracks.save(&track).await?;
        publish(
            self.events.as_ref(),
            DomainEvent::for_track(
                track_id,
                EventPayload::TrackRenamed {
                    old_name,
                    new_name: track.name().to_string(),
                },
            ),
        )
        .await?;
        Ok(CommandOutcome::Done)
    }
}

pub struct DeleteTrackHandler {
    tracks: Arc<dyn TrackRepository>,
    clips: Arc<dyn ClipRepository>,
    events: Arc<dyn EventBus>,
}

impl DeleteTrackHandler {
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
impl CommandHandler for DeleteTrackHandler {
    #[instrument(skip(self, command))]
    async fn handle(&self, command: Command) -> Result<CommandOutcome> {
        let Command::DeleteTrack { track_id } = command else {
            return Err(unexpected_command(&command));
        };

        let track = load_track(self.tracks.as_ref(), &track_id).await?;

        // Clips belong to exactly one track, so they go with it
        for clip_id in track.clips() {
            self.clips.delete(clip_id).await?;
            publish(
                self.events.as_ref(),
                DomainEvent::for_clip(*clip_id, EventPayload::ClipDeleted),
            )
            .await?;
        }

        self.tracks.delete(&track_id).await?;
        publish(
            self.events.as_ref(),
            DomainEvent::for_track(track_id, EventPayload::TrackDeleted),
        )
        .await?;
        Ok(CommandOutcome::Done)
    }
}

pub struct CloneTrackHandler {
    tracks: Arc<dyn TrackRepository>,
    events: Arc<dyn EventBus>,
}

impl CloneTrackHandler {
    pub fn new(tracks: Arc<dyn TrackRepository>, events: Arc<dyn EventBus>) -> Self {
        Self { tracks, events }
    }
}

#[async_trait]
impl CommandHandler for CloneTrackHandler {
    async fn handle(&self, command: Command) -> Result<CommandOutcome> {
        let Command::CloneTrack { track_id, new_name } = command else {
            return Err(unexpected_command(&command));
        };

        if let Some(name) = &new_name {
            validator::validate_rename_track(name).into_result()?;
        }

        let source = load_track(self.tracks.as_ref(), &track_id).await?;
        let clone =
            TrackFactory::new(source.track_type()).clone_from(&source, new_name.as_deref())?;
        self.tracks.save(&clone).await?;
        publish(
            self.events.as_ref(),
            DomainEvent::for_track(clone.id(), EventPayload::TrackCloned { source_id: track_id }),
        )
        .await?;
        Ok(CommandOutcome::TrackCreated(clone.id()))
    }
}

pub struct SetTrackVolumeHandler {
    tracks: Arc<dyn TrackRepository>,
    events: Arc<dyn EventBus>,
}

impl SetTrackVolumeHandler {
    pub fn new(tracks: Arc<dyn TrackRepository>, events: Arc<dyn EventBus>) -> Self {
        Self { tracks, events }
    }
}

#[async_trait]
impl CommandHandler for SetTrackVolumeHandler {
    async fn handle(&self, command: Command) -> Result<CommandOutcome> {
        let Command::SetTrackVolume { track_id, volume } = command else {
            return Err(unexpected_command(&command));
        };

        validator::validate_volume(volume).into_result()?;

        let mut track = load_track(self.tracks.as_ref(), &track_id).await?;
        let old_volume = track.volume();
        track.set_volume(volume)?;
        self.tracks.save(&track).await?;
        publish(
            self.events.as_ref(),
            DomainEvent::for_track(
                track_id,
                EventPayload::TrackVolumeChanged {
                    old_volume,
                    new_volume: volume,
                },
            ),
        )
        .await?;
        Ok(CommandOutcome::Done)
    }
}

pub struct SetTrackMuteHandler {
    tracks: Arc<dyn TrackRepository>,
    events: Arc<dyn EventBus>,
}

impl SetTrackMuteHandler {
    pub fn new(tracks: Arc<dyn TrackRepository>, events: Arc<dyn EventBus>) -> Self {
        Self { tracks, events }
    }
}

#[async_trait]
impl CommandHandler for SetTrackMuteHandler {
    async fn handle(&self, command: Command) -> Result<CommandOutcome> {
        let Command::SetTrackMute { track_id, muted } = command else {
            return Err(unexpected_command(&command));
        };

        let mut track = load_track(self.tracks.as_ref(), &track_id).await?;
        let old_muted = track.is_muted();
        track.set_muted(muted);
        self.tracks.save(&track).await?;
        publish(
            self.events.as_ref(),
            DomainEvent::for_track(
                track_id,
                EventPayload::TrackMuteChanged {
                    old_muted,
                    new_muted: muted,
                },
            ),
        )
        .await?;
        Ok(CommandOutcome::Done)
    }
}

pub struct SetTrackSoloHandler {
    tracks: Arc<dyn TrackRepository>,
    events: Arc<dyn EventBus>,
}

impl SetTrackSoloHandler {
    pub fn new(tracks: Arc<dyn TrackRepository>, events: Arc<dyn EventBus>) -> Self {
        Self { tracks, events }
    }
}

#[async_trait]
impl CommandHandler for SetTrackSoloHandler {
    async fn handle(&self, command: Command) -> Result<CommandOutcome> {
        let Command::SetTrackSolo { track_id, solo } = command else {
            return Err(unexpected_command(&command));
        };

        let mut track = load_track(self.tracks.as_ref(), &track_id).await?;
        let old_solo = track.is_solo();
        track.set_solo(solo);
        self.tracks.save(&track).await?;
        publish(
            self.events.as_ref(),
            DomainEvent::for_track(
                track_id,
                EventPayload::TrackSoloChanged {
                    old_solo,
                    new_solo: solo,
                },
            ),
        )
        .await?;
        Ok(CommandOutcome::Done)
    }
}

pub struct ChangeTrackRoutingHandler {
    tracks: Arc<dyn TrackRepository>,
    events: Arc<dyn EventBus>,
}

impl ChangeTrackRoutingHandler {
    pub fn new(tracks: Arc<dyn TrackRepository>, events: Arc<dyn EventBus>) -> Self {
        Self { tracks, events }
    }
}

#[async_trait]
impl CommandHandler for ChangeTrackRoutingHandler {
    async fn handle(&self, command: Command) -> Result<CommandOutcome> {
        let Command::ChangeTrackRouting { track_id, routing } = command else {
            return Err(unexpected_command(&command));
        };

        validator::validate_routing(&routing).into_result()?;

        let mut track = load_track(self.tracks.as_ref(), &track_id).await?;
        let old_routing = track.routing().clone();
        track.set_routing(routing.clone());
        self.tracks.save(&track).await?;
        publish(
            self.events.as_ref(),
            DomainEvent::for_track(
                track_id,
                EventPayload::TrackRoutingChanged {
                    old_routing,
                    new_routing: routing,
                },
            ),
        )
        .await?;
        Ok(CommandOutcome::Done)
    }
}

pub struct AddPluginHandler {
    tracks: Arc<dyn TrackRepository>,
    events: Arc<dyn EventBus>,
}

impl AddPluginHandler {
    pub fn new(tracks: Arc<dyn TrackRepository>, events: Arc<dyn EventBus>) -> Self {
        Self { tracks, events }
    }
}

#[async_trait]
impl CommandHandler for AddPluginHandler {
    async fn handle(&self, command: Command) -> Result<CommandOutcome> {
        let Command::AddPlugin { track_id, plugin } = command else {
            return Err(unexpected_command(&command));
        };

        validator::validate_plugin(&plugin).into_result()?;

        let mut track = load_track(self.tracks.as_ref(), &track_id).await?;
        let reference = PluginReference::new(plugin)?;
        let plugin_name = reference.as_str().to_string();
        track.add_plugin(reference)?;
        self.tracks.save(&track).await?;
        publish(
            self.events.as_ref(),
            DomainEvent::for_track(track_id, EventPayload::PluginAdded { plugin: plugin_name }),
        )
        .await?;
        Ok(CommandOutcome::Done)
    }
}

pub struct RemovePluginHandler {
    tracks: Arc<dyn TrackRepository>,
    events: Arc<dyn EventBus>,
}

impl RemovePluginHandler {
    pub fn new(tracks: Arc<dyn TrackRepository>, events: Arc<dyn EventBus>) -> Self {
        Self { tracks, events }
    }
}

#[async_trait]
impl CommandHandler for RemovePluginHandler {
    async fn handle(&self, command: Command) -> Result<CommandOutcome> {
        let Command::RemovePlugin { track_id, plugin } = command else {
            return Err(unexpected_command(&command));
        };

        let mut track = load_track(self.tracks.as_ref(), &track_id).await?;
        let reference = PluginReference::new(plugin)?;
        let plugin_name = reference.as_str().to_string();
        track.remove_plugin(&reference)?;
        self.tracks.save(&track).await?;
        publish(
            self.events.as_ref(),
            DomainEvent::for_track(
                track_id,
                EventPayload::PluginRemoved { plugin: plugin_name },
            ),
        )
        .await?;
        Ok(CommandOutcome::Done)
    }
}

pub struct AddClipToTrackHandler {
    tracks: Arc<dyn TrackRepository>,
    clips: Arc<dyn ClipRepository>,
    events: Arc<dyn EventBus>,
}

impl AddClipToTrackHandler {
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
impl CommandHandler for AddClipToTrackHandler {
    async fn handle(&self, command: Command) -> Result<CommandOutcome> {
        let Command::AddClipToTrack { track_id, clip_id } = command else {
            return Err(unexpected_command(&command));
        };

        let mut track = load_track(self.tracks.as_ref(), &track_id).await?;
        let clip = load_clip(self.clips.as_ref(), &clip_id).await?;

        track.add_clip(clip.id(), clip.kind())?;
        self.tracks.save(&track).await?;
        publish(
            self.events.as_ref(),
            DomainEvent::for_track(track_id, EventPayload::TrackClipAdded { clip_id }),
        )
        .await?;
        Ok(CommandOutcome::Done)
    }
}

pub struct RemoveClipFromTrackHandler {
    tracks: Arc<dyn TrackRepository>,
    events: Arc<dyn EventBus>,
}

impl RemoveClipFromTrackHandler {
    pub fn new(tracks: Arc<dyn TrackRepository>, events: Arc<dyn EventBus>) -> Self {
        Self { tracks, events }
    }
}

#[async_trait]
impl CommandHandler for RemoveClipFromTrackHandler {
    async fn handle(&self, command: Command) -> Result<CommandOutcome> {
        let Command::RemoveClipFromTrack { track_id, clip_id } = command else {
            return Err(unexpected_command(&command));
        };

        let mut track = load_track(self.tracks.as_ref(), &track_id).await?;
        track.remove_clip(&clip_id)?;
        self.tracks.save(&track).await?;
        publish(
            self.events.as_ref(),
            DomainEvent::for_track(track_id, EventPayload::TrackClipRemoved { clip_id }),
        )
        .await?;
        Ok(CommandOutcome::Done)
    }
}

pub struct MoveClipHandler {
    tracks: Arc<dyn TrackRepository>,
    clips: Arc<dyn ClipRepository>,
    events: Arc<dyn EventBus>,
}

impl MoveClipHandler {
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
impl CommandHandler for MoveClipHandler {
    /// Loads and checks every implicated aggregate before mutating any;
    /// the two track saves are still separate, non-transactional calls
    #[instrument(skip(self, command))]
    async fn handle(&self, command: Command) -> Result<CommandOutcome> {
        let Command::MoveClip {
            clip_id,
            from_track,
            to_track,
        } = command
        else {
            return Err(unexpected_command(&command));
        };

        // A move within one track is a no-op; falling through would load
        // the same aggregate twice and race its own saves
        if from_track == to_track {
            let track = load_track(self.tracks.as_ref(), &from_track).await?;
            if !track.clips().contains(&clip_id) {
                return Err(DomainError::invariant(format!("clip not on track: {clip_id}")));
            }
            return Ok(CommandOutcome::Done);
        }

        let clip = load_clip(self.clips.as_ref(), &clip_id).await?;
        let mut from = load_track(self.tracks.as_ref(), &from_track).await?;
        let mut to = load_track(self.tracks.as_ref(), &to_track).await?;

        from.remove_clip(&clip_id)?;
        to.add_clip(clip_id, clip.kind())?;

        self.tracks.save(&from).await?;
        self.tracks.save(&to).await?;
        publish(
            self.events.as_ref(),
            DomainEvent::for_clip(
                clip_id,
                EventPayload::ClipMoved {
                    clip_id,
                    from_track,
                    to_track,
                },
            ),
        )
        .await?;
        Ok(CommandOutcome::Done)
    }
}

pub struct CopyClipHandler {
    tracks: Arc<dyn TrackRepository>,
    clips: Arc<dyn ClipRepository>,
    events: Arc<dyn EventBus>,
}

impl CopyClipHandler {
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
impl CommandHandler for CopyClipHandler {
    #[instrument(skip(self, command))]
    async fn handle(&self, command: Command) -> Result<CommandOutcome> {
        let Command::CopyClip { clip_id, to_track } = command else {
            return Err(unexpected_command(&command));
        };

        let source = load_clip(self.clips.as_ref(), &clip_id).await?;
        let mut target = load_track(self.tracks.as_ref(), &to_track).await?;

        let copy = source.duplicate(ClipId::new());
        target.add_clip(copy.id(), copy.kind())?;

        self.clips.save(&copy).await?;
        self.tracks.save(&target).await?;
        publish(
            self.events.as_ref(),
            DomainEvent::for_clip(
                copy.id(),
                EventPayload::ClipCopied {
                    source_clip: clip_id,
                    new_clip: copy.id(),
                    to_track,
                },
            ),
        )
        .await?;
        publish(
            self.events.as_ref(),
            DomainEvent::for_track(to_track, EventPayload::TrackClipAdded { clip_id: copy.id() }),
        )
        .await?;
        Ok(CommandOutcome::ClipCreated(copy.id()))
    }
}
