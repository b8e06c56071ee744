//! Mediator: one dispatch table from command/query kind to its handler
//!
//! Callers never see handlers. They hand the mediator a `Command` or a
//! `Query`; the mediator looks up the single registered handler for that
//! kind and forwards. An unroutable kind is a wiring bug and surfaces as
//! an operation error, not a panic.

use crate::application::command::{Command, CommandKind, CommandOutcome};
use crate::application::handlers::{bus, clip, query, track, CommandHandler, QueryHandler};
use crate::application::ports::{ClipRepository, EventBus, TrackRepository};
use crate::application::query::{Query, QueryKind, QueryOutcome};
use crate::domain::error::{DomainError, Result};
use anyhow::anyhow;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, error, instrument};

/// Routes each command and query to its registered handler
pub struct Mediator {
    commands: HashMap<CommandKind, Arc<dyn CommandHandler>>,
    queries: HashMap<QueryKind, Arc<dyn QueryHandler>>,
}

impl Mediator {
    pub fn builder() -> MediatorBuilder {
        MediatorBuilder::default()
    }

    /// Builds a mediator with every handler registered against the
    /// given stores and event bus
    pub fn wire(
        tracks: Arc<dyn TrackRepository>,
        clips: Arc<dyn ClipRepository>,
        events: Arc<dyn EventBus>,
    ) -> Self {
        Self::builder()
            .register_command(
                CommandKind::CreateTrack,
                Arc::new(track::CreateTrackHandler::new(tracks.clone(), events.clone())),
            )
            .register_command(
                CommandKind::RenameTrack,
                Arc::new(track::RenameTrackHandler::new(tracks.clone(), events.clone())),
            )
            .register_command(
                CommandKind::DeleteTrack,
                Arc::new(track::DeleteTrackHandler::new(
                    tracks.clone(),
                    clips.clone(),
                    events.clone(),
                )),
            )
            .register_command(
                CommandKind::CloneTrack,
                Arc::new(track::CloneTrackHandler::new(tracks.clone(), events.clone())),
            )
            .register_command(
                CommandKind::SetTrackVolume,
                Arc::new(track::SetTrackVolumeHandler::new(
                    tracks.clone(),
                    events.clone(),
                )),
            )
            .register_command(
                CommandKind::SetTrackMute,
                Arc::new(track::SetTrackMuteHandler::new(tracks.clone(), events.clone())),
            )
            .register_command(
                CommandKind::SetTrackSolo,
                Arc::new(track::SetTrackSoloHandler::new(tracks.clone(), events.clone())),
            )
            .register_command(
                CommandKind::ChangeTrackRouting,
                Arc::new(track::ChangeTrackRoutingHandler::new(
                    tracks.clone(),
                    events.clone(),
                )),
            )
            .register_command(
                CommandKind::AddPlugin,
                Arc::new(track::AddPluginHandler::new(tracks.clone(), events.clone())),
            )
            .register_command(
                CommandKind::RemovePlugin,
                Arc::new(track::RemovePluginHandler::new(tracks.clone(), events.clone())),
            )
            .register_command(
                CommandKind::AddClipToTrack,
                Arc::new(track::AddClipToTrackHandler::new(
                    tracks.clone(),
                    clips.clone(),
                    events.clone(),
                )),
            )
            .register_command(
                CommandKind::RemoveClipFromTrack,
                Arc::new(track::RemoveClipFromTrackHandler::new(
                    tracks.clone(),
                    events.clone(),
                )),
            )
            .register_command(
                CommandKind::MoveClip,
                Arc::new(track::MoveClipHandler::new(
                    tracks.clone(),
                    clips.clone(),
                    events.clone(),
                )),
            )
            .register_command(
                CommandKind::CopyClip,
                Arc::new(track::CopyClipHandler::new(
                    tracks.clone(),
                    clips.clone(),
                    events.clone(),
                )),
            )
            .register_command(
                CommandKind::AddSend,
                Arc::new(bus::AddSendHandler::new(tracks.clone(), events.clone())),
            )
            .register_command(
                CommandKind::RemoveSend,
                Arc::new(bus::RemoveSendHandler::new(tracks.clone(), events.clone())),
            )
            .register_command(
                CommandKind::AddReturn,
                Arc::new(bus::AddReturnHandler::new(tracks.clone(), events.clone())),
            )
            .register_command(
                CommandKind::RemoveReturn,
                Arc::new(bus::RemoveReturnHandler::new(tracks.clone(), events.clone())),
            )
            .register_command(
                CommandKind::AddInputTrack,
                Arc::new(bus::AddInputTrackHandler::new(tracks.clone(), events.clone())),
            )
            .register_command(
                CommandKind::RemoveInputTrack,
                Arc::new(bus::RemoveInputTrackHandler::new(
                    tracks.clone(),
                    events.clone(),
                )),
            )
            .register_command(
                CommandKind::CreateAudioClip,
                Arc::new(clip::CreateAudioClipHandler::new(
                    tracks.clone(),
                    clips.clone(),
                    events.clone(),
                )),
            )
            .register_command(
                CommandKind::CreateMidiClip,
                Arc::new(clip::CreateMidiClipHandler::new(
                    tracks.clone(),
                    clips.clone(),
                    events.clone(),
                )),
            )
            .register_command(
                CommandKind::DeleteClip,
                Arc::new(clip::DeleteClipHandler::new(
                    tracks.clone(),
                    clips.clone(),
                    events.clone(),
                )),
            )
            .register_command(
                CommandKind::SetClipGain,
                Arc::new(clip::SetClipGainHandler::new(clips.clone(), events.clone())),
            )
            .register_command(
                CommandKind::SetClipStart,
                Arc::new(clip::SetClipStartHandler::new(clips.clone(), events.clone())),
            )
            .register_command(
                CommandKind::SetFadeIn,
                Arc::new(clip::SetFadeInHandler::new(clips.clone(), events.clone())),
            )
            .register_command(
                CommandKind::SetFadeOut,
                Arc::new(clip::SetFadeOutHandler::new(clips.clone(), events.clone())),
            )
            .register_command(
                CommandKind::AddNote,
                Arc::new(clip::AddNoteHandler::new(clips.clone(), events.clone())),
            )
            .register_command(
                CommandKind::UpdateNote,
                Arc::new(clip::UpdateNoteHandler::new(clips.clone(), events.clone())),
            )
            .register_command(
                CommandKind::RemoveNote,
                Arc::new(clip::RemoveNoteHandler::new(clips.clone(), events)),
            )
            .register_query(
                QueryKind::GetTrack,
                Arc::new(query::GetTrackHandler::new(tracks.clone())),
            )
            .register_query(
                QueryKind::GetClip,
                Arc::new(query::GetClipHandler::new(clips.clone())),
            )
            .register_query(
                QueryKind::GetTrackClips,
                Arc::new(query::GetTrackClipsHandler::new(tracks, clips.clone())),
            )
            .register_query(
                QueryKind::GetClipNotes,
                Arc::new(query::GetClipNotesHandler::new(clips.clone())),
            )
            .register_query(QueryKind::NoteFits, Arc::new(query::NoteFitsHandler::new(clips)))
            .build()
    }

    /// Routes a command to its handler
    #[instrument(skip(self, command), fields(kind = ?command.kind()))]
    pub async fn dispatch(&self, command: Command) -> Result<CommandOutcome> {
        let kind = command.kind();
        let handler = self.commands.get(&kind).ok_or_else(|| {
            error!(?kind, "No handler registered for command");
            DomainError::Operation(anyhow!("no handler registered for command: {kind:?}"))
        })?;
        debug!(?kind, "Dispatching command");
        handler.handle(command).await
    }

    /// Routes a query to its handler
    #[instrument(skip(self, query), fields(kind = ?query.kind()))]
    pub async fn query(&self, query: Query) -> Result<QueryOutcome> {
        let kind = query.kind();
        let handler = self.queries.get(&kind).ok_or_else(|| {
            error!(?kind, "No handler registered for query");
            DomainError::Operation(anyhow!("no handler registered for query: {kind:?}"))
        })?;
        handler.handle(query).await
    }
}

/// Collects handler registrations; one handler per kind, last wins
#[derive(Default)]
pub struct MediatorBuilder {
    commands: HashMap<CommandKind, Arc<dyn CommandHandler>>,
    queries: HashMap<QueryKind, Arc<dyn QueryHandler>>,
}

impl MediatorBuilder {
    pub fn register_command(mut self, kind: CommandKind, handler: Arc<dyn CommandHandler>) -> Self {
        self.commands.insert(kind, handler);
        self
    }

    pub fn register_query(mut self, kind: QueryKind, handler: Arc<dyn QueryHandler>) -> Self {
        self.queries.insert(kind, handler);
        self
    }

    pub fn build(self) -> Mediator {
        Mediator {
            commands: self.commands,
            queries: self.queries,
        }
    }
}
