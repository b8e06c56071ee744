//! Handlers for bus send/return/input wiring

use crate::application::command::{Command, CommandOutcome};
use crate::application::handlers::{load_track, publish, unexpected_command, CommandHandler};
use crate::application::ports::{EventBus, TrackRepository};
use crate::application::validator;
use crate::domain::error::Result;
use crate::domain::event::{DomainEvent, EventPayload};
use crate::domain::track::bus::{ReturnSetting, SendSetting};
use async_trait::async_trait;
use std::sync::Arc;

pub struct AddSendHandler {
    tracks: Arc<dyn TrackRepository>,
    events: Arc<dyn EventBus>,
}

impl AddSendHandler {
    pub fn new(tracks: Arc<dyn TrackRepository>, events: Arc<dyn EventBus>) -> Self {
        Self { tracks, events }
    }
}

#[async_trait]
impl CommandHandler for AddSendHandler {
    async fn handle(&self, command: Command) -> Result<CommandOutcome> {
        let Command::AddSend {
            bus_id,
            target,
            level,
            pan,
        } = command
        else {
            return Err(unexpected_command(&command));
        };

        validator::validate_send_level_pan(level, pan).into_result()?;

        let mut track = load_track(self.tracks.as_ref(), &bus_id).await?;
        track.as_bus_mut()?.add_send(SendSetting::new(target, level, pan)?)?;
        self.tracks.save(&track).await?;
        publish(
            self.events.as_ref(),
            DomainEvent::for_track(bus_id, EventPayload::SendAdded { target }),
        )
        .await?;
        Ok(CommandOutcome::Done)
    }
}

pub struct RemoveSendHandler {
    tracks: Arc<dyn TrackRepository>,
    events: Arc<dyn EventBus>,
}

impl RemoveSendHandler {
    pub fn new(tracks: Arc<dyn TrackRepository>, events: Arc<dyn EventBus>) -> Self {
        Self { tracks, events }
    }
}

#[async_trait]
impl CommandHandler for RemoveSendHandler {
    async fn handle(&self, command: Command) -> Result<CommandOutcome> {
        let Command::RemoveSend { bus_id, target } = command else {
            return Err(unexpected_command(&command));
        };

        let mut track = load_track(self.tracks.as_ref(), &bus_id).await?;
        track.as_bus_mut()?.remove_send(&target)?;
        self.tracks.save(&track).await?;
        publish(
            self.events.as_ref(),
            DomainEvent::for_track(bus_id, EventPayload::SendRemoved { target }),
        )
        .await?;
        Ok(CommandOutcome::Done)
    }
}

pub struct AddReturnHandler {
    tracks: Arc<dyn TrackRepository>,
    events: Arc<dyn EventBus>,
}

impl AddReturnHandler {
    pub fn new(tracks: Arc<dyn TrackRepository>, events: Arc<dyn EventBus>) -> Self {
        Self { tracks, events }
    }
}

#[async_trait]
impl CommandHandler for AddReturnHandler {
    async fn handle(&self, command: Command) -> Result<CommandOutcome> {
        let Command::AddReturn {
            bus_id,
            source,
            level,
            pan,
        } = command
        else {
            return Err(unexpected_command(&command));
        };

        validator::validate_send_level_pan(level, pan).into_result()?;

        let mut track = load_track(self.tracks.as_ref(), &bus_id).await?;
        track
            .as_bus_mut()?
            .add_return(ReturnSetting::new(source, level, pan)?)?;
        self.tracks.save(&track).await?;
        publish(
            self.events.as_ref(),
            DomainEvent::for_track(bus_id, EventPayload::ReturnAdded { source }),
        )
        .await?;
        Ok(CommandOutcome::Done)
    }
}

pub struct RemoveReturnHandler {
    tracks: Arc<dyn TrackRepository>,
    events: Arc<dyn EventBus>,
}

impl RemoveReturnHandler {
    pub fn new(tracks: Arc<dyn TrackRepository>, events: Arc<dyn EventBus>) -> Self {
        Self { tracks, events }
    }
}

#[async_trait]
impl CommandHandler for RemoveReturnHandler {
    async fn handle(&self, command: Command) -> Result<CommandOutcome> {
        let Command::RemoveReturn { bus_id, source } = command else {
            return Err(unexpected_command(&command));
        };

        let mut track = load_track(self.tracks.as_ref(), &bus_id).await?;
        track.as_bus_mut()?.remove_return(&source)?;
        self.tracks.save(&track).await?;
        publish(
            self.events.as_ref(),
            DomainEvent::for_track(bus_id, EventPayload::ReturnRemoved { source }),
        )
        .await?;
        Ok(CommandOutcome::Done)
    }
}

pub struct AddInputTrackHandler {
    tracks: Arc<dyn TrackRepository>,
    events: Arc<dyn EventBus>,
}

impl AddInputTrackHandler {
    pub fn new(tracks: Arc<dyn TrackRepository>, events: Arc<dyn EventBus>) -> Self {
        Self { tracks, events }
    }
}

#[async_trait]
impl CommandHandler for AddInputTrackHandler {
    async fn handle(&self, command: Command) -> Result<CommandOutcome> {
        let Command::AddInputTrack { bus_id, input } = command else {
            return Err(unexpected_command(&command));
        };

        // The input must exist before it can feed the bus
        load_track(self.tracks.as_ref(), &input).await?;

        let mut track = load_track(self.tracks.as_ref(), &bus_id).await?;
        track.as_bus_mut()?.add_input_track(input)?;
        self.tracks.save(&track).await?;
        publish(
            self.events.as_ref(),
            DomainEvent::for_track(bus_id, EventPayload::InputTrackAdded { input }),
        )
        .await?;
        Ok(CommandOutcome::Done)
    }
}

pub struct RemoveInputTrackHandler {
    tracks: Arc<dyn TrackRepository>,
    events: Arc<dyn EventBus>,
}

impl RemoveInputTrackHandler {
    pub fn new(tracks: Arc<dyn TrackRepository>, events: Arc<dyn EventBus>) -> Self {
        Self { tracks, events }
    }
}

#[async_trait]
impl CommandHandler for RemoveInputTrackHandler {
    async fn handle(&self, command: Command) -> Result<CommandOutcome> {
        let Command::RemoveInputTrack { bus_id, input } = command else {
            return Err(unexpected_command(&command));
        };

        let mut track = load_track(self.tracks.as_ref(), &bus_id).await?;
        track.as_bus_mut()?.remove_input_track(&input)?;
        self.tracks.save(&track).await?;
        publish(
            self.events.as_ref(),
            DomainEvent::for_track(bus_id, EventPayload::InputTrackRemoved { input }),
        )
        .await?;
        Ok(CommandOutcome::Done)
    }
}
