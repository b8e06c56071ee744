//! Command and query handlers
//!
//! One handler per command/query type. Every command handler follows the
//! same sequence: load the aggregate(s) by id, run the pre-flight
//! validator, invoke the entity mutation, save the whole aggregate, then
//! publish the domain events describing the transition. Saves and
//! publishes are separate calls; a publish failure after a successful
//! save is logged and surfaced, never rolled back.

pub mod bus;
pub mod clip;
pub mod query;
pub mod track;

use crate::application::command::{Command, CommandOutcome};
use crate::application::ports::{ClipRepository, EventBus, TrackRepository};
use crate::application::query::{Query, QueryOutcome};
use crate::domain::clip::Clip;
use crate::domain::error::{DomainError, Result};
use crate::domain::event::DomainEvent;
use crate::domain::ids::{ClipId, TrackId};
use crate::domain::track::Track;
use anyhow::anyhow;
use async_trait::async_trait;
use tracing::error;

/// Executes exactly one command variant
#[async_trait]
pub trait CommandHandler: Send + Sync {
    async fn handle(&self, command: Command) -> Result<CommandOutcome>;
}

/// Executes exactly one query variant
#[async_trait]
pub trait QueryHandler: Send + Sync {
    async fn handle(&self, query: Query) -> Result<QueryOutcome>;
}

pub(crate) async fn load_track(repo: &dyn TrackRepository, id: &TrackId) -> Result<Track> {
    repo.find_by_id(id)
        .await?
        .ok_or_else(|| DomainError::not_found("track", id))
}

pub(crate) async fn load_clip(repo: &dyn ClipRepository, id: &ClipId) -> Result<Clip> {
    repo.find_by_id(id)
        .await?
        .ok_or_else(|| DomainError::not_found("clip", id))
}

/// Publish after a successful save; failure is escalated, not rolled back
pub(crate) async fn publish(bus: &dyn EventBus, event: DomainEvent) -> Result<()> {
    let kind = event.kind();
    if let Err(err) = bus.publish(event).await {
        error!(kind, error = %err, "Event publish failed after save; stores may diverge");
        return Err(err);
    }
    Ok(())
}

/// A handler received a command variant it was not registered for; this
/// is a wiring bug, not caller input
pub(crate) fn unexpected_command(command: &Command) -> DomainError {
    DomainError::Operation(anyhow!(
        "handler received unexpected command: {:?}",
        command.kind()
    ))
}

pub(crate) fn unexpected_query(query: &Query) -> DomainError {
    DomainError::Operation(anyhow!(
        "handler received unexpected query: {:?}",
        query.kind()
    ))
}
