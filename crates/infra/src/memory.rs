//! In-memory adapters for the repository and event-bus contracts
//!
//! Backing for the CLI demo and the integration tests. Aggregates are
//! stored whole behind async locks; saves enforce optimistic
//! concurrency against the stored version.

use anyhow::anyhow;
use async_trait::async_trait;
use ostinato_core::application::ports::{ClipRepository, EventBus, TrackRepository};
use ostinato_core::domain::clip::Clip;
use ostinato_core::domain::error::{DomainError, Result};
use ostinato_core::domain::event::DomainEvent;
use ostinato_core::domain::ids::{ClipId, TrackId};
use ostinato_core::domain::track::Track;
use std::collections::HashMap;
use tokio::sync::{broadcast, RwLock};
use tracing::{debug, trace, warn};

/// A save whose version is lower than the stored one lost a race and
/// is rejected; an equal version is an idempotent re-save.
fn check_stale(entity: &str, id: &str, incoming: u64, stored: u64) -> Result<()> {
    if incoming < stored {
        warn!(entity, id, incoming, stored, "Stale write rejected");
        return Err(DomainError::Operation(anyhow!(
            "stale write for {entity} {id}: version {incoming} is behind stored version {stored}"
        )));
    }
    Ok(())
}

/// Track store over a `HashMap` behind an async lock
#[derive(Default)]
pub struct MemoryTrackRepository {
    tracks: RwLock<HashMap<TrackId, Track>>,
}

impl MemoryTrackRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TrackRepository for MemoryTrackRepository {
    async fn find_by_id(&self, id: &TrackId) -> Result<Option<Track>> {
        Ok(self.tracks.read().await.get(id).cloned())
    }

    async fn save(&self, track: &Track) -> Result<()> {
        let mut tracks = self.tracks.write().await;
        if let Some(stored) = tracks.get(&track.id()) {
            check_stale(
                "track",
                &track.id().to_string(),
                track.version(),
                stored.version(),
            )?;
        }
        trace!(id = %track.id(), version = track.version(), "Track saved");
        tracks.insert(track.id(), track.clone());
        Ok(())
    }

    async fn delete(&self, id: &TrackId) -> Result<()> {
        if self.tracks.write().await.remove(id).is_none() {
            return Err(DomainError::not_found("track", id));
        }
        debug!(%id, "Track deleted");
        Ok(())
    }
}

/// Clip store over a `HashMap` behind an async lock
#[derive(Default)]
pub struct MemoryClipRepository {
    clips: RwLock<HashMap<ClipId, Clip>>,
}

impl MemoryClipRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ClipRepository for MemoryClipRepository {
    async fn find_by_id(&self, id: &ClipId) -> Result<Option<Clip>> {
        Ok(self.clips.read().await.get(id).cloned())
    }

    async fn save(&self, clip: &Clip) -> Result<()> {
        let mut clips = self.clips.write().await;
        if let Some(stored) = clips.get(&clip.id()) {
            check_stale(
                "clip",
                &clip.id().to_string(),
                clip.version(),
                stored.version(),
            )?;
        }
        trace!(id = %clip.id(), version = clip.version(), "Clip saved");
        clips.insert(clip.id(), clip.clone());
        Ok(())
    }

    async fn delete(&self, id: &ClipId) -> Result<()> {
        if self.clips.write().await.remove(id).is_none() {
            return Err(DomainError::not_found("clip", id));
        }
        debug!(%id, "Clip deleted");
        Ok(())
    }
}

/// Event bus that records every published event and forwards it on a
/// broadcast channel; lagging subscribers are dropped by tokio, which
/// is acceptable for an in-memory bus
pub struct MemoryEventBus {
    log: RwLock<Vec<DomainEvent>>,
    sender: broadcast::Sender<DomainEvent>,
}

impl MemoryEventBus {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(256);
        Self {
            log: RwLock::new(Vec::new()),
            sender,
        }
    }

    /// Every event published so far, in publish order
    pub async fn recorded(&self) -> Vec<DomainEvent> {
        self.log.read().await.clone()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<DomainEvent> {
        self.sender.subscribe()
    }
}

impl Default for MemoryEventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventBus for MemoryEventBus {
    async fn publish(&self, event: DomainEvent) -> Result<()> {
        debug!(kind = event.kind(), aggregate = event.aggregate_id(), "Event published");
        self.log.write().await.push(event.clone());
        // No receivers is fine; the log is the source of truth
        let _ = self.sender.send(event);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ostinato_core::domain::factory::TrackFactory;
    use ostinato_core::domain::track::TrackType;

    #[tokio::test]
    async fn test_track_round_trip() {
        let repo = MemoryTrackRepository::new();
        let track = TrackFactory::new(TrackType::Audio)
            .create("Guitar", None, Vec::new())
            .unwrap();

        repo.save(&track).await.unwrap();
        let loaded = repo.find_by_id(&track.id()).await.unwrap().unwrap();
        assert_eq!(loaded, track);
        assert_eq!(loaded.name(), "Guitar");

        repo.delete(&track.id()).await.unwrap();
        assert!(repo.find_by_id(&track.id()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_stale_save_rejected() {
        let repo = MemoryTrackRepository::new();
        let stale = TrackFactory::new(TrackType::Audio)
            .create("Guitar", None, Vec::new())
            .unwrap();
        repo.save(&stale).await.unwrap();

        let mut fresh = repo.find_by_id(&stale.id()).await.unwrap().unwrap();
        fresh.rename("Lead").unwrap();
        repo.save(&fresh).await.unwrap();

        // The copy that never saw the rename is now behind
        let err = repo.save(&stale).await.unwrap_err();
        assert!(err.to_string().contains("stale write"));
        let stored = repo.find_by_id(&stale.id()).await.unwrap().unwrap();
        assert_eq!(stored.name(), "Lead");
    }

    #[tokio::test]
    async fn test_equal_version_resave_allowed() {
        let repo = MemoryTrackRepository::new();
        let track = TrackFactory::new(TrackType::Audio)
            .create("Guitar", None, Vec::new())
            .unwrap();
        repo.save(&track).await.unwrap();
        repo.save(&track).await.unwrap();
    }

    #[tokio::test]
    async fn test_delete_missing_is_not_found() {
        let repo = MemoryClipRepository::new();
        let err = repo.delete(&ClipId::new()).await.unwrap_err();
        assert!(matches!(err, DomainError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_bus_records_and_broadcasts() {
        use ostinato_core::domain::event::EventPayload;
        use ostinato_core::domain::ids::TrackId;

        let bus = MemoryEventBus::new();
        let mut receiver = bus.subscribe();

        let event = DomainEvent::for_track(TrackId::new(), EventPayload::TrackDeleted);
        bus.publish(event.clone()).await.unwrap();

        assert_eq!(bus.recorded().await, vec![event.clone()]);
        assert_eq!(receiver.recv().await.unwrap(), event);
    }
}
