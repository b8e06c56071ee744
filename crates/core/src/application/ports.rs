//! Contracts the handlers depend on
//!
//! Persistence is whole-aggregate by id; anything richer belongs to the
//! query handlers, not the repository. Event publication is
//! fire-and-forget from the handler's perspective. Implementations live
//! outside the core (see `ostinato-infra` for the in-memory adapters).

use crate::domain::clip::Clip;
use crate::domain::error::Result;
use crate::domain::event::DomainEvent;
use crate::domain::ids::{ClipId, TrackId};
use crate::domain::track::Track;
use async_trait::async_trait;

/// Whole-aggregate persistence for tracks
#[async_trait]
pub trait TrackRepository: Send + Sync {
    /// Look up a track; `None` means the id does not resolve
    async fn find_by_id(&self, id: &TrackId) -> Result<Option<Track>>;

    /// Upsert the whole aggregate; no partial-field updates
    async fn save(&self, track: &Track) -> Result<()>;

    async fn delete(&self, id: &TrackId) -> Result<()>;
}

/// Whole-aggregate persistence for clips
#[async_trait]
pub trait ClipRepository: Send + Sync {
    async fn find_by_id(&self, id: &ClipId) -> Result<Option<Clip>>;

    async fn save(&self, clip: &Clip) -> Result<()>;

    async fn delete(&self, id: &ClipId) -> Result<()>;
}

/// Event delivery; no reply channel
#[async_trait]
pub trait EventBus: Send + Sync {
    async fn publish(&self, event: DomainEvent) -> Result<()>;
}
