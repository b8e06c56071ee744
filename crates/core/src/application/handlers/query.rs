//! Handlers for the read side

use crate::application::handlers::{load_clip, load_track, unexpected_query, QueryHandler};
use crate::application::ports::{ClipRepository, TrackRepository};
use crate::application::query::{ClipDto, NoteDto, Query, QueryOutcome, TrackDto};
use crate::domain::clip::spans_overlap;
use crate::domain::error::Result;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::instrument;

pub struct GetTrackHandler {
    tracks: Arc<dyn TrackRepository>,
}

impl GetTrackHandler {
    pub fn new(tracks: Arc<dyn TrackRepository>) -> Self {
        Self { tracks }
    }
}

#[async_trait]
impl QueryHandler for GetTrackHandler {
    async fn handle(&self, query: Query) -> Result<QueryOutcome> {
        let Query::GetTrack { track_id } = query else {
            return Err(unexpected_query(&query));
        };
        let track = load_track(self.tracks.as_ref(), &track_id).await?;
        Ok(QueryOutcome::Track(TrackDto::from(&track)))
    }
}

pub struct GetClipHandler {
    clips: Arc<dyn ClipRepository>,
}

impl GetClipHandler {
    pub fn new(clips: Arc<dyn ClipRepository>) -> Self {
        Self { clips }
    }
}

#[async_trait]
impl QueryHandler for GetClipHandler {
    async fn handle(&self, query: Query) -> Result<QueryOutcome> {
        let Query::GetClip { clip_id } = query else {
            return Err(unexpected_query(&query));
        };
        let clip = load_clip(self.clips.as_ref(), &clip_id).await?;
        Ok(QueryOutcome::Clip(ClipDto::from(&clip)))
    }
}

pub struct GetTrackClipsHandler {
    tracks: Arc<dyn TrackRepository>,
    clips: Arc<dyn ClipRepository>,
}

impl GetTrackClipsHandler {
    pub fn new(tracks: Arc<dyn TrackRepository>, clips: Arc<dyn ClipRepository>) -> Self {
        Self { tracks, clips }
    }
}

#[async_trait]
impl QueryHandler for GetTrackClipsHandler {
    /// Clips come back in placement order, as the track recorded them
    #[instrument(skip(self, query))]
    async fn handle(&self, query: Query) -> Result<QueryOutcome> {
        let Query::GetTrackClips { track_id } = query else {
            return Err(unexpected_query(&query));
        };
        let track = load_track(self.tracks.as_ref(), &track_id).await?;
        let mut dtos = Vec::with_capacity(track.clips().len());
        for clip_id in track.clips() {
            let clip = load_clip(self.clips.as_ref(), clip_id).await?;
            dtos.push(ClipDto::from(&clip));
        }
        Ok(QueryOutcome::Clips(dtos))
    }
}

pub struct GetClipNotesHandler {
    clips: Arc<dyn ClipRepository>,
}

impl GetClipNotesHandler {
    pub fn new(clips: Arc<dyn ClipRepository>) -> Self {
        Self { clips }
    }
}

#[async_trait]
impl QueryHandler for GetClipNotesHandler {
    async fn handle(&self, query: Query) -> Result<QueryOutcome> {
        let Query::GetClipNotes { clip_id } = query else {
            return Err(unexpected_query(&query));
        };
        let clip = load_clip(self.clips.as_ref(), &clip_id).await?;
        let notes = clip
            .as_midi()?
            .notes()
            .iter()
            .map(NoteDto::from)
            .collect();
        Ok(QueryOutcome::Notes(notes))
    }
}

pub struct NoteFitsHandler {
    clips: Arc<dyn ClipRepository>,
}

impl NoteFitsHandler {
    pub fn new(clips: Arc<dyn ClipRepository>) -> Self {
        Self { clips }
    }
}

#[async_trait]
impl QueryHandler for NoteFitsHandler {
    /// Any failure reads as `false`: a span cannot fit a clip that does
    /// not exist or is not a midi clip
    async fn handle(&self, query: Query) -> Result<QueryOutcome> {
        let Query::NoteFits {
            clip_id,
            start_time,
            duration,
        } = query
        else {
            return Err(unexpected_query(&query));
        };

        if !start_time.is_finite() || start_time < 0.0 || !duration.is_finite() || duration <= 0.0
        {
            return Ok(QueryOutcome::Bool(false));
        }

        let Ok(Some(clip)) = self.clips.find_by_id(&clip_id).await else {
            return Ok(QueryOutcome::Bool(false));
        };
        let Ok(midi) = clip.as_midi() else {
            return Ok(QueryOutcome::Bool(false));
        };

        if start_time + duration > clip.duration() {
            return Ok(QueryOutcome::Bool(false));
        }
        let fits = !midi
            .notes()
            .iter()
            .any(|n| spans_overlap(n.start_time(), n.duration(), start_time, duration));
        Ok(QueryOutcome::Bool(fits))
    }
}
