//! Ostinato CLI application
//!
//! Runs a small scripted arrangement session through the mediator and
//! prints every published domain event.

use clap::Parser;
use ostinato_core::application::ports::{ClipRepository, TrackRepository};
use ostinato_core::application::{Command, Mediator, NoteSpec, Query};
use ostinato_core::domain::snapshot::ArrangementFile;
use ostinato_core::domain::{Track, TrackType};
use ostinato_infra::{MemoryClipRepository, MemoryEventBus, MemoryTrackRepository};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "ostinato")]
#[command(about = "A DAW arrangement model", long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Save the demo arrangement to a TOML file when done
    #[arg(long)]
    save: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if cli.verbose {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::INFO)
            .init();
    }

    tracing::info!("🎼 Ostinato starting...");

    let tracks = Arc::new(MemoryTrackRepository::new());
    let clips = Arc::new(MemoryClipRepository::new());
    let events = Arc::new(MemoryEventBus::new());
    let mediator = Mediator::wire(tracks.clone(), clips.clone(), events.clone());

    // Two playable tracks feeding a bus
    let guitar = mediator
        .dispatch(Command::CreateTrack {
            name: "Guitar".to_string(),
            track_type: TrackType::Audio,
            routing: None,
        })
        .await?
        .created_track()
        .ok_or_else(|| anyhow::anyhow!("expected a track id"))?;

    let keys = mediator
        .dispatch(Command::CreateTrack {
            name: "Keys".to_string(),
            track_type: TrackType::Midi,
            routing: None,
        })
        .await?
        .created_track()
        .ok_or_else(|| anyhow::anyhow!("expected a track id"))?;

    let drum_bus = mediator
        .dispatch(Command::CreateTrack {
            name: "Drum Bus".to_string(),
            track_type: TrackType::Bus,
            routing: None,
        })
        .await?
        .created_track()
        .ok_or_else(|| anyhow::anyhow!("expected a track id"))?;

    mediator
        .dispatch(Command::SetTrackVolume {
            track_id: guitar,
            volume: 0.8,
        })
        .await?;
    mediator
        .dispatch(Command::AddPlugin {
            track_id: guitar,
            plugin: "amp-sim".to_string(),
        })
        .await?;

    mediator
        .dispatch(Command::CreateAudioClip {
            track_id: guitar,
            sample_id: "riff-take-3".to_string(),
            start_time: 0.0,
            duration: 8.0,
            offset: 0.0,
        })
        .await?;

    let melody = mediator
        .dispatch(Command::CreateMidiClip {
            track_id: keys,
            numerator: 4,
            denominator: 4,
            start_time: 0.0,
            duration: 16.0,
        })
        .await?
        .created_clip()
        .ok_or_else(|| anyhow::anyhow!("expected a clip id"))?;

    for (start, note_number) in [(0.0, 60), (1.0, 64), (2.0, 67)] {
        mediator
            .dispatch(Command::AddNote {
                clip_id: melody,
                note: NoteSpec {
                    note_number,
                    velocity: 100,
                    start_time: start,
                    duration: 0.9,
                },
            })
            .await?;
    }

    mediator
        .dispatch(Command::AddInputTrack {
            bus_id: drum_bus,
            input: guitar,
        })
        .await?;
    mediator
        .dispatch(Command::AddSend {
            bus_id: drum_bus,
            target: keys,
            level: 0.5,
            pan: 0.0,
        })
        .await?;

    let fits = mediator
        .query(Query::NoteFits {
            clip_id: melody,
            start_time: 3.0,
            duration: 1.0,
        })
        .await?;
    tracing::info!(fits = ?fits.as_bool(), "Note fit check at beat 3");

    println!("Published events:");
    for event in events.recorded().await {
        println!("{}", serde_json::to_string(&event)?);
    }

    if let Some(path) = cli.save {
        // Snapshots are captured from the aggregates, not the DTOs, so
        // go through the repositories directly
        let mut saved_tracks: Vec<Track> = Vec::new();
        let mut saved_clips = Vec::new();
        for id in [guitar, keys, drum_bus] {
            let track = tracks
                .find_by_id(&id)
                .await?
                .ok_or_else(|| anyhow::anyhow!("track vanished: {id}"))?;
            for clip_id in track.clips() {
                let clip = clips
                    .find_by_id(clip_id)
                    .await?
                    .ok_or_else(|| anyhow::anyhow!("clip vanished: {clip_id}"))?;
                saved_clips.push(clip);
            }
            saved_tracks.push(track);
        }
        let arrangement = ArrangementFile::capture(&saved_tracks, &saved_clips);
        arrangement.save_to_file(&path).await?;
        tracing::info!(path = %path.display(), "Arrangement saved");
    }

    Ok(())
}
