//! Application layer: commands, queries, validation, and dispatch

pub mod command;
pub mod handlers;
pub mod mediator;
pub mod ports;
pub mod query;
pub mod validator;

// Re-export the surface callers wire against; avoid ambiguous glob imports
pub use command::{Command, CommandKind, CommandOutcome, FadeSpec, NoteSpec};
pub use handlers::{CommandHandler, QueryHandler};
pub use mediator::{Mediator, MediatorBuilder};
pub use ports::{ClipRepository, EventBus, TrackRepository};
pub use query::{ClipDto, NoteDto, Query, QueryKind, QueryOutcome, TrackDto};
