//! Ostinato core: the arrangement model of a digital audio workstation.
//!
//! `domain` holds the aggregates (tracks, clips, notes) and their
//! business rules; `application` holds the command/query surface that
//! mediates every mutation and read against repository and event-bus
//! contracts. Storage and transport live in `ostinato-infra`.

pub mod application;
pub mod domain;
