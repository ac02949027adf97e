// Use-case level outputs shared between the room loop and connections.

use std::sync::Arc;

use serde::Serialize;

use crate::domain::items::PlayerId;
use crate::use_cases::room::Phase;
use crate::use_cases::snapshot::Snapshot;

/// Events fanned out to every connection subscribed to a room.
#[derive(Debug, Clone)]
pub enum RoomEvent {
    /// Lobby membership or host changed.
    Roster(RosterUpdate),
    /// Fresh authoritative game snapshot. Serialized once per receiver, but
    /// built once per tick.
    State(Arc<Snapshot>),
    /// Human-readable room-wide notice ("Pizza burnt", pause toggles, ...).
    Note(String),
    /// The game just ended.
    Ended(EndInfo),
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RosterUpdate {
    pub code: String,
    pub phase: Phase,
    pub host_id: Option<PlayerId>,
    pub players: Vec<RosterPlayer>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RosterPlayer {
    pub id: PlayerId,
    pub name: String,
    pub connected: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EndInfo {
    pub win: bool,
    pub reason: String,
    pub score: u32,
    pub target: u32,
}
