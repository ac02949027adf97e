// Room registry and the shared simulation scheduler.
//
// All rooms advance on one ticker task; each room is its own lock so a slow
// room only delays itself.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use rand::Rng;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info};

use crate::use_cases::room::{Phase, Room};
use crate::use_cases::snapshot::build_snapshot;
use crate::use_cases::types::RoomEvent;

/// Room codes avoid lookalike characters (I/L/O/0/1).
const CODE_ALPHABET: &[u8] = b"ABCDEFGHJKMNPQRSTUVWXYZ23456789";
pub const CODE_LEN: usize = 5;

pub fn make_code() -> String {
    let mut rng = rand::thread_rng();
    (0..CODE_LEN)
        .map(|_| CODE_ALPHABET[rng.gen_range(0..CODE_ALPHABET.len())] as char)
        .collect()
}

/// Thread-safe registry of active rooms.
pub struct RoomRegistry {
    events_capacity: usize,
    rooms: RwLock<HashMap<String, Arc<Mutex<Room>>>>,
}

impl RoomRegistry {
    pub fn new(events_capacity: usize) -> Self {
        Self {
            events_capacity,
            rooms: RwLock::new(HashMap::new()),
        }
    }

    /// Creates a room under a fresh unique code.
    pub async fn create_room(&self) -> (String, Arc<Mutex<Room>>) {
        let mut rooms = self.rooms.write().await;
        let code = loop {
            let candidate = make_code();
            if !rooms.contains_key(&candidate) {
                break candidate;
            }
        };
        let room = Arc::new(Mutex::new(Room::new(code.clone(), self.events_capacity)));
        rooms.insert(code.clone(), Arc::clone(&room));
        info!(%code, "room created");
        (code, room)
    }

    pub async fn get(&self, code: &str) -> Option<Arc<Mutex<Room>>> {
        self.rooms.read().await.get(code).cloned()
    }

    pub async fn remove(&self, code: &str) {
        if self.rooms.write().await.remove(code).is_some() {
            info!(%code, "room removed");
        }
    }

    pub async fn all(&self) -> Vec<Arc<Mutex<Room>>> {
        self.rooms.read().await.values().cloned().collect()
    }

    pub async fn len(&self) -> usize {
        self.rooms.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.rooms.read().await.is_empty()
    }
}

/// Drives every room's simulation at a fixed cadence. Snapshots go out at a
/// slower rate than physics ticks.
pub async fn simulation_task(
    registry: Arc<RoomRegistry>,
    tick_interval: Duration,
    snapshot_interval: Duration,
) {
    let mut ticker = tokio::time::interval(tick_interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    debug!(?tick_interval, ?snapshot_interval, "simulation loop started");
    loop {
        ticker.tick().await;
        let rooms = registry.all().await;
        let now = Instant::now();
        for room in rooms {
            let mut room = room.lock().await;
            advance_room(&mut room, now, snapshot_interval);
        }
    }
}

/// One scheduler pass over one room: integrate elapsed wall time, fan out
/// notes, and broadcast snapshots / the end-of-game event.
pub fn advance_room(room: &mut Room, now: Instant, snapshot_interval: Duration) {
    let dt = room
        .last_update
        .map(|t| now.saturating_duration_since(t).as_secs_f32())
        .unwrap_or(0.0);
    room.last_update = Some(now);

    if room.phase != Phase::Playing {
        return;
    }

    let mut notes = Vec::new();
    let (ended_now, snapshot_due) = {
        let Room { players, game, .. } = room;
        let Some(game) = game.as_mut() else {
            return;
        };
        if game.ended {
            return;
        }

        game.update(players, dt, &mut notes);
        let snapshot_due = if game.paused {
            false
        } else {
            game.snapshot_acc += dt;
            if game.snapshot_acc >= snapshot_interval.as_secs_f32() {
                game.snapshot_acc = 0.0;
                true
            } else {
                false
            }
        };
        (game.ended, snapshot_due)
    };

    for note in notes {
        room.broadcast(RoomEvent::Note(note));
    }

    if ended_now {
        room.phase = Phase::Ended;
        if let Some(snap) = build_snapshot(room) {
            room.broadcast(RoomEvent::State(snap));
        }
        if let Some(info) = room.end_info() {
            info!(code = %room.code, win = info.win, score = info.score, reason = %info.reason, "game ended");
            room.broadcast(RoomEvent::Ended(info));
        }
        room.broadcast_roster();
        return;
    }

    if snapshot_due {
        if let Some(snap) = build_snapshot(room) {
            room.broadcast(RoomEvent::State(snap));
        }
    }
}
