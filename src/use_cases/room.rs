// Room lifecycle: membership, host election, start/pause/restart.

use std::time::Instant;

use rand::Rng;
use serde::Serialize;
use tokio::sync::broadcast;

use crate::domain::items::{ItemId, ItemSpot, PlayerId};
use crate::domain::layout::spawn_positions;
use crate::domain::movement::MoveInput;
use crate::domain::tuning::{
    ACTIONS_PER_SEC_LIMIT, Difficulty, MAP_H, MAP_W, MAX_PLAYERS, MIN_PLAYERS, difficulty_for,
};
use crate::use_cases::game::GameInstance;
use crate::use_cases::types::{EndInfo, RoomEvent, RosterPlayer, RosterUpdate};

pub const MAX_NAME_LEN: usize = 18;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Lobby,
    Playing,
    Ended,
}

/// A seat in the room. Stays in the list as a "ghost" when the player drops
/// mid-game so the roster and score history survive a reconnect window.
#[derive(Debug)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    pub x: f32,
    pub y: f32,
    pub held: Option<ItemId>,
    pub connected: bool,
    pub input: MoveInput,
    action_tokens: f32,
    action_refill_at: Instant,
}

impl Player {
    pub fn new(id: PlayerId, name: String, x: f32, y: f32) -> Self {
        Self {
            id,
            name,
            x,
            y,
            held: None,
            connected: true,
            input: MoveInput::neutral(),
            action_tokens: ACTIONS_PER_SEC_LIMIT,
            action_refill_at: Instant::now(),
        }
    }

    /// Token-bucket rate limit on interact actions. Refills continuously at
    /// the per-second cap.
    pub fn try_consume_action(&mut self, now: Instant) -> bool {
        let elapsed = now.saturating_duration_since(self.action_refill_at).as_secs_f32();
        self.action_tokens =
            (self.action_tokens + elapsed * ACTIONS_PER_SEC_LIMIT).min(ACTIONS_PER_SEC_LIMIT);
        self.action_refill_at = now;
        if self.action_tokens < 1.0 {
            return false;
        }
        self.action_tokens -= 1.0;
        true
    }
}

/// Why a lobby-control request was refused. Rendered to the client as an
/// error message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoomError {
    NotHost,
    AlreadyRunning,
    NotEnoughPlayers,
    TooManyPlayers,
    RoomFull,
    NotRunning,
}

impl RoomError {
    pub fn message(self) -> &'static str {
        match self {
            Self::NotHost => "Only the host can do that",
            Self::AlreadyRunning => "Game already running",
            Self::NotEnoughPlayers => "Need at least 2 connected players",
            Self::TooManyPlayers => "Too many players",
            Self::RoomFull => "Room is full",
            Self::NotRunning => "No game running",
        }
    }
}

pub struct Room {
    pub code: String,
    pub phase: Phase,
    pub host_id: Option<PlayerId>,
    pub players: Vec<Player>,
    /// Player count the difficulty was locked to at game start.
    pub locked_count: u8,
    pub config: Option<Difficulty>,
    pub game: Option<GameInstance>,
    pub events_tx: broadcast::Sender<RoomEvent>,
    /// Last time the simulation loop advanced this room.
    pub last_update: Option<Instant>,
}

impl Room {
    pub fn new(code: String, events_capacity: usize) -> Self {
        let (events_tx, _) = broadcast::channel(events_capacity);
        Self {
            code,
            phase: Phase::Lobby,
            host_id: None,
            players: Vec::new(),
            locked_count: 0,
            config: None,
            game: None,
            events_tx,
            last_update: None,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RoomEvent> {
        self.events_tx.subscribe()
    }

    /// Receivers may all be gone (everyone mid-disconnect); that is fine.
    pub fn broadcast(&self, event: RoomEvent) {
        let _ = self.events_tx.send(event);
    }

    pub fn broadcast_roster(&self) {
        self.broadcast(RoomEvent::Roster(self.roster()));
    }

    pub fn roster(&self) -> RosterUpdate {
        RosterUpdate {
            code: self.code.clone(),
            phase: self.phase,
            host_id: self.host_id,
            players: self
                .players
                .iter()
                .map(|p| RosterPlayer {
                    id: p.id,
                    name: p.name.clone(),
                    connected: p.connected,
                })
                .collect(),
        }
    }

    pub fn player(&self, id: PlayerId) -> Option<&Player> {
        self.players.iter().find(|p| p.id == id)
    }

    pub fn player_mut(&mut self, id: PlayerId) -> Option<&mut Player> {
        self.players.iter_mut().find(|p| p.id == id)
    }

    pub fn connected_count(&self) -> usize {
        self.players.iter().filter(|p| p.connected).count()
    }

    pub fn is_host(&self, id: PlayerId) -> bool {
        self.host_id == Some(id)
    }

    /// Keeps the current host while they are connected; otherwise promotes
    /// the first connected player, then falls back to anyone still seated.
    pub fn ensure_host(&mut self) {
        let current_ok = self
            .host_id
            .and_then(|id| self.player(id))
            .is_some_and(|p| p.connected);
        if current_ok {
            return;
        }
        self.host_id = self
            .players
            .iter()
            .find(|p| p.connected)
            .or(self.players.first())
            .map(|p| p.id);
    }

    /// Seats a new player at the next spawn position.
    pub fn add_player(&mut self, id: PlayerId, name: String) -> Result<(), RoomError> {
        if self.players.len() >= MAX_PLAYERS {
            return Err(RoomError::RoomFull);
        }
        let spawns = spawn_positions();
        let spawn = spawns[self.players.len().min(spawns.len() - 1)];
        self.players.push(Player::new(id, sanitize_name(name), spawn.x, spawn.y));
        self.ensure_host();
        Ok(())
    }

    /// Host-only. Locks the difficulty to the connected player count and
    /// resets everyone to their spawn positions.
    pub fn start_game(&mut self, requester: PlayerId) -> Result<(), RoomError> {
        if !self.is_host(requester) {
            return Err(RoomError::NotHost);
        }
        if self.phase == Phase::Playing {
            return Err(RoomError::AlreadyRunning);
        }
        let connected = self.connected_count();
        if connected < MIN_PLAYERS {
            return Err(RoomError::NotEnoughPlayers);
        }
        if connected > MAX_PLAYERS {
            return Err(RoomError::TooManyPlayers);
        }

        self.locked_count = connected as u8;
        let difficulty = difficulty_for(self.locked_count);
        self.config = Some(difficulty);
        self.game = Some(GameInstance::new(self.locked_count, difficulty));
        self.phase = Phase::Playing;
        self.last_update = None;

        let spawns = spawn_positions();
        for (i, p) in self.players.iter_mut().enumerate() {
            let spawn = spawns[i.min(spawns.len() - 1)];
            p.x = spawn.x;
            p.y = spawn.y;
            p.held = None;
            p.input = MoveInput::neutral();
        }
        Ok(())
    }

    /// Host-only return to the lobby: drops ghosts, clears hands and the
    /// finished (or abandoned) game.
    pub fn back_to_lobby(&mut self, requester: PlayerId) -> Result<(), RoomError> {
        if !self.is_host(requester) {
            return Err(RoomError::NotHost);
        }
        self.phase = Phase::Lobby;
        self.locked_count = 0;
        self.config = None;
        self.game = None;
        self.last_update = None;
        self.players.retain(|p| p.connected);
        for p in &mut self.players {
            p.held = None;
            p.input = MoveInput::neutral();
        }
        self.ensure_host();
        Ok(())
    }

    /// Host-only mid-game pause toggle. Returns the new paused state.
    pub fn toggle_pause(&mut self, requester: PlayerId) -> Result<bool, RoomError> {
        if !self.is_host(requester) {
            return Err(RoomError::NotHost);
        }
        let Some(game) = self.game.as_mut().filter(|g| !g.ended) else {
            return Err(RoomError::NotRunning);
        };
        if self.phase != Phase::Playing {
            return Err(RoomError::NotRunning);
        }
        game.paused = !game.paused;
        Ok(game.paused)
    }

    /// A connection dropped. Mid-game the player stays as a ghost and their
    /// held item falls to the floor; otherwise they leave the roster. Returns
    /// true when the room is now empty and should be deleted.
    pub fn handle_disconnect(&mut self, id: PlayerId) -> bool {
        let mid_game = self.phase == Phase::Playing
            && self.game.as_ref().is_some_and(|g| !g.ended);
        if mid_game {
            let Room { players, game, .. } = self;
            if let Some(p) = players.iter_mut().find(|p| p.id == id) {
                p.connected = false;
                p.input = MoveInput::neutral();
                if let Some(held) = p.held.take() {
                    let (px, py) = (p.x, p.y);
                    if let Some(game) = game.as_mut() {
                        drop_to_floor(game, held, px, py);
                    }
                }
            }
            self.ensure_host();
            return false;
        }
        self.players.retain(|p| p.id != id);
        self.ensure_host();
        self.players.is_empty()
    }

    pub fn end_info(&self) -> Option<EndInfo> {
        self.game.as_ref().and_then(|g| g.end_info.clone())
    }
}

/// Dropped items land near the player's feet with a little scatter, kept
/// inside the playable area.
fn drop_to_floor(game: &mut GameInstance, item: ItemId, px: f32, py: f32) {
    let mut rng = rand::thread_rng();
    let x = (px + rng.gen_range(-9.0..=9.0)).clamp(30.0, MAP_W - 30.0);
    let y = (py + rng.gen_range(-9.0..=9.0)).clamp(30.0, MAP_H - 30.0);
    if let Some(it) = game.items.get_mut(item) {
        it.spot = ItemSpot::Floor;
        it.x = x;
        it.y = y;
    }
}

/// Names are trimmed and truncated; blank names get a placeholder.
pub fn sanitize_name(raw: String) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return "Player".to_string();
    }
    trimmed.chars().take(MAX_NAME_LEN).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn room_with(n: usize) -> Room {
        let mut room = Room::new("TEST1".to_string(), 16);
        for i in 0..n {
            room.add_player(i as PlayerId + 1, format!("p{i}")).unwrap();
        }
        room
    }

    #[test]
    fn first_player_becomes_host() {
        let room = room_with(3);
        assert_eq!(room.host_id, Some(1));
    }

    #[test]
    fn host_migrates_to_first_connected() {
        let mut room = room_with(3);
        room.players[0].connected = false;
        room.ensure_host();
        assert_eq!(room.host_id, Some(2));
    }

    #[test]
    fn host_falls_back_to_ghost_when_nobody_connected() {
        let mut room = room_with(2);
        room.phase = Phase::Playing;
        room.config = Some(difficulty_for(2));
        room.game = Some(GameInstance::new(2, difficulty_for(2)));
        for p in &mut room.players {
            p.connected = false;
        }
        room.ensure_host();
        assert_eq!(room.host_id, Some(1));
    }

    #[test]
    fn start_requires_host_and_enough_players() {
        let mut room = room_with(1);
        assert_eq!(room.start_game(1), Err(RoomError::NotEnoughPlayers));
        assert_eq!(room.start_game(99), Err(RoomError::NotHost));

        room.add_player(2, "two".to_string()).unwrap();
        assert!(room.start_game(1).is_ok());
        assert_eq!(room.phase, Phase::Playing);
        assert_eq!(room.locked_count, 2);
        assert_eq!(room.start_game(1), Err(RoomError::AlreadyRunning));
    }

    #[test]
    fn sixth_player_is_rejected() {
        let mut room = room_with(5);
        assert_eq!(room.add_player(6, "six".to_string()), Err(RoomError::RoomFull));
    }

    #[test]
    fn lobby_disconnect_removes_player_and_empties_room() {
        let mut room = room_with(2);
        assert!(!room.handle_disconnect(1));
        assert_eq!(room.players.len(), 1);
        assert_eq!(room.host_id, Some(2));
        assert!(room.handle_disconnect(2));
    }

    #[test]
    fn mid_game_disconnect_leaves_a_ghost_and_drops_held() {
        let mut room = room_with(2);
        room.start_game(1).unwrap();
        let held = {
            let game = room.game.as_mut().unwrap();
            let id = game.items.spawn(
                crate::domain::items::ItemKind::Plate,
                0.0,
                0.0,
                ItemSpot::Held(2),
            );
            room.players[1].held = Some(id);
            id
        };

        assert!(!room.handle_disconnect(2));
        let ghost = room.player(2).unwrap();
        assert!(!ghost.connected);
        assert!(ghost.held.is_none());
        let item = room.game.as_ref().unwrap().items.get(held).unwrap();
        assert_eq!(item.spot, ItemSpot::Floor);
        assert!(item.x >= 30.0 && item.x <= MAP_W - 30.0);
    }

    #[test]
    fn back_to_lobby_drops_ghosts() {
        let mut room = room_with(3);
        room.start_game(1).unwrap();
        room.players[2].connected = false;
        room.back_to_lobby(1).unwrap();
        assert_eq!(room.phase, Phase::Lobby);
        assert_eq!(room.players.len(), 2);
        assert!(room.game.is_none());
        assert!(room.config.is_none());
    }

    #[test]
    fn action_tokens_run_out_and_refill() {
        let mut p = Player::new(1, "p".to_string(), 0.0, 0.0);
        let t0 = Instant::now();
        let mut granted = 0;
        for _ in 0..20 {
            if p.try_consume_action(t0) {
                granted += 1;
            }
        }
        assert_eq!(granted, ACTIONS_PER_SEC_LIMIT as i32);
        // Half a second refills half the bucket.
        let later = t0 + Duration::from_millis(500);
        let mut refilled = 0;
        for _ in 0..20 {
            if p.try_consume_action(later) {
                refilled += 1;
            }
        }
        assert_eq!(refilled, (ACTIONS_PER_SEC_LIMIT / 2.0) as i32);
    }

    #[test]
    fn name_sanitizing() {
        assert_eq!(sanitize_name("  Ada  ".to_string()), "Ada");
        assert_eq!(sanitize_name("   ".to_string()), "Player");
        assert_eq!(sanitize_name("x".repeat(40)), "x".repeat(MAX_NAME_LEN));
    }
}
