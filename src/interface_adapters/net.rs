use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    Error,
    extract::{
        State,
        ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade, close_code},
    },
    response::IntoResponse,
};
use futures::SinkExt;
use tokio::sync::{Mutex, broadcast};
use tracing::{debug, info, info_span, warn};

use crate::interface_adapters::protocol::{
    ClientMessage, MoveInputDto, RestartMode, ServerMessage, sanitize_input,
};
use crate::interface_adapters::state::AppState;
use crate::interface_adapters::utils::rng::rand_id;
use crate::use_cases::actions::perform_action;
use crate::use_cases::room::{Phase, Room};
use crate::use_cases::snapshot::build_snapshot;
use crate::use_cases::types::RoomEvent;

#[derive(Debug)]
enum NetError {
    // Categorizes connection lifecycle failures so callers can decide policy.
    #[allow(dead_code)]
    Ws(axum::Error),
    #[allow(dead_code)]
    Serialization(serde_json::Error),
    EventsClosed,
}

impl From<axum::Error> for NetError {
    fn from(e: axum::Error) -> Self {
        NetError::Ws(e)
    }
}

const LOG_THROTTLE: Duration = Duration::from_secs(2);
const MAX_INVALID_JSON: u32 = 10;

fn should_log(last: &mut Instant) -> bool {
    if last.elapsed() >= LOG_THROTTLE {
        *last = Instant::now();
        true
    } else {
        false
    }
}

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

async fn handle_socket(mut socket: WebSocket, state: Arc<AppState>) {
    let player_id = rand_id();
    let span = info_span!("conn", player_id);
    let _enter = span.enter();

    let mut ctx = ConnCtx::new(player_id);
    info!("client connected");

    if let Err(e) = run_client_loop(&mut socket, &state, &mut ctx).await {
        warn!(error = ?e, "client loop exited with error");
    }

    leave_current_room(&state, &mut ctx, "disconnected").await;
    debug!(
        msgs_in = ctx.msgs_in,
        msgs_out = ctx.msgs_out,
        bytes_in = ctx.bytes_in,
        bytes_out = ctx.bytes_out,
        invalid_json = ctx.invalid_json,
        "connection stats"
    );
    info!("client disconnected");
}

async fn send_message(socket: &mut WebSocket, msg: &ServerMessage) -> Result<usize, NetError> {
    let txt = serde_json::to_string(msg).map_err(NetError::Serialization)?;
    let bytes = txt.len();
    socket
        .send(Message::Text(txt.into()))
        .await
        .map_err(NetError::Ws)?;
    Ok(bytes)
}

struct ConnCtx {
    player_id: u64,
    room: Option<Arc<Mutex<Room>>>,
    room_code: Option<String>,
    /// Live subscription to the joined room, or a stand-in channel while
    /// unjoined. The stand-in sender is kept so the receiver never closes.
    events_rx: broadcast::Receiver<RoomEvent>,
    idle_tx: broadcast::Sender<RoomEvent>,

    msgs_in: u64,
    msgs_out: u64,
    bytes_in: u64,
    bytes_out: u64,
    invalid_json: u32,

    last_invalid_log: Instant,
    last_lag_log: Instant,

    close_frame: Option<CloseFrame>,
}

impl ConnCtx {
    fn new(player_id: u64) -> Self {
        let (idle_tx, events_rx) = broadcast::channel(1);
        let throttle_start = Instant::now() - LOG_THROTTLE;
        Self {
            player_id,
            room: None,
            room_code: None,
            events_rx,
            idle_tx,
            msgs_in: 0,
            msgs_out: 0,
            bytes_in: 0,
            bytes_out: 0,
            invalid_json: 0,
            last_invalid_log: throttle_start,
            last_lag_log: throttle_start,
            close_frame: None,
        }
    }
}

enum LoopControl {
    Continue,
    Disconnect,
}

async fn run_client_loop(
    socket: &mut WebSocket,
    state: &Arc<AppState>,
    ctx: &mut ConnCtx,
) -> Result<(), NetError> {
    loop {
        let control = tokio::select! {
            incoming = socket.recv() => {
                handle_incoming(socket, state, ctx, incoming).await?
            }
            event = ctx.events_rx.recv() => {
                forward_event(socket, ctx, event).await?
            }
        };

        if let LoopControl::Disconnect = control {
            if let Some(frame) = ctx.close_frame.take() {
                let _ = socket.send(Message::Close(Some(frame))).await;
            }
            if let Err(err) = socket.close().await {
                debug!(error = ?err, "socket close error");
            }
            return Ok(());
        }
    }
}

async fn forward_event(
    socket: &mut WebSocket,
    ctx: &mut ConnCtx,
    event: Result<RoomEvent, broadcast::error::RecvError>,
) -> Result<LoopControl, NetError> {
    match event {
        Ok(event) => {
            let msg = match event {
                RoomEvent::Roster(roster) => ServerMessage::RoomUpdate(roster),
                RoomEvent::State(snapshot) => ServerMessage::State(snapshot),
                RoomEvent::Note(text) => ServerMessage::Note { text },
                RoomEvent::Ended(info) => ServerMessage::Ended(info),
            };
            match send_message(socket, &msg).await {
                Ok(bytes) => {
                    ctx.msgs_out += 1;
                    ctx.bytes_out += bytes as u64;
                    Ok(LoopControl::Continue)
                }
                Err(err) => {
                    warn!(error = ?err, "failed to forward room event");
                    Ok(LoopControl::Disconnect)
                }
            }
        }
        // Snapshots are periodic, so a lagged receiver resyncs on the next
        // one without any recovery traffic.
        Err(broadcast::error::RecvError::Lagged(missed)) => {
            if should_log(&mut ctx.last_lag_log) {
                warn!(missed, "room events lagged; waiting for next snapshot");
            }
            Ok(LoopControl::Continue)
        }
        Err(broadcast::error::RecvError::Closed) => Err(NetError::EventsClosed),
    }
}

async fn handle_incoming(
    socket: &mut WebSocket,
    state: &Arc<AppState>,
    ctx: &mut ConnCtx,
    incoming: Option<Result<Message, Error>>,
) -> Result<LoopControl, NetError> {
    match incoming {
        Some(Ok(Message::Text(text))) => {
            ctx.msgs_in += 1;
            ctx.bytes_in += text.len() as u64;

            match serde_json::from_str::<ClientMessage>(&text) {
                Ok(msg) => handle_client_message(socket, state, ctx, msg).await,
                Err(parse_err) => {
                    ctx.invalid_json += 1;
                    if should_log(&mut ctx.last_invalid_log) {
                        warn!(bytes = text.len(), error = %parse_err, "failed to parse client message");
                    }
                    if ctx.invalid_json > MAX_INVALID_JSON {
                        ctx.close_frame = Some(CloseFrame {
                            code: close_code::POLICY,
                            reason: "too many invalid messages".into(),
                        });
                        return Ok(LoopControl::Disconnect);
                    }
                    Ok(LoopControl::Continue)
                }
            }
        }
        Some(Ok(Message::Binary(_))) => {
            ctx.close_frame = Some(CloseFrame {
                code: close_code::UNSUPPORTED,
                reason: "binary messages not supported".into(),
            });
            Ok(LoopControl::Disconnect)
        }
        Some(Ok(Message::Ping(_) | Message::Pong(_))) => Ok(LoopControl::Continue),
        Some(Ok(Message::Close(_))) | None => Ok(LoopControl::Disconnect),
        Some(Err(e)) => {
            warn!(error = %e, "websocket recv error");
            Ok(LoopControl::Disconnect)
        }
    }
}

async fn handle_client_message(
    socket: &mut WebSocket,
    state: &Arc<AppState>,
    ctx: &mut ConnCtx,
    msg: ClientMessage,
) -> Result<LoopControl, NetError> {
    match msg {
        ClientMessage::CreateRoom { name } => create_room(socket, state, ctx, name).await,
        ClientMessage::JoinRoom { name, code } => join_room(socket, state, ctx, name, code).await,
        ClientMessage::LeaveRoom => {
            leave_current_room(state, ctx, "left the room").await;
            Ok(LoopControl::Continue)
        }
        ClientMessage::StartGame => start_game(socket, ctx).await,
        ClientMessage::Restart { mode } => match mode {
            RestartMode::Again => start_game(socket, ctx).await,
            RestartMode::Lobby => back_to_lobby(socket, ctx).await,
        },
        ClientMessage::TogglePause => toggle_pause(socket, ctx).await,
        ClientMessage::Input(dto) => {
            apply_input(ctx, dto).await;
            Ok(LoopControl::Continue)
        }
        ClientMessage::Action => run_action(socket, ctx).await,
    }
}

async fn reply_error(socket: &mut WebSocket, text: &str) -> Result<LoopControl, NetError> {
    send_message(socket, &ServerMessage::ErrorMsg { text: text.to_string() }).await?;
    Ok(LoopControl::Continue)
}

async fn create_room(
    socket: &mut WebSocket,
    state: &Arc<AppState>,
    ctx: &mut ConnCtx,
    name: String,
) -> Result<LoopControl, NetError> {
    if ctx.room.is_some() {
        return reply_error(socket, "Already in a room").await;
    }
    let (code, room) = state.rooms.create_room().await;
    {
        let mut r = room.lock().await;
        if let Err(e) = r.add_player(ctx.player_id, name) {
            return reply_error(socket, e.message()).await;
        }
        ctx.events_rx = r.subscribe();
        send_message(
            socket,
            &ServerMessage::Joined { code: code.clone(), player_id: ctx.player_id },
        )
        .await?;
        send_message(socket, &ServerMessage::RoomUpdate(r.roster())).await?;
    }
    info!(%code, "room created by connection");
    ctx.room = Some(room);
    ctx.room_code = Some(code);
    Ok(LoopControl::Continue)
}

async fn join_room(
    socket: &mut WebSocket,
    state: &Arc<AppState>,
    ctx: &mut ConnCtx,
    name: String,
    code: String,
) -> Result<LoopControl, NetError> {
    if ctx.room.is_some() {
        return reply_error(socket, "Already in a room").await;
    }
    let code = code.trim().to_uppercase();
    let Some(room) = state.rooms.get(&code).await else {
        return reply_error(socket, "Room not found").await;
    };
    {
        let mut r = room.lock().await;
        if let Err(e) = r.add_player(ctx.player_id, name) {
            return reply_error(socket, e.message()).await;
        }
        ctx.events_rx = r.subscribe();
        send_message(
            socket,
            &ServerMessage::Joined { code: code.clone(), player_id: ctx.player_id },
        )
        .await?;

        // Joining a running game: catch the newcomer up immediately instead
        // of making them wait for the next broadcast tick.
        if r.phase == Phase::Playing {
            if let Some(snap) = build_snapshot(&r) {
                send_message(socket, &ServerMessage::State(snap)).await?;
            }
            let joined_name = r
                .player(ctx.player_id)
                .map(|p| p.name.clone())
                .unwrap_or_default();
            r.broadcast(RoomEvent::Note(format!(
                "{joined_name} joined (difficulty locked at {}).",
                r.locked_count
            )));
        }
        r.broadcast_roster();
    }
    info!(%code, "joined room");
    ctx.room = Some(room);
    ctx.room_code = Some(code);
    Ok(LoopControl::Continue)
}

/// Shared by explicit leave and socket teardown. Removes the connection's
/// player (or ghosts them mid-game) and deletes the room when it empties.
async fn leave_current_room(state: &Arc<AppState>, ctx: &mut ConnCtx, how: &str) {
    let Some(room) = ctx.room.take() else {
        return;
    };
    let code = ctx.room_code.take().unwrap_or_default();
    let mut r = room.lock().await;
    let name = r
        .player(ctx.player_id)
        .map(|p| p.name.clone())
        .unwrap_or_default();
    let mid_game = r.phase == Phase::Playing && r.game.as_ref().is_some_and(|g| !g.ended);
    let empty = r.handle_disconnect(ctx.player_id);
    if empty {
        drop(r);
        state.rooms.remove(&code).await;
    } else {
        r.broadcast_roster();
        if mid_game {
            r.broadcast(RoomEvent::Note(format!("{name} {how}")));
        }
    }
    ctx.events_rx = ctx.idle_tx.subscribe();
}

async fn start_game(socket: &mut WebSocket, ctx: &mut ConnCtx) -> Result<LoopControl, NetError> {
    let Some(room) = ctx.room.as_ref() else {
        return reply_error(socket, "Join a room first").await;
    };
    let mut r = room.lock().await;
    match r.start_game(ctx.player_id) {
        Err(e) => reply_error(socket, e.message()).await,
        Ok(()) => {
            info!(code = %r.code, locked = r.locked_count, "game started");
            r.broadcast_roster();
            if let Some(snap) = build_snapshot(&r) {
                r.broadcast(RoomEvent::State(snap));
            }
            Ok(LoopControl::Continue)
        }
    }
}

async fn back_to_lobby(socket: &mut WebSocket, ctx: &mut ConnCtx) -> Result<LoopControl, NetError> {
    let Some(room) = ctx.room.as_ref() else {
        return reply_error(socket, "Join a room first").await;
    };
    let mut r = room.lock().await;
    match r.back_to_lobby(ctx.player_id) {
        Err(e) => reply_error(socket, e.message()).await,
        Ok(()) => {
            r.broadcast_roster();
            Ok(LoopControl::Continue)
        }
    }
}

async fn toggle_pause(socket: &mut WebSocket, ctx: &mut ConnCtx) -> Result<LoopControl, NetError> {
    let Some(room) = ctx.room.as_ref() else {
        return reply_error(socket, "Join a room first").await;
    };
    let mut r = room.lock().await;
    match r.toggle_pause(ctx.player_id) {
        Err(e) => reply_error(socket, e.message()).await,
        Ok(paused) => {
            let text = if paused { "Game paused" } else { "Game resumed" };
            r.broadcast(RoomEvent::Note(text.to_string()));
            // The paused flag should render right away, not at the next
            // broadcast tick.
            if let Some(snap) = build_snapshot(&r) {
                r.broadcast(RoomEvent::State(snap));
            }
            Ok(LoopControl::Continue)
        }
    }
}

/// Movement intent. Accepted while paused so held keys resume cleanly, but
/// dropped for ghosts and outside a running game.
async fn apply_input(ctx: &mut ConnCtx, dto: MoveInputDto) {
    let Some(input) = sanitize_input(dto) else {
        if should_log(&mut ctx.last_invalid_log) {
            warn!("invalid input values (NaN/inf); dropping");
        }
        return;
    };
    let Some(room) = ctx.room.as_ref() else {
        return;
    };
    let mut r = room.lock().await;
    let running = r.phase == Phase::Playing && r.game.as_ref().is_some_and(|g| !g.ended);
    if !running {
        return;
    }
    if let Some(p) = r.player_mut(ctx.player_id) {
        if p.connected {
            p.input = input;
        }
    }
}

async fn run_action(socket: &mut WebSocket, ctx: &mut ConnCtx) -> Result<LoopControl, NetError> {
    let Some(room) = ctx.room.as_ref() else {
        return Ok(LoopControl::Continue);
    };
    let mut r = room.lock().await;
    let running = r.phase == Phase::Playing
        && r.game.as_ref().is_some_and(|g| !g.ended && !g.paused);
    if !running {
        return Ok(LoopControl::Continue);
    }

    let now = Instant::now();
    {
        let Some(p) = r.player_mut(ctx.player_id) else {
            return Ok(LoopControl::Continue);
        };
        if !p.connected {
            return Ok(LoopControl::Continue);
        }
        if !p.try_consume_action(now) {
            if should_log(&mut ctx.last_invalid_log) {
                debug!("action rate limit hit");
            }
            return Ok(LoopControl::Continue);
        }
    }

    let note = {
        let Room { players, game, .. } = &mut *r;
        match game.as_mut() {
            Some(game) => perform_action(game, players, ctx.player_id),
            None => None,
        }
    };
    drop(r);

    if let Some(text) = note {
        send_message(socket, &ServerMessage::Note { text }).await?;
    }
    Ok(LoopControl::Continue)
}
