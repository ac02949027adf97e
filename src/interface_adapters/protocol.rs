// Wire protocol DTOs for the public WebSocket surface.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::domain::items::PlayerId;
use crate::domain::movement::MoveInput;
use crate::use_cases::snapshot::Snapshot;
use crate::use_cases::types::{EndInfo, RosterUpdate};

/// Messages the server sends to connected clients.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "camelCase")]
pub enum ServerMessage {
    // Acknowledges room entry and tells the client who it is.
    Joined {
        code: String,
        #[serde(rename = "playerId")]
        player_id: PlayerId,
    },
    // Lobby membership / host changes.
    RoomUpdate(RosterUpdate),
    // Authoritative game snapshot; the Arc keeps per-receiver serialization
    // from cloning the whole tree.
    State(Arc<Snapshot>),
    // Short human-readable notice.
    Note { text: String },
    // The game just finished.
    Ended(EndInfo),
    // A request was refused.
    ErrorMsg { text: String },
}

/// Messages clients send to the server.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "camelCase")]
pub enum ClientMessage {
    CreateRoom { name: String },
    JoinRoom { name: String, code: String },
    LeaveRoom,
    StartGame,
    Restart { mode: RestartMode },
    TogglePause,
    Input(MoveInputDto),
    Action,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RestartMode {
    /// Same seats, fresh game.
    Again,
    /// Back to the lobby screen.
    Lobby,
}

/// Raw movement payload. Clients may send directional flags, analog axes,
/// or both; axes win when non-zero.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct MoveInputDto {
    #[serde(default)]
    pub up: bool,
    #[serde(default)]
    pub down: bool,
    #[serde(default)]
    pub left: bool,
    #[serde(default)]
    pub right: bool,
    #[serde(default)]
    pub ax: f32,
    #[serde(default)]
    pub ay: f32,
}

/// Rejects non-finite axes and clamps the rest into the unit box.
pub fn sanitize_input(dto: MoveInputDto) -> Option<MoveInput> {
    if !dto.ax.is_finite() || !dto.ay.is_finite() {
        return None;
    }
    Some(MoveInput {
        up: dto.up,
        down: dto.down,
        left: dto.left,
        right: dto.right,
        ax: dto.ax.clamp(-1.0, 1.0),
        ay: dto.ay.clamp(-1.0, 1.0),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_messages_parse() {
        let msg: ClientMessage =
            serde_json::from_str(r#"{"type":"createRoom","data":{"name":"Ada"}}"#).unwrap();
        assert!(matches!(msg, ClientMessage::CreateRoom { ref name } if name == "Ada"));

        let msg: ClientMessage =
            serde_json::from_str(r#"{"type":"joinRoom","data":{"name":"Bo","code":"AB2CD"}}"#)
                .unwrap();
        assert!(matches!(msg, ClientMessage::JoinRoom { ref code, .. } if code == "AB2CD"));

        let msg: ClientMessage = serde_json::from_str(r#"{"type":"action"}"#).unwrap();
        assert!(matches!(msg, ClientMessage::Action));

        let msg: ClientMessage =
            serde_json::from_str(r#"{"type":"restart","data":{"mode":"again"}}"#).unwrap();
        assert!(matches!(msg, ClientMessage::Restart { mode: RestartMode::Again }));

        let msg: ClientMessage =
            serde_json::from_str(r#"{"type":"input","data":{"up":true,"ax":0.5}}"#).unwrap();
        let ClientMessage::Input(dto) = msg else {
            panic!("expected input");
        };
        assert!(dto.up);
        assert_eq!(dto.ax, 0.5);
    }

    #[test]
    fn server_messages_tag_their_type() {
        let joined = ServerMessage::Joined { code: "AB2CD".to_string(), player_id: 7 };
        let v = serde_json::to_value(&joined).unwrap();
        assert_eq!(v["type"], "joined");
        assert_eq!(v["data"]["code"], "AB2CD");
        assert_eq!(v["data"]["playerId"], 7);

        let err = ServerMessage::ErrorMsg { text: "Room not found".to_string() };
        let v = serde_json::to_value(&err).unwrap();
        assert_eq!(v["type"], "errorMsg");
        assert_eq!(v["data"]["text"], "Room not found");
    }

    #[test]
    fn sanitizing_rejects_nan_and_clamps() {
        assert!(sanitize_input(MoveInputDto { ax: f32::NAN, ..Default::default() }).is_none());
        assert!(sanitize_input(MoveInputDto { ay: f32::INFINITY, ..Default::default() }).is_none());

        let input = sanitize_input(MoveInputDto { ax: 4.0, ay: -2.5, ..Default::default() })
            .unwrap();
        assert_eq!(input.ax, 1.0);
        assert_eq!(input.ay, -1.0);
    }
}
