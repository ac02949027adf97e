//! Transport layer: WebSocket handling, wire DTOs and shared handler state.

pub mod net;
pub mod protocol;
pub mod state;
pub mod utils;
