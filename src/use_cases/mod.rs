//! Application rules: room lifecycle, the simulation loop and the actions
//! players can take, independent of any transport.

pub mod actions;
pub mod game;
pub mod room;
pub mod rooms;
pub mod snapshot;
pub mod types;
