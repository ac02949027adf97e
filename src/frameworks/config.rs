use std::{env, time::Duration};

// Runtime/server constants (not gameplay tuning).

pub fn http_port() -> u16 {
    env::var("KITCHEN_SERVER_PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(3000)
}

/// Buffered events per room before slow receivers start lagging.
pub const ROOM_EVENTS_CAPACITY: usize = 64;

/// Simulation advances at 25 Hz.
pub const TICK_INTERVAL: Duration = Duration::from_millis(40);
/// State snapshots go out at roughly 12 Hz.
pub const SNAPSHOT_INTERVAL: Duration = Duration::from_millis(1000 / 12);
