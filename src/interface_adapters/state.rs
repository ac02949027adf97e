// Shared state handed to every request handler.

use std::sync::Arc;

use crate::use_cases::rooms::RoomRegistry;

pub struct AppState {
    pub rooms: Arc<RoomRegistry>,
}
