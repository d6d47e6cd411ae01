use std::sync::Arc;

use acp_hub::{Hub, InMemoryStorage};

#[derive(Clone)]
pub struct AppState {
    pub hub: Arc<Hub<InMemoryStorage>>,
}

impl AppState {
    pub fn new(hub: Arc<Hub<InMemoryStorage>>) -> Self {
        Self { hub }
    }
}
