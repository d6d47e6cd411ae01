use std::sync::Arc;

use acp_kernel::Router;

#[derive(Clone)]
pub struct AppState {
    pub router: Arc<Router>,
}

impl AppState {
    pub fn new(router: Arc<Router>) -> Self {
        Self { router }
    }
}
