use crate::config::Config;
use crate::store::ProductStore;
use std::sync::Arc;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn ProductStore>,
    pub config: Arc<Config>,
}
