// src/state.rs

use axum::extract::FromRef;

use crate::{ai::ModelHandle, attempts::AttemptRegistry, config::Config, store::Store};

#[derive(Clone)]
pub struct AppState {
    pub store: Store,
    pub config: Config,
    pub ai: ModelHandle,
    pub attempts: AttemptRegistry,
}

impl FromRef<AppState> for Store {
    fn from_ref(state: &AppState) -> Self {
        state.store.clone()
    }
}

impl FromRef<AppState> for Config {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}

impl FromRef<AppState> for ModelHandle {
    fn from_ref(state: &AppState) -> Self {
        state.ai.clone()
    }
}

impl FromRef<AppState> for AttemptRegistry {
    fn from_ref(state: &AppState) -> Self {
        state.attempts.clone()
    }
}
