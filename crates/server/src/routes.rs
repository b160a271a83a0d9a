use std::sync::Arc;

use axum::{extract::FromRef, routing::get, Router};
use tera::Tera;
use tower_http::services::ServeDir;

use crate::assistant::OrderAssistant;
use crate::health::{self, HealthState};
use crate::{home, webhook};

#[derive(Clone)]
pub struct AppState {
    pub assistant: Arc<OrderAssistant>,
    pub templates: Arc<Tera>,
    pub health: HealthState,
}

impl FromRef<AppState> for Arc<OrderAssistant> {
    fn from_ref(state: &AppState) -> Self {
        Arc::clone(&state.assistant)
    }
}

impl FromRef<AppState> for Arc<Tera> {
    fn from_ref(state: &AppState) -> Self {
        Arc::clone(&state.templates)
    }
}

impl FromRef<AppState> for HealthState {
    fn from_ref(state: &AppState) -> Self {
        state.health.clone()
    }
}

pub fn router(state: AppState, static_dir: &str) -> Router {
    Router::new()
        .route("/", get(home::home_page).post(webhook::fulfill))
        .route("/health", get(health::health))
        .nest_service("/static", ServeDir::new(static_dir))
        .with_state(state)
}
