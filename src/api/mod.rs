// src/api/mod.rs

pub mod handlers;

use axum::{routing::post, Router};
use std::sync::Arc;

use crate::bidding::in_house::InHouse;
use crate::logging::runtime_logger::RuntimeLogger;

#[derive(Clone)]
pub struct AppState {
    pub in_house: Arc<InHouse>,
    pub runtime_logger: Option<Arc<RuntimeLogger>>,
}

/// in-house 接入的 HTTP 路由
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/inhouse/bid", post(handlers::handle_inhouse_bid))
        .route("/inhouse/token", post(handlers::handle_token_value))
        .with_state(state)
}
