use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

use tutor_core::constants::endpoints;

use crate::handlers::{chat_tutor_handler, health_handler, method_not_allowed_handler};
use crate::state::AppState;

pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
        .on_response(DefaultOnResponse::new().level(Level::INFO));

    let chat = post(chat_tutor_handler).fallback(method_not_allowed_handler);

    Router::new()
        .route("/health", get(health_handler))
        .route(endpoints::PROXY_ROUTE, chat.clone())
        .route(endpoints::PROXY_ROUTE_ALIAS, chat)
        .layer(trace_layer)
        .layer(cors)
        .with_state(state)
}
