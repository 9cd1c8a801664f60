use crate::handlers;
use crate::state::AppState;
use axum::{
    Router,
    routing::{get, post, put},
};
use tower_http::trace::TraceLayer;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route(
            "/api/users/:user_id/profile",
            get(handlers::get_profile).put(handlers::put_profile),
        )
        .route("/api/users/:user_id/preferences", put(handlers::put_preferences))
        .route("/api/users/:user_id/goals", get(handlers::get_goals))
        .route("/api/users/:user_id/goals/apply", post(handlers::apply_goals))
        .route("/api/users/:user_id/completions/:metric", post(handlers::complete_goal))
        .route("/api/users/:user_id/progress", get(handlers::get_progress))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
