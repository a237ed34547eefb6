use std::sync::Arc;

use axum::{middleware, routing::get, Extension, Json, Router};
use serde_json::json;
use tower_http::trace::TraceLayer;

use crate::{
    handler::{
        admin::admin_handler, agent::agent_handler, auth::auth_handler,
        profile::profile_handler, user::user_handler,
    },
    middleware::auth,
    AppState,
};

async fn health_check() -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "message": "Server is running"
    }))
}

pub fn create_router(app_state: Arc<AppState>) -> Router {
    let protected_routes = Router::new()
        .merge(profile_handler())
        .nest("/user", user_handler())
        .nest("/agent", agent_handler())
        .nest("/admin", admin_handler())
        .layer(middleware::from_fn(auth));

    Router::new()
        .route("/health", get(health_check))
        .merge(auth_handler())
        .merge(protected_routes)
        .layer(TraceLayer::new_for_http())
        .layer(Extension(app_state))
}
