use axum::{middleware, response::IntoResponse, routing::get, Extension, Json, Router};

use crate::{
    dtos::userdtos::{FilterUserDto, UserData},
    error::HttpError,
    middleware::{role_check, JWTAuthMiddleware},
    service::policy::Action,
};

pub fn profile_handler() -> Router {
    Router::new().route(
        "/profile",
        get(get_profile).layer(middleware::from_fn(|state, req, next| {
            role_check(state, req, next, Action::ViewProfile)
        })),
    )
}

pub async fn get_profile(
    Extension(auth): Extension<JWTAuthMiddleware>,
) -> Result<impl IntoResponse, HttpError> {
    Ok(Json(serde_json::json!({
        "status": "success",
        "data": UserData {
            user: FilterUserDto::filter_user(&auth.user),
        }
    })))
}
