use std::sync::Arc;

use axum::{
    http::{header, HeaderValue},
    response::{IntoResponse, Response as AxumResponse},
    routing::post,
    Extension, Json, Router,
};
use axum_extra::extract::{
    cookie::{Cookie, SameSite},
    WithRejection,
};
use validator::Validate;

use crate::{
    dtos::userdtos::{FilterUserDto, LoginUserDto, RegisterUserDto, Response, UserData, UserLoginResponseDto},
    error::HttpError,
    middleware::TOKEN_COOKIE,
    models::usermodel::User,
    AppState,
};

pub fn auth_handler() -> Router {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/logout", post(logout))
}

/// Browsers drop `SameSite=None` cookies that are not `Secure`, so insecure
/// deployments fall back to `Lax`.
fn session_cookie(app_state: &AppState, value: String, max_age: time::Duration) -> Cookie<'static> {
    let same_site = if app_state.env.cookie_secure {
        SameSite::None
    } else {
        SameSite::Lax
    };

    Cookie::build((TOKEN_COOKIE, value))
        .path("/")
        .max_age(max_age)
        .http_only(true)
        .secure(app_state.env.cookie_secure)
        .same_site(same_site)
        .build()
}

fn with_cookie(response: impl IntoResponse, cookie: Cookie<'static>) -> Result<AxumResponse, HttpError> {
    let value = HeaderValue::from_str(&cookie.to_string())
        .map_err(|e| HttpError::server_error(e.to_string()))?;

    let mut response = response.into_response();
    response.headers_mut().append(header::SET_COOKIE, value);
    Ok(response)
}

fn session_response(
    app_state: &AppState,
    user: &User,
    message: &str,
) -> Result<AxumResponse, HttpError> {
    let token = app_state.authenticator.issue_token(user)?;

    let cookie = session_cookie(
        app_state,
        token.clone(),
        time::Duration::minutes(app_state.authenticator.maxage_minutes()),
    );

    let body = Json(UserLoginResponseDto {
        status: "success".to_string(),
        message: message.to_string(),
        data: UserData {
            user: FilterUserDto::filter_user(user),
        },
        token,
    });

    with_cookie(body, cookie)
}

pub async fn register(
    Extension(app_state): Extension<Arc<AppState>>,
    WithRejection(Json(body), _): WithRejection<Json<RegisterUserDto>, HttpError>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let user = app_state.account_service.register(body.into()).await?;

    session_response(&app_state, &user, "User registered successfully")
}

pub async fn login(
    Extension(app_state): Extension<Arc<AppState>>,
    WithRejection(Json(body), _): WithRejection<Json<LoginUserDto>, HttpError>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let user = app_state
        .account_service
        .login(&body.email, &body.password, body.role.as_deref())
        .await?;

    session_response(&app_state, &user, "User logged in successfully")
}

pub async fn logout(
    Extension(app_state): Extension<Arc<AppState>>,
) -> Result<impl IntoResponse, HttpError> {
    let cookie = session_cookie(&app_state, String::new(), time::Duration::ZERO);

    let body = Json(Response {
        status: "success",
        message: "User logged out successfully".to_string(),
    });

    with_cookie(body, cookie)
}
