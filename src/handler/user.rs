use std::sync::Arc;

use axum::{
    extract::Path,
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::{get, patch, post},
    Extension, Json, Router,
};
use axum_extra::extract::WithRejection;
use uuid::Uuid;
use validator::Validate;

use crate::{
    dtos::ticketdtos::{CommentDto, CreateTicketDto, RatingDto},
    error::HttpError,
    middleware::{role_check, JWTAuthMiddleware},
    service::policy::Action,
    AppState,
};

pub fn user_handler() -> Router {
    Router::new()
        .route(
            "/ticket",
            post(create_ticket).layer(middleware::from_fn(|state, req, next| {
                role_check(state, req, next, Action::CreateTicket)
            })),
        )
        .route(
            "/ticket/myTickets",
            get(get_my_tickets).layer(middleware::from_fn(|state, req, next| {
                role_check(state, req, next, Action::ListOwnTickets)
            })),
        )
        .route(
            "/ticket/:id",
            get(get_my_ticket).layer(middleware::from_fn(|state, req, next| {
                role_check(state, req, next, Action::ViewOwnTicket)
            })),
        )
        .route(
            "/ticket/:id/comment",
            post(add_comment).layer(middleware::from_fn(|state, req, next| {
                role_check(state, req, next, Action::CommentAsOwner)
            })),
        )
        .route(
            "/ticket/:id/rating",
            patch(rate_ticket).layer(middleware::from_fn(|state, req, next| {
                role_check(state, req, next, Action::RateTicket)
            })),
        )
}

pub async fn create_ticket(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddleware>,
    WithRejection(Json(body), _): WithRejection<Json<CreateTicketDto>, HttpError>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let ticket = app_state
        .ticket_service
        .create_ticket(&auth.actor(), body.into())
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({
            "status": "success",
            "message": "Ticket created successfully",
            "data": ticket
        })),
    ))
}

pub async fn get_my_tickets(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddleware>,
) -> Result<impl IntoResponse, HttpError> {
    let tickets = app_state
        .ticket_service
        .list_own_tickets(&auth.actor())
        .await?;

    Ok(Json(serde_json::json!({
        "status": "success",
        "results": tickets.len(),
        "data": tickets
    })))
}

pub async fn get_my_ticket(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddleware>,
    WithRejection(Path(ticket_id), _): WithRejection<Path<Uuid>, HttpError>,
) -> Result<impl IntoResponse, HttpError> {
    let ticket = app_state
        .ticket_service
        .get_own_ticket(&auth.actor(), ticket_id)
        .await?;

    Ok(Json(serde_json::json!({
        "status": "success",
        "data": ticket
    })))
}

pub async fn add_comment(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddleware>,
    WithRejection(Path(ticket_id), _): WithRejection<Path<Uuid>, HttpError>,
    WithRejection(Json(body), _): WithRejection<Json<CommentDto>, HttpError>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let comment = app_state
        .ticket_service
        .add_comment_as_owner(&auth.actor(), ticket_id, &body.text)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({
            "status": "success",
            "message": "Comment added successfully",
            "data": comment
        })),
    ))
}

pub async fn rate_ticket(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddleware>,
    WithRejection(Path(ticket_id), _): WithRejection<Path<Uuid>, HttpError>,
    WithRejection(Json(body), _): WithRejection<Json<RatingDto>, HttpError>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let ticket = app_state
        .ticket_service
        .rate_ticket(&auth.actor(), ticket_id, body.stars, body.feedback)
        .await?;

    Ok(Json(serde_json::json!({
        "status": "success",
        "message": "Ticket rated successfully",
        "data": ticket
    })))
}
