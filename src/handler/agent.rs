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
    dtos::ticketdtos::{CommentDto, StatusUpdateDto},
    error::HttpError,
    middleware::{role_check, JWTAuthMiddleware},
    service::policy::Action,
    AppState,
};

pub fn agent_handler() -> Router {
    Router::new()
        .route(
            "/tickets",
            get(get_assigned_tickets).layer(middleware::from_fn(|state, req, next| {
                role_check(state, req, next, Action::ListAssignedTickets)
            })),
        )
        .route(
            "/ticket/:id/status",
            patch(update_status).layer(middleware::from_fn(|state, req, next| {
                role_check(state, req, next, Action::UpdateAssignedStatus)
            })),
        )
        .route(
            "/ticket/:id/comment",
            post(add_comment).layer(middleware::from_fn(|state, req, next| {
                role_check(state, req, next, Action::CommentAsAssignee)
            })),
        )
}

pub async fn get_assigned_tickets(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddleware>,
) -> Result<impl IntoResponse, HttpError> {
    let tickets = app_state
        .ticket_service
        .list_assigned(&auth.actor())
        .await?;

    Ok(Json(serde_json::json!({
        "status": "success",
        "results": tickets.len(),
        "data": tickets
    })))
}

pub async fn update_status(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddleware>,
    WithRejection(Path(ticket_id), _): WithRejection<Path<Uuid>, HttpError>,
    WithRejection(Json(body), _): WithRejection<Json<StatusUpdateDto>, HttpError>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let ticket = app_state
        .ticket_service
        .agent_update_status(&auth.actor(), ticket_id, &body.status)
        .await?;

    Ok(Json(serde_json::json!({
        "status": "success",
        "message": "Ticket status updated successfully",
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
        .add_comment_as_assignee(&auth.actor(), ticket_id, &body.text)
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
