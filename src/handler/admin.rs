use std::sync::Arc;

use axum::{
    extract::Path,
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::{delete, get, patch, post},
    Extension, Json, Router,
};
use axum_extra::extract::WithRejection;
use uuid::Uuid;
use validator::Validate;

use crate::{
    dtos::{
        ticketdtos::{AssignTicketDto, ReassignTicketDto, StatusUpdateDto},
        userdtos::{
            AgentDto, FilterUserDto, RegisterUserDto, RoleUpdateDto, UserData,
            UserListResponseDto, UserResponseDto,
        },
    },
    error::HttpError,
    middleware::{role_check, JWTAuthMiddleware},
    service::policy::Action,
    AppState,
};

pub fn admin_handler() -> Router {
    Router::new()
        .route(
            "/tickets",
            get(get_all_tickets).layer(middleware::from_fn(|state, req, next| {
                role_check(state, req, next, Action::ListAllTickets)
            })),
        )
        .route(
            "/tickets/stats",
            get(get_ticket_stats).layer(middleware::from_fn(|state, req, next| {
                role_check(state, req, next, Action::ViewTicketStats)
            })),
        )
        .route(
            "/tickets/:id",
            get(get_ticket).layer(middleware::from_fn(|state, req, next| {
                role_check(state, req, next, Action::ViewAnyTicket)
            })),
        )
        .route(
            "/tickets/:id/status",
            patch(force_status).layer(middleware::from_fn(|state, req, next| {
                role_check(state, req, next, Action::ForceTicketStatus)
            })),
        )
        .route(
            "/ticket/:id/assign",
            patch(assign_ticket).layer(middleware::from_fn(|state, req, next| {
                role_check(state, req, next, Action::AssignTicket)
            })),
        )
        .route(
            "/ticket/:id/reassign",
            patch(reassign_ticket).layer(middleware::from_fn(|state, req, next| {
                role_check(state, req, next, Action::ReassignTicket)
            })),
        )
        .route(
            "/ticket/:id",
            delete(delete_ticket).layer(middleware::from_fn(|state, req, next| {
                role_check(state, req, next, Action::DeleteTicket)
            })),
        )
        .route(
            "/user",
            post(create_user).layer(middleware::from_fn(|state, req, next| {
                role_check(state, req, next, Action::CreateUser)
            })),
        )
        .route(
            "/user/:id/role",
            patch(update_user_role).layer(middleware::from_fn(|state, req, next| {
                role_check(state, req, next, Action::UpdateUserRole)
            })),
        )
        .route(
            "/users",
            get(get_users).layer(middleware::from_fn(|state, req, next| {
                role_check(state, req, next, Action::ListUsers)
            })),
        )
        .route(
            "/users/:id",
            delete(delete_user).layer(middleware::from_fn(|state, req, next| {
                role_check(state, req, next, Action::DeleteUser)
            })),
        )
        .route(
            "/agents",
            get(get_agents).layer(middleware::from_fn(|state, req, next| {
                role_check(state, req, next, Action::ListAgents)
            })),
        )
}

pub async fn get_all_tickets(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddleware>,
) -> Result<impl IntoResponse, HttpError> {
    let tickets = app_state.ticket_service.list_all(&auth.actor()).await?;

    Ok(Json(serde_json::json!({
        "status": "success",
        "results": tickets.len(),
        "data": tickets
    })))
}

pub async fn get_ticket_stats(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddleware>,
) -> Result<impl IntoResponse, HttpError> {
    let stats = app_state.ticket_service.stats(&auth.actor()).await?;
    let total: i64 = stats.iter().map(|s| s.count).sum();

    Ok(Json(serde_json::json!({
        "status": "success",
        "data": {
            "total": total,
            "byStatus": stats
        }
    })))
}

pub async fn get_ticket(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddleware>,
    WithRejection(Path(ticket_id), _): WithRejection<Path<Uuid>, HttpError>,
) -> Result<impl IntoResponse, HttpError> {
    let ticket = app_state
        .ticket_service
        .get_any(&auth.actor(), ticket_id)
        .await?;

    Ok(Json(serde_json::json!({
        "status": "success",
        "data": ticket
    })))
}

pub async fn force_status(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddleware>,
    WithRejection(Path(ticket_id), _): WithRejection<Path<Uuid>, HttpError>,
    WithRejection(Json(body), _): WithRejection<Json<StatusUpdateDto>, HttpError>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let ticket = app_state
        .ticket_service
        .force_status(&auth.actor(), ticket_id, &body.status)
        .await?;

    Ok(Json(serde_json::json!({
        "status": "success",
        "message": "Ticket status updated successfully",
        "data": ticket
    })))
}

pub async fn assign_ticket(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddleware>,
    WithRejection(Path(ticket_id), _): WithRejection<Path<Uuid>, HttpError>,
    WithRejection(Json(body), _): WithRejection<Json<AssignTicketDto>, HttpError>,
) -> Result<impl IntoResponse, HttpError> {
    let ticket = app_state
        .ticket_service
        .assign(&auth.actor(), ticket_id, body.assigned_to)
        .await?;

    Ok(Json(serde_json::json!({
        "status": "success",
        "message": "Ticket assigned successfully",
        "data": ticket
    })))
}

pub async fn reassign_ticket(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddleware>,
    WithRejection(Path(ticket_id), _): WithRejection<Path<Uuid>, HttpError>,
    WithRejection(Json(body), _): WithRejection<Json<ReassignTicketDto>, HttpError>,
) -> Result<impl IntoResponse, HttpError> {
    let ticket = app_state
        .ticket_service
        .reassign(&auth.actor(), ticket_id, body.assigned_to)
        .await?;

    Ok(Json(serde_json::json!({
        "status": "success",
        "message": "Ticket reassigned successfully",
        "data": ticket
    })))
}

pub async fn delete_ticket(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddleware>,
    WithRejection(Path(ticket_id), _): WithRejection<Path<Uuid>, HttpError>,
) -> Result<impl IntoResponse, HttpError> {
    let ticket = app_state
        .ticket_service
        .delete_ticket(&auth.actor(), ticket_id)
        .await?;

    Ok(Json(serde_json::json!({
        "status": "success",
        "message": "Ticket deleted successfully",
        "data": ticket
    })))
}

pub async fn create_user(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddleware>,
    WithRejection(Json(body), _): WithRejection<Json<RegisterUserDto>, HttpError>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let user = app_state
        .account_service
        .create_user(&auth.actor(), body.into())
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(UserResponseDto {
            status: "success".to_string(),
            message: "User created successfully".to_string(),
            data: UserData {
                user: FilterUserDto::filter_user(&user),
            },
        }),
    ))
}

pub async fn update_user_role(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddleware>,
    WithRejection(Path(user_id), _): WithRejection<Path<Uuid>, HttpError>,
    WithRejection(Json(body), _): WithRejection<Json<RoleUpdateDto>, HttpError>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let user = app_state
        .account_service
        .update_role(&auth.actor(), user_id, &body.role)
        .await?;

    Ok(Json(UserResponseDto {
        status: "success".to_string(),
        message: "User role updated successfully".to_string(),
        data: UserData {
            user: FilterUserDto::filter_user(&user),
        },
    }))
}

pub async fn get_users(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddleware>,
) -> Result<impl IntoResponse, HttpError> {
    let users = app_state.account_service.list_users(&auth.actor()).await?;

    Ok(Json(UserListResponseDto {
        status: "success".to_string(),
        results: users.len(),
        users: FilterUserDto::filter_users(&users),
    }))
}

pub async fn delete_user(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddleware>,
    WithRejection(Path(user_id), _): WithRejection<Path<Uuid>, HttpError>,
) -> Result<impl IntoResponse, HttpError> {
    let deletion = app_state
        .account_service
        .delete_user(&auth.actor(), user_id)
        .await?;

    Ok(Json(serde_json::json!({
        "status": "success",
        "message": "User deleted successfully",
        "data": {
            "user": FilterUserDto::filter_user(&deletion.user),
            "ticketsDeleted": deletion.tickets_deleted,
            "commentsDeleted": deletion.comments_deleted
        }
    })))
}

pub async fn get_agents(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddleware>,
) -> Result<impl IntoResponse, HttpError> {
    let agents = app_state.account_service.list_agents(&auth.actor()).await?;

    Ok(Json(serde_json::json!({
        "status": "success",
        "results": agents.len(),
        "data": AgentDto::filter_agents(&agents)
    })))
}
