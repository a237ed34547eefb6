mod config;
mod db;
mod dtos;
mod error;
mod handler;
mod mail;
mod middleware;
mod models;
mod routes;
mod service;
mod utils;

use std::sync::Arc;

use axum::http::{
    header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
    HeaderValue, Method,
};
use config::Config;
use db::{db::DBClient, memory::MemoryStore, Store};
use dotenv::dotenv;
use mail::sendmail::{build_mailer, Mailer};
use routes::create_router;
use service::{
    account_service::AccountService, auth_service::Authenticator,
    notification_service::NotificationService, ticket_service::TicketService,
};
use tower_http::cors::{AllowOrigin, CorsLayer};

#[derive(Clone)]
pub struct AppState {
    pub env: Config,
    pub authenticator: Authenticator,
    pub account_service: AccountService,
    pub ticket_service: TicketService,
}

impl AppState {
    pub fn new(env: Config, db_client: Arc<dyn Store>, mailer: Arc<dyn Mailer>) -> Self {
        let notifier = NotificationService::new(mailer);

        AppState {
            authenticator: Authenticator::new(
                db_client.clone(),
                env.jwt_secret.as_bytes(),
                env.jwt_maxage,
            ),
            account_service: AccountService::new(db_client.clone(), env.allow_privileged_signup),
            ticket_service: TicketService::new(db_client, notifier),
            env,
        }
    }
}

#[tokio::main]
async fn main() {
    dotenv().ok();

    let config = match Config::init() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("🔥 Invalid configuration: {}", err);
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_max_level(config.log_level)
        .init();

    let db_client: Arc<dyn Store> = if config.uses_memory_store() {
        tracing::warn!("Using the in-memory store; data is lost on restart");
        Arc::new(MemoryStore::new())
    } else {
        match DBClient::connect(&config.database_url, 10).await {
            Ok(client) => {
                tracing::info!("✅Connection to the database is successful!");
                Arc::new(client)
            }
            Err(err) => {
                tracing::error!("🔥 Failed to connect to the database: {:?}", err);
                std::process::exit(1);
            }
        }
    };

    let mailer = match build_mailer(&config.mail) {
        Ok(mailer) => mailer,
        Err(err) => {
            tracing::error!("🔥 Failed to set up the mail transport: {}", err);
            std::process::exit(1);
        }
    };
    tracing::info!("Mail transport: {:?}", config.mail.transport);

    let allowed_origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin {}", origin);
                None
            }
        })
        .collect();

    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed_origins))
        .allow_headers([AUTHORIZATION, ACCEPT, CONTENT_TYPE])
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE]);

    let app_state = AppState::new(config.clone(), db_client, mailer);

    let app = create_router(Arc::new(app_state)).layer(cors);

    let listener = match tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.port)).await {
        Ok(listener) => listener,
        Err(err) => {
            tracing::error!("🔥 Failed to bind port {}: {}", config.port, err);
            std::process::exit(1);
        }
    };

    tracing::info!("🚀 Server is running on http://localhost:{}", config.port);

    if let Err(err) = axum::serve(listener, app).await {
        tracing::error!("🔥 Server error: {}", err);
        std::process::exit(1);
    }
}
