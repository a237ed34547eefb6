pub mod account_service;
pub mod auth_service;
pub mod error;
pub mod lifecycle;
pub mod notification_service;
pub mod policy;
pub mod ticket_service;
