pub mod admin;
pub mod agent;
pub mod auth;
pub mod profile;
pub mod user;
