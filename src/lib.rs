pub mod api;
pub mod auth;
pub mod clash;
pub mod commands;
pub mod config;
pub mod interaction;
pub mod metrics;
pub mod store;
