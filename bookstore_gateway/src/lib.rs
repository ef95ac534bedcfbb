pub mod aggregation;
pub mod api;
pub mod app_config;
pub mod authorization;
pub mod error;
pub mod routes;
pub mod settings;

mod handlers;
