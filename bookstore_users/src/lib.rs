pub mod api;
pub mod auth_service;
pub mod password;
pub mod settings;
pub mod token;
pub mod user_record;

#[cfg(feature = "client")]
pub mod client;

#[cfg(any(feature = "server", test))]
pub mod app_config;
#[cfg(any(feature = "server", test))]
mod handlers;
