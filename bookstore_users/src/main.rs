use std::sync::Arc;

use actix_web::{web, App, HttpServer};
use paperclip::actix::OpenApiExt;
use tracing_actix_web::TracingLogger;

use bookstore_resources::service::open_store;
use bookstore_resources::settings::StoreSettings;
use bookstore_resources::telemetry::init_telemetry;
use bookstore_users::app_config::config_app;
use bookstore_users::auth_service::{Accounts, AuthService};
use bookstore_users::settings::{SignupSettings, TokenSettings};
use bookstore_users::token::TokenIssuer;
use bookstore_users::user_record::UserRecord;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let app_name = "bookstore_users";
    init_telemetry(app_name)?;

    let store_settings = StoreSettings::load(3004)?;
    let token_settings = TokenSettings::load()?;
    let signup_settings = SignupSettings::load()?;
    let users = open_store::<UserRecord>(&store_settings).await?;
    if !signup_settings.allow_privileged_signup {
        tracing::info!("Public signups are limited to user privileges");
    }
    let accounts: Arc<dyn Accounts> = Arc::new(
        AuthService::new(users, TokenIssuer::from_settings(&token_settings))
            .with_privileged_signup(signup_settings.allow_privileged_signup),
    );

    tracing::info!(
        "starting {} HTTP server at http://0.0.0.0:{}",
        app_name,
        store_settings.port
    );
    HttpServer::new(move || {
        App::new()
            .wrap_api()
            .app_data(web::Data::new(accounts.clone()))
            .wrap(TracingLogger::default())
            .configure(config_app)
            .with_json_spec_at("/apispec/v2")
            .build()
    })
    .bind(("0.0.0.0", store_settings.port))?
    .run()
    .await?;
    Ok(())
}
