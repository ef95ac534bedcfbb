use std::sync::Arc;

use actix_web::middleware::from_fn;
use actix_web::web::Data;
use actix_web::{App, HttpServer};
use tracing_actix_web::TracingLogger;

use bookstore_gateway::aggregation::BookAggregator;
use bookstore_gateway::app_config::GatewayState;
use bookstore_gateway::authorization::{authorize_request, Authorizer};
use bookstore_gateway::settings::GatewaySettings;
use bookstore_resources::api::{Author, Book, Category};
use bookstore_resources::client::ResourceClient;
use bookstore_resources::resource_store::ResourceStore;
use bookstore_resources::telemetry::init_telemetry;
use bookstore_users::auth_service::Accounts;
use bookstore_users::client::UsersClient;
use bookstore_users::token::TokenVerifier;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let app_name = "bookstore_gateway";
    init_telemetry(app_name)?;

    let settings = GatewaySettings::load()?;
    let client_settings = settings.client_settings();
    let authors: Arc<dyn ResourceStore<Author>> = Arc::new(ResourceClient::with_settings(
        &settings.authors_url,
        &client_settings,
    )?);
    let books: Arc<dyn ResourceStore<Book>> = Arc::new(ResourceClient::with_settings(
        &settings.books_url,
        &client_settings,
    )?);
    let categories: Arc<dyn ResourceStore<Category>> = Arc::new(ResourceClient::with_settings(
        &settings.categories_url,
        &client_settings,
    )?);
    let accounts: Arc<dyn Accounts> = Arc::new(UsersClient::with_settings(
        &settings.users_url,
        &client_settings,
    )?);

    let state = Arc::new(GatewayState {
        aggregator: Data::new(BookAggregator::new(
            books.clone(),
            authors.clone(),
            categories.clone(),
            settings.lookup_timeout(),
        )),
        authorizer: Data::new(Authorizer::new(TokenVerifier::new(
            &settings.jwt_secret,
            &settings.jwt_issuer,
        ))),
        authors,
        books,
        categories,
        accounts,
    });

    tracing::info!(
        "starting {} HTTP server at http://0.0.0.0:{}",
        app_name,
        settings.port
    );
    HttpServer::new(move || {
        let state = state.clone();
        App::new()
            .wrap(from_fn(authorize_request))
            .wrap(TracingLogger::default())
            .configure(move |cfg| state.configure(cfg))
    })
    .bind(("0.0.0.0", settings.port))?
    .run()
    .await?;
    Ok(())
}
