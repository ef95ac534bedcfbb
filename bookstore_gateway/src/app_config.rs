use std::sync::Arc;

use actix_web::web::{self, Data};

use bookstore_resources::api::{Author, Book, Category};
use bookstore_resources::resource_store::{Resource, ResourceStore};
use bookstore_users::auth_service::Accounts;

use crate::aggregation::BookAggregator;
use crate::authorization::Authorizer;
use crate::error::GatewayError;
use crate::handlers;

/// Collaborators shared by every worker of the gateway
pub struct GatewayState {
    pub authors: Arc<dyn ResourceStore<Author>>,
    pub books: Arc<dyn ResourceStore<Book>>,
    pub categories: Arc<dyn ResourceStore<Category>>,
    pub accounts: Arc<dyn Accounts>,
    pub aggregator: Data<BookAggregator>,
    pub authorizer: Data<Authorizer>,
}

impl GatewayState {
    pub fn configure(&self, cfg: &mut web::ServiceConfig) {
        cfg.app_data(Data::new(self.authors.clone()))
            .app_data(Data::new(self.books.clone()))
            .app_data(Data::new(self.categories.clone()))
            .app_data(Data::new(self.accounts.clone()))
            .app_data(self.aggregator.clone())
            .app_data(self.authorizer.clone())
            .app_data(web::JsonConfig::default().error_handler(|err, _req| {
                GatewayError::BadRequest(format!("Invalid request body: {}", err)).into()
            }))
            .app_data(web::QueryConfig::default().error_handler(|err, _req| {
                GatewayError::BadRequest(format!("Invalid query: {}", err)).into()
            }))
            .configure(config_app);
    }
}

pub fn config_app(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/health").route(web::get().to(handlers::health)))
        .service(web::resource("/signup").route(web::post().to(handlers::signup)))
        .service(web::resource("/login").route(web::post().to(handlers::login)))
        .service(web::resource("/whoami").route(web::get().to(handlers::whoami)))
        .service(web::resource("/users").route(web::get().to(handlers::list_users)))
        .service(web::resource("/user/{user_id}").route(web::delete().to(handlers::delete_user)))
        .configure(config_passthrough::<Author>)
        .configure(config_passthrough::<Category>)
        .configure(config_books);
}

fn config_passthrough<T: Resource>(cfg: &mut web::ServiceConfig) {
    let collection = format!("/{}", T::COLLECTION);
    cfg.service(
        web::resource(collection.as_str())
            .route(web::post().to(handlers::create::<T>))
            .route(web::get().to(handlers::find::<T>)),
    )
    .service(
        web::resource(format!("{}/count", collection)).route(web::get().to(handlers::count::<T>)),
    )
    .service(
        web::resource(format!("{}/{{id}}", collection))
            .route(web::get().to(handlers::find_by_id::<T>))
            .route(web::patch().to(handlers::update_by_id::<T>))
            .route(web::put().to(handlers::replace_by_id::<T>))
            .route(web::delete().to(handlers::delete_by_id::<T>)),
    );
}

/// Writes go straight to the books store, reads are served as book views
fn config_books(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/books")
            .route(web::post().to(handlers::create::<Book>))
            .route(web::get().to(handlers::list_book_views)),
    )
    .service(web::resource("/books/count").route(web::get().to(handlers::count::<Book>)))
    .service(
        web::resource("/books/{id}")
            .route(web::get().to(handlers::get_book_view))
            .route(web::patch().to(handlers::update_by_id::<Book>))
            .route(web::put().to(handlers::replace_by_id::<Book>))
            .route(web::delete().to(handlers::delete_by_id::<Book>)),
    );
}
