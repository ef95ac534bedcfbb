use bookstore_resources::api::Book;
use bookstore_resources::service::run_resource_service;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    run_resource_service::<Book>("bookstore_books", 3001).await
}
