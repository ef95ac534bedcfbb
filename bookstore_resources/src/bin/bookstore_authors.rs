use bookstore_resources::api::Author;
use bookstore_resources::service::run_resource_service;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    run_resource_service::<Author>("bookstore_authors", 3002).await
}
