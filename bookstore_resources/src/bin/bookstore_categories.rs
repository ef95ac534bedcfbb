use bookstore_resources::api::Category;
use bookstore_resources::service::run_resource_service;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    run_resource_service::<Category>("bookstore_categories", 3003).await
}
