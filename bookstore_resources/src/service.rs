use std::sync::Arc;

use actix_web::{web, App, HttpServer};
use tracing_actix_web::TracingLogger;

use crate::app_config::config_resource;
use crate::resource_store::{
    InMemoryResourceStore, PostgresResourceStore, Resource, ResourceStore,
};
use crate::settings::StoreSettings;
use crate::telemetry::init_telemetry;

/// Picks the storage adapter configured for this process
pub async fn open_store<T: Resource>(
    settings: &StoreSettings,
) -> anyhow::Result<Arc<dyn ResourceStore<T>>> {
    if settings.use_in_memory_db {
        tracing::info!("Using in-memory {} store", T::COLLECTION);
        Ok(Arc::new(InMemoryResourceStore::<T>::default()))
    } else {
        Ok(Arc::new(
            PostgresResourceStore::<T>::init(&settings.postgres()).await?,
        ))
    }
}

/// Runs the HTTP service owning the `T` collection until shutdown
pub async fn run_resource_service<T: Resource>(
    app_name: &str,
    default_port: u16,
) -> anyhow::Result<()> {
    init_telemetry(app_name)?;
    let settings = StoreSettings::load(default_port)?;
    let store = open_store::<T>(&settings).await?;

    tracing::info!(
        "starting {} HTTP server at http://0.0.0.0:{}",
        app_name,
        settings.port
    );
    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(store.clone()))
            .wrap(TracingLogger::default())
            .configure(config_resource::<T>)
    })
    .bind(("0.0.0.0", settings.port))?
    .run()
    .await?;
    Ok(())
}
