use actix_web::web;

use crate::handlers;
use crate::resource_store::Resource;

/// Mounts the CRUD surface of one resource collection.
/// Expects a `Data<Arc<dyn ResourceStore<T>>>` registered as app data
pub fn config_resource<T: Resource>(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/health").route(web::get().to(handlers::health)))
        .service(
            web::resource(format!("/{}", T::COLLECTION))
                .route(web::get().to(handlers::find::<T>))
                .route(web::post().to(handlers::create::<T>)),
        )
        .service(
            web::resource(format!("/{}/count", T::COLLECTION))
                .route(web::get().to(handlers::count::<T>)),
        )
        .service(
            web::resource(format!("/{}/{{id}}", T::COLLECTION))
                .route(web::get().to(handlers::find_by_id::<T>))
                .route(web::patch().to(handlers::update_by_id::<T>))
                .route(web::put().to(handlers::replace_by_id::<T>))
                .route(web::delete().to(handlers::delete_by_id::<T>)),
        );
}
