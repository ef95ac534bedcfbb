use std::sync::Arc;

use actix_web::http::header::LOCATION;
use actix_web::web::{self, Data};
use actix_web::{Error, HttpResponse};

use crate::api::{CountQuery, CountResponse, ErrorBody, FindQuery};
use crate::resource_store::{Resource, ResourceStore, StoreError};

pub type SharedStore<T> = Data<Arc<dyn ResourceStore<T>>>;

pub async fn health() -> Result<HttpResponse, Error> {
    Ok(HttpResponse::Ok().finish())
}

/// Translates a store failure into the response sent to the caller.
/// Unexpected failures are logged here and reported without details
pub fn store_error_response(operation: &str, err: &StoreError) -> HttpResponse {
    let body = |message: String| ErrorBody { message };
    match err {
        StoreError::NotFound { .. } => HttpResponse::NotFound().json(body(err.to_string())),
        StoreError::Conflict(message) => HttpResponse::Conflict().json(body(message.clone())),
        StoreError::Invalid(message) => HttpResponse::BadRequest().json(body(message.clone())),
        StoreError::Unavailable(_) => {
            tracing::error!("{} failed, backend unavailable: {}", operation, err);
            HttpResponse::ServiceUnavailable().json(body(format!("{} failed", operation)))
        }
        _ => {
            tracing::error!("{} failed {}", operation, err);
            HttpResponse::InternalServerError().json(body(format!("{} failed", operation)))
        }
    }
}

pub async fn create<T: Resource>(
    store: SharedStore<T>,
    item: web::Json<T>,
) -> Result<HttpResponse, Error> {
    Ok(match store.create(item.into_inner()).await {
        Ok(created) => HttpResponse::Created()
            .append_header((LOCATION, format!("/{}/{}", T::COLLECTION, created.id())))
            .json(created),
        Err(err) => store_error_response(&format!("Create {}", T::NAME), &err),
    })
}

pub async fn find<T: Resource>(
    store: SharedStore<T>,
    query: web::Query<FindQuery>,
) -> Result<HttpResponse, Error> {
    let filter = match query.parse() {
        Ok(filter) => filter,
        Err(err) => return Ok(store_error_response("Find", &err)),
    };
    Ok(match store.find(&filter).await {
        Ok(records) => HttpResponse::Ok().json(records),
        Err(err) => store_error_response(&format!("Find {}", T::COLLECTION), &err),
    })
}

pub async fn count<T: Resource>(
    store: SharedStore<T>,
    query: web::Query<CountQuery>,
) -> Result<HttpResponse, Error> {
    let where_clause = match query.parse() {
        Ok(where_clause) => where_clause,
        Err(err) => return Ok(store_error_response("Count", &err)),
    };
    Ok(match store.count(where_clause.as_ref()).await {
        Ok(count) => HttpResponse::Ok().json(CountResponse { count }),
        Err(err) => store_error_response(&format!("Count {}", T::COLLECTION), &err),
    })
}

pub async fn find_by_id<T: Resource>(
    store: SharedStore<T>,
    id: web::Path<String>,
) -> Result<HttpResponse, Error> {
    Ok(match store.find_by_id(&id).await {
        Ok(record) => HttpResponse::Ok().json(record),
        Err(err) => store_error_response(&format!("Get {}", T::NAME), &err),
    })
}

pub async fn update_by_id<T: Resource>(
    store: SharedStore<T>,
    id: web::Path<String>,
    patch: web::Json<serde_json::Value>,
) -> Result<HttpResponse, Error> {
    Ok(match store.update_by_id(&id, patch.into_inner()).await {
        Ok(record) => HttpResponse::Ok().json(record),
        Err(err) => store_error_response(&format!("Update {}", T::NAME), &err),
    })
}

pub async fn replace_by_id<T: Resource>(
    store: SharedStore<T>,
    id: web::Path<String>,
    item: web::Json<T>,
) -> Result<HttpResponse, Error> {
    Ok(match store.replace_by_id(&id, item.into_inner()).await {
        Ok(record) => HttpResponse::Ok().json(record),
        Err(err) => store_error_response(&format!("Replace {}", T::NAME), &err),
    })
}

pub async fn delete_by_id<T: Resource>(
    store: SharedStore<T>,
    id: web::Path<String>,
) -> Result<HttpResponse, Error> {
    Ok(match store.delete_by_id(&id).await {
        Ok(()) => HttpResponse::NoContent().finish(),
        Err(err) => store_error_response(&format!("Delete {}", T::NAME), &err),
    })
}

#[cfg(test)]
mod handler_tests {
    use std::sync::Arc;

    use actix_web::http::header::LOCATION;
    use actix_web::http::StatusCode;
    use actix_web::{test, web, App};
    use serde_json::json;

    use crate::api::{Author, CountResponse, ErrorBody};
    use crate::app_config::config_resource;
    use crate::resource_store::{InMemoryResourceStore, ResourceStore};

    fn author_store() -> Arc<dyn ResourceStore<Author>> {
        Arc::new(InMemoryResourceStore::with_records(vec![Author {
            id: "a1".to_string(),
            name: "X".to_string(),
        }]))
    }

    #[actix_web::test]
    async fn test_create_get_and_delete_over_http() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(author_store()))
                .configure(config_resource::<Author>),
        )
        .await;

        let request = test::TestRequest::post()
            .uri("/authors")
            .set_json(json!({"id": "a2", "name": "Y"}))
            .to_request();
        let response = test::call_service(&app, request).await;
        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(
            response.headers().get(LOCATION).and_then(|h| h.to_str().ok()),
            Some("/authors/a2")
        );

        let request = test::TestRequest::get().uri("/authors/a2").to_request();
        let fetched: Author = test::call_and_read_body_json(&app, request).await;
        assert_eq!(fetched.name, "Y");

        let request = test::TestRequest::get().uri("/authors/count").to_request();
        let count: CountResponse = test::call_and_read_body_json(&app, request).await;
        assert_eq!(count.count, 2);

        let request = test::TestRequest::delete().uri("/authors/a1").to_request();
        let response = test::call_service(&app, request).await;
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        let request = test::TestRequest::get().uri("/authors/a1").to_request();
        let response = test::call_service(&app, request).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body: ErrorBody = test::read_body_json(response).await;
        assert_eq!(body.message, "Author a1 not found");
    }

    #[actix_web::test]
    async fn test_store_errors_map_to_statuses() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(author_store()))
                .configure(config_resource::<Author>),
        )
        .await;

        let request = test::TestRequest::post()
            .uri("/authors")
            .set_json(json!({"id": "a1", "name": "dup"}))
            .to_request();
        assert_eq!(
            test::call_service(&app, request).await.status(),
            StatusCode::CONFLICT
        );

        let request = test::TestRequest::post()
            .uri("/authors")
            .set_json(json!({"id": "a3", "name": ""}))
            .to_request();
        assert_eq!(
            test::call_service(&app, request).await.status(),
            StatusCode::BAD_REQUEST
        );

        let request = test::TestRequest::get()
            .uri("/authors?filter=%7Bbroken")
            .to_request();
        assert_eq!(
            test::call_service(&app, request).await.status(),
            StatusCode::BAD_REQUEST
        );

        let request = test::TestRequest::patch()
            .uri("/authors/a1")
            .set_json(json!({"name": "Renamed"}))
            .to_request();
        let patched: Author = test::call_and_read_body_json(&app, request).await;
        assert_eq!(patched.name, "Renamed");
    }
}
