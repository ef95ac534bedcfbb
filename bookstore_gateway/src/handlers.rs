use std::sync::Arc;

use actix_web::http::header::LOCATION;
use actix_web::web::{self, Data};
use actix_web::HttpResponse;

use bookstore_resources::api::{CountQuery, CountResponse, FindQuery};
use bookstore_resources::resource_store::{validate_resource, Resource, ResourceStore};
use bookstore_users::api::{LoginRequest, SignupRequest};
use bookstore_users::auth_service::Accounts;

use crate::aggregation::BookAggregator;
use crate::authorization::Principal;
use crate::error::{auth_failure, store_failure, GatewayError};

pub type Store<T> = Data<Arc<dyn ResourceStore<T>>>;
pub type SharedAccounts = Data<Arc<dyn Accounts>>;

fn require(field: &str, value: &str) -> Result<(), GatewayError> {
    if value.trim().is_empty() {
        Err(GatewayError::BadRequest(format!("{} must not be empty", field)))
    } else {
        Ok(())
    }
}

pub async fn health() -> HttpResponse {
    HttpResponse::Ok().finish()
}

pub async fn whoami(principal: Principal) -> HttpResponse {
    HttpResponse::Ok().json(principal)
}

pub async fn signup(
    accounts: SharedAccounts,
    request: web::Json<SignupRequest>,
) -> Result<HttpResponse, GatewayError> {
    let request = request.into_inner();
    require("username", &request.username)?;
    require("email", &request.email)?;
    require("password", &request.password)?;
    let token = accounts
        .signup(request)
        .await
        .map_err(|err| auth_failure("Signup", err))?;
    Ok(HttpResponse::Ok().json(token))
}

pub async fn login(
    accounts: SharedAccounts,
    request: web::Json<LoginRequest>,
) -> Result<HttpResponse, GatewayError> {
    let request = request.into_inner();
    require("username", &request.username)?;
    require("password", &request.password)?;
    let token = accounts
        .login(request)
        .await
        .map_err(|err| auth_failure("Login", err))?;
    Ok(HttpResponse::Ok().json(token))
}

pub async fn list_users(accounts: SharedAccounts) -> Result<HttpResponse, GatewayError> {
    let users = accounts
        .list_users()
        .await
        .map_err(|err| auth_failure("List users", err))?;
    Ok(HttpResponse::Ok().json(users))
}

pub async fn delete_user(
    accounts: SharedAccounts,
    user_id: web::Path<String>,
) -> Result<HttpResponse, GatewayError> {
    let user = accounts
        .delete_user(&user_id)
        .await
        .map_err(|err| auth_failure(&format!("Delete user {}", user_id), err))?;
    Ok(HttpResponse::Ok().json(user))
}

pub async fn list_book_views(
    aggregator: Data<BookAggregator>,
    query: web::Query<FindQuery>,
) -> Result<HttpResponse, GatewayError> {
    let filter = query.parse()?;
    Ok(HttpResponse::Ok().json(aggregator.list_book_views(&filter).await?))
}

pub async fn get_book_view(
    aggregator: Data<BookAggregator>,
    id: web::Path<String>,
) -> Result<HttpResponse, GatewayError> {
    Ok(HttpResponse::Ok().json(aggregator.get_book_view(&id).await?))
}

pub async fn create<T: Resource>(
    store: Store<T>,
    item: web::Json<T>,
) -> Result<HttpResponse, GatewayError> {
    let item = item.into_inner();
    validate_resource(&item)?;
    let created = store
        .create(item)
        .await
        .map_err(|err| store_failure(&format!("Create {}", T::NAME), err))?;
    Ok(HttpResponse::Created()
        .append_header((LOCATION, format!("/{}/{}", T::COLLECTION, created.id())))
        .json(created))
}

pub async fn find<T: Resource>(
    store: Store<T>,
    query: web::Query<FindQuery>,
) -> Result<HttpResponse, GatewayError> {
    let filter = query.parse()?;
    let records = store
        .find(&filter)
        .await
        .map_err(|err| store_failure(&format!("List {}", T::COLLECTION), err))?;
    Ok(HttpResponse::Ok().json(records))
}

pub async fn count<T: Resource>(
    store: Store<T>,
    query: web::Query<CountQuery>,
) -> Result<HttpResponse, GatewayError> {
    let where_clause = query.parse()?;
    let count = store
        .count(where_clause.as_ref())
        .await
        .map_err(|err| store_failure(&format!("Count {}", T::COLLECTION), err))?;
    Ok(HttpResponse::Ok().json(CountResponse { count }))
}

pub async fn find_by_id<T: Resource>(
    store: Store<T>,
    id: web::Path<String>,
) -> Result<HttpResponse, GatewayError> {
    let record = store
        .find_by_id(&id)
        .await
        .map_err(|err| store_failure(&format!("Get {} {}", T::NAME, id), err))?;
    Ok(HttpResponse::Ok().json(record))
}

pub async fn update_by_id<T: Resource>(
    store: Store<T>,
    id: web::Path<String>,
    patch: web::Json<serde_json::Value>,
) -> Result<HttpResponse, GatewayError> {
    if !patch.is_object() {
        return Err(GatewayError::BadRequest(
            "Patch body must be a JSON object".to_string(),
        ));
    }
    let updated = store
        .update_by_id(&id, patch.into_inner())
        .await
        .map_err(|err| store_failure(&format!("Update {} {}", T::NAME, id), err))?;
    Ok(HttpResponse::Ok().json(updated))
}

pub async fn replace_by_id<T: Resource>(
    store: Store<T>,
    id: web::Path<String>,
    item: web::Json<T>,
) -> Result<HttpResponse, GatewayError> {
    let mut item = item.into_inner();
    if item.id().is_empty() {
        item.set_id(id.to_string());
    }
    validate_resource(&item)?;
    let replaced = store
        .replace_by_id(&id, item)
        .await
        .map_err(|err| store_failure(&format!("Replace {} {}", T::NAME, id), err))?;
    Ok(HttpResponse::Ok().json(replaced))
}

pub async fn delete_by_id<T: Resource>(
    store: Store<T>,
    id: web::Path<String>,
) -> Result<HttpResponse, GatewayError> {
    store
        .delete_by_id(&id)
        .await
        .map_err(|err| store_failure(&format!("Delete {} {}", T::NAME, id), err))?;
    Ok(HttpResponse::NoContent().finish())
}
