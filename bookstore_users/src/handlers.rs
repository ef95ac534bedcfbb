use std::sync::Arc;

use actix_web::web::Data;
use actix_web::{Error, HttpResponse};
use paperclip::actix::{api_v2_operation, web};

use bookstore_resources::api::ErrorBody;
use bookstore_resources::handlers::store_error_response;

use crate::api::{LoginRequest, SignupRequest};
use crate::auth_service::{Accounts, AuthError};

pub type SharedAccounts = Data<Arc<dyn Accounts>>;

fn auth_error_response(operation: &str, err: &AuthError) -> HttpResponse {
    let body = ErrorBody {
        message: err.to_string(),
    };
    match err {
        AuthError::UsernameTaken(_) => HttpResponse::Conflict().json(body),
        AuthError::InvalidCredentials => HttpResponse::Unauthorized().json(body),
        AuthError::UserNotFound(_) => HttpResponse::NotFound().json(body),
        AuthError::Invalid(_) => HttpResponse::BadRequest().json(body),
        AuthError::SignupNotAllowed(_) => HttpResponse::Forbidden().json(body),
        AuthError::Store(store_err) => store_error_response(operation, store_err),
        AuthError::Hashing(_) | AuthError::Token(_) => {
            tracing::error!("{} failed {}", operation, err);
            HttpResponse::InternalServerError().json(ErrorBody {
                message: format!("{} failed", operation),
            })
        }
    }
}

#[api_v2_operation]
pub async fn health() -> Result<HttpResponse, Error> {
    Ok(HttpResponse::Ok().finish())
}

#[api_v2_operation]
pub async fn signup(
    accounts: SharedAccounts,
    request: web::Json<SignupRequest>,
) -> Result<HttpResponse, Error> {
    Ok(match accounts.signup(request.into_inner()).await {
        Ok(token) => HttpResponse::Ok().json(token),
        Err(err) => auth_error_response("Signup", &err),
    })
}

#[api_v2_operation]
pub async fn login(
    accounts: SharedAccounts,
    request: web::Json<LoginRequest>,
) -> Result<HttpResponse, Error> {
    Ok(match accounts.login(request.into_inner()).await {
        Ok(token) => HttpResponse::Ok().json(token),
        Err(err) => auth_error_response("Login", &err),
    })
}

#[api_v2_operation]
pub async fn list_users(accounts: SharedAccounts) -> Result<HttpResponse, Error> {
    Ok(match accounts.list_users().await {
        Ok(users) => HttpResponse::Ok().json(users),
        Err(err) => auth_error_response("List users", &err),
    })
}

#[api_v2_operation]
pub async fn delete_user(
    accounts: SharedAccounts,
    user_id: web::Path<String>,
) -> Result<HttpResponse, Error> {
    Ok(match accounts.delete_user(&user_id).await {
        Ok(user) => HttpResponse::Ok().json(user),
        Err(err) => auth_error_response("Delete user", &err),
    })
}
