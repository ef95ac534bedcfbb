use std::future::{ready, Ready};

use actix_web::body::{EitherBody, MessageBody};
use actix_web::dev::{Payload, ServiceRequest, ServiceResponse};
use actix_web::http::header::AUTHORIZATION;
use actix_web::middleware::Next;
use actix_web::web::Data;
use actix_web::{Error, FromRequest, HttpMessage, HttpRequest, ResponseError};
use serde::{Deserialize, Serialize};

use bookstore_users::api::{Permission, Role, UserId};
use bookstore_users::token::{Claims, TokenVerifier};

use crate::error::GatewayError;
use crate::routes::{resolve, Access, Verb};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
/// Caller identified by a verified session token
pub struct Principal {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub role: Role,
    pub permissions: Vec<Permission>,
}

impl Principal {
    pub fn has_permission(&self, permission: Permission) -> bool {
        self.permissions.contains(&permission)
    }
}

impl From<Claims> for Principal {
    fn from(claims: Claims) -> Self {
        Self {
            id: claims.id,
            username: claims.username,
            email: claims.email,
            role: claims.role,
            permissions: claims.permissions,
        }
    }
}

/// Handlers behind a non public route receive the principal stored by [`authorize_request`]
impl FromRequest for Principal {
    type Error = GatewayError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(
            req.extensions()
                .get::<Principal>()
                .cloned()
                .ok_or_else(|| GatewayError::Unauthorized("Missing bearer token".to_string())),
        )
    }
}

pub struct Authorizer {
    verifier: TokenVerifier,
}

impl Authorizer {
    pub fn new(verifier: TokenVerifier) -> Self {
        Self { verifier }
    }

    /// Verifies an `Authorization: Bearer <token>` header value
    pub fn authenticate(&self, header: Option<&str>) -> Result<Principal, GatewayError> {
        let header =
            header.ok_or_else(|| GatewayError::Unauthorized("Missing bearer token".to_string()))?;
        let token = header
            .strip_prefix("Bearer ")
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .ok_or_else(|| {
                GatewayError::Unauthorized("Authorization header is not a bearer token".to_string())
            })?;
        Ok(self.verifier.verify(token)?.into())
    }

    /// Returns the principal allowed through, `None` for public access
    pub fn authorize(
        &self,
        access: Access,
        header: Option<&str>,
    ) -> Result<Option<Principal>, GatewayError> {
        let required = match access {
            Access::Public => return Ok(None),
            Access::Authenticated => None,
            Access::Permission(permission) => Some(permission),
        };
        let principal = self.authenticate(header)?;
        match required {
            Some(permission) if !principal.has_permission(permission) => {
                Err(GatewayError::Forbidden(format!(
                    "Missing permission {:?}",
                    permission
                )))
            }
            _ => Ok(Some(principal)),
        }
    }
}

/// Resolves the route of the request and checks its access rule before any handler runs.
/// Requests matching no route of the table and rejected requests are answered here
/// and never reach the stores
pub async fn authorize_request(
    req: ServiceRequest,
    next: Next<impl MessageBody>,
) -> Result<ServiceResponse<EitherBody<impl MessageBody>>, Error> {
    let route = Verb::from_method(req.method()).and_then(|verb| resolve(verb, req.path()));
    let Some(route) = route else {
        // Only listed routes are served, anything else could be an alias of one after decoding
        tracing::info!("No route for {} {}", req.method(), req.path());
        let err = GatewayError::NotFound(format!("No route for {}", req.path()));
        return Ok(req.into_response(err.error_response()).map_into_right_body());
    };

    let Some(authorizer) = req.app_data::<Data<Authorizer>>().cloned() else {
        tracing::error!("Authorizer is not configured");
        let err = GatewayError::InternalError("Internal error".to_string());
        return Ok(req.into_response(err.error_response()).map_into_right_body());
    };
    let header = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok());

    match authorizer.authorize(route.access, header) {
        Ok(principal) => {
            if let Some(principal) = principal {
                tracing::debug!("{} allowed to {}", principal.username, route.pattern);
                req.extensions_mut().insert(principal);
            }
            Ok(next.call(req).await?.map_into_left_body())
        }
        Err(err) => {
            tracing::info!(
                "Rejected {} {}: {}",
                req.method(),
                req.path(),
                err
            );
            Ok(req.into_response(err.error_response()).map_into_right_body())
        }
    }
}

#[cfg(test)]
mod authorization_tests {
    use chrono::Duration;

    use bookstore_users::api::{Permission, Role};
    use bookstore_users::token::{TokenIssuer, TokenVerifier};
    use bookstore_users::user_record::UserRecord;

    use crate::authorization::Authorizer;
    use crate::error::ErrorKind;
    use crate::routes::Access;

    fn authorizer() -> Authorizer {
        Authorizer::new(TokenVerifier::new("secret", "bookstore"))
    }

    fn bearer(secret: &str, lifetime: Duration, permissions: Vec<Permission>) -> String {
        let user = UserRecord {
            id: "u1".to_string(),
            username: "reader".to_string(),
            email: "reader@example.com".to_string(),
            password_hash: "unused".to_string(),
            role: Role::User,
            permissions,
        };
        let token = TokenIssuer::new(secret, "bookstore", lifetime)
            .issue(&user)
            .unwrap();
        format!("Bearer {}", token)
    }

    #[test]
    fn public_access_needs_no_token() {
        assert_eq!(authorizer().authorize(Access::Public, None).unwrap(), None);
    }

    #[test]
    fn missing_or_malformed_header_is_unauthorized() {
        let authorizer = authorizer();
        let access = Access::Authenticated;
        for header in [None, Some("Basic abc"), Some("Bearer "), Some("Bearer not-a-jwt")] {
            assert_eq!(
                authorizer.authorize(access, header).unwrap_err().kind(),
                ErrorKind::Unauthorized
            );
        }
    }

    #[test]
    fn expired_or_foreign_tokens_are_unauthorized() {
        let authorizer = authorizer();
        let expired = bearer("secret", Duration::hours(-1), vec![]);
        let foreign = bearer("other-secret", Duration::hours(1), vec![]);

        for header in [expired, foreign] {
            assert_eq!(
                authorizer
                    .authorize(Access::Authenticated, Some(&header))
                    .unwrap_err()
                    .kind(),
                ErrorKind::Unauthorized
            );
        }
    }

    #[test]
    fn permission_is_checked_after_authentication() {
        let authorizer = authorizer();
        let header = bearer("secret", Duration::hours(1), vec![Permission::ViewBook]);

        let principal = authorizer
            .authorize(Access::Permission(Permission::ViewBook), Some(&header))
            .unwrap()
            .unwrap();
        assert_eq!(principal.username, "reader");

        let err = authorizer
            .authorize(Access::Permission(Permission::DeleteBook), Some(&header))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Forbidden);

        assert!(authorizer
            .authorize(Access::Authenticated, Some(&header))
            .unwrap()
            .is_some());
    }
}
