use actix_web::http::Method;

use bookstore_users::api::Permission;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verb {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl Verb {
    pub fn from_method(method: &Method) -> Option<Self> {
        match *method {
            Method::GET => Some(Verb::Get),
            Method::POST => Some(Verb::Post),
            Method::PUT => Some(Verb::Put),
            Method::PATCH => Some(Verb::Patch),
            Method::DELETE => Some(Verb::Delete),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// What a caller must present to reach a route
pub enum Access {
    Public,
    /// Any valid bearer token
    Authenticated,
    /// A valid bearer token whose principal holds the permission
    Permission(Permission),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Route {
    pub verb: Verb,
    /// Literal segments, `{name}` matches exactly one non-empty segment
    pub pattern: &'static str,
    pub access: Access,
}

const fn route(verb: Verb, pattern: &'static str, access: Access) -> Route {
    Route {
        verb,
        pattern,
        access,
    }
}

use Access::{Authenticated, Permission as Needs, Public};
use Permission::*;
use Verb::*;

/// Every route the gateway serves. Requests matching none of them are answered with not found
pub const ROUTES: &[Route] = &[
    route(Get, "/health", Public),
    route(Post, "/signup", Public),
    route(Post, "/login", Public),
    route(Get, "/whoami", Authenticated),
    route(Get, "/users", Needs(ViewUser)),
    route(Delete, "/user/{id}", Needs(DeleteUser)),
    route(Post, "/authors", Needs(PostAuthor)),
    route(Get, "/authors", Needs(ViewAuthor)),
    route(Get, "/authors/count", Needs(ViewAuthor)),
    route(Get, "/authors/{id}", Needs(ViewAuthor)),
    route(Patch, "/authors/{id}", Needs(UpdateAuthor)),
    route(Put, "/authors/{id}", Needs(UpdateAuthor)),
    route(Delete, "/authors/{id}", Needs(DeleteAuthor)),
    route(Post, "/books", Needs(PostBook)),
    route(Get, "/books", Needs(ViewBook)),
    route(Get, "/books/count", Needs(ViewBook)),
    route(Get, "/books/{id}", Needs(ViewBook)),
    route(Patch, "/books/{id}", Needs(UpdateBook)),
    route(Put, "/books/{id}", Needs(UpdateBook)),
    route(Delete, "/books/{id}", Needs(DeleteBook)),
    route(Post, "/categories", Needs(PostCategory)),
    route(Get, "/categories", Needs(ViewCategory)),
    route(Get, "/categories/count", Needs(ViewCategory)),
    route(Get, "/categories/{id}", Needs(ViewCategory)),
    route(Patch, "/categories/{id}", Needs(UpdateCategory)),
    route(Put, "/categories/{id}", Needs(UpdateCategory)),
    route(Delete, "/categories/{id}", Needs(DeleteCategory)),
];

/// First route of the table matching the request line
pub fn resolve(verb: Verb, path: &str) -> Option<&'static Route> {
    ROUTES
        .iter()
        .find(|route| route.verb == verb && matches_pattern(route.pattern, path))
}

fn matches_pattern(pattern: &str, path: &str) -> bool {
    let path = path.strip_suffix('/').filter(|p| !p.is_empty()).unwrap_or(path);
    let mut pattern_segments = pattern.split('/');
    let mut path_segments = path.split('/');
    loop {
        match (pattern_segments.next(), path_segments.next()) {
            (None, None) => return true,
            (Some(expected), Some(actual)) => {
                let is_param = expected.starts_with('{') && expected.ends_with('}');
                if (is_param && actual.is_empty()) || (!is_param && expected != actual) {
                    return false;
                }
            }
            _ => return false,
        }
    }
}

#[cfg(test)]
mod routes_tests {
    use bookstore_users::api::Permission;

    use crate::routes::{resolve, Access, Verb};

    fn access(verb: Verb, path: &str) -> Option<Access> {
        resolve(verb, path).map(|route| route.access)
    }

    #[test]
    fn public_routes() {
        assert_eq!(access(Verb::Post, "/signup"), Some(Access::Public));
        assert_eq!(access(Verb::Post, "/login"), Some(Access::Public));
        assert_eq!(access(Verb::Get, "/health"), Some(Access::Public));
    }

    #[test]
    fn permissions_follow_resource_and_verb() {
        assert_eq!(
            access(Verb::Post, "/authors"),
            Some(Access::Permission(Permission::PostAuthor))
        );
        assert_eq!(
            access(Verb::Delete, "/books/b1"),
            Some(Access::Permission(Permission::DeleteBook))
        );
        assert_eq!(
            access(Verb::Patch, "/categories/c1"),
            Some(Access::Permission(Permission::UpdateCategory))
        );
        assert_eq!(
            access(Verb::Get, "/books/count"),
            Some(Access::Permission(Permission::ViewBook))
        );
        assert_eq!(
            access(Verb::Delete, "/user/u1"),
            Some(Access::Permission(Permission::DeleteUser))
        );
        assert_eq!(access(Verb::Get, "/whoami"), Some(Access::Authenticated));
    }

    #[test]
    fn placeholders_match_exactly_one_segment() {
        assert!(resolve(Verb::Get, "/books/b1/extra").is_none());
        assert!(resolve(Verb::Get, "/books//").is_none());
        assert!(resolve(Verb::Get, "/books/").is_some());
        assert!(resolve(Verb::Get, "/bookshelf").is_none());
    }

    #[test]
    fn unknown_routes_do_not_resolve() {
        assert!(resolve(Verb::Get, "/publishers").is_none());
        assert!(resolve(Verb::Post, "/users").is_none());
        assert!(resolve(Verb::Put, "/authors").is_none());
    }
}
