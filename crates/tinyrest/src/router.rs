//! Request routing and dispatch.
//!
//! [`Server`] is the context object shared by every connection. It owns the
//! endpoints, a radix-tree route table mapping each registered path pattern
//! to the endpoint that claimed it, and the derived method → paths map used
//! for startup reporting.

use crate::endpoint::{Endpoint, HttpMethod, ID_PARAM};
use crate::store::{Fields, StoreError};
use hyper::{Method, StatusCode};
use serde_json::Value;
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::debug;

/// Method → union of path patterns enabled for it
pub type RoutesMap = BTreeMap<HttpMethod, Vec<String>>;

#[derive(Debug, Error)]
pub enum RegisterError {
    #[error("path {path} is already served by endpoint '{owner}'")]
    Conflict { path: String, owner: String },
    #[error("invalid path pattern {path}: {reason}")]
    InvalidPattern { path: String, reason: String },
}

/// Errors surfaced to clients by [`Server::dispatch`]
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("Not Found")]
    NoRoute,
    #[error("Invalid ID")]
    BadRequest(String),
    #[error("Unable to read BODY")]
    Body(String),
    #[error("Method not allowed in readonly mode")]
    MethodNotAllowed(HttpMethod),
    #[error("no endpoint registered for route {0}")]
    UnknownRoute(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl DispatchError {
    pub fn status(&self) -> StatusCode {
        match self {
            DispatchError::NoRoute => StatusCode::NOT_FOUND,
            DispatchError::BadRequest(_) | DispatchError::Body(_) => StatusCode::BAD_REQUEST,
            DispatchError::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
            DispatchError::UnknownRoute(_) => StatusCode::INTERNAL_SERVER_ERROR,
            DispatchError::Store(StoreError::Decode(_)) => StatusCode::BAD_REQUEST,
            DispatchError::Store(StoreError::NotFound(_)) => StatusCode::NOT_FOUND,
            DispatchError::Store(StoreError::IdExhausted) => StatusCode::INSUFFICIENT_STORAGE,
        }
    }
}

/// Successful dispatch outcome
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    pub status: StatusCode,
    /// `None` renders as an empty body
    pub body: Option<Value>,
}

impl Reply {
    fn ok(body: Value) -> Self {
        Self {
            status: StatusCode::OK,
            body: Some(body),
        }
    }

    fn record(status: StatusCode, fields: Fields) -> Self {
        Self {
            status,
            body: Some(Value::Object(fields)),
        }
    }

    fn empty() -> Self {
        Self {
            status: StatusCode::OK,
            body: None,
        }
    }
}

#[derive(Debug, Clone)]
struct RouteTarget {
    endpoint: usize,
    pattern: String,
}

/// Registry of endpoints plus the route table built from them
pub struct Server {
    endpoints: Vec<Endpoint>,
    routes: RoutesMap,
    table: matchit::Router<RouteTarget>,
}

impl Server {
    pub fn new() -> Self {
        Self {
            endpoints: Vec::new(),
            routes: RoutesMap::new(),
            table: matchit::Router::new(),
        }
    }

    /// Add an endpoint and register its paths.
    ///
    /// Every pattern must be free; if any is already claimed the endpoint is
    /// rejected and the server is left unchanged.
    pub fn register_endpoint(&mut self, endpoint: Endpoint) -> Result<(), RegisterError> {
        for path in endpoint.paths() {
            if let Ok(existing) = self.table.at(&route_pattern(path)) {
                if existing.value.pattern == *path {
                    return Err(RegisterError::Conflict {
                        path: path.clone(),
                        owner: self
                            .endpoints
                            .get(existing.value.endpoint)
                            .map(|e| e.name().to_string())
                            .unwrap_or_default(),
                    });
                }
            }
        }

        let table = build_table(self.endpoints.iter().chain(std::iter::once(&endpoint)))?;

        for method in endpoint.methods().iter() {
            let paths = self.routes.entry(method).or_default();
            for path in endpoint.paths() {
                debug!("Registering {} {} -> {}", method, path, endpoint.name());
                if !paths.contains(path) {
                    paths.push(path.clone());
                }
            }
        }

        self.table = table;
        self.endpoints.push(endpoint);
        Ok(())
    }

    pub fn endpoints(&self) -> &[Endpoint] {
        &self.endpoints
    }

    pub fn routes(&self) -> &RoutesMap {
        &self.routes
    }

    /// Resolve a request to its endpoint and run the store operation.
    pub fn dispatch(
        &self,
        method: &Method,
        path: &str,
        body: &[u8],
    ) -> Result<Reply, DispatchError> {
        let method = HttpMethod::from_hyper(method).ok_or(DispatchError::NoRoute)?;
        let matched = self.table.at(path).map_err(|_| DispatchError::NoRoute)?;
        let target = matched.value;
        let endpoint = self
            .endpoints
            .get(target.endpoint)
            .ok_or_else(|| DispatchError::UnknownRoute(target.pattern.clone()))?;

        // Paths are only registered for enabled methods
        if !endpoint.methods().contains(method) {
            return Err(DispatchError::NoRoute);
        }
        if !endpoint.permits(method) {
            return Err(DispatchError::MethodNotAllowed(method));
        }

        let id = matched.params.get(param_name());
        debug!(
            "{} {} matched {} on endpoint '{}'",
            method,
            path,
            target.pattern,
            endpoint.name()
        );

        let store = endpoint.store();
        let reply = match method {
            HttpMethod::Get | HttpMethod::Head => match id {
                None => Reply::ok(Value::Array(
                    store.list().into_iter().map(Value::Object).collect(),
                )),
                Some(raw) => Reply::record(StatusCode::OK, store.get(parse_id(Some(raw))?)?),
            },
            HttpMethod::Post => Reply::record(StatusCode::CREATED, store.create(body)?),
            HttpMethod::Put => Reply::record(StatusCode::OK, store.update(parse_id(id)?, body)?),
            HttpMethod::Patch => Reply::record(StatusCode::OK, store.patch(parse_id(id)?, body)?),
            HttpMethod::Delete => {
                store.delete(parse_id(id)?)?;
                Reply::empty()
            }
        };
        Ok(reply)
    }
}

impl Default for Server {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Server {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Server")
            .field("endpoints", &self.endpoints)
            .field("routes", &self.routes)
            .finish()
    }
}

/// Route table for `endpoints`, indexed by position.
fn build_table<'a>(
    endpoints: impl Iterator<Item = &'a Endpoint>,
) -> Result<matchit::Router<RouteTarget>, RegisterError> {
    let mut table = matchit::Router::new();
    for (index, endpoint) in endpoints.enumerate() {
        for path in endpoint.paths() {
            let target = RouteTarget {
                endpoint: index,
                pattern: path.clone(),
            };
            table
                .insert(route_pattern(path), target)
                .map_err(|e| RegisterError::InvalidPattern {
                    path: path.clone(),
                    reason: e.to_string(),
                })?;
        }
    }
    Ok(table)
}

fn param_name() -> &'static str {
    ID_PARAM.trim_start_matches(':')
}

/// Parse the `:id` path segment as a signed integer.
fn parse_id(raw: Option<&str>) -> Result<i64, DispatchError> {
    let raw = raw.ok_or_else(|| DispatchError::BadRequest(String::new()))?;
    raw.parse()
        .map_err(|_| DispatchError::BadRequest(raw.to_string()))
}

/// Convert a `/name/:param` pattern into the route table's `/name/{param}` syntax.
fn route_pattern(path: &str) -> String {
    path.split('/')
        .map(|segment| match segment.strip_prefix(':') {
            Some(param) => format!("{{{param}}}"),
            None => segment.replace('{', "{{").replace('}', "}}"),
        })
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::RecordStore;
    use serde_json::json;

    fn endpoint(name: &str, methods: &[&str], read_only: bool) -> Endpoint {
        let store = RecordStore::default();
        store
            .load(br#"[{"id":1,"name":"Ann"},{"id":2,"name":"Bo"}]"#)
            .unwrap();
        let mut endpoint = Endpoint::new(name, store);
        endpoint.add_path(name).unwrap();
        for m in methods {
            endpoint.enable_method(m).unwrap();
        }
        endpoint.set_read_only(read_only);
        endpoint
    }

    fn all_methods(name: &str) -> Endpoint {
        endpoint(name, &["GET", "POST", "PUT", "PATCH", "DELETE", "HEAD"], false)
    }

    fn server_with(endpoints: Vec<Endpoint>) -> Server {
        let mut server = Server::new();
        for e in endpoints {
            server.register_endpoint(e).unwrap();
        }
        server
    }

    #[test]
    fn test_route_pattern() {
        assert_eq!(route_pattern("/books"), "/books");
        assert_eq!(route_pattern("/books/:id"), "/books/{id}");
        assert_eq!(route_pattern("/we{ird}/:id"), "/we{{ird}}/{id}");
    }

    #[test]
    fn test_routes_map_is_union() {
        let mut people = endpoint("people", &["GET"], false);
        people.add_path("gente").unwrap();
        let server = server_with(vec![people, endpoint("books", &["GET", "POST"], false)]);

        let routes = server.routes();
        assert_eq!(
            routes[&HttpMethod::Get],
            ["/people", "/people/:id", "/gente", "/gente/:id", "/books", "/books/:id"]
        );
        assert_eq!(routes[&HttpMethod::Post], ["/books", "/books/:id"]);
        assert!(!routes.contains_key(&HttpMethod::Delete));
    }

    #[test]
    fn test_conflicting_registration_is_rejected() {
        let mut server = server_with(vec![all_methods("books")]);
        let mut other = all_methods("magazines");
        other.add_path("books").unwrap();

        let err = server.register_endpoint(other).unwrap_err();
        assert!(matches!(err, RegisterError::Conflict { ref owner, .. } if owner == "books"));
        assert_eq!(server.endpoints().len(), 1);
        // the rejected endpoint's other paths were not registered either
        assert!(matches!(
            server.dispatch(&Method::GET, "/magazines", b""),
            Err(DispatchError::NoRoute)
        ));
    }

    #[test]
    fn test_dispatch_resolves_each_endpoint() {
        let server = server_with(vec![all_methods("books"), all_methods("people")]);
        server.dispatch(&Method::DELETE, "/books/1", b"").unwrap();

        let books = server.dispatch(&Method::GET, "/books", b"").unwrap();
        let people = server.dispatch(&Method::GET, "/people", b"").unwrap();
        assert_eq!(books.body.unwrap().as_array().unwrap().len(), 1);
        assert_eq!(people.body.unwrap().as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_dispatch_get() {
        let server = server_with(vec![all_methods("people")]);

        let reply = server.dispatch(&Method::GET, "/people/2", b"").unwrap();
        assert_eq!(reply.status, StatusCode::OK);
        assert_eq!(reply.body.unwrap()["name"], json!("Bo"));

        let head = server.dispatch(&Method::HEAD, "/people/1", b"").unwrap();
        assert_eq!(head.status, StatusCode::OK);

        let err = server.dispatch(&Method::GET, "/people/abc", b"").unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.to_string(), "Invalid ID");

        let err = server.dispatch(&Method::GET, "/people/9", b"").unwrap_err();
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
        assert_eq!(err.to_string(), "ID not found");
    }

    #[test]
    fn test_dispatch_mutations() {
        let server = server_with(vec![all_methods("people")]);

        let created = server
            .dispatch(&Method::POST, "/people", br#"{"name":"Cy"}"#)
            .unwrap();
        assert_eq!(created.status, StatusCode::CREATED);
        assert_eq!(created.body.unwrap()["id"], json!(3));

        let updated = server
            .dispatch(&Method::PUT, "/people/3", br#"{"surname":"Doe"}"#)
            .unwrap();
        let body = updated.body.unwrap();
        assert_eq!(body["name"], json!(""));
        assert_eq!(body["surname"], json!("Doe"));

        let patched = server
            .dispatch(&Method::PATCH, "/people/3", br#"{"name":"Cy"}"#)
            .unwrap();
        let body = patched.body.unwrap();
        assert_eq!(body["name"], json!("Cy"));
        assert_eq!(body["surname"], json!("Doe"));

        let deleted = server.dispatch(&Method::DELETE, "/people/3", b"").unwrap();
        assert_eq!(deleted, Reply::empty());

        let err = server.dispatch(&Method::DELETE, "/people/3", b"").unwrap_err();
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_mutations_require_id() {
        let server = server_with(vec![all_methods("people")]);
        for method in [Method::PUT, Method::PATCH, Method::DELETE] {
            let err = server.dispatch(&method, "/people", b"{}").unwrap_err();
            assert!(matches!(err, DispatchError::BadRequest(_)), "{method}");
        }
    }

    #[test]
    fn test_dispatch_decode_error() {
        let server = server_with(vec![all_methods("people")]);
        let err = server
            .dispatch(&Method::POST, "/people", b"not json")
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_dispatch_create_when_ids_exhausted() {
        let people = all_methods("people");
        people
            .store()
            .load(br#"[{"id":9223372036854775807,"name":"Ann"}]"#)
            .unwrap();
        let server = server_with(vec![people]);

        let err = server
            .dispatch(&Method::POST, "/people", br#"{"name":"Cy"}"#)
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::INSUFFICIENT_STORAGE);
        assert_eq!(server.endpoints()[0].store().len(), 1);
    }

    #[test]
    fn test_read_only_rejects_mutations() {
        let server = server_with(vec![endpoint(
            "people",
            &["GET", "POST", "PUT", "PATCH", "DELETE"],
            true,
        )]);

        let err = server
            .dispatch(&Method::POST, "/people", br#"{"name":"Cy"}"#)
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::METHOD_NOT_ALLOWED);

        for method in [Method::PUT, Method::PATCH, Method::DELETE] {
            let err = server.dispatch(&method, "/people/1", b"{}").unwrap_err();
            assert_eq!(err.status(), StatusCode::METHOD_NOT_ALLOWED);
        }

        let list = server.dispatch(&Method::GET, "/people", b"").unwrap();
        assert_eq!(list.body.unwrap().as_array().unwrap().len(), 2);
        assert_eq!(server.endpoints()[0].store().len(), 2);
    }

    #[test]
    fn test_disabled_method_and_unknown_path() {
        let server = server_with(vec![endpoint("people", &["GET"], false)]);

        assert!(matches!(
            server.dispatch(&Method::POST, "/people", b"{}"),
            Err(DispatchError::NoRoute)
        ));
        assert!(matches!(
            server.dispatch(&Method::GET, "/nothing", b""),
            Err(DispatchError::NoRoute)
        ));
        assert!(matches!(
            server.dispatch(&Method::OPTIONS, "/people", b""),
            Err(DispatchError::NoRoute)
        ));
        assert!(matches!(
            server.dispatch(&Method::GET, "/people/1/extra", b""),
            Err(DispatchError::NoRoute)
        ));
    }

    #[test]
    fn test_aliases_through_dispatch() {
        let mut people = all_methods("people");
        people.add_alias("nom", "name");
        let server = server_with(vec![people]);

        let created = server
            .dispatch(&Method::POST, "/people", br#"{"nom":"Dee"}"#)
            .unwrap();
        let body = created.body.unwrap();
        assert_eq!(body["nom"], json!("Dee"));
        assert!(body.get("name").is_none());
    }
}
