//! Endpoint descriptors.
//!
//! An [`Endpoint`] pairs one [`RecordStore`] with the URL patterns it answers
//! to, the methods enabled for it, and a read-only flag.

mod method;

pub use method::{HttpMethod, MethodSet};

use crate::store::RecordStore;
use thiserror::Error;

/// Placeholder segment appended to a collection path for single-item routes.
pub const ID_PARAM: &str = ":id";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EndpointError {
    #[error("Unknown method {0}")]
    UnknownMethod(String),
    #[error("Empty path name")]
    EmptyPath,
}

/// A virtual REST resource backed by its own record store
#[derive(Debug)]
pub struct Endpoint {
    name: String,
    paths: Vec<String>,
    methods: MethodSet,
    read_only: bool,
    store: RecordStore,
}

impl Endpoint {
    /// Create an endpoint with no paths and every method disabled.
    pub fn new(name: impl Into<String>, store: RecordStore) -> Self {
        Self {
            name: name.into(),
            paths: Vec::new(),
            methods: MethodSet::new(),
            read_only: false,
            store,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Add the collection path `/name` and the item path `/name/:id`.
    pub fn add_path(&mut self, name: &str) -> Result<(), EndpointError> {
        let name = name.trim().trim_matches('/');
        if name.is_empty() {
            return Err(EndpointError::EmptyPath);
        }

        let collection = format!("/{name}");
        let item = format!("{collection}/{ID_PARAM}");
        for path in [collection, item] {
            if !self.paths.contains(&path) {
                self.paths.push(path);
            }
        }
        Ok(())
    }

    pub fn paths(&self) -> &[String] {
        &self.paths
    }

    /// Enable a method by name.
    pub fn enable_method(&mut self, name: &str) -> Result<HttpMethod, EndpointError> {
        let method = name.parse()?;
        self.methods.enable(method);
        Ok(method)
    }

    pub fn methods(&self) -> &MethodSet {
        &self.methods
    }

    pub fn set_read_only(&mut self, read_only: bool) {
        self.read_only = read_only;
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    /// Whether a request with `method` may reach the store.
    ///
    /// Read-only endpoints refuse every mutating method, enabled or not.
    pub fn permits(&self, method: HttpMethod) -> bool {
        !(self.read_only && method.is_mutating())
    }

    pub fn add_alias(&mut self, alias: impl Into<String>, internal: impl Into<String>) {
        self.store.add_alias(alias, internal);
    }

    pub fn store(&self) -> &RecordStore {
        &self.store
    }
}
