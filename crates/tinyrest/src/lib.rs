//! TinyREST: a configurable mock REST API server.
//!
//! Each configured endpoint owns an in-memory [`RecordStore`] seeded from a
//! JSON array, answers on one or more resource paths, and exposes a chosen
//! subset of GET/POST/PUT/PATCH/DELETE/HEAD. Field aliases let the external
//! API use different field names than the stored records.

pub mod api;
pub mod config;
pub mod endpoint;
pub mod router;
pub mod store;

pub use api::ApiServer;
pub use config::Config;
pub use endpoint::{Endpoint, HttpMethod};
pub use router::{DispatchError, Reply, Server};
pub use store::{RecordStore, Schema, StoreError};
