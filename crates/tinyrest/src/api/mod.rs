//! HTTP front end for the mock REST server.
//!
//! This module wires the [`Server`](crate::router::Server) dispatcher onto a
//! hyper HTTP/1 listener:
//! - `server`: accept loop, one task per connection
//! - `router`: request → dispatch → response
//! - `types`: JSON response builders and body collection

mod router;
mod server;
mod types;

pub use router::{respond, route_request};
pub use server::ApiServer;
