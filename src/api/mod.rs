//! Relay HTTP surface.
//!
//! Exposes the billing API's login, doctor and case resources to the
//! dashboard. Routes are nested under `/api/`; everything except login and
//! health requires a bearer token, which is forwarded upstream untouched.
//!
//! The router is composable: `relay_router()` returns a `Router` that can be
//! mounted on any axum server instance.

pub mod endpoints;
pub mod error;
pub mod middleware;
pub mod router;
pub mod server;
pub mod types;

pub use error::ApiError;
pub use router::relay_router;
pub use server::{start_relay_server, RelayServer, RelaySession, ServerError};
pub use types::ApiContext;
