//! HTTP layer for the TAXII exchange server: handlers, request validation,
//! response envelopes, background expiry tasks, and router assembly.

#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used, clippy::panic))]

pub mod background;
pub mod error;
pub mod handlers;
pub mod http;
pub mod responses;
pub mod router;
pub mod state;
pub mod validation;

pub use error::{ServerError, ServerResult};
pub use router::build_router;
pub use state::AppState;
