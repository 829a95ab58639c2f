//! Shared application state handed to every Axum handler.

use std::sync::Arc;

use taxii_core::ServerConfig;
use taxii_memory::MemoryBackend;

/// Application state: the in-process backend plus the server configuration
/// that bounds pagination and content length.
#[derive(Clone)]
pub struct AppState {
    pub backend: Arc<MemoryBackend>,
    pub config: Arc<ServerConfig>,
}

/// Clamp a requested `limit` to `[0, max_pagination_limit]`, defaulting to
/// `default_pagination_limit` when the client omitted it.
#[must_use]
pub fn effective_limit(requested: Option<usize>, default_limit: usize, max_limit: usize) -> usize {
    requested.unwrap_or(default_limit).min(max_limit)
}
