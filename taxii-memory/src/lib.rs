//! The reference in-process TAXII backend: an in-memory [`Backend`]
//! implementation plus a JSON persistence codec for loading and saving it.

#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used, clippy::panic))]

pub mod backend;
pub mod persistence;

pub use backend::MemoryBackend;
