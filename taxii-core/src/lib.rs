//! Domain types, time codec, filter engine, paging/status stores, the
//! backend contract, configuration, and the error taxonomy shared across
//! the TAXII server.

#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used, clippy::panic))]

pub mod backend;
pub mod config;
pub mod entities;
pub mod error;
pub mod filter;
pub mod meta;
pub mod paging;
pub mod status_store;
pub mod time;

pub use backend::{Backend, FilterArgs, OBJECTS_ALLOWED_FILTERS, Page};
pub use config::ServerConfig;
pub use entities::{
    ApiRoot, ApiRootInfo, Collection, CollectionSummary, Discovery, ManifestEntry, Status, StatusDetail,
    StatusKind, StixObject,
};
pub use error::{TaxiiError, TaxiiResult};
pub use meta::Meta;
pub use paging::PagingSessionStore;
pub use status_store::StatusStore;
