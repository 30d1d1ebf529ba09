//! Paginated-list engine between `sgivu-api` and list consumers (CLI).
//!
//! - **[`Backend`]**: Owns the HTTP client for one gateway and hands out
//!   per-resource [`Repository`] instances.
//!
//! - **[`Repository<T>`]**: The canonical CRUD operation set for one REST
//!   resource, plus filtered search, counts and status changes. Successful
//!   responses keep a [`PagedCollectionStore`] consistent without refetching.
//!
//! - **[`filter`]**: Declarative codec between typed filter objects and
//!   list-URL query parameters, plus es-CO price input helpers.
//!
//! - **[`ListPageManager<T>`]**: Loads a page and its KPI counts together,
//!   reconciles them, and recounts from the full dataset in the background
//!   when the server counts disagree with the page.

pub mod backend;
pub mod config;
pub mod error;
pub mod filter;
pub mod list;
pub mod model;
pub mod repository;
pub mod store;

// ── Primary re-exports ──────────────────────────────────────────────
pub use backend::Backend;
pub use config::{BackendConfig, TlsVerification};
pub use error::CoreError;
pub use filter::{DecodedFilters, FilterFieldMapping, FilterKind, QueryParams};
pub use list::{
    CountKeys, Counts, FallbackCounts, ListPageManager, ListPageState, LoadPageConfig,
};
pub use model::{Entity, Toggleable};
pub use repository::{CountMapper, Repository};
pub use store::PagedCollectionStore;

pub use sgivu_api::Page;
