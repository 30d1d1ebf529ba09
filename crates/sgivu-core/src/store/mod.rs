// ── Resource caches ──

mod collection;

pub use collection::PagedCollectionStore;
