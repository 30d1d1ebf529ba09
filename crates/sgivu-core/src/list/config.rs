// ── Load configuration ──
//
// Everything `ListPageManager::load_page` needs to know about one list
// screen: how to fetch a page and the counts, how to read the counts, and
// how to recount from the full dataset when the server figures are off.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use sgivu_api::Page;

use crate::error::CoreError;
use crate::filter::are_filters_empty;
use crate::repository::Repository;

use super::reconcile::{CountKeys, Counts};

pub type FetchPager<T> = Arc<dyn Fn(u64) -> BoxFuture<'static, Result<Page<T>, CoreError>> + Send + Sync>;
pub type FetchCounts = Arc<dyn Fn() -> BoxFuture<'static, Result<Value, CoreError>> + Send + Sync>;
pub type FetchFallback<T> =
    Arc<dyn Fn() -> BoxFuture<'static, Result<FallbackCounts<T>, CoreError>> + Send + Sync>;
pub type ComputeCounts<T> = Arc<dyn Fn(&[T]) -> Counts + Send + Sync>;

const DEFAULT_ERROR_MESSAGE: &str = "Failed to load the list.";

/// Counts recomputed from the full dataset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FallbackCounts<T> {
    pub active: u64,
    pub inactive: u64,
    pub total: u64,
    /// Full dataset; when present the viewed page is re-sliced from it.
    pub items: Option<Vec<T>>,
}

/// Fetchers and count rules for one list screen.
pub struct LoadPageConfig<T> {
    pub(crate) fetch_pager: FetchPager<T>,
    pub(crate) fetch_counts: FetchCounts,
    pub(crate) fallback_counts: Option<FetchFallback<T>>,
    pub(crate) compute_counts: ComputeCounts<T>,
    pub(crate) count_keys: CountKeys,
    pub(crate) error_message: String,
}

impl<T> Clone for LoadPageConfig<T> {
    fn clone(&self) -> Self {
        Self {
            fetch_pager: Arc::clone(&self.fetch_pager),
            fetch_counts: Arc::clone(&self.fetch_counts),
            fallback_counts: self.fallback_counts.clone(),
            compute_counts: Arc::clone(&self.compute_counts),
            count_keys: self.count_keys.clone(),
            error_message: self.error_message.clone(),
        }
    }
}

impl<T> fmt::Debug for LoadPageConfig<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadPageConfig")
            .field("count_keys", &self.count_keys)
            .field("error_message", &self.error_message)
            .field("fallback", &self.fallback_counts.is_some())
            .finish_non_exhaustive()
    }
}

impl<T: Send + 'static> LoadPageConfig<T> {
    /// Build from a page fetcher, a count fetcher and a client-side tally.
    ///
    /// Count keys default to `active` / `inactive`; there is no fallback
    /// until [`with_fallback_counts`](Self::with_fallback_counts) is called.
    pub fn new<P, PF, C, CF>(
        fetch_pager: P,
        fetch_counts: C,
        compute_counts: impl Fn(&[T]) -> Counts + Send + Sync + 'static,
    ) -> Self
    where
        P: Fn(u64) -> PF + Send + Sync + 'static,
        PF: Future<Output = Result<Page<T>, CoreError>> + Send + 'static,
        C: Fn() -> CF + Send + Sync + 'static,
        CF: Future<Output = Result<Value, CoreError>> + Send + 'static,
    {
        Self {
            fetch_pager: Arc::new(move |page| fetch_pager(page).boxed()),
            fetch_counts: Arc::new(move || fetch_counts().boxed()),
            fallback_counts: None,
            compute_counts: Arc::new(compute_counts),
            count_keys: CountKeys::new(["active"], ["inactive"]),
            error_message: DEFAULT_ERROR_MESSAGE.to_owned(),
        }
    }

    pub fn with_count_keys(mut self, keys: CountKeys) -> Self {
        self.count_keys = keys;
        self
    }

    /// Message stored in the list state when a load fails.
    pub fn with_error_message(mut self, message: impl Into<String>) -> Self {
        self.error_message = message.into();
        self
    }

    pub fn with_fallback_counts<F, FF>(mut self, fallback: F) -> Self
    where
        F: Fn() -> FF + Send + Sync + 'static,
        FF: Future<Output = Result<FallbackCounts<T>, CoreError>> + Send + 'static,
    {
        self.fallback_counts = Some(Arc::new(move || fallback().boxed()));
        self
    }

    pub fn count_keys(&self) -> &CountKeys {
        &self.count_keys
    }

    pub fn error_message(&self) -> &str {
        &self.error_message
    }

    pub fn has_fallback(&self) -> bool {
        self.fallback_counts.is_some()
    }
}

impl<T> LoadPageConfig<T>
where
    T: Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
{
    /// Wire a list screen to a repository.
    ///
    /// With active `filters` pages come from `search/page/{n}` and there is
    /// no fallback (a full listing would ignore the filters). Without them
    /// pages come from `page/{n}` and the fallback recounts `list_all`.
    pub fn for_repository(
        repository: &Repository<T>,
        filters: Option<Value>,
        compute_counts: impl Fn(&[T]) -> Counts + Send + Sync + 'static,
    ) -> Self {
        let filters = filters.filter(|value| match value {
            Value::Object(map) => !are_filters_empty(map),
            Value::Null => false,
            _ => true,
        });
        let compute_counts: ComputeCounts<T> = Arc::new(compute_counts);

        let counts_repo = repository.clone();
        let fetch_counts = move || {
            let repo = counts_repo.clone();
            async move { repo.get_counts().await }
        };

        let tally = Arc::clone(&compute_counts);
        match filters {
            Some(filters) => {
                let repo = repository.clone();
                let filters = Arc::new(filters);
                Self::new(
                    move |page| {
                        let repo = repo.clone();
                        let filters = Arc::clone(&filters);
                        async move { repo.search_page(page, filters.as_ref()).await }
                    },
                    fetch_counts,
                    move |items| tally(items),
                )
            }
            None => {
                let repo = repository.clone();
                let fallback_repo = repository.clone();
                let recount = Arc::clone(&compute_counts);
                Self::new(
                    move |page| {
                        let repo = repo.clone();
                        async move { repo.list_page(page).await }
                    },
                    fetch_counts,
                    move |items| tally(items),
                )
                .with_fallback_counts(move || {
                    let repo = fallback_repo.clone();
                    let recount = Arc::clone(&recount);
                    async move {
                        let items = repo.list_all().await?;
                        let counts = recount(&items);
                        Ok(FallbackCounts {
                            active: counts.active,
                            inactive: counts.inactive,
                            total: u64::try_from(items.len()).unwrap_or(u64::MAX),
                            items: Some(items),
                        })
                    }
                })
            }
        }
    }
}
