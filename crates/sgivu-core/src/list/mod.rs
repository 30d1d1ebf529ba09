// ── List page manager ──
//
// Loads one page of a list screen together with its KPI counts, reconciles
// the two, and recounts from the full dataset in the background when the
// server figures cannot be trusted. State is published through a `watch`
// channel; loads are sequenced so that the last requested page wins.

mod config;
mod reconcile;

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::WatchStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use sgivu_api::Page;

use crate::error::CoreError;

pub use config::{
    ComputeCounts, FallbackCounts, FetchCounts, FetchFallback, FetchPager, LoadPageConfig,
};
pub use reconcile::{
    Counts, CountKeys, DEFAULT_PAGE_SIZE, ExtractedCounts, compute_counts_by,
    compute_enabled_counts, extract_counts, infer_from_page, normalize_count, resolve_page_size,
    resolve_total, should_fallback, slice_items,
};

/// Snapshot of a list screen.
#[derive(Debug, Clone, PartialEq)]
pub struct ListPageState<T> {
    pub items: Vec<T>,
    pub pager: Option<Page<T>>,
    pub active: u64,
    pub inactive: u64,
    pub total: u64,
    pub loading: bool,
    pub error: Option<String>,
    /// Index of the page being shown.
    pub current_page: u64,
}

impl<T> Default for ListPageState<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            pager: None,
            active: 0,
            inactive: 0,
            total: 0,
            loading: false,
            error: None,
            current_page: 0,
        }
    }
}

/// Read a `page` query parameter.
///
/// Missing or empty means page 0. `None` means the value is unusable and
/// the caller should redirect to page 0.
pub fn parse_page(raw: Option<&str>) -> Option<u64> {
    match raw.map(str::trim) {
        None | Some("") => Some(0),
        Some(value) => value.parse().ok(),
    }
}

struct Inner<T> {
    state: watch::Sender<ListPageState<T>>,
    /// Ticket of the most recently requested load.
    latest: AtomicU64,
}

impl<T> Inner<T> {
    fn is_current(&self, ticket: u64) -> bool {
        self.latest.load(Ordering::SeqCst) == ticket
    }
}

/// State holder for one list screen. Clones share the same state.
pub struct ListPageManager<T> {
    inner: Arc<Inner<T>>,
}

impl<T> Clone for ListPageManager<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> Default for ListPageManager<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T> ListPageManager<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        let (state, _) = watch::channel(ListPageState::default());
        Self {
            inner: Arc::new(Inner {
                state,
                latest: AtomicU64::new(0),
            }),
        }
    }

    // ── Read views ───────────────────────────────────────────────────

    pub fn state(&self) -> ListPageState<T> {
        self.inner.state.borrow().clone()
    }

    pub fn current_page(&self) -> u64 {
        self.inner.state.borrow().current_page
    }

    pub fn is_loading(&self) -> bool {
        self.inner.state.borrow().loading
    }

    pub fn subscribe(&self) -> watch::Receiver<ListPageState<T>> {
        self.inner.state.subscribe()
    }

    /// Stream of state snapshots, starting with the current one.
    pub fn stream(&self) -> WatchStream<ListPageState<T>> {
        WatchStream::new(self.inner.state.subscribe())
    }

    // ── Loading ──────────────────────────────────────────────────────

    /// Load `page_index` and commit the reconciled state.
    ///
    /// Resolves once the page and counts are committed (or the load failed,
    /// was cancelled, or was superseded). When the counts need a recount
    /// from the full dataset, the returned handle tracks that background
    /// task; it does not hold `loading` up.
    pub async fn load_page(
        &self,
        config: &LoadPageConfig<T>,
        page_index: u64,
        cancel: CancellationToken,
    ) -> Option<JoinHandle<()>> {
        let ticket = self.inner.latest.fetch_add(1, Ordering::SeqCst) + 1;
        self.inner.state.send_modify(|state| {
            state.loading = true;
            state.error = None;
        });

        let joined = tokio::select! {
            () = cancel.cancelled() => {
                debug!(page = page_index, ticket, "list load cancelled");
                self.inner.state.send_if_modified(|state| {
                    if !self.inner.is_current(ticket) {
                        return false;
                    }
                    state.loading = false;
                    true
                });
                return None;
            }
            result = async {
                tokio::try_join!((config.fetch_pager)(page_index), (config.fetch_counts)())
            } => result,
        };

        if !self.inner.is_current(ticket) {
            debug!(page = page_index, ticket, "dropping superseded list load");
            return None;
        }

        match joined {
            Ok((pager, counts)) => self.commit(config, pager, &counts, page_index, ticket, cancel),
            Err(e) => {
                self.fail(config, &e, ticket);
                None
            }
        }
    }

    /// Fire-and-forget [`load_page`](Self::load_page).
    pub fn spawn_load(
        &self,
        config: LoadPageConfig<T>,
        page_index: u64,
        cancel: CancellationToken,
    ) -> JoinHandle<()> {
        let manager = self.clone();
        tokio::spawn(async move {
            if let Some(fallback) = manager.load_page(&config, page_index, cancel).await {
                if let Err(e) = fallback.await {
                    warn!(error = %e, "fallback recount task aborted");
                }
            }
        })
    }

    // ── Private helpers ──────────────────────────────────────────────

    fn commit(
        &self,
        config: &LoadPageConfig<T>,
        pager: Page<T>,
        counts: &serde_json::Value,
        page_index: u64,
        ticket: u64,
        cancel: CancellationToken,
    ) -> Option<JoinHandle<()>> {
        let items = pager.content.clone();
        let page_counts = (config.compute_counts)(&items);
        let extracted = extract_counts(counts, &config.count_keys);

        let working = if extracted.has_counts {
            extracted.counts
        } else {
            infer_from_page(page_counts, &pager)
        };

        let fallback = config.fallback_counts.clone().filter(|_| {
            should_fallback(
                extracted.has_counts,
                working,
                page_counts,
                pager.total_elements,
            )
        });

        let total = resolve_total(pager.total_elements, working);
        let current_page = pager.number.unwrap_or(page_index);

        let committed = self.inner.state.send_if_modified(|state| {
            if !self.inner.is_current(ticket) {
                return false;
            }
            state.items = items;
            state.pager = Some(pager.clone());
            state.active = working.active;
            state.inactive = working.inactive;
            state.total = total;
            state.current_page = current_page;
            state.loading = false;
            true
        });
        if !committed {
            debug!(page = page_index, ticket, "dropping superseded list load");
            return None;
        }

        let fetch = fallback?;
        debug!(
            page = current_page,
            has_counts = extracted.has_counts,
            active = working.active,
            inactive = working.inactive,
            reported_total = ?pager.total_elements,
            "server counts unreliable, recounting from full dataset"
        );

        let inner = Arc::clone(&self.inner);
        Some(tokio::spawn(async move {
            let result = tokio::select! {
                () = cancel.cancelled() => {
                    debug!(ticket, "fallback recount cancelled");
                    return;
                }
                result = fetch() => result,
            };

            match result {
                Ok(recount) => apply_fallback(&inner, recount, &pager, current_page, ticket),
                Err(e) => warn!(error = %e, "fallback recount failed, keeping server counts"),
            }
        }))
    }

    fn fail(&self, config: &LoadPageConfig<T>, err: &CoreError, ticket: u64) {
        error!(error = %err, "list load failed");
        self.inner.state.send_if_modified(|state| {
            if !self.inner.is_current(ticket) {
                return false;
            }
            state.error = Some(config.error_message.clone());
            state.items.clear();
            state.pager = None;
            state.loading = false;
            true
        });
    }
}

fn apply_fallback<T: Clone>(
    inner: &Inner<T>,
    recount: FallbackCounts<T>,
    pager: &Page<T>,
    page_index: u64,
    ticket: u64,
) {
    let FallbackCounts {
        active,
        inactive,
        total,
        items,
    } = recount;

    let replacement = items.map(|dataset| {
        let page_size = resolve_page_size(pager, dataset.len());
        let page_items = slice_items(&dataset, page_index, page_size);
        Page::from_slice(page_items, page_index, page_size, total)
    });

    let applied = inner.state.send_if_modified(|state| {
        if !inner.is_current(ticket) {
            return false;
        }
        state.active = active;
        state.inactive = inactive;
        state.total = total;
        if let Some(page) = replacement {
            state.items = page.content.clone();
            state.pager = Some(page);
        }
        true
    });

    if !applied {
        debug!(ticket, "dropping superseded fallback recount");
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::{Value, json};
    use std::time::Duration;

    #[derive(Debug, Clone, PartialEq)]
    struct Car {
        id: i64,
        available: bool,
    }

    fn car(id: i64, available: bool) -> Car {
        Car { id, available }
    }

    fn page_of(content: Vec<Car>, number: u64, size: u64, total: Option<u64>) -> Page<Car> {
        let count = u64::try_from(content.len()).unwrap();
        Page {
            number_of_elements: Some(count),
            empty: count == 0,
            content,
            number: Some(number),
            size: Some(size),
            total_elements: total,
            total_pages: total.map(|t| t.div_ceil(size).max(1)),
            ..Page::default()
        }
    }

    fn car_keys() -> CountKeys {
        CountKeys::new(
            ["availableCars", "available", "availableVehicles"],
            ["unavailableCars", "unavailable", "unavailableVehicles"],
        )
    }

    fn config(pager: Page<Car>, counts: Value) -> LoadPageConfig<Car> {
        LoadPageConfig::new(
            move |_| {
                let pager = pager.clone();
                async move { Ok(pager) }
            },
            move || {
                let counts = counts.clone();
                async move { Ok(counts) }
            },
            |items: &[Car]| compute_counts_by(items, |c| c.available),
        )
        .with_count_keys(car_keys())
        .with_error_message("Error loading cars.")
    }

    fn dataset(available: usize, unavailable: usize) -> Vec<Car> {
        let mut cars = Vec::new();
        for i in 0..available + unavailable {
            cars.push(car(i64::try_from(i).unwrap(), i < available));
        }
        cars
    }

    fn with_dataset(config: LoadPageConfig<Car>, cars: Vec<Car>) -> LoadPageConfig<Car> {
        config.with_fallback_counts(move || {
            let cars = cars.clone();
            async move {
                let counts = compute_counts_by(&cars, |c| c.available);
                Ok(FallbackCounts {
                    active: counts.active,
                    inactive: counts.inactive,
                    total: u64::try_from(cars.len()).unwrap(),
                    items: Some(cars),
                })
            }
        })
    }

    #[tokio::test]
    async fn trusted_counts_commit_without_fallback() {
        let manager = ListPageManager::new();
        let page = page_of(
            vec![car(1, true), car(2, false), car(3, true)],
            0,
            10,
            Some(10),
        );
        let cfg = with_dataset(
            config(page, json!({"availableCars": 6, "unavailableCars": 4})),
            dataset(1, 1),
        );

        let fallback = manager.load_page(&cfg, 0, CancellationToken::new()).await;
        assert!(fallback.is_none());

        let state = manager.state();
        assert_eq!(state.items.len(), 3);
        assert_eq!((state.active, state.inactive, state.total), (6, 4, 10));
        assert!(!state.loading);
        assert_eq!(state.error, None);
    }

    #[tokio::test]
    async fn missing_counts_trigger_fallback() {
        let manager = ListPageManager::new();
        let page = page_of(vec![car(0, true), car(1, true)], 0, 2, Some(2));
        let cfg = with_dataset(config(page, json!({})), dataset(3, 2));

        let fallback = manager.load_page(&cfg, 0, CancellationToken::new()).await;
        fallback.unwrap().await.unwrap();

        let state = manager.state();
        assert_eq!((state.active, state.inactive, state.total), (3, 2, 5));
    }

    #[tokio::test]
    async fn total_mismatch_triggers_fallback() {
        let manager = ListPageManager::new();
        let page = page_of(vec![car(0, true), car(1, false)], 0, 10, Some(5));
        let cfg = with_dataset(
            config(page, json!({"availableCars": 7, "unavailableCars": 3})),
            dataset(4, 1),
        );

        let fallback = manager.load_page(&cfg, 0, CancellationToken::new()).await;
        assert_eq!(manager.state().total, 5);
        fallback.unwrap().await.unwrap();

        let state = manager.state();
        assert_eq!((state.active, state.inactive, state.total), (4, 1, 5));
    }

    #[tokio::test]
    async fn hidden_inactive_triggers_fallback() {
        let manager = ListPageManager::new();
        let page = page_of(vec![car(0, true), car(1, true)], 0, 10, Some(10));
        let cfg = with_dataset(
            config(page, json!({"availableCars": 8, "unavailableCars": 2})),
            dataset(8, 2),
        );

        let fallback = manager.load_page(&cfg, 0, CancellationToken::new()).await;
        assert!(fallback.is_some());
    }

    #[tokio::test]
    async fn no_fallback_without_a_fallback_source() {
        let manager = ListPageManager::new();
        let page = page_of(vec![car(0, true)], 0, 10, Some(4));
        let cfg = config(page, json!({}));

        let fallback = manager.load_page(&cfg, 0, CancellationToken::new()).await;
        assert!(fallback.is_none());

        let state = manager.state();
        assert_eq!((state.active, state.inactive, state.total), (1, 3, 4));
    }

    #[tokio::test]
    async fn fallback_reslices_the_viewed_page() {
        let manager = ListPageManager::new();
        let page = page_of(vec![car(3, true), car(4, true)], 1, 3, None);
        let cfg = with_dataset(config(page, json!({})), dataset(5, 2));

        let fallback = manager.load_page(&cfg, 1, CancellationToken::new()).await;
        fallback.unwrap().await.unwrap();

        let state = manager.state();
        let ids: Vec<i64> = state.items.iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![3, 4, 5]);

        let pager = state.pager.unwrap();
        assert_eq!(pager.number, Some(1));
        assert_eq!(pager.size, Some(3));
        assert_eq!(pager.total_elements, Some(7));
        assert_eq!(pager.total_pages, Some(3));
        assert_eq!(pager.number_of_elements, Some(3));
        assert!(!pager.first);
        assert!(!pager.last);
        assert!(!pager.empty);
        assert_eq!(state.total, 7);
    }

    #[tokio::test]
    async fn join_failure_sets_error_and_clears_items() {
        let manager = ListPageManager::new();
        let ok = config(page_of(vec![car(1, true)], 0, 10, Some(1)), json!({"available": 1}));
        manager.load_page(&ok, 0, CancellationToken::new()).await;
        assert_eq!(manager.state().items.len(), 1);

        let failing = LoadPageConfig::new(
            |_| async { Ok(page_of(Vec::new(), 0, 10, Some(0))) },
            || async {
                Err(CoreError::Api {
                    message: "boom".into(),
                    status: Some(500),
                })
            },
            |items: &[Car]| compute_counts_by(items, |c| c.available),
        )
        .with_error_message("Error loading cars.");

        let fallback = manager.load_page(&failing, 0, CancellationToken::new()).await;
        assert!(fallback.is_none());

        let state = manager.state();
        assert_eq!(state.error.as_deref(), Some("Error loading cars."));
        assert!(state.items.is_empty());
        assert!(state.pager.is_none());
        assert!(!state.loading);
    }

    #[tokio::test]
    async fn fallback_failure_keeps_committed_counts() {
        let manager = ListPageManager::new();
        let page = page_of(vec![car(0, true)], 0, 10, Some(3));
        let cfg = config(page, json!({})).with_fallback_counts(|| async {
            Err(CoreError::Internal("dataset unavailable".into()))
        });

        let fallback = manager.load_page(&cfg, 0, CancellationToken::new()).await;
        fallback.unwrap().await.unwrap();

        let state = manager.state();
        assert_eq!((state.active, state.inactive, state.total), (1, 2, 3));
        assert_eq!(state.error, None);
    }

    #[tokio::test]
    async fn cancelled_load_commits_nothing() {
        let manager: ListPageManager<Car> = ListPageManager::new();
        let cfg = LoadPageConfig::new(
            |_| async {
                tokio::time::sleep(Duration::from_secs(60)).await;
                Ok(page_of(vec![car(1, true)], 0, 10, Some(1)))
            },
            || async { Ok(json!({"available": 1})) },
            |items: &[Car]| compute_counts_by(items, |c| c.available),
        );

        let cancel = CancellationToken::new();
        cancel.cancel();
        let fallback = manager.load_page(&cfg, 0, cancel).await;

        assert!(fallback.is_none());
        let state = manager.state();
        assert!(state.items.is_empty());
        assert!(!state.loading);
    }

    #[tokio::test]
    async fn superseded_load_is_dropped() {
        let manager: ListPageManager<Car> = ListPageManager::new();
        let slow = LoadPageConfig::new(
            |_| async {
                tokio::time::sleep(Duration::from_millis(200)).await;
                Ok(page_of(vec![car(1, true)], 0, 10, Some(1)))
            },
            || async { Ok(json!({"available": 1, "unavailable": 0})) },
            |items: &[Car]| compute_counts_by(items, |c| c.available),
        );
        let fast = config(
            page_of(vec![car(7, true), car(8, true)], 1, 10, Some(12)),
            json!({"available": 12, "unavailable": 0}),
        );

        let first = manager.clone();
        let slow_load =
            tokio::spawn(async move { first.load_page(&slow, 0, CancellationToken::new()).await });
        tokio::time::sleep(Duration::from_millis(20)).await;
        manager.load_page(&fast, 1, CancellationToken::new()).await;
        assert!(slow_load.await.unwrap().is_none());

        let state = manager.state();
        assert_eq!(state.current_page, 1);
        assert_eq!(state.items.iter().map(|c| c.id).collect::<Vec<_>>(), vec![7, 8]);
        assert_eq!(state.total, 12);
    }

    #[tokio::test]
    async fn loading_flag_is_published() {
        let manager = ListPageManager::new();
        let mut rx = manager.subscribe();
        let cfg = config(page_of(vec![car(1, true)], 0, 10, Some(1)), json!({"available": 1}));

        let handle = manager.spawn_load(cfg, 0, CancellationToken::new());
        rx.changed().await.unwrap();
        handle.await.unwrap();
        assert!(!manager.is_loading());
        assert_eq!(manager.current_page(), 0);
    }

    #[tokio::test]
    async fn stream_yields_committed_snapshots() {
        use tokio_stream::StreamExt;

        let manager = ListPageManager::new();
        let mut snapshots = manager.stream();
        assert_eq!(snapshots.next().await.unwrap(), ListPageState::default());

        let page = page_of(vec![car(0, true), car(1, true)], 0, 2, Some(2));
        let cfg = with_dataset(config(page, json!({})), dataset(3, 2));
        let fallback = manager.load_page(&cfg, 0, CancellationToken::new()).await;
        fallback.unwrap().await.unwrap();

        let latest = snapshots.next().await.unwrap();
        assert!(!latest.loading);
        assert_eq!((latest.active, latest.inactive, latest.total), (3, 2, 5));
        assert_eq!(latest.pager.unwrap().total_pages, Some(3));
    }

    #[test]
    fn page_parameter_parsing() {
        assert_eq!(parse_page(None), Some(0));
        assert_eq!(parse_page(Some("")), Some(0));
        assert_eq!(parse_page(Some("4")), Some(4));
        assert_eq!(parse_page(Some("-1")), None);
        assert_eq!(parse_page(Some("two")), None);
    }
}
