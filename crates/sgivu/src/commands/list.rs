//! `sgivu list`: one page of a resource with reconciled counts.

use serde_json::{Value, json};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use sgivu_core::filter::{self, FilterFieldMapping, FilterKind, QueryParams};
use sgivu_core::list::parse_page;
use sgivu_core::{Backend, ListPageManager, LoadPageConfig};

use crate::cli::{GlobalOpts, ListArgs};
use crate::config::Config;
use crate::error::CliError;
use crate::output;

use super::util;

pub async fn handle(
    backend: &Backend,
    cfg: &Config,
    args: ListArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let (resource, repo) = util::open_resource(backend, cfg, &args.resource)?;

    let page = parse_page(args.page.as_deref()).unwrap_or_else(|| {
        warn!(page = ?args.page, "unusable page index, showing page 0");
        0
    });

    let mut query: QueryParams = args.query.into_iter().collect();
    normalize_prices(&mut query, resource.filter_mappings());
    let decoded = filter::decode(&query, resource.filter_mappings(), || json!({}))?;
    if let Some(ref applied) = decoded.query_params {
        debug!(?applied, "active filters");
    }
    let ignored: Vec<&String> = query
        .keys()
        .filter(|key| !resource.filters.iter().any(|m| &m.query_key == *key))
        .collect();
    if !ignored.is_empty() {
        warn!(?ignored, resource = %args.resource, "query keys not recognised for this resource");
    }

    let tally = resource.clone();
    let load = LoadPageConfig::for_repository(&repo, decoded.filters, move |items: &[Value]| {
        tally.tally(items)
    })
    .with_count_keys(resource.count_keys.clone())
    .with_error_message(resource.error_message.clone());

    let cancel = CancellationToken::new();
    let interrupt = cancel.clone();
    let watcher = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            interrupt.cancel();
        }
    });

    let manager = ListPageManager::new();
    let fallback = manager.load_page(&load, page, cancel.clone()).await;
    if let Some(handle) = fallback {
        if let Err(e) = handle.await {
            warn!(error = %e, "recount task aborted");
        }
    }
    watcher.abort();

    if cancel.is_cancelled() {
        return Err(CliError::Interrupted);
    }

    let state = manager.state();
    if let Some(message) = &state.error {
        return Err(CliError::ListFailed {
            message: message.clone(),
        });
    }

    let out = output::render_list(&global.output, &state.items)?;
    output::print_output(&out, global.quiet);
    if !global.quiet {
        eprintln!(
            "{}",
            output::page_summary(&state, output::should_color(&global.color))
        );
    }
    Ok(())
}

/// Rewrite es-CO formatted price filters (`25.000.000`) as plain numbers.
/// Unparsable values are left alone; the codec drops them.
fn normalize_prices(query: &mut QueryParams, mappings: &[FilterFieldMapping]) {
    for mapping in mappings.iter().filter(|m| m.kind == FilterKind::Price) {
        let Some(raw) = query.get_mut(&mapping.query_key) else {
            continue;
        };
        let input = filter::normalize_price_input(raw, 0);
        if let Some(value) = input.value {
            info!(filter = %mapping.query_key, price = %input.display, "price filter");
            *raw = value.to_string();
        }
    }
}
