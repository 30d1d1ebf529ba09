//! Single-record and aggregate handlers: get, delete, status, counts.

use serde_json::json;

use sgivu_core::list::extract_counts;
use sgivu_core::{Backend, CoreError};

use crate::cli::{GlobalOpts, RecordArgs, ResourceArgs, StatusArgs};
use crate::config::Config;
use crate::error::CliError;
use crate::output;

use super::util;

/// Attach the resource name to a not-found error from the gateway.
fn not_found(resource: &str, id: i64) -> impl FnOnce(CoreError) -> CliError {
    let resource = resource.to_owned();
    move |err| match err {
        CoreError::NotFound { .. } => CliError::NotFound {
            resource_type: resource.clone(),
            identifier: id.to_string(),
            list_command: resource,
        },
        other => other.into(),
    }
}

pub async fn get(
    backend: &Backend,
    cfg: &Config,
    args: RecordArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let (_, repo) = util::open_resource(backend, cfg, &args.resource)?;
    let record = repo
        .get_by_id(args.id)
        .await
        .map_err(not_found(&args.resource, args.id))?;

    let out = output::render_single(&global.output, &record)?;
    output::print_output(&out, global.quiet);
    Ok(())
}

pub async fn delete(
    backend: &Backend,
    cfg: &Config,
    args: RecordArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let (_, repo) = util::open_resource(backend, cfg, &args.resource)?;

    let prompt = format!("Delete {} {}?", args.resource, args.id);
    if !util::confirm(&prompt, "delete", global.yes)? {
        return Ok(());
    }

    repo.delete(args.id)
        .await
        .map_err(not_found(&args.resource, args.id))?;

    if !global.quiet {
        eprintln!("Deleted {} {}", args.resource, args.id);
    }
    Ok(())
}

pub async fn status(
    backend: &Backend,
    cfg: &Config,
    args: StatusArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let (resource, repo) = util::open_resource(backend, cfg, &args.resource)?;
    let field = resource.active_field.clone();

    let settled = repo
        .change_status(args.id, &args.status, |record, status| {
            util::apply_status(record, &field, status);
        })
        .await
        .map_err(not_found(&args.resource, args.id))?;

    let out = output::render_single(&global.output, &json!({ "id": args.id, "status": settled }))?;
    output::print_output(&out, global.quiet);
    Ok(())
}

pub async fn counts(
    backend: &Backend,
    cfg: &Config,
    args: ResourceArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let (resource, repo) = util::open_resource(backend, cfg, &args.resource)?;
    let raw = repo.get_counts().await?;

    let extracted = extract_counts(&raw, resource.count_keys());
    if !extracted.has_counts {
        tracing::warn!(
            resource = %args.resource,
            "count payload carries none of the configured count keys"
        );
    }

    let summary = json!({
        "active": extracted.counts.active,
        "inactive": extracted.counts.inactive,
        "reported": extracted.has_counts,
        "raw": raw,
    });
    let out = output::render_single(&global.output, &summary)?;
    output::print_output(&out, global.quiet);
    Ok(())
}
