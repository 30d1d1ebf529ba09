//! Shared helpers for command handlers.

use std::io::IsTerminal;

use serde_json::Value;

use sgivu_core::{Backend, Repository};

use crate::config::{self, Config, ResourceConfig};
use crate::error::CliError;

/// Identifier of an untyped record; records without a numeric `id` read as 0.
pub fn value_id(record: &Value) -> i64 {
    record.get("id").and_then(Value::as_i64).unwrap_or_default()
}

/// Resolve a resource name to its definition and an untyped repository.
pub fn open_resource(
    backend: &Backend,
    cfg: &Config,
    name: &str,
) -> Result<(ResourceConfig, Repository<Value>), CliError> {
    let resource = config::resolve_resource(cfg, name)?;
    let repo = backend.repository_by(&resource.path, value_id)?;
    Ok((resource, repo))
}

/// Prompt for confirmation, auto-approving if `--yes` was passed.
pub fn confirm(message: &str, action: &str, yes_flag: bool) -> Result<bool, CliError> {
    if yes_flag {
        return Ok(true);
    }
    if !std::io::stdin().is_terminal() {
        return Err(CliError::NonInteractiveRequiresYes {
            action: action.into(),
        });
    }
    let confirmed = dialoguer::Confirm::new()
        .with_prompt(message)
        .default(false)
        .interact()
        .map_err(|e| CliError::Io(std::io::Error::other(e)))?;
    Ok(confirmed)
}

/// Write `status` into the record's active field, keeping booleans boolean.
pub fn apply_status(record: &mut Value, field: &str, status: &str) {
    let Value::Object(fields) = record else {
        return;
    };
    let value = match status {
        "true" => Value::Bool(true),
        "false" => Value::Bool(false),
        other => Value::String(other.to_owned()),
    };
    fields.insert(field.to_owned(), value);
}
