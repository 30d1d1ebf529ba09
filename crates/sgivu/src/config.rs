//! CLI configuration: thin wrapper around `sgivu_config` shared types.
//!
//! Adds resolution that respects `GlobalOpts` flag overrides (--api-url,
//! --insecure, --timeout) and fills error help text from the loaded config.

use std::time::Duration;

use sgivu_core::{BackendConfig, TlsVerification};

use crate::cli::GlobalOpts;
use crate::error::CliError;

// ── Re-exports from shared crate ────────────────────────────────────

pub use sgivu_config::{
    Config, Profile, ResourceConfig, config_path, load_config, save_config,
};

// ── CLI-specific helpers ────────────────────────────────────────────

/// Resolve the active profile name from CLI flags and config.
pub fn active_profile_name(global: &GlobalOpts, config: &Config) -> String {
    global
        .profile
        .clone()
        .or_else(|| config.default_profile.clone())
        .unwrap_or_else(|| "default".into())
}

/// Build a `BackendConfig` from the profile and CLI overrides.
///
/// Flags win over profile values. Without a matching profile, `--api-url`
/// alone is enough.
pub fn resolve_backend(global: &GlobalOpts, cfg: &Config) -> Result<BackendConfig, CliError> {
    let profile_name = active_profile_name(global, cfg);

    let mut backend = match (cfg.profiles.get(&profile_name), global.api_url.as_deref()) {
        (Some(profile), _) => sgivu_config::profile_to_backend_config(profile, &cfg.defaults)?,
        (None, Some(url)) => {
            let profile = Profile {
                api_url: url.to_owned(),
                ca_cert: None,
                insecure: None,
                timeout: None,
            };
            sgivu_config::profile_to_backend_config(&profile, &cfg.defaults)?
        }
        (None, None) if global.profile.is_some() => {
            return Err(CliError::ProfileNotFound {
                name: profile_name,
                available: profile_list(cfg),
            });
        }
        (None, None) => {
            return Err(CliError::NoConfig {
                path: config_path().display().to_string(),
            });
        }
    };

    if let Some(url) = global.api_url.as_deref() {
        backend.api_url = parse_url(url)?;
    }
    if global.insecure {
        backend.tls = TlsVerification::DangerAcceptInvalid;
    }
    if let Some(secs) = global.timeout {
        backend.timeout = Duration::from_secs(secs);
    }

    Ok(backend)
}

/// Look up a resource definition, listing the known ones on failure.
pub fn resolve_resource(cfg: &Config, name: &str) -> Result<ResourceConfig, CliError> {
    cfg.resource(name).map_err(|_| CliError::UnknownResource {
        name: name.into(),
        available: cfg.resource_names().join(", "),
    })
}

/// Comma-separated profile names, sorted.
pub fn profile_list(cfg: &Config) -> String {
    let mut names: Vec<&str> = cfg.profiles.keys().map(String::as_str).collect();
    names.sort_unstable();
    if names.is_empty() {
        "(none)".into()
    } else {
        names.join(", ")
    }
}

fn parse_url(raw: &str) -> Result<url::Url, CliError> {
    raw.parse().map_err(|_| CliError::Validation {
        field: "api-url".into(),
        reason: format!("invalid URL: {raw}"),
    })
}
