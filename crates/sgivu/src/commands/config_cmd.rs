//! Config subcommand handlers.

use dialoguer::Input;

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts, OutputFormat};
use crate::config::{self, Config, Profile};
use crate::error::CliError;
use crate::output;

// ── Helpers ─────────────────────────────────────────────────────────

/// Format config as TOML-like text. Only overridden resources are listed.
fn format_config(cfg: &Config) -> String {
    use std::fmt::Write;
    let mut out = String::new();

    if let Some(ref default) = cfg.default_profile {
        let _ = writeln!(out, "default_profile = \"{default}\"");
    }
    let _ = writeln!(out);
    let _ = writeln!(out, "[defaults]");
    let _ = writeln!(out, "output = \"{}\"", cfg.defaults.output);
    let _ = writeln!(out, "color = \"{}\"", cfg.defaults.color);
    let _ = writeln!(out, "insecure = {}", cfg.defaults.insecure);
    let _ = writeln!(out, "timeout = {}", cfg.defaults.timeout);

    let mut names: Vec<_> = cfg.profiles.keys().collect();
    names.sort();
    for name in names {
        let p = &cfg.profiles[name];
        let _ = writeln!(out);
        let _ = writeln!(out, "[profiles.{name}]");
        let _ = writeln!(out, "api_url = \"{}\"", p.api_url);
        if let Some(ref ca) = p.ca_cert {
            let _ = writeln!(out, "ca_cert = \"{}\"", ca.display());
        }
        if let Some(insecure) = p.insecure {
            let _ = writeln!(out, "insecure = {insecure}");
        }
        if let Some(timeout) = p.timeout {
            let _ = writeln!(out, "timeout = {timeout}");
        }
    }

    let mut resources: Vec<_> = cfg.resources.keys().collect();
    resources.sort();
    for name in resources {
        let r = &cfg.resources[name];
        let _ = writeln!(out);
        let _ = writeln!(out, "[resources.{name}]");
        let _ = writeln!(out, "path = \"{}\"", r.path);
        let _ = writeln!(out, "active_field = \"{}\"", r.active_field);
        let _ = writeln!(out, "filters = {}", r.filters.len());
    }

    out
}

/// Map a dialoguer / interactive I/O failure into CliError.
fn prompt_err(e: impl std::fmt::Display) -> CliError {
    CliError::Validation {
        field: "interactive".into(),
        reason: format!("prompt failed: {e}"),
    }
}

fn render_value<T: serde::Serialize>(global: &GlobalOpts, data: &T) -> Result<String, CliError> {
    let value = serde_json::to_value(data).map_err(|e| CliError::Render(e.to_string()))?;
    output::render_single(&global.output, &value)
}

// ── Handler ─────────────────────────────────────────────────────────

pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        // ── Init: interactive wizard ────────────────────────────────
        ConfigCommand::Init => {
            let config_path = config::config_path();
            eprintln!("sgivu: configuration wizard");
            eprintln!("   Config path: {}\n", config_path.display());

            let profile_name: String = Input::new()
                .with_prompt("Profile name")
                .default("default".into())
                .interact_text()
                .map_err(prompt_err)?;

            let api_url: String = Input::new()
                .with_prompt("Gateway URL")
                .default(
                    global
                        .api_url
                        .clone()
                        .unwrap_or_else(|| "http://localhost:8080".into()),
                )
                .validate_with(|input: &String| -> Result<(), String> {
                    url::Url::parse(input)
                        .map(|_| ())
                        .map_err(|e| format!("invalid URL: {e}"))
                })
                .interact_text()
                .map_err(prompt_err)?;

            let mut cfg = config::load_config().unwrap_or_default();
            cfg.profiles.insert(
                profile_name.clone(),
                Profile {
                    api_url,
                    ca_cert: None,
                    insecure: None,
                    timeout: None,
                },
            );
            cfg.default_profile = Some(profile_name.clone());

            config::save_config(&cfg)?;

            eprintln!("\n✓ Configuration written to {}", config_path.display());
            eprintln!("  Active profile: {profile_name}");
            eprintln!("\n  Test it: sgivu list cars");
            Ok(())
        }

        // ── Show ────────────────────────────────────────────────────
        ConfigCommand::Show => {
            let cfg = config::load_config().map_err(CliError::from)?;
            let out = match global.output {
                OutputFormat::Table | OutputFormat::Plain => format_config(&cfg),
                _ => render_value(global, &cfg)?,
            };
            output::print_output(out.trim_end(), global.quiet);
            Ok(())
        }

        // ── Path ────────────────────────────────────────────────────
        ConfigCommand::Path => {
            println!("{}", config::config_path().display());
            Ok(())
        }

        // ── Profiles ────────────────────────────────────────────────
        ConfigCommand::Profiles => {
            let cfg = config::load_config().map_err(CliError::from)?;
            let active = config::active_profile_name(global, &cfg);
            let mut names: Vec<_> = cfg.profiles.keys().collect();
            names.sort();
            for name in names {
                let marker = if *name == active { "*" } else { " " };
                println!("{marker} {name}  {}", cfg.profiles[name].api_url);
            }
            Ok(())
        }
    }
}

/// `sgivu resources`: every list resource and the path it reads from.
pub fn resources(cfg: &Config, global: &GlobalOpts) -> Result<(), CliError> {
    let rows: Vec<serde_json::Value> = cfg
        .resource_names()
        .into_iter()
        .filter_map(|name| {
            let resource = cfg.resource(&name).ok()?;
            Some(serde_json::json!({
                "name": name,
                "path": resource.path,
                "active_field": resource.active_field,
                "filters": resource
                    .filters
                    .iter()
                    .map(|m| m.query_key.as_str())
                    .collect::<Vec<_>>()
                    .join(","),
            }))
        })
        .collect();

    let out = match global.output {
        OutputFormat::Plain => rows
            .iter()
            .filter_map(|row| row["name"].as_str())
            .collect::<Vec<_>>()
            .join("\n"),
        _ => output::render_list(&global.output, &rows)?,
    };
    output::print_output(&out, global.quiet);
    Ok(())
}
