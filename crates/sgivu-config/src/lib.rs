//! Shared configuration for sgivu tools.
//!
//! TOML gateway profiles, list resource definitions (count-key aliases,
//! filter mappings, the field that marks an item active), and translation
//! to `sgivu_core::BackendConfig`.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use sgivu_core::list::compute_counts_by;
use sgivu_core::{BackendConfig, CountKeys, Counts, FilterFieldMapping, FilterKind, TlsVerification};

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("no profile named '{profile}'")]
    NoProfile { profile: String },

    #[error("unknown resource '{name}'")]
    UnknownResource { name: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Default profile name.
    pub default_profile: Option<String>,

    /// Global defaults.
    #[serde(default)]
    pub defaults: Defaults,

    /// Named gateway profiles.
    #[serde(default)]
    pub profiles: HashMap<String, Profile>,

    /// List resources. Entries here override the built-in definitions.
    #[serde(default)]
    pub resources: HashMap<String, ResourceConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: Some("default".into()),
            defaults: Defaults::default(),
            profiles: HashMap::new(),
            resources: HashMap::new(),
        }
    }
}

impl Config {
    /// Look up a resource, falling back to the built-in definitions.
    pub fn resource(&self, name: &str) -> Result<ResourceConfig, ConfigError> {
        self.resources
            .get(name)
            .cloned()
            .or_else(|| builtin_resource(name))
            .ok_or_else(|| ConfigError::UnknownResource { name: name.into() })
    }

    /// Every resource name that [`resource`](Self::resource) resolves, sorted.
    pub fn resource_names(&self) -> Vec<String> {
        let mut names: Vec<String> = BUILTIN_RESOURCES
            .iter()
            .map(|name| (*name).to_owned())
            .chain(self.resources.keys().cloned())
            .collect();
        names.sort();
        names.dedup();
        names
    }

    /// The profile `name`, or the default profile.
    pub fn profile(&self, name: Option<&str>) -> Result<(String, &Profile), ConfigError> {
        let name = name
            .or(self.default_profile.as_deref())
            .unwrap_or("default")
            .to_owned();
        match self.profiles.get(&name) {
            Some(profile) => Ok((name, profile)),
            None => Err(ConfigError::NoProfile { profile: name }),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    #[serde(default = "default_color")]
    pub color: String,

    #[serde(default)]
    pub insecure: bool,

    #[serde(default = "default_timeout")]
    pub timeout: u64,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            color: default_color(),
            insecure: false,
            timeout: default_timeout(),
        }
    }
}

fn default_output() -> String {
    "table".into()
}
fn default_color() -> String {
    "auto".into()
}
fn default_timeout() -> u64 {
    30
}

/// A named gateway profile.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Profile {
    /// Gateway base URL (e.g., "http://localhost:8080").
    pub api_url: String,

    /// Path to custom CA certificate.
    pub ca_cert: Option<PathBuf>,

    /// Override insecure TLS setting.
    pub insecure: Option<bool>,

    /// Override timeout.
    pub timeout: Option<u64>,
}

/// One list resource: where it lives and how its counts and filters read.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ResourceConfig {
    /// Path under the gateway URL (e.g., "v1/cars").
    pub path: String,

    /// Message shown when a page fails to load.
    #[serde(default = "default_error_message")]
    pub error_message: String,

    /// Item field that decides active vs inactive.
    #[serde(default = "default_active_field")]
    pub active_field: String,

    /// Value of `active_field` that means active.
    #[serde(default = "default_active_value")]
    pub active_value: Value,

    /// Aliases probed in the `/count` payload.
    #[serde(default = "default_count_keys")]
    pub count_keys: CountKeys,

    /// Query parameter mappings for list filters.
    #[serde(default)]
    pub filters: Vec<FilterFieldMapping>,
}

fn default_error_message() -> String {
    "Error loading the list.".into()
}
fn default_active_field() -> String {
    "enabled".into()
}
fn default_active_value() -> Value {
    Value::Bool(true)
}
fn default_count_keys() -> CountKeys {
    CountKeys::new(["active"], ["inactive"])
}

impl ResourceConfig {
    /// Whether `item` is on the active side of the counts.
    pub fn is_active(&self, item: &Value) -> bool {
        item.get(&self.active_field) == Some(&self.active_value)
    }

    /// Active / inactive tally over raw items.
    pub fn tally(&self, items: &[Value]) -> Counts {
        compute_counts_by(items, |item| self.is_active(item))
    }

    pub fn filter_mappings(&self) -> &[FilterFieldMapping] {
        &self.filters
    }

    pub fn count_keys(&self) -> &CountKeys {
        &self.count_keys
    }
}

// ── Built-in resources ──────────────────────────────────────────────

const BUILTIN_RESOURCES: &[&str] = &["cars", "companies", "motorcycles", "persons", "users"];

fn mappings(entries: &[(&str, &str, FilterKind)]) -> Vec<FilterFieldMapping> {
    entries
        .iter()
        .map(|(query_key, filter_key, kind)| FilterFieldMapping::new(*query_key, *filter_key, *kind))
        .collect()
}

fn vehicle_mappings(prefix: &str, type_field: Option<&str>) -> Vec<FilterFieldMapping> {
    let mut fields = vec![
        ("Plate", "plate", FilterKind::String),
        ("Brand", "brand", FilterKind::String),
        ("Line", "line", FilterKind::String),
        ("Model", "model", FilterKind::String),
    ];
    match type_field {
        Some(field) => fields.push(("Type", field, FilterKind::String)),
        None => {
            fields.push(("FuelType", "fuelType", FilterKind::String));
            fields.push(("BodyType", "bodyType", FilterKind::String));
        }
    }
    fields.extend([
        ("Transmission", "transmission", FilterKind::String),
        ("City", "cityRegistered", FilterKind::String),
        ("Status", "status", FilterKind::Enum),
        ("MinYear", "minYear", FilterKind::Number),
        ("MaxYear", "maxYear", FilterKind::Number),
        ("MinCapacity", "minCapacity", FilterKind::Number),
        ("MaxCapacity", "maxCapacity", FilterKind::Number),
        ("MinMileage", "minMileage", FilterKind::Number),
        ("MaxMileage", "maxMileage", FilterKind::Number),
        ("MinSalePrice", "minSalePrice", FilterKind::Price),
        ("MaxSalePrice", "maxSalePrice", FilterKind::Price),
    ]);

    fields
        .into_iter()
        .map(|(suffix, filter_key, kind)| {
            FilterFieldMapping::new(format!("{prefix}{suffix}"), filter_key, kind)
        })
        .collect()
}

/// Definition shipped for the standard sgivu resources.
pub fn builtin_resource(name: &str) -> Option<ResourceConfig> {
    let resource = match name {
        "users" => ResourceConfig {
            path: "v1/users".into(),
            error_message: "Error loading users.".into(),
            active_field: default_active_field(),
            active_value: default_active_value(),
            count_keys: CountKeys::new(["activeUsers", "active"], ["inactiveUsers", "inactive"]),
            filters: mappings(&[
                ("userName", "name", FilterKind::String),
                ("userUsername", "username", FilterKind::String),
                ("userEmail", "email", FilterKind::String),
                ("userRole", "role", FilterKind::String),
                ("userEnabled", "enabled", FilterKind::Boolean),
            ]),
        },
        "persons" => ResourceConfig {
            path: "v1/persons".into(),
            error_message: "Error loading persons.".into(),
            active_field: default_active_field(),
            active_value: default_active_value(),
            count_keys: CountKeys::new(
                ["activeClients", "activePersons", "activePeople", "active"],
                ["inactiveClients", "inactivePersons", "inactivePeople", "inactive"],
            ),
            filters: mappings(&[
                ("personName", "name", FilterKind::String),
                ("personEmail", "email", FilterKind::String),
                ("personNationalId", "nationalId", FilterKind::String),
                ("personPhone", "phoneNumber", FilterKind::String),
                ("personCity", "city", FilterKind::String),
                ("personEnabled", "enabled", FilterKind::Boolean),
            ]),
        },
        "companies" => ResourceConfig {
            path: "v1/companies".into(),
            error_message: "Error loading companies.".into(),
            active_field: default_active_field(),
            active_value: default_active_value(),
            count_keys: CountKeys::new(
                ["activeCompanies", "activeClients", "activeOrganizations", "active"],
                ["inactiveCompanies", "inactiveClients", "inactiveOrganizations", "inactive"],
            ),
            filters: mappings(&[
                ("companyName", "companyName", FilterKind::String),
                ("companyTaxId", "taxId", FilterKind::String),
                ("companyEmail", "email", FilterKind::String),
                ("companyPhone", "phoneNumber", FilterKind::String),
                ("companyCity", "city", FilterKind::String),
                ("companyEnabled", "enabled", FilterKind::Boolean),
            ]),
        },
        "cars" => ResourceConfig {
            path: "v1/cars".into(),
            error_message: "Error loading cars.".into(),
            active_field: "status".into(),
            active_value: Value::String("AVAILABLE".into()),
            count_keys: CountKeys::new(
                ["availableCars", "available", "availableVehicles"],
                ["unavailableCars", "unavailable", "unavailableVehicles"],
            ),
            filters: vehicle_mappings("car", None),
        },
        "motorcycles" => ResourceConfig {
            path: "v1/motorcycles".into(),
            error_message: "Error loading motorcycles.".into(),
            active_field: "status".into(),
            active_value: Value::String("AVAILABLE".into()),
            count_keys: CountKeys::new(
                ["availableMotorcycles", "available", "availableVehicles"],
                ["unavailableMotorcycles", "unavailable", "unavailableVehicles"],
            ),
            filters: vehicle_mappings("motorcycle", Some("motorcycleType")),
        },
        _ => return None,
    };
    Some(resource)
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("com", "sgivu", "sgivu").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("sgivu");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from the canonical file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load the full Config from `path` + environment.
///
/// Nested keys use a double underscore: `SGIVU_DEFAULTS__TIMEOUT=10`.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("SGIVU_").split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

/// Load config, returning a default if the file doesn't exist.
pub fn load_config_or_default() -> Config {
    load_config().unwrap_or_default()
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write it to `path`.
pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<(), ConfigError> {
    save_config_to(cfg, &config_path())
}

// ── Translation ─────────────────────────────────────────────────────

/// Build a `BackendConfig` from a profile, with no CLI overrides.
pub fn profile_to_backend_config(
    profile: &Profile,
    defaults: &Defaults,
) -> Result<BackendConfig, ConfigError> {
    let api_url: url::Url = profile
        .api_url
        .parse()
        .map_err(|_| ConfigError::Validation {
            field: "api_url".into(),
            reason: format!("invalid URL: {}", profile.api_url),
        })?;

    let tls = if profile.insecure.unwrap_or(defaults.insecure) {
        TlsVerification::DangerAcceptInvalid
    } else if let Some(ref ca_path) = profile.ca_cert {
        TlsVerification::CustomCa(ca_path.clone())
    } else {
        TlsVerification::SystemDefaults
    };

    Ok(BackendConfig {
        api_url,
        tls,
        timeout: Duration::from_secs(profile.timeout.unwrap_or(defaults.timeout)),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    fn write_config(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = load_config_from(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(cfg.default_profile.as_deref(), Some("default"));
        assert_eq!(cfg.defaults.output, "table");
        assert_eq!(cfg.defaults.timeout, 30);
        assert!(cfg.profiles.is_empty());
    }

    #[test]
    fn profiles_and_resources_parse() {
        let file = write_config(
            r#"
default_profile = "local"

[defaults]
timeout = 5

[profiles.local]
api_url = "http://localhost:8080"

[resources.cars]
path = "v2/cars"
error_message = "Cars unavailable."
active_field = "status"
active_value = "AVAILABLE"
count_keys = { active = ["availableCars"], inactive = ["unavailableCars"] }
filters = [{ query_key = "carBrand", filter_key = "brand", kind = "string" }]
"#,
        );

        let cfg = load_config_from(file.path()).unwrap();
        let (name, profile) = cfg.profile(None).unwrap();
        assert_eq!(name, "local");
        assert_eq!(profile.api_url, "http://localhost:8080");

        let cars = cfg.resource("cars").unwrap();
        assert_eq!(cars.path, "v2/cars");
        assert_eq!(cars.active_value, Value::String("AVAILABLE".into()));
        assert_eq!(
            cars.filters,
            vec![FilterFieldMapping::new("carBrand", "brand", FilterKind::String)]
        );

        let backend = profile_to_backend_config(profile, &cfg.defaults).unwrap();
        assert_eq!(backend.timeout, Duration::from_secs(5));
        assert_eq!(backend.tls, TlsVerification::SystemDefaults);
    }

    #[test]
    fn resource_defaults_fill_in() {
        let file = write_config(
            r#"
[resources.roles]
path = "v1/roles"
"#,
        );
        let cfg = load_config_from(file.path()).unwrap();
        let roles = cfg.resource("roles").unwrap();
        assert_eq!(roles.active_field, "enabled");
        assert_eq!(roles.count_keys, CountKeys::new(["active"], ["inactive"]));
        assert!(roles.filters.is_empty());
        assert!(cfg.resource_names().contains(&"roles".to_owned()));
    }

    #[test]
    fn builtin_resources_resolve() {
        let cfg = Config::default();
        let users = cfg.resource("users").unwrap();
        assert_eq!(users.count_keys.active, vec!["activeUsers", "active"]);

        let cars = cfg.resource("cars").unwrap();
        let min_price = cars
            .filters
            .iter()
            .find(|m| m.query_key == "carMinSalePrice")
            .unwrap();
        assert_eq!(min_price.filter_key, "minSalePrice");
        assert_eq!(min_price.kind, FilterKind::Price);
        assert!(cars.filters.iter().any(|m| m.query_key == "carFuelType"));

        let motorcycles = cfg.resource("motorcycles").unwrap();
        assert!(
            motorcycles
                .filters
                .iter()
                .any(|m| m.query_key == "motorcycleType" && m.filter_key == "motorcycleType")
        );

        assert!(matches!(
            cfg.resource("invoices"),
            Err(ConfigError::UnknownResource { .. })
        ));
    }

    #[test]
    fn tally_uses_active_field() {
        let cars = builtin_resource("cars").unwrap();
        let items = vec![
            serde_json::json!({ "id": 1, "status": "AVAILABLE" }),
            serde_json::json!({ "id": 2, "status": "SOLD" }),
            serde_json::json!({ "id": 3 }),
        ];
        assert_eq!(cars.tally(&items), Counts::new(1, 2));
    }

    #[test]
    fn unknown_profile_is_an_error() {
        let cfg = Config::default();
        assert!(matches!(
            cfg.profile(Some("prod")),
            Err(ConfigError::NoProfile { .. })
        ));
    }

    #[test]
    fn invalid_url_is_rejected() {
        let profile = Profile {
            api_url: "not a url".into(),
            ca_cert: None,
            insecure: None,
            timeout: None,
        };
        assert!(matches!(
            profile_to_backend_config(&profile, &Defaults::default()),
            Err(ConfigError::Validation { .. })
        ));
    }

    #[test]
    fn insecure_default_applies_to_profiles() {
        let profile = Profile {
            api_url: "https://gateway.local".into(),
            ca_cert: Some("/etc/ssl/ca.pem".into()),
            insecure: None,
            timeout: Some(12),
        };
        let defaults = Defaults {
            insecure: true,
            ..Defaults::default()
        };
        let backend = profile_to_backend_config(&profile, &defaults).unwrap();
        assert_eq!(backend.tls, TlsVerification::DangerAcceptInvalid);
        assert_eq!(backend.timeout, Duration::from_secs(12));
    }

    #[test]
    fn save_then_load_keeps_profiles() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut cfg = Config::default();
        cfg.profiles.insert(
            "default".into(),
            Profile {
                api_url: "http://localhost:8080".into(),
                ca_cert: None,
                insecure: None,
                timeout: None,
            },
        );
        save_config_to(&cfg, &path).unwrap();

        let loaded = load_config_from(&path).unwrap();
        assert_eq!(loaded.profile(None).unwrap().1.api_url, "http://localhost:8080");
    }
}
