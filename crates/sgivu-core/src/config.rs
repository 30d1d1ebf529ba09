// ── Runtime backend configuration ──
//
// These types describe *how* to reach the REST gateway. They carry
// connection tuning only and never touch disk: the CLI builds a
// `BackendConfig` (usually through `sgivu-config`) and hands it in.

use std::time::Duration;

use sgivu_api::{TlsMode, TransportConfig};
use url::Url;

/// TLS verification strategy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TlsVerification {
    /// System CA store (strict).
    #[default]
    SystemDefaults,
    /// Custom CA certificate file.
    CustomCa(std::path::PathBuf),
    /// Skip verification (self-signed development gateways).
    DangerAcceptInvalid,
}

/// Configuration for one backend gateway.
#[derive(Debug, Clone)]
pub struct BackendConfig {
    /// Gateway root URL (e.g., `http://localhost:8080`). Resource paths such
    /// as `v1/cars` are joined onto it.
    pub api_url: Url,
    /// TLS verification strategy.
    pub tls: TlsVerification,
    /// Request timeout.
    pub timeout: Duration,
}

impl BackendConfig {
    pub fn new(api_url: Url) -> Self {
        Self {
            api_url,
            tls: TlsVerification::default(),
            timeout: Duration::from_secs(30),
        }
    }

    /// Translate into the transport-level configuration. The gateway keeps
    /// its session in cookies, so every backend gets its own jar.
    pub fn transport(&self) -> TransportConfig {
        let tls = match &self.tls {
            TlsVerification::SystemDefaults => TlsMode::System,
            TlsVerification::CustomCa(path) => TlsMode::CustomCa(path.clone()),
            TlsVerification::DangerAcceptInvalid => TlsMode::DangerAcceptInvalid,
        };

        TransportConfig {
            tls,
            timeout: self.timeout,
            cookie_jar: None,
        }
        .with_cookie_jar()
    }
}
