// ── Backend handle ──
//
// One shared HTTP client per gateway; resource clients and repositories are
// carved out of it by relative path (`v1/cars`, `v1/users`, ...).

use tracing::debug;

use sgivu_api::ResourceClient;

use crate::config::BackendConfig;
use crate::error::CoreError;
use crate::model::Entity;
use crate::repository::Repository;

/// Entry point for consumers: owns the HTTP client for one gateway.
#[derive(Debug, Clone)]
pub struct Backend {
    config: BackendConfig,
    http: reqwest::Client,
}

impl Backend {
    pub fn new(config: BackendConfig) -> Result<Self, CoreError> {
        let http = config.transport().build_client()?;
        debug!(api_url = %config.api_url, "backend client ready");
        Ok(Self { config, http })
    }

    pub fn config(&self) -> &BackendConfig {
        &self.config
    }

    /// Raw client for the resource at `path` (relative to the gateway URL).
    pub fn resource(&self, path: &str) -> Result<ResourceClient, CoreError> {
        let mut root = self.config.api_url.clone();
        if !root.path().ends_with('/') {
            let with_slash = format!("{}/", root.path());
            root.set_path(&with_slash);
        }
        let url = root.join(path.trim_start_matches('/')).map_err(|e| CoreError::Config {
            message: format!("invalid resource path '{path}': {e}"),
        })?;
        Ok(ResourceClient::from_reqwest(url.as_str(), self.http.clone())?)
    }

    /// Repository keyed by [`Entity::id`].
    pub fn repository<T>(&self, path: &str) -> Result<Repository<T>, CoreError>
    where
        T: Entity + Clone + Send + Sync + 'static,
    {
        Ok(Repository::new(self.resource(path)?))
    }

    /// Repository with an explicit identifier selector.
    pub fn repository_by<T>(
        &self,
        path: &str,
        id_of: fn(&T) -> i64,
    ) -> Result<Repository<T>, CoreError>
    where
        T: Clone + Send + Sync + 'static,
    {
        Ok(Repository::with_id_selector(self.resource(path)?, id_of))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn backend(url: &str) -> Backend {
        Backend::new(BackendConfig::new(url.parse().unwrap())).unwrap()
    }

    #[test]
    fn resource_paths_join_under_gateway_prefix() {
        let b = backend("http://localhost:8080/api");
        let client = b.resource("v1/cars").unwrap();
        assert_eq!(client.base_url().as_str(), "http://localhost:8080/api/v1/cars");
    }

    #[test]
    fn leading_slash_does_not_escape_prefix() {
        let b = backend("http://localhost:8080/api/");
        let client = b.resource("/v1/users").unwrap();
        assert_eq!(client.base_url().as_str(), "http://localhost:8080/api/v1/users");
    }
}
