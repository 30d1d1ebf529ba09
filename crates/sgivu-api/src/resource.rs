// Async HTTP client for a single REST resource collection.
//
// Every resource exposes the same endpoint layout under its base URL:
//   POST   {base}                 create
//   GET    {base}                 list all
//   GET    {base}/page/{n}        one page
//   GET    {base}/{id}            one item
//   PUT    {base}/{id}            update
//   DELETE {base}/{id}            delete
//   GET    {base}/search          filtered list
//   GET    {base}/search/page/{n} filtered page
//   GET    {base}/count           aggregate counts (shape varies per resource)
//   PATCH  {base}/{id}/status     status change

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;
use url::Url;

use crate::Error;
use crate::page::Page;

// ── Error response shape from the backend ────────────────────────────

#[derive(serde::Deserialize)]
struct ErrorResponse {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(serde::Deserialize)]
struct StatusResponse {
    status: String,
}

// ── Client ───────────────────────────────────────────────────────────

/// Async client bound to one resource base URL (e.g. `.../v1/cars`).
///
/// Cheap to clone: the inner `reqwest::Client` is reference counted.
#[derive(Debug, Clone)]
pub struct ResourceClient {
    http: reqwest::Client,
    /// Always ends with `/` so relative joins land under the resource.
    base_url: Url,
}

impl ResourceClient {
    // ── Constructors ─────────────────────────────────────────────────

    /// Build from a base URL and transport config.
    pub fn new(base_url: &str, transport: &crate::TransportConfig) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Self::from_reqwest(base_url, http)
    }

    /// Wrap an existing `reqwest::Client` (caller manages cookies/headers).
    pub fn from_reqwest(base_url: &str, http: reqwest::Client) -> Result<Self, Error> {
        let base_url = Self::normalize_base_url(base_url)?;
        Ok(Self { http, base_url })
    }

    /// Parse the base URL and force a trailing slash.
    fn normalize_base_url(raw: &str) -> Result<Url, Error> {
        let mut url = Url::parse(raw)?;
        let path = url.path().trim_end_matches('/').to_owned();
        url.set_path(&format!("{path}/"));
        Ok(url)
    }

    /// The resource base URL, without the trailing slash.
    pub fn base_url(&self) -> Url {
        self.collection_url()
    }

    // ── URL builders ─────────────────────────────────────────────────

    fn collection_url(&self) -> Url {
        let mut url = self.base_url.clone();
        let path = url.path().trim_end_matches('/').to_owned();
        url.set_path(&path);
        url
    }

    /// Join a relative path (e.g. `"page/0"`) onto the base URL.
    fn url(&self, path: &str) -> Result<Url, Error> {
        Ok(self.base_url.join(path)?)
    }

    // ── HTTP verbs ───────────────────────────────────────────────────

    async fn get<T: DeserializeOwned>(&self, url: Url) -> Result<T, Error> {
        debug!("GET {url}");

        let resp = self.http.get(url).send().await?;
        self.handle_response(resp).await
    }

    async fn get_with_params<T: DeserializeOwned>(
        &self,
        url: Url,
        params: &[(String, String)],
    ) -> Result<T, Error> {
        debug!("GET {url} params={params:?}");

        let resp = self.http.get(url).query(params).send().await?;
        self.handle_response(resp).await
    }

    async fn post<T: DeserializeOwned, B: Serialize + Sync>(
        &self,
        url: Url,
        body: &B,
    ) -> Result<T, Error> {
        debug!("POST {url}");

        let resp = self.http.post(url).json(body).send().await?;
        self.handle_response(resp).await
    }

    async fn put<T: DeserializeOwned, B: Serialize + Sync>(
        &self,
        url: Url,
        body: &B,
    ) -> Result<T, Error> {
        debug!("PUT {url}");

        let resp = self.http.put(url).json(body).send().await?;
        self.handle_response(resp).await
    }

    async fn patch<T: DeserializeOwned, B: Serialize + Sync>(
        &self,
        url: Url,
        body: &B,
    ) -> Result<T, Error> {
        debug!("PATCH {url}");

        let resp = self.http.patch(url).json(body).send().await?;
        self.handle_response(resp).await
    }

    async fn delete_at(&self, url: Url) -> Result<(), Error> {
        debug!("DELETE {url}");

        let resp = self.http.delete(url).send().await?;
        self.handle_empty(resp).await
    }

    // ── Response handling ────────────────────────────────────────────

    async fn handle_response<T: DeserializeOwned>(
        &self,
        resp: reqwest::Response,
    ) -> Result<T, Error> {
        let status = resp.status();
        if status.is_success() {
            let body = resp.text().await?;
            serde_json::from_str(&body).map_err(|e| {
                let preview: String = body.chars().take(200).collect();
                Error::Deserialization {
                    message: format!("{e} (body preview: {preview:?})"),
                    body,
                }
            })
        } else {
            Err(self.parse_error(status, resp).await)
        }
    }

    async fn handle_empty(&self, resp: reqwest::Response) -> Result<(), Error> {
        let status = resp.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(self.parse_error(status, resp).await)
        }
    }

    async fn parse_error(&self, status: reqwest::StatusCode, resp: reqwest::Response) -> Error {
        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Error::Unauthorized;
        }

        let raw = resp.text().await.unwrap_or_default();

        let message = match serde_json::from_str::<ErrorResponse>(&raw) {
            Ok(err) => err
                .message
                .or(err.error)
                .unwrap_or_else(|| status.to_string()),
            Err(_) if raw.is_empty() => status.to_string(),
            Err(_) => raw,
        };

        Error::Http {
            status: status.as_u16(),
            message,
        }
    }

    // ━━ Public API ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

    pub async fn create<T: DeserializeOwned, B: Serialize + Sync>(
        &self,
        payload: &B,
    ) -> Result<T, Error> {
        self.post(self.collection_url(), payload).await
    }

    pub async fn list_all<T: DeserializeOwned>(&self) -> Result<Vec<T>, Error> {
        self.get(self.collection_url()).await
    }

    pub async fn list_page<T: DeserializeOwned>(&self, page: u64) -> Result<Page<T>, Error> {
        self.get(self.url(&format!("page/{page}"))?).await
    }

    pub async fn get_by_id<T: DeserializeOwned>(&self, id: i64) -> Result<T, Error> {
        self.get(self.url(&id.to_string())?).await
    }

    pub async fn update<T: DeserializeOwned, B: Serialize + Sync>(
        &self,
        id: i64,
        payload: &B,
    ) -> Result<T, Error> {
        self.put(self.url(&id.to_string())?, payload).await
    }

    pub async fn delete(&self, id: i64) -> Result<(), Error> {
        self.delete_at(self.url(&id.to_string())?).await
    }

    pub async fn search<T: DeserializeOwned, F: Serialize>(
        &self,
        filters: &F,
    ) -> Result<Vec<T>, Error> {
        let params = search_params(filters)?;
        self.get_with_params(self.url("search")?, &params).await
    }

    pub async fn search_page<T: DeserializeOwned, F: Serialize>(
        &self,
        page: u64,
        filters: &F,
    ) -> Result<Page<T>, Error> {
        let params = search_params(filters)?;
        self.get_with_params(self.url(&format!("search/page/{page}"))?, &params)
            .await
    }

    /// Raw aggregate counts. The payload shape is resource specific.
    pub async fn count(&self) -> Result<Value, Error> {
        self.get(self.url("count")?).await
    }

    /// Change an item's status; returns the status the backend settled on.
    pub async fn change_status(&self, id: i64, status: &str) -> Result<String, Error> {
        let resp: StatusResponse = self
            .patch(self.url(&format!("{id}/status"))?, &status)
            .await?;
        Ok(resp.status)
    }
}

// ── Search query building ────────────────────────────────────────────

/// Flatten a filter object into query parameters.
///
/// Entries that are absent, `null`, or `""` are dropped; everything else is
/// string-coerced (booleans become `"true"` / `"false"`).
pub fn search_params<F: Serialize + ?Sized>(filters: &F) -> Result<Vec<(String, String)>, Error> {
    let value = serde_json::to_value(filters).map_err(|e| Error::InvalidFilters(e.to_string()))?;
    let map = match value {
        Value::Object(map) => map,
        Value::Null => return Ok(Vec::new()),
        other => {
            return Err(Error::InvalidFilters(format!(
                "expected an object, got {other}"
            )));
        }
    };

    Ok(map
        .into_iter()
        .filter_map(|(key, value)| query_value(&value).map(|v| (key, v)))
        .collect())
}

fn query_value(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(format_number(n)),
        other => Some(other.to_string()),
    }
}

/// Query-string form of a JSON number. Whole floats inside the exactly
/// representable integer range drop their fraction (`25000.0` → `"25000"`).
#[allow(
    clippy::cast_possible_truncation,
    clippy::as_conversions,
    clippy::float_cmp
)]
pub fn format_number(n: &serde_json::Number) -> String {
    if n.is_i64() || n.is_u64() {
        return n.to_string();
    }
    match n.as_f64() {
        Some(f) if f.fract() == 0.0 && f.abs() < 9_007_199_254_740_992.0 => (f as i64).to_string(),
        _ => n.to_string(),
    }
}
