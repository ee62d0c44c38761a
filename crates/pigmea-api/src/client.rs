// Async HTTP client for the shop backend's REST resources.
//
// Base path: /api/
// Resources: clientes, vendedores, pedidos
// Auth: x-user-id / x-user-role headers, optional bearer token

use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use crate::Error;
use crate::transport::TransportConfig;

// ── Response shapes ──────────────────────────────────────────────────

/// Error body returned by the backend: `{"message": "..."}` or `{"error": "..."}`.
#[derive(Deserialize)]
struct ErrorResponse {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// Some endpoints wrap their payload in `{"data": ...}`, others return it bare.
#[derive(Deserialize)]
#[serde(untagged)]
enum Envelope<T> {
    Wrapped { data: T },
    Bare(T),
}

impl<T> Envelope<T> {
    fn into_inner(self) -> T {
        match self {
            Self::Wrapped { data } | Self::Bare(data) => data,
        }
    }
}

#[derive(Deserialize)]
struct ExistsResponse {
    exists: bool,
}

// ── Client ───────────────────────────────────────────────────────────

/// Async client for the backend's `/api/{resource}` endpoints.
///
/// Resource-agnostic: callers pass the resource name (`"clientes"`,
/// `"vendedores"`, `"pedidos"`) and the record type to decode into.
#[derive(Debug, Clone)]
pub struct BackendClient {
    http: reqwest::Client,
    base_url: Url,
}

impl BackendClient {
    // ── Constructors ─────────────────────────────────────────────────

    /// Build from a backend URL and transport config.
    ///
    /// Identity and token headers from `transport` are sent on every request.
    pub fn new(base_url: &str, transport: &TransportConfig) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Self::from_reqwest(base_url, http)
    }

    /// Wrap an existing `reqwest::Client` (caller manages headers).
    pub fn from_reqwest(base_url: &str, http: reqwest::Client) -> Result<Self, Error> {
        let base_url = Self::normalize_base_url(base_url)?;
        Ok(Self { http, base_url })
    }

    /// Ensure the base URL ends in `/api/` so resource paths join cleanly.
    ///
    /// `http://host:8080` and `http://host:8080/api` both become
    /// `http://host:8080/api/`.
    fn normalize_base_url(raw: &str) -> Result<Url, Error> {
        let mut url = Url::parse(raw)?;
        let path = url.path().trim_end_matches('/').to_owned();

        if path.ends_with("/api") {
            url.set_path(&format!("{path}/"));
        } else {
            url.set_path(&format!("{path}/api/"));
        }

        Ok(url)
    }

    /// The normalized `/api/` base this client talks to.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    // ── URL builder ──────────────────────────────────────────────────

    fn url(&self, path: &str) -> Result<Url, Error> {
        Ok(self.base_url.join(path)?)
    }

    fn record_path(resource: &str, id: &str) -> String {
        format!("{resource}/{}", urlencode_segment(id))
    }

    // ── Resource operations ──────────────────────────────────────────

    /// `GET /api/{resource}`: the full collection.
    pub async fn list<T: DeserializeOwned>(&self, resource: &str) -> Result<Vec<T>, Error> {
        let envelope: Envelope<Vec<T>> = self.get(resource).await?;
        Ok(envelope.into_inner())
    }

    /// `POST /api/{resource}`: create a record, returning the stored version.
    pub async fn create<T: DeserializeOwned, B: Serialize + Sync>(
        &self,
        resource: &str,
        body: &B,
    ) -> Result<T, Error> {
        let envelope: Envelope<T> = self.post(resource, body).await?;
        Ok(envelope.into_inner())
    }

    /// `PUT /api/{resource}/{id}`: apply a patch, returning the stored version.
    pub async fn update<T: DeserializeOwned, B: Serialize + Sync>(
        &self,
        resource: &str,
        id: &str,
        body: &B,
    ) -> Result<T, Error> {
        let envelope: Envelope<T> = self.put(&Self::record_path(resource, id), body).await?;
        Ok(envelope.into_inner())
    }

    /// `DELETE /api/{resource}/{id}`: hard delete.
    pub async fn remove(&self, resource: &str, id: &str) -> Result<(), Error> {
        self.delete(&Self::record_path(resource, id)).await
    }

    /// `POST /api/{resource}/{id}/archive`: soft delete, returning the archived record.
    pub async fn archive<T: DeserializeOwned>(&self, resource: &str, id: &str) -> Result<T, Error> {
        let path = format!("{}/archive", Self::record_path(resource, id));
        let envelope: Envelope<T> = self.post(&path, &serde_json::json!({})).await?;
        Ok(envelope.into_inner())
    }

    /// `GET /api/{resource}/exists?{field}={value}`: uniqueness probe.
    pub async fn exists(&self, resource: &str, field: &str, value: &str) -> Result<bool, Error> {
        let url = self.url(&format!("{resource}/exists"))?;
        debug!("GET {url} {field}={value:?}");

        let resp = self.http.get(url).query(&[(field, value)]).send().await?;
        let body: ExistsResponse = Self::handle_response(resp).await?;
        Ok(body.exists)
    }

    // ── HTTP verbs ───────────────────────────────────────────────────

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, Error> {
        let url = self.url(path)?;
        debug!("GET {url}");

        let resp = self.http.get(url).send().await?;
        Self::handle_response(resp).await
    }

    async fn post<T: DeserializeOwned, B: Serialize + Sync>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, Error> {
        let url = self.url(path)?;
        debug!("POST {url}");

        let resp = self.http.post(url).json(body).send().await?;
        Self::handle_response(resp).await
    }

    async fn put<T: DeserializeOwned, B: Serialize + Sync>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, Error> {
        let url = self.url(path)?;
        debug!("PUT {url}");

        let resp = self.http.put(url).json(body).send().await?;
        Self::handle_response(resp).await
    }

    async fn delete(&self, path: &str) -> Result<(), Error> {
        let url = self.url(path)?;
        debug!("DELETE {url}");

        let resp = self.http.delete(url).send().await?;
        let status = resp.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(Self::parse_error(path, status, resp).await)
        }
    }

    // ── Response handling ────────────────────────────────────────────

    async fn handle_response<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, Error> {
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
            let path = resp.url().path().to_owned();
            Err(Self::parse_error(&path, status, resp).await)
        }
    }

    async fn parse_error(path: &str, status: StatusCode, resp: reqwest::Response) -> Error {
        let raw = resp.text().await.unwrap_or_default();

        let message = serde_json::from_str::<ErrorResponse>(&raw)
            .ok()
            .and_then(|err| err.message.or(err.error))
            .unwrap_or_else(|| {
                if raw.is_empty() {
                    status.to_string()
                } else {
                    raw
                }
            });

        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Error::Unauthorized { message },
            StatusCode::NOT_FOUND => Error::NotFound {
                path: path.to_owned(),
            },
            StatusCode::CONFLICT => Error::Conflict { message },
            _ => Error::Http {
                status: status.as_u16(),
                message,
            },
        }
    }
}

/// Percent-encode characters that would break out of a single path segment.
fn urlencode_segment(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '/' => out.push_str("%2F"),
            '?' => out.push_str("%3F"),
            '#' => out.push_str("%23"),
            '%' => out.push_str("%25"),
            ' ' => out.push_str("%20"),
            _ => out.push(ch),
        }
    }
    out
}
