// Async HTTP client for the presence add-on REST API.
//
// Base path: detected or configured ingress prefix, then /api/
// Errors:    { "error": { "message": ..., "code": ... } }

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use crate::error::{Error, UNKNOWN_ERROR_CODE};
use crate::ingress::BasePath;
use crate::transport::TransportConfig;
use crate::types::HealthStatus;

// ── Error response shape ─────────────────────────────────────────────

#[derive(serde::Deserialize)]
struct ErrorEnvelope {
    #[serde(default)]
    error: Option<ErrorBody>,
}

#[derive(serde::Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    code: Option<String>,
}

// ── Client ───────────────────────────────────────────────────────────

/// Async client for the presence add-on.
///
/// Every request path is prefixed with the ingress [`BasePath`], so the
/// same client works against the add-on port directly and through a Home
/// Assistant ingress URL.
#[derive(Debug, Clone)]
pub struct PresenceClient {
    http: reqwest::Client,
    origin: Url,
    base_path: BasePath,
}

impl PresenceClient {
    // ── Constructors ─────────────────────────────────────────────────

    /// Build from a server URL, explicit base path, and transport config.
    pub fn new(
        server: &str,
        base_path: BasePath,
        transport: &TransportConfig,
    ) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Self::from_reqwest(server, base_path, http)
    }

    /// Build from a dashboard URL, detecting the base path from its route.
    pub fn from_dashboard_url(url: &str, transport: &TransportConfig) -> Result<Self, Error> {
        let parsed = Url::parse(url)?;
        let (origin, base_path) = BasePath::from_dashboard_url(&parsed);
        let http = transport.build_client()?;
        Ok(Self {
            http,
            origin,
            base_path,
        })
    }

    /// Wrap an existing `reqwest::Client` (caller manages headers).
    pub fn from_reqwest(
        server: &str,
        base_path: BasePath,
        http: reqwest::Client,
    ) -> Result<Self, Error> {
        let mut origin = Url::parse(server)?;
        if origin.cannot_be_a_base() {
            return Err(Error::CannotBeABase(server.to_owned()));
        }
        origin.set_path("/");
        Ok(Self {
            http,
            origin,
            base_path,
        })
    }

    pub fn origin(&self) -> &Url {
        &self.origin
    }

    pub fn base_path(&self) -> &BasePath {
        &self.base_path
    }

    // ── URL builders ─────────────────────────────────────────────────

    /// Resolve a raw absolute path (`/healthz`) under the base path.
    pub(crate) fn url_for_path(&self, path: &str) -> Result<Url, Error> {
        Ok(self.origin.join(&self.base_path.join(path))?)
    }

    /// Build `{base}/api/{segments...}`, percent-encoding each segment.
    pub(crate) fn api_url(&self, segments: &[&str]) -> Result<Url, Error> {
        let mut url = self.url_for_path("/api")?;
        url.path_segments_mut()
            .map_err(|()| Error::CannotBeABase(self.origin.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    // ── HTTP verbs ───────────────────────────────────────────────────

    pub(crate) async fn get<T: DeserializeOwned>(&self, url: Url) -> Result<T, Error> {
        debug!("GET {url}");

        let resp = self.http.get(url).send().await?;
        self.handle_response(resp).await
    }

    pub(crate) async fn get_with_params<T: DeserializeOwned>(
        &self,
        url: Url,
        params: &[(&str, String)],
    ) -> Result<T, Error> {
        debug!("GET {url} params={params:?}");

        let resp = self.http.get(url).query(params).send().await?;
        self.handle_response(resp).await
    }

    pub(crate) async fn post<T: DeserializeOwned, B: Serialize + Sync>(
        &self,
        url: Url,
        body: &B,
    ) -> Result<T, Error> {
        debug!("POST {url}");

        let resp = self.http.post(url).json(body).send().await?;
        self.handle_response(resp).await
    }

    pub(crate) async fn put<T: DeserializeOwned, B: Serialize + Sync>(
        &self,
        url: Url,
        body: &B,
    ) -> Result<T, Error> {
        debug!("PUT {url}");

        let resp = self.http.put(url).json(body).send().await?;
        self.handle_response(resp).await
    }

    pub(crate) async fn patch<T: DeserializeOwned, B: Serialize + Sync>(
        &self,
        url: Url,
        body: &B,
    ) -> Result<T, Error> {
        debug!("PATCH {url}");

        let resp = self.http.patch(url).json(body).send().await?;
        self.handle_response(resp).await
    }

    pub(crate) async fn delete(&self, url: Url) -> Result<(), Error> {
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

    #[allow(clippy::unused_self)]
    async fn parse_error(&self, status: reqwest::StatusCode, resp: reqwest::Response) -> Error {
        let raw = resp.text().await.unwrap_or_default();
        let body = serde_json::from_str::<ErrorEnvelope>(&raw)
            .ok()
            .and_then(|envelope| envelope.error);

        let message = body
            .as_ref()
            .and_then(|b| b.message.clone())
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| format!("Request failed with status {}", status.as_u16()));
        let code = body
            .and_then(|b| b.code)
            .filter(|c| !c.is_empty())
            .unwrap_or_else(|| UNKNOWN_ERROR_CODE.to_owned());

        Error::Api {
            message,
            code,
            status: status.as_u16(),
        }
    }

    // ── Health ───────────────────────────────────────────────────────

    /// `GET /healthz`: liveness plus whether the router integration is set up.
    pub async fn health(&self) -> Result<HealthStatus, Error> {
        let url = self.url_for_path("/healthz")?;
        self.get(url).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(server: &str, base: &str) -> PresenceClient {
        PresenceClient::from_reqwest(server, BasePath::new(base), reqwest::Client::new())
            .expect("client should build")
    }

    #[test]
    fn api_url_on_root_base() {
        let c = client("http://localhost:8099", "/");
        let url = c.api_url(&["devices"]).expect("url");
        assert_eq!(url.as_str(), "http://localhost:8099/api/devices");
    }

    #[test]
    fn api_url_under_ingress_base() {
        let c = client("http://ha.local:8123/ignored/path", "/api/hassio_ingress/tok");
        let url = c.api_url(&["devices", "AA:BB", "register"]).expect("url");
        assert_eq!(
            url.as_str(),
            "http://ha.local:8123/api/hassio_ingress/tok/api/devices/AA:BB/register"
        );
    }

    #[test]
    fn api_url_encodes_segments() {
        let c = client("http://localhost:8099", "/");
        let url = c.api_url(&["automation", "capabilities", "a/b c"]).expect("url");
        assert_eq!(
            url.as_str(),
            "http://localhost:8099/api/automation/capabilities/a%2Fb%20c"
        );
    }

    #[test]
    fn health_url_is_under_base() {
        let c = client("http://localhost:8099", "/ingress");
        let url = c.url_for_path("/healthz").expect("url");
        assert_eq!(url.as_str(), "http://localhost:8099/ingress/healthz");
    }

    #[test]
    fn dashboard_url_detects_base() {
        let c = PresenceClient::from_dashboard_url(
            "http://ha.local:8123/api/hassio_ingress/tok/automation/capabilities",
            &TransportConfig::default(),
        )
        .expect("client");
        assert_eq!(c.base_path().as_str(), "/api/hassio_ingress/tok");
        assert_eq!(c.origin().as_str(), "http://ha.local:8123/");
    }

    #[test]
    fn non_base_urls_are_rejected() {
        let result =
            PresenceClient::from_reqwest("mailto:a@b.c", BasePath::root(), reqwest::Client::new());
        assert!(matches!(result, Err(Error::CannotBeABase(_))));
    }
}
