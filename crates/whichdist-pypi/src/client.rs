//! HTTP client for the simple repository API.

use crate::parse::{
    parse_file_listing_html, parse_file_listing_json, parse_project_list_html,
    parse_project_list_json, version_from_filename, ArtifactLink,
};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, USER_AGENT};
use reqwest::StatusCode;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, trace};
use url::Url;
use whichdist_core::{DistName, ImportName, VersionString};
use whichdist_sync::{BoxFuture, FetchError, FetchResult, MetadataFetcher};

/// The public PyPI simple index.
pub const DEFAULT_INDEX_URL: &str = "https://pypi.org/simple/";

const ACCEPT_SIMPLE: &str = "application/vnd.pypi.simple.v1+json, text/html;q=0.1";

/// Configuration for [`SimpleIndexClient`].
#[derive(Debug, Clone)]
pub struct SimpleIndexConfig {
    /// Simple index base URL (trailing slash significant for URL joins).
    pub base_url: Url,
    /// TCP connect timeout.
    pub connect_timeout: Duration,
    /// Whole-request timeout.
    pub total_timeout: Duration,
    /// User agent sent with every request.
    pub user_agent: String,
}

impl Default for SimpleIndexConfig {
    fn default() -> Self {
        Self {
            base_url: Url::parse(DEFAULT_INDEX_URL).expect("default index url is valid"),
            connect_timeout: Duration::from_secs(10),
            total_timeout: Duration::from_secs(60),
            user_agent: format!("whichdist/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl SimpleIndexConfig {
    /// Config for a non-default index base URL.
    pub fn with_base_url(url: &str) -> Result<Self, FetchError> {
        let mut base = Url::parse(url)
            .map_err(|e| FetchError::malformed(format!("invalid index url '{url}': {e}")))?;
        if !base.path().ends_with('/') {
            base.set_path(&format!("{}/", base.path()));
        }
        Ok(Self {
            base_url: base,
            ..Self::default()
        })
    }
}

/// Inspection failure for a downloaded artifact.
#[derive(Error, Debug)]
#[error("artifact inspection failed: {message}")]
pub struct InspectError {
    /// Error message.
    pub message: String,
}

impl InspectError {
    /// Create a new inspection error.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Static introspection of a downloaded artifact's top-level import names.
///
/// Implementations must never execute code from the payload. The client
/// downloads; the inspector (supplied by the embedding application) reads
/// `top_level.txt`/`RECORD` or whatever its format knows.
pub trait ArtifactInspector: Send + Sync {
    /// The top-level import names the artifact provides.
    fn provided_names(
        &self,
        filename: &str,
        payload: &[u8],
    ) -> Result<BTreeSet<ImportName>, InspectError>;
}

/// Client for a PEP 503/691 simple repository.
pub struct SimpleIndexClient {
    client: reqwest::Client,
    config: SimpleIndexConfig,
    inspector: Arc<dyn ArtifactInspector>,
}

impl std::fmt::Debug for SimpleIndexClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimpleIndexClient")
            .field("base_url", &self.config.base_url.as_str())
            .finish()
    }
}

impl SimpleIndexClient {
    /// Create a client.
    pub fn new(
        config: SimpleIndexConfig,
        inspector: Arc<dyn ArtifactInspector>,
    ) -> Result<Self, FetchError> {
        let mut headers = HeaderMap::new();
        if let Ok(ua) = HeaderValue::from_str(&config.user_agent) {
            headers.insert(USER_AGENT, ua);
        }

        let client = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.total_timeout)
            .gzip(true)
            .deflate(true)
            .default_headers(headers)
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()
            .map_err(|e| FetchError::transient(format!("building http client: {e}")))?;

        Ok(Self {
            client,
            config,
            inspector,
        })
    }

    /// The configured base URL.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.config.base_url
    }

    fn project_url(&self, name: &DistName) -> FetchResult<Url> {
        self.config
            .base_url
            .join(&format!("{}/", name.as_str()))
            .map_err(|e| FetchError::malformed(format!("project url for '{name}': {e}")))
    }

    /// GET a listing page; returns the body and whether it is the JSON form.
    async fn get_listing(&self, url: Url) -> FetchResult<(Vec<u8>, bool)> {
        trace!(url = %url, "GET simple listing");
        let response = self
            .client
            .get(url.clone())
            .header(ACCEPT, ACCEPT_SIMPLE)
            .send()
            .await
            .map_err(classify_reqwest_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(classify_status(status, &url));
        }

        let is_json = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.contains("json"));

        let body = response
            .bytes()
            .await
            .map_err(classify_reqwest_error)?
            .to_vec();
        Ok((body, is_json))
    }

    async fn artifact_links(&self, name: &DistName) -> FetchResult<Vec<ArtifactLink>> {
        let url = self.project_url(name)?;
        let (body, is_json) = self.get_listing(url.clone()).await?;
        if is_json {
            parse_file_listing_json(&body)
        } else {
            let text = String::from_utf8(body)
                .map_err(|e| FetchError::malformed(format!("listing for '{name}': {e}")))?;
            Ok(parse_file_listing_html(&text, &url))
        }
    }

    async fn download(&self, link: &ArtifactLink) -> FetchResult<Vec<u8>> {
        let url = Url::parse(&link.url)
            .map_err(|e| FetchError::malformed(format!("artifact url '{}': {e}", link.url)))?;
        debug!(url = %url, "downloading artifact");
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(classify_reqwest_error)?;
        let status = response.status();
        if !status.is_success() {
            return Err(classify_status(status, &url));
        }
        Ok(response
            .bytes()
            .await
            .map_err(classify_reqwest_error)?
            .to_vec())
    }
}

impl MetadataFetcher for SimpleIndexClient {
    fn list_distributions(&self) -> BoxFuture<'_, FetchResult<Vec<DistName>>> {
        Box::pin(async move {
            let url = self.config.base_url.clone();
            let (body, is_json) = self.get_listing(url).await?;
            if is_json {
                parse_project_list_json(&body)
            } else {
                let text = String::from_utf8(body)
                    .map_err(|e| FetchError::malformed(format!("project list: {e}")))?;
                Ok(parse_project_list_html(&text))
            }
        })
    }

    fn list_versions<'a>(
        &'a self,
        name: &'a DistName,
        include_prereleases: bool,
    ) -> BoxFuture<'a, FetchResult<Vec<VersionString>>> {
        Box::pin(async move {
            let links = self.artifact_links(name).await?;
            let mut versions: Vec<VersionString> = links
                .iter()
                .filter_map(|link| version_from_filename(name, &link.filename))
                .filter(|v| include_prereleases || !v.is_prerelease())
                .collect();
            versions.sort();
            versions.dedup();
            debug!(name = %name, versions = versions.len(), "listed versions");
            Ok(versions)
        })
    }

    fn fetch_provided_names<'a>(
        &'a self,
        name: &'a DistName,
        version: &'a VersionString,
    ) -> BoxFuture<'a, FetchResult<BTreeSet<ImportName>>> {
        Box::pin(async move {
            let links = self.artifact_links(name).await?;
            let mut matching: Vec<&ArtifactLink> = links
                .iter()
                .filter(|link| {
                    version_from_filename(name, &link.filename).as_ref() == Some(version)
                })
                .collect();
            // Wheels are cheap to introspect statically; prefer them.
            matching.sort_by_key(|link| !link.is_wheel());
            let Some(link) = matching.first() else {
                return Err(FetchError::NotFound);
            };

            let payload = self.download(link).await?;
            self.inspector
                .provided_names(&link.filename, &payload)
                .map_err(|e| FetchError::malformed(e.to_string()))
        })
    }
}

fn classify_status(status: StatusCode, url: &Url) -> FetchError {
    match status {
        StatusCode::NOT_FOUND | StatusCode::GONE => FetchError::NotFound,
        StatusCode::TOO_MANY_REQUESTS | StatusCode::REQUEST_TIMEOUT => {
            FetchError::transient(format!("HTTP {status} from {url}"))
        }
        s if s.is_server_error() => FetchError::transient(format!("HTTP {s} from {url}")),
        s => FetchError::malformed(format!("unexpected HTTP {s} from {url}")),
    }
}

fn classify_reqwest_error(err: reqwest::Error) -> FetchError {
    if err.is_timeout() || err.is_connect() || err.is_request() {
        FetchError::transient(err.to_string())
    } else if err.is_decode() || err.is_body() {
        FetchError::malformed(err.to_string())
    } else {
        FetchError::transient(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NullInspector;

    impl ArtifactInspector for NullInspector {
        fn provided_names(
            &self,
            _filename: &str,
            _payload: &[u8],
        ) -> Result<BTreeSet<ImportName>, InspectError> {
            Ok(BTreeSet::new())
        }
    }

    #[test]
    fn client_creation() {
        let client = SimpleIndexClient::new(SimpleIndexConfig::default(), Arc::new(NullInspector));
        assert!(client.is_ok());
    }

    #[test]
    fn base_url_gets_trailing_slash() {
        let config = SimpleIndexConfig::with_base_url("https://mirror.example/simple").unwrap();
        assert_eq!(config.base_url.as_str(), "https://mirror.example/simple/");
    }

    #[test]
    fn project_url_join() {
        let client =
            SimpleIndexClient::new(SimpleIndexConfig::default(), Arc::new(NullInspector)).unwrap();
        let url = client.project_url(&DistName::new("ruamel.yaml")).unwrap();
        assert_eq!(url.as_str(), "https://pypi.org/simple/ruamel-yaml/");
    }

    #[test]
    fn status_classification() {
        let url = Url::parse("https://pypi.org/simple/x/").unwrap();
        assert!(matches!(
            classify_status(StatusCode::NOT_FOUND, &url),
            FetchError::NotFound
        ));
        assert!(classify_status(StatusCode::SERVICE_UNAVAILABLE, &url).is_retryable());
        assert!(classify_status(StatusCode::TOO_MANY_REQUESTS, &url).is_retryable());
        assert!(!classify_status(StatusCode::FORBIDDEN, &url).is_retryable());
    }
}
