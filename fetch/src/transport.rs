use crate::config::RequestConfig;
use async_trait::async_trait;
use error::FetchError;
use indexmap::IndexMap;
use reqwest::Client;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;
use util::KeyValueStore;

/// Store key the auth token is kept under.
pub const TOKEN_KEY: &str = "token";

/// GET capable client, resolves with the (possibly absent) body or fails.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn get(
        &self,
        url: &str,
        config: &RequestConfig,
    ) -> Result<Option<serde_json::Value>, FetchError>;
}

pub struct HttpTransport {
    client: Client,
    base: Option<Url>,
    store: Option<Arc<dyn KeyValueStore>>,
}

impl HttpTransport {
    /// Transport resolving relative paths against `base_url`.
    ///
    /// Relative paths are joined like links, so a base which should keep its
    /// last path segment needs a trailing slash.
    pub fn new(base_url: &str) -> Result<Self, FetchError> {
        Self::configured(base_url, None, &IndexMap::new())
    }

    pub fn configured(
        base_url: &str,
        timeout: Option<Duration>,
        headers: &IndexMap<String, String>,
    ) -> Result<Self, FetchError> {
        let base = Url::parse(base_url)
            .map_err(|err| FetchError::Config(format!("invalid base url {base_url}: {err}")))?;

        let mut builder = Client::builder().default_headers(header_map(headers)?);
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|err| FetchError::Config(err.to_string()))?;

        Ok(HttpTransport {
            client,
            base: Some(base),
            store: None,
        })
    }

    /// Transport without base, every path has to be absolute.
    pub fn with_client(client: Client) -> Self {
        HttpTransport {
            client,
            base: None,
            store: None,
        }
    }

    /// Reads the bearer token from `store` on every request.
    pub fn with_store(mut self, store: Arc<dyn KeyValueStore>) -> Self {
        self.store = Some(store);
        self
    }

    fn resolve(&self, url: &str) -> Result<Url, FetchError> {
        match Url::parse(url) {
            Ok(url) => Ok(url),
            Err(url::ParseError::RelativeUrlWithoutBase) => match &self.base {
                Some(base) => base
                    .join(url)
                    .map_err(|err| FetchError::network(format!("invalid path {url}: {err}"))),
                None => Err(FetchError::network(format!(
                    "relative path {url} without base url"
                ))),
            },
            Err(err) => Err(FetchError::network(format!("invalid url {url}: {err}"))),
        }
    }

    fn token(&self, config: &RequestConfig) -> Option<String> {
        config.bearer.clone().or_else(|| {
            self.store
                .as_ref()
                .and_then(|store| store.get(TOKEN_KEY))
                .filter(|token| !token.is_empty())
        })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get(
        &self,
        url: &str,
        config: &RequestConfig,
    ) -> Result<Option<serde_json::Value>, FetchError> {
        let url = self.resolve(url)?;
        debug!("GET {}", url);

        let mut request = self.client.get(url).headers(header_map(&config.headers)?);
        if let Some(timeout) = config.timeout {
            request = request.timeout(timeout);
        }
        if let Some(token) = self.token(config) {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(transport_error)?;
        let status = response.status();
        let body = response.bytes().await.map_err(transport_error)?;

        if !status.is_success() {
            let message = remote_message(&body)
                .or_else(|| status.canonical_reason().map(String::from));
            warn!("request failed with {}: {:?}", status, message);
            return Err(FetchError::remote(status.as_u16(), message));
        }

        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(None);
        }

        match serde_json::from_slice::<serde_json::Value>(&body)? {
            serde_json::Value::Null => Ok(None),
            value => Ok(Some(value)),
        }
    }
}

fn header_map(headers: &IndexMap<String, String>) -> Result<HeaderMap, FetchError> {
    let mut map = HeaderMap::with_capacity(headers.len());
    for (key, value) in headers {
        let name = HeaderName::from_bytes(key.as_bytes())
            .map_err(|err| FetchError::Config(format!("invalid header {key}: {err}")))?;
        let value = HeaderValue::from_str(value)
            .map_err(|err| FetchError::Config(format!("invalid header value for {key}: {err}")))?;
        map.insert(name, value);
    }
    Ok(map)
}

fn transport_error(err: reqwest::Error) -> FetchError {
    if err.is_timeout() {
        FetchError::network("request timed out")
    } else if err.is_connect() {
        FetchError::network(format!("could not connect: {err}"))
    } else {
        FetchError::network(err.to_string())
    }
}

/// Message an error response carries, json `message`/`title`/`error` fields or short plain text.
fn remote_message(body: &[u8]) -> Option<String> {
    if let Ok(value) = serde_json::from_slice::<serde_json::Value>(body) {
        return ["message", "title", "error"]
            .iter()
            .find_map(|key| value.get(key).and_then(|v| v.as_str()))
            .map(String::from);
    }

    let text = String::from_utf8_lossy(body);
    let text = text.trim();
    if text.is_empty() || text.len() > 200 {
        None
    } else {
        Some(text.to_string())
    }
}

#[cfg(test)]
mod tests {
    use crate::config::RequestConfig;
    use crate::transport::{HttpTransport, TOKEN_KEY, Transport, remote_message};
    use axum::Router;
    use axum::extract::RawQuery;
    use axum::http::{HeaderMap, StatusCode};
    use axum::response::IntoResponse;
    use axum::routing::get;
    use error::FetchError;
    use indexmap::IndexMap;
    use serde_json::json;
    use std::sync::Arc;
    use tokio::net::TcpListener;
    use tracing_test::traced_test;
    use util::{KeyValueStore, MemoryStore};

    async fn serve() -> String {
        let app = Router::new()
            .route(
                "/api/products",
                get(|RawQuery(query): RawQuery| async move {
                    axum::Json(json!({"query": query, "items": [{"id": "p1"}]}))
                }),
            )
            .route(
                "/api/whoami",
                get(|headers: HeaderMap| async move {
                    let auth = headers
                        .get("authorization")
                        .and_then(|v| v.to_str().ok())
                        .map(String::from);
                    let shop = headers
                        .get("x-shop")
                        .and_then(|v| v.to_str().ok())
                        .map(String::from);
                    axum::Json(json!({"authorization": auth, "shop": shop}))
                }),
            )
            .route("/api/empty", get(|| async { StatusCode::NO_CONTENT }))
            .route(
                "/api/missing",
                get(|| async {
                    (
                        StatusCode::NOT_FOUND,
                        axum::Json(json!({"message": "Product not found"})),
                    )
                        .into_response()
                }),
            )
            .route(
                "/api/broken",
                get(|| async { StatusCode::INTERNAL_SERVER_ERROR }),
            );

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}/api/")
    }

    #[tokio::test]
    #[traced_test]
    async fn resolves_relative_path() {
        let transport = HttpTransport::new(&serve().await).unwrap();

        let body = transport
            .get("products?PageSize=4&Filter.CategoryId=c1", &RequestConfig::new())
            .await
            .unwrap()
            .unwrap();

        assert_eq!(body["query"], json!("PageSize=4&Filter.CategoryId=c1"));
        assert_eq!(body["items"][0]["id"], json!("p1"));
    }

    #[tokio::test]
    #[traced_test]
    async fn empty_body_is_none() {
        let transport = HttpTransport::new(&serve().await).unwrap();
        let body = transport.get("empty", &RequestConfig::new()).await.unwrap();
        assert_eq!(body, None);
    }

    #[tokio::test]
    #[traced_test]
    async fn remote_failure_message() {
        let transport = HttpTransport::new(&serve().await).unwrap();

        let err = transport
            .get("missing", &RequestConfig::new())
            .await
            .unwrap_err();
        assert_eq!(
            err,
            FetchError::remote(404, Some(String::from("Product not found")))
        );
        assert_eq!(err.message(), "Product not found");

        let err = transport
            .get("broken", &RequestConfig::new())
            .await
            .unwrap_err();
        assert_eq!(
            err,
            FetchError::remote(500, Some(String::from("Internal Server Error")))
        );
    }

    #[tokio::test]
    #[traced_test]
    async fn token_from_store() {
        let store = Arc::new(MemoryStore::new());
        store.set(TOKEN_KEY, String::from("secret")).unwrap();

        let transport = HttpTransport::new(&serve().await)
            .unwrap()
            .with_store(store);

        let body = transport
            .get("whoami", &RequestConfig::new().header("X-Shop", "bakery"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(body["authorization"], json!("Bearer secret"));
        assert_eq!(body["shop"], json!("bakery"));

        let body = transport
            .get("whoami", &RequestConfig::new().bearer("override"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(body["authorization"], json!("Bearer override"));
    }

    #[tokio::test]
    #[traced_test]
    async fn connection_refused() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let transport = HttpTransport::new(&format!("http://{addr}/")).unwrap();
        let err = transport
            .get("products", &RequestConfig::new())
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Network(_)));
    }

    #[tokio::test]
    async fn relative_without_base() {
        let transport = HttpTransport::with_client(reqwest::Client::new());
        let err = transport
            .get("products", &RequestConfig::new())
            .await
            .unwrap_err();
        assert!(err.message().contains("without base url"));
    }

    #[test]
    fn invalid_base() {
        let err = HttpTransport::new("not a url").err().unwrap();
        assert!(matches!(err, FetchError::Config(_)));
    }

    #[tokio::test]
    #[traced_test]
    async fn invalid_header_is_config() {
        let transport = HttpTransport::new(&serve().await).unwrap();

        let err = transport
            .get("products", &RequestConfig::new().header("X Shop", "bakery"))
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Config(_)));
        assert!(err.message().contains("invalid header X Shop"));

        let mut headers = IndexMap::new();
        headers.insert(String::from("X-Shop"), String::from("line
break"));
        let err = HttpTransport::configured("http://localhost/", None, &headers)
            .err()
            .unwrap();
        assert!(matches!(err, FetchError::Config(_)));
    }

    #[test]
    fn messages() {
        assert_eq!(
            remote_message(br#"{"title": "Bad Request"}"#),
            Some(String::from("Bad Request"))
        );
        assert_eq!(remote_message(br#"{"code": 3}"#), None);
        assert_eq!(remote_message(b"  out of stock "), Some(String::from("out of stock")));
        assert_eq!(remote_message(b""), None);
    }
}
