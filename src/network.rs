//! Network access for the worker.
//!
//! [`Fetcher`] stands in for the platform `fetch`: it either produces a
//! response (whatever its status) or fails with [`WorkerError::Network`].

use async_trait::async_trait;
use tracing::debug;

use crate::error::{Result, WorkerError};
use crate::models::{Request, Response};

/// Request headers that describe the client connection rather than the request.
const HOP_BY_HOP: &[&str] = &[
    "connection",
    "content-length",
    "host",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

/// Returns true if `name` must not be forwarded between connections.
pub fn is_hop_by_hop(name: &str) -> bool {
    HOP_BY_HOP.iter().any(|h| h.eq_ignore_ascii_case(name))
}

// == Fetcher Trait ==
/// Performs a live network request.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, request: &Request) -> Result<Response>;
}

// == HTTP Fetcher ==
/// [`Fetcher`] backed by a shared `reqwest` client.
///
/// Redirects are not followed: a 3xx reaches the caller with its `Location`
/// and `Set-Cookie` headers intact.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new() -> Result<Self> {
        let client = Self::client_builder()
            .build()
            .map_err(|e| WorkerError::Internal(format!("Building HTTP client: {}", e)))?;
        Ok(Self { client })
    }

    /// Client settings the fetcher expects; extend them and pass the client
    /// to [`HttpFetcher::with_client`].
    pub fn client_builder() -> reqwest::ClientBuilder {
        reqwest::Client::builder().redirect(reqwest::redirect::Policy::none())
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, request: &Request) -> Result<Response> {
        debug!("Network fetch {} {}", request.method, request.url);

        let mut builder = self
            .client
            .request(request.method.clone(), request.url.clone());
        for (name, value) in &request.headers {
            if !is_hop_by_hop(name) {
                builder = builder.header(name.as_str(), value.as_str());
            }
        }
        if !request.body.is_empty() {
            builder = builder.body(request.body.clone());
        }

        let response = builder
            .send()
            .await
            .map_err(|e| WorkerError::Network(format!("{} {}: {}", request.method, request.url, e)))?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter(|(name, _)| !is_hop_by_hop(name.as_str()))
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        let body = response
            .bytes()
            .await
            .map_err(|e| WorkerError::Network(format!("Reading body of {}: {}", request.url, e)))?
            .to_vec();

        Ok(Response::network(status, headers, body))
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hop_by_hop_headers() {
        assert!(is_hop_by_hop("Host"));
        assert!(is_hop_by_hop("transfer-encoding"));
        assert!(!is_hop_by_hop("content-type"));
        assert!(!is_hop_by_hop("cookie"));
    }

    #[tokio::test]
    async fn test_unreachable_host_is_network_error() {
        let fetcher = HttpFetcher::new().unwrap();
        // Port 9 (discard) on loopback is closed in test environments.
        let request = Request::get(url::Url::parse("http://127.0.0.1:9/").unwrap());
        let result = fetcher.fetch(&request).await;
        assert!(matches!(result, Err(WorkerError::Network(_))));
    }
}
