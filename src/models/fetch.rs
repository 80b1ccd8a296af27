//! Fetch values exchanged between the host and the worker.
//!
//! A [`Request`] is what the host hands to the worker's fetch handler; a
//! [`Response`] is what comes back, tagged with where it was served from.

use axum::http::Method;
use serde::Serialize;
use url::Url;

// == Destination ==
/// What the request is for, as reported by `Sec-Fetch-Dest`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Destination {
    /// Full-page navigation
    Document,
    Style,
    Script,
    Image,
    Font,
    Manifest,
    /// Anything else, including `fetch()`/XHR calls
    #[default]
    Empty,
}

impl Destination {
    /// Maps a `Sec-Fetch-Dest` header value. Unknown values map to `Empty`.
    pub fn from_fetch_dest(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "document" | "iframe" | "frame" => Destination::Document,
            "style" => Destination::Style,
            "script" | "worker" | "sharedworker" | "serviceworker" => Destination::Script,
            "image" => Destination::Image,
            "font" => Destination::Font,
            "manifest" => Destination::Manifest,
            _ => Destination::Empty,
        }
    }

    /// Returns true for navigation requests.
    pub fn is_document(&self) -> bool {
        matches!(self, Destination::Document)
    }
}

// == Request ==
/// A request seen by the worker's fetch handler.
#[derive(Debug, Clone)]
pub struct Request {
    pub method: Method,
    pub url: Url,
    pub destination: Destination,
    /// Headers forwarded on pass-through or network fetches
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl Request {
    /// Creates a bodiless GET request for a sub-resource.
    pub fn get(url: Url) -> Self {
        Self::new(Method::GET, url)
    }

    /// Creates a bodiless GET navigation request.
    pub fn navigate(url: Url) -> Self {
        Self::get(url).with_destination(Destination::Document)
    }

    pub fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            destination: Destination::Empty,
            headers: Vec::new(),
            body: Vec::new(),
        }
    }

    pub fn with_destination(mut self, destination: Destination) -> Self {
        self.destination = destination;
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    pub fn is_get(&self) -> bool {
        self.method == Method::GET
    }
}

// == Response Source ==
/// Where a response handed back to the page came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseSource {
    Cache,
    Network,
    /// Synthesized by the worker while offline
    Offline,
}

impl ResponseSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResponseSource::Cache => "cache",
            ResponseSource::Network => "network",
            ResponseSource::Offline => "offline",
        }
    }
}

// == Response ==
/// A response produced by the worker or the network.
#[derive(Debug, Clone)]
pub struct Response {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
    pub source: ResponseSource,
}

impl Response {
    /// Creates a network response.
    pub fn network(status: u16, headers: Vec<(String, String)>, body: Vec<u8>) -> Self {
        Self {
            status,
            headers,
            body,
            source: ResponseSource::Network,
        }
    }

    /// Creates the synthetic `503 Service Unavailable` offline response.
    pub fn offline(message: &str) -> Self {
        Self {
            status: 503,
            headers: vec![(
                "content-type".to_string(),
                "text/plain; charset=utf-8".to_string(),
            )],
            body: message.as_bytes().to_vec(),
            source: ResponseSource::Offline,
        }
    }

    /// Returns true for 2xx statuses.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Looks up a header value, ignoring case.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}
