use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::FetchError;

/// Header set on responses that were answered from the data store.
pub const SERVED_BY_HEADER: &str = "x-served-by";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Destination {
    Document,
    Image,
    Script,
    Style,
    Font,
    Manifest,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RequestMode {
    Navigate,
    Cors,
    SameOrigin,
    NoCors,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub url: Url,
    pub method: String,
    pub destination: Destination,
    pub mode: RequestMode,
}

impl Request {
    /// GET request for `target`, resolved against `origin` when relative.
    pub fn get(origin: &Url, target: &str) -> Result<Self, FetchError> {
        let url = origin
            .join(target)
            .map_err(|e| FetchError::InvalidUrl(format!("{}: {}", target, e)))?;
        Ok(Self {
            url,
            method: "GET".to_string(),
            destination: Destination::Other,
            mode: RequestMode::Cors,
        })
    }

    pub fn navigate(origin: &Url, target: &str) -> Result<Self, FetchError> {
        Ok(Self {
            destination: Destination::Document,
            mode: RequestMode::Navigate,
            ..Self::get(origin, target)?
        })
    }

    pub fn with_destination(mut self, destination: Destination) -> Self {
        self.destination = destination;
        self
    }

    pub fn with_method(mut self, method: &str) -> Self {
        self.method = method.to_ascii_uppercase();
        self
    }

    pub fn is_get(&self) -> bool {
        self.method == "GET"
    }

    pub fn is_navigation(&self) -> bool {
        self.mode == RequestMode::Navigate || self.destination == Destination::Document
    }

    /// Store key: absolute URL without fragment.
    pub fn key(&self) -> String {
        cache_key(&self.url)
    }
}

pub fn cache_key(url: &Url) -> String {
    let mut url = url.clone();
    url.set_fragment(None);
    url.to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
    pub status: u16,
    pub status_text: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl Response {
    pub fn new(status: u16, status_text: &str, content_type: &str, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            status_text: status_text.to_string(),
            headers: vec![("content-type".to_string(), content_type.to_string())],
            body: body.into(),
        }
    }

    pub fn ok(content_type: &str, body: impl Into<Vec<u8>>) -> Self {
        Self::new(200, "OK", content_type, body)
    }

    /// Data path: network failed and nothing was cached.
    pub fn unavailable() -> Self {
        Self::new(
            503,
            "Service Unavailable",
            "text/plain; charset=utf-8",
            "داده در دسترس نیست",
        )
    }

    pub fn placeholder_image() -> Self {
        Self::ok(
            "image/svg+xml",
            r##"<svg width="200" height="200" xmlns="http://www.w3.org/2000/svg"><rect width="100%" height="100%" fill="#1a1a2e"/><text x="50%" y="50%" text-anchor="middle" fill="#58a6ff">تصویر در دسترس نیست</text></svg>"##,
        )
    }

    pub fn timeout() -> Self {
        Self::new(
            408,
            "Request Timeout",
            "text/plain; charset=utf-8",
            "منبع در دسترس نیست",
        )
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.retain(|(k, _)| !k.eq_ignore_ascii_case(name));
        self.headers.push((name.to_ascii_lowercase(), value.to_string()));
        self
    }

    pub fn served_from_cache(&self) -> bool {
        self.header(SERVED_BY_HEADER) == Some("cache")
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}
