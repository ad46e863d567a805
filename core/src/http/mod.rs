pub mod client;

pub use client::HttpClient;

use std::collections::HashMap;

use anyhow::Context;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use reqwest::Method;
use url::Url;

use crate::poc::RequestTemplate;

/// A fully built probe request, ready for the transport layer.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: String,
    /// Whether the transport should chase redirects or hand back the
    /// first-hop response.
    pub follow_redirects: bool,
}

impl HttpRequest {
    /// Builds a request from a rule's template against the target base URL.
    /// The template path is appended to the target as written in the POC
    /// (paths are absolute, starting with `/`).
    pub fn from_template(template: &RequestTemplate, target_url: &str) -> anyhow::Result<Self> {
        let full_url = format!("{}{}", target_url, template.path);
        let url = Url::parse(&full_url)
            .with_context(|| format!("invalid request URL: {}", full_url))?;

        let method = if template.method.is_empty() {
            Method::GET
        } else {
            Method::from_bytes(template.method.as_bytes())
                .with_context(|| format!("invalid method: {}", template.method))?
        };

        let mut headers = HeaderMap::new();
        for (key, value) in &template.headers {
            let name = HeaderName::from_bytes(key.as_bytes())
                .with_context(|| format!("invalid header name: {}", key))?;
            let value = HeaderValue::from_str(value)
                .with_context(|| format!("invalid value for header {}", key))?;
            headers.insert(name, value);
        }

        Ok(Self {
            method,
            url,
            headers,
            body: template.body.clone(),
            follow_redirects: template.follow_redirects,
        })
    }
}

/// Normalized view of an HTTP response, the record the expression evaluator
/// consumes.
///
/// Header names are lowercased; multi-valued headers are joined with a single
/// space in arrival order. The body is decoded losslessly (invalid UTF-8 is
/// replaced, never rejected).
#[derive(Debug, Clone)]
pub struct ResponseView {
    pub status: u16,
    pub headers: HashMap<String, String>,
    pub body: String,
    /// First `Content-Type` value, or empty when the header is absent.
    pub content_type: String,
}

impl ResponseView {
    /// Builds the view from already-extracted response parts. Never fails,
    /// and never touches the transport's response object.
    pub fn from_parts(status: u16, headers: &HeaderMap, body: &[u8]) -> Self {
        let mut map = HashMap::new();
        for name in headers.keys() {
            // HeaderName::as_str is already lowercase.
            let joined = headers
                .get_all(name)
                .iter()
                .map(|value| String::from_utf8_lossy(value.as_bytes()))
                .collect::<Vec<_>>()
                .join(" ");
            map.insert(name.as_str().to_string(), joined);
        }

        let content_type = headers
            .get(CONTENT_TYPE)
            .map(|value| String::from_utf8_lossy(value.as_bytes()).into_owned())
            .unwrap_or_default();

        Self {
            status,
            headers: map,
            body: String::from_utf8_lossy(body).into_owned(),
            content_type,
        }
    }

    /// Case-insensitive header lookup, returning the joined value.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_lowercase()).map(String::as_str)
    }

    /// The condition language's `body_string` alias of `body`.
    pub fn body_string(&self) -> &str {
        &self.body
    }
}
