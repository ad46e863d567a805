use std::time::Duration;

use rand::prelude::IndexedRandom;
use reqwest::header::{HeaderMap, USER_AGENT};
use reqwest::{redirect, Client, ClientBuilder, Proxy};

use super::HttpRequest;

/// HTTP transport for POC probes.
///
/// Holds two reqwest clients that differ only in redirect policy; a rule's
/// `follow_redirects` flag selects which one performs the exchange, so
/// exactly one response is ever handed back per rule (the first hop when the
/// flag is off, the final destination when it is on).
pub struct HttpClient {
    following: Client,
    first_hop: Client,
    user_agents: Vec<&'static str>,
    default_timeout: Duration,
}

impl HttpClient {
    pub fn new(timeout_seconds: u64, proxy_url: Option<&str>) -> Self {
        let timeout = Duration::from_secs(timeout_seconds);
        let following = build_client(timeout, proxy_url, redirect::Policy::limited(10));
        let first_hop = build_client(timeout, proxy_url, redirect::Policy::none());

        // Browser-like User-Agent pool, injected only when a rule's template
        // carries none of its own.
        let user_agents = vec![
            "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
             (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
            "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:120.0) \
             Gecko/20100101 Firefox/120.0",
            "Mozilla/5.0 (Macintosh; Intel Mac OS X 13_0) AppleWebKit/605.1.15 \
             (KHTML, like Gecko) Version/17.0 Safari/605.1.15",
        ];

        Self {
            following,
            first_hop,
            user_agents,
            default_timeout: timeout,
        }
    }

    /// Sends the request and returns the response parts the evaluator needs:
    /// status, headers, and raw body bytes. No retries; the fixed timeout is
    /// the only bound.
    pub async fn execute(
        &self,
        req: &HttpRequest,
    ) -> Result<(u16, HeaderMap, Vec<u8>), reqwest::Error> {
        let client = if req.follow_redirects {
            &self.following
        } else {
            &self.first_hop
        };

        let mut builder = client.request(req.method.clone(), req.url.as_str());

        for (name, value) in req.headers.iter() {
            builder = builder.header(name, value);
        }

        if !req.headers.contains_key(USER_AGENT) {
            builder = builder.header(USER_AGENT, self.random_user_agent());
        }

        if !req.body.is_empty() {
            builder = builder.body(req.body.clone());
        }

        builder = builder.timeout(self.default_timeout);

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let headers = response.headers().clone();
        let body = response.bytes().await?.to_vec();

        Ok((status, headers, body))
    }

    fn random_user_agent(&self) -> &'static str {
        let mut rng = rand::rng();
        *self.user_agents.choose(&mut rng).unwrap_or(&"Mozilla/5.0")
    }
}

fn build_client(timeout: Duration, proxy_url: Option<&str>, policy: redirect::Policy) -> Client {
    let mut builder = ClientBuilder::new()
        .timeout(timeout)
        .redirect(policy)
        .danger_accept_invalid_certs(true);

    if let Some(proxy) = proxy_url {
        if let Ok(p) = Proxy::all(proxy) {
            builder = builder.proxy(p);
        }
    }

    builder.build().expect("failed to build reqwest client")
}
