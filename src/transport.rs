//! HTTP transport seam.
//!
//! [`Transport`] is the one place requests leave the process. The chat
//! client is generic over it, so tests drive it with scripted responses and
//! the binary stacks [`LoggingTransport`] on top of [`ReqwestTransport`] to
//! mirror every exchange into the devtools buffer.

use std::future::Future;

use tracing::debug;

use crate::config::ClientConfig;
use crate::devtools::{Devtools, LogArg, LogLevel};
use crate::error::{MeshError, Result};

pub const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Method::Get => write!(f, "GET"),
            Method::Post => write!(f, "POST"),
        }
    }
}

/// A request against the gateway, addressed by path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: Method,
    pub path: String,
    /// Form-encoded body; POST only.
    pub body: Option<String>,
}

impl HttpRequest {
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            path: path.into(),
            body: None,
        }
    }

    pub fn post_form(path: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            method: Method::Post,
            path: path.into(),
            body: Some(body.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Executes requests against the gateway.
///
/// A resolved `Ok` means the gateway answered, whatever the status;
/// `Err` means it never did.
pub trait Transport: Send + Sync + 'static {
    fn execute(&self, request: HttpRequest) -> impl Future<Output = Result<HttpResponse>> + Send;
}

/// `reqwest`-backed transport aimed at a gateway base URL.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    base_url: String,
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(config: &ClientConfig) -> Self {
        // reqwest::Client::builder() can fail in extreme environments, but
        // unwrap_or_default() falls back to a default client instead of panicking.
        let client = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout())
            .timeout(config.request_timeout())
            .build()
            .unwrap_or_default();
        Self {
            base_url: config.base_url().to_string(),
            client,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn url_for(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

impl Transport for ReqwestTransport {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse> {
        let url = self.url_for(&request.path);
        let builder = match request.method {
            Method::Get => self.client.get(&url),
            Method::Post => self
                .client
                .post(&url)
                .header(reqwest::header::CONTENT_TYPE, FORM_CONTENT_TYPE)
                .body(request.body.unwrap_or_default()),
        };

        let resp = builder.send().await.map_err(|e| MeshError::Connect {
            url: url.clone(),
            detail: e.to_string(),
        })?;
        let status = resp.status().as_u16();
        let body = resp.bytes().await.map_err(|e| MeshError::Connect {
            url: url.clone(),
            detail: e.to_string(),
        })?;

        debug!(method = %request.method, %url, status, bytes = body.len(), "gateway responded");
        Ok(HttpResponse::new(status, body.to_vec()))
    }
}

/// Decorator that records every resolved request into the devtools buffer.
///
/// Entries read `fetch <METHOD> <path> <status>`. Transport errors pass
/// through unrecorded, and a failure to record never reaches the caller.
#[derive(Debug, Clone)]
pub struct LoggingTransport<T> {
    inner: T,
    devtools: Devtools,
}

impl<T> LoggingTransport<T> {
    pub fn new(inner: T, devtools: Devtools) -> Self {
        Self { inner, devtools }
    }

    pub fn inner(&self) -> &T {
        &self.inner
    }
}

impl<T: Transport> Transport for LoggingTransport<T> {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse> {
        let target = format!("{} {}", request.method, request.path);
        let response = self.inner.execute(request).await?;
        let _ = self.devtools.record(
            LogLevel::Log,
            &[LogArg::text("fetch"), LogArg::text(target), LogArg::json(&response.status)],
        );
        Ok(response)
    }
}
