//! The HTTP seam: everything above it deals in [`HttpRequest`] and
//! [`HttpResponse`], so it can be decorated (retry) or faked (tests).

use std::fmt;
use std::sync::Arc;

use futures::future::BoxFuture;
use tracing::{debug, info, instrument};

use crate::config::ClientConfig;
use crate::error::{Error, ErrorKind, Result};
use crate::request::{HttpRequest, HttpResponse};

/// Sends one request and reads the whole response.
///
/// A non-2xx status is a successful send; interpreting it is up to the caller.
pub trait HttpSender: Send + Sync + fmt::Debug {
    fn send(&self, request: HttpRequest) -> BoxFuture<'_, Result<HttpResponse>>;
}

impl<S: HttpSender + ?Sized> HttpSender for Arc<S> {
    fn send(&self, request: HttpRequest) -> BoxFuture<'_, Result<HttpResponse>> {
        (**self).send(request)
    }
}

impl<S: HttpSender + ?Sized> HttpSender for Box<S> {
    fn send(&self, request: HttpRequest) -> BoxFuture<'_, Result<HttpResponse>> {
        (**self).send(request)
    }
}

/// [`HttpSender`] backed by a pooled `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct ReqwestSender {
    inner: reqwest::Client,
    config: ClientConfig,
}

impl ReqwestSender {
    pub fn new(config: ClientConfig) -> Result<Self> {
        let inner = reqwest::Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .pool_idle_timeout(config.pool_idle_timeout)
            .pool_max_idle_per_host(config.pool_max_idle_per_host)
            .user_agent(&config.user_agent)
            .gzip(true)
            .deflate(true)
            .build()
            .map_err(|e| Error::with_source(ErrorKind::Config(e.to_string()), e))?;

        Ok(Self { inner, config })
    }

    /// Get the client configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    #[instrument(skip(self, request), fields(method = ?request.method, url = %request.url))]
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse> {
        let mut req = self
            .inner
            .request(request.method.to_reqwest(), &request.url);

        for (name, value) in &request.headers {
            req = req.header(name.as_str(), value.as_str());
        }

        if let Some(body) = request.body {
            req = req.body(body);
        }

        if self.config.enable_tracing {
            debug!("Sending request");
        }

        let response = req.send().await?;
        let status = response.status();

        if self.config.enable_tracing {
            let content_length = response.content_length();
            if status.is_success() {
                debug!(status = status.as_u16(), content_length, "Response received");
            } else {
                info!(status = status.as_u16(), content_length, "Non-success response");
            }
        }

        // Reading the body can fail with a connection reset too.
        let body = response.text().await?;

        Ok(HttpResponse {
            status: status.as_u16(),
            reason: status.canonical_reason().unwrap_or_default().to_string(),
            body,
        })
    }
}

impl HttpSender for ReqwestSender {
    fn send(&self, request: HttpRequest) -> BoxFuture<'_, Result<HttpResponse>> {
        Box::pin(self.execute(request))
    }
}
