use std::sync::Arc;
use std::time::Duration;

use super::client::HttpClient;
use super::codec::JsonCodec;
use super::interceptor::{BasicAuthInterceptor, RequestInterceptor};
use super::logger::LoggerKind;
use super::retry::RetryPolicy;
use crate::descriptor::LogLevel;
use crate::error::HttpError;

/// Snapshot of what a builder has been configured with.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientOptions {
    pub connect_timeout: Duration,
    pub read_timeout: Duration,
    pub retry: RetryPolicy,
    pub logger: LoggerKind,
    pub log_level: LogLevel,
    pub decode_404: bool,
    pub basic_auth: bool,
    /// Number of installed request interceptors, basic auth included.
    pub interceptors: usize,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            read_timeout: Duration::from_secs(60),
            retry: RetryPolicy::default(),
            logger: LoggerKind::NoOp,
            log_level: LogLevel::None,
            decode_404: false,
            basic_auth: false,
            interceptors: 0,
        }
    }
}

/// Configures and creates an [`HttpClient`].
///
/// One builder is owned by exactly one construction; nothing in it is shared.
#[derive(Clone, Default)]
pub struct HttpClientBuilder {
    name: Option<String>,
    options: ClientOptions,
    codec: JsonCodec,
    interceptors: Vec<Arc<dyn RequestInterceptor>>,
}

impl HttpClientBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Label used in exchange logs. Defaults to the target URL.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn timeouts(mut self, connect: Duration, read: Duration) -> Self {
        self.options.connect_timeout = connect;
        self.options.read_timeout = read;
        self
    }

    pub fn retry(mut self, policy: RetryPolicy) -> Self {
        self.options.retry = policy;
        self
    }

    pub fn codec(mut self, codec: JsonCodec) -> Self {
        self.codec = codec;
        self
    }

    pub fn logger(mut self, logger: LoggerKind) -> Self {
        self.options.logger = logger;
        self
    }

    pub fn log_level(mut self, level: LogLevel) -> Self {
        self.options.log_level = level;
        self
    }

    /// Treat 404 responses as empty results.
    pub fn decode_404(mut self) -> Self {
        self.options.decode_404 = true;
        self
    }

    pub fn request_interceptor(mut self, interceptor: Arc<dyn RequestInterceptor>) -> Self {
        self.interceptors.push(interceptor);
        self.options.interceptors = self.interceptors.len();
        self
    }

    pub fn basic_auth(self, username: &str, password: &str) -> Self {
        let mut builder =
            self.request_interceptor(Arc::new(BasicAuthInterceptor::new(username, password)));
        builder.options.basic_auth = true;
        builder
    }

    pub fn options(&self) -> &ClientOptions {
        &self.options
    }

    /// Create a client bound to `url`.
    pub fn target(self, url: impl Into<String>) -> Result<HttpClient, HttpError> {
        let url = url.into();
        let http = reqwest::Client::builder()
            .connect_timeout(self.options.connect_timeout)
            .read_timeout(self.options.read_timeout)
            .build()
            .map_err(HttpError::Build)?;
        let name = self.name.unwrap_or_else(|| url.clone());

        tracing::debug!(
            client = %name,
            url = %url,
            connect_timeout_ms = self.options.connect_timeout.as_millis() as u64,
            read_timeout_ms = self.options.read_timeout.as_millis() as u64,
            max_attempts = self.options.retry.max_attempts,
            interceptors = self.interceptors.len(),
            "HTTP client created"
        );

        Ok(HttpClient::new(
            http,
            name,
            url,
            self.options,
            self.codec,
            self.interceptors,
        ))
    }
}
