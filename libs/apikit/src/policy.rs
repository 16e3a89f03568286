//! The shared client policy: timeouts, retry, codec, logger and optional basic auth.

use std::time::Duration;

use crate::transport::{HttpClientBuilder, JsonCodec, LoggerKind, RetryPolicy};

pub const DEFAULT_READ_TIMEOUT_MS: u64 = 30_000;
pub const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 10_000;
pub const DEFAULT_RETRY_TIMES: u32 = 3;
pub const RETRY_PERIOD_MS: u64 = 100;
pub const RETRY_MAX_PERIOD_MS: u64 = 10_000;

/// Definition name the scanner expects the [`ClientManager`] under, unless configured otherwise.
pub const DEFAULT_MANAGER_DEF: &str = "apiClientManager";

/// Produces pre-configured [`HttpClientBuilder`]s.
///
/// Stateless apart from the codec; registered once in the container and shared by
/// every client factory.
#[derive(Debug, Clone, Default)]
pub struct ClientManager {
    codec: JsonCodec,
}

impl ClientManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// A builder with the connect timeout, the given read timeout, retry policy,
    /// JSON codec and logger sink. Basic auth is installed only when both
    /// credentials are present.
    pub fn compose(
        &self,
        read_timeout_ms: u64,
        retry_times: u32,
        username: Option<&str>,
        password: Option<&str>,
        logger: LoggerKind,
    ) -> HttpClientBuilder {
        let builder = HttpClientBuilder::new()
            .logger(logger)
            .timeouts(
                Duration::from_millis(DEFAULT_CONNECT_TIMEOUT_MS),
                Duration::from_millis(read_timeout_ms),
            )
            .retry(RetryPolicy::new(
                Duration::from_millis(RETRY_PERIOD_MS),
                Duration::from_millis(RETRY_MAX_PERIOD_MS),
                retry_times,
            ))
            .codec(self.codec);

        match (username, password) {
            (Some(user), Some(pass)) => builder.basic_auth(user, pass),
            _ => builder,
        }
    }

    pub fn default_builder(&self) -> HttpClientBuilder {
        self.compose(DEFAULT_READ_TIMEOUT_MS, DEFAULT_RETRY_TIMES, None, None, LoggerKind::NoOp)
    }

    pub fn builder_with_read_timeout(&self, read_timeout_ms: u64) -> HttpClientBuilder {
        self.compose(read_timeout_ms, DEFAULT_RETRY_TIMES, None, None, LoggerKind::NoOp)
    }

    pub fn builder_with_basic_auth(&self, username: &str, password: &str) -> HttpClientBuilder {
        self.compose(
            DEFAULT_READ_TIMEOUT_MS,
            DEFAULT_RETRY_TIMES,
            Some(username),
            Some(password),
            LoggerKind::NoOp,
        )
    }
}
