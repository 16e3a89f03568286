//! HTTP exchange logging.
//!
//! [`LoggerKind`] chooses the sink, [`LogLevel`] chooses how much of each exchange is
//! written. Everything goes through `tracing` under the `apikit::http` target.

use std::time::Duration;

use http::{HeaderMap, Method, StatusCode};
use serde::{Deserialize, Serialize};

use super::request::RequestTemplate;
use crate::descriptor::LogLevel;

/// Sink for HTTP exchange logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoggerKind {
    /// Discards everything.
    #[default]
    #[serde(alias = "NoOpLogger", alias = "noop")]
    NoOp,
    /// Regular diagnostic output at debug level.
    #[serde(alias = "JavaLogger")]
    Basic,
    /// Error-level output.
    #[serde(alias = "ErrorLogger")]
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Line {
    Debug,
    Error,
}

/// Writes request and response lines according to a sink and a verbosity.
#[derive(Debug, Clone, Copy, Default)]
pub struct HttpLogger {
    kind: LoggerKind,
    level: LogLevel,
}

impl HttpLogger {
    pub fn new(kind: LoggerKind, level: LogLevel) -> Self {
        Self { kind, level }
    }

    pub fn is_enabled(&self) -> bool {
        self.kind != LoggerKind::NoOp && self.level != LogLevel::None
    }

    fn line(&self) -> Option<Line> {
        if !self.is_enabled() {
            return None;
        }
        match self.kind {
            LoggerKind::NoOp => None,
            LoggerKind::Basic => Some(Line::Debug),
            LoggerKind::Error => Some(Line::Error),
        }
    }

    fn emit(&self, message: &str) {
        match self.line() {
            Some(Line::Debug) => tracing::debug!(target: "apikit::http", "{message}"),
            Some(Line::Error) => tracing::error!(target: "apikit::http", "{message}"),
            None => {}
        }
    }

    pub fn log_request(&self, api: &str, url: &str, template: &RequestTemplate) {
        if self.line().is_none() {
            return;
        }
        self.emit(&format!("[{api}] ---> {} {url}", template.method()));
        if self.level.includes_headers() {
            for (key, value) in template.headers() {
                self.emit(&format!("[{api}] {key}: {value}"));
            }
        }
        if self.level.includes_body() {
            if let Some(body) = template.body() {
                self.emit(&format!("[{api}] {}", String::from_utf8_lossy(body)));
            }
        }
        if self.level.includes_headers() {
            let bytes = template.body().map_or(0, |b| b.len());
            self.emit(&format!("[{api}] ---> END HTTP ({bytes}-byte body)"));
        }
    }

    pub fn log_response(
        &self,
        api: &str,
        status: StatusCode,
        headers: &HeaderMap,
        body: &[u8],
        elapsed: Duration,
    ) {
        if self.line().is_none() {
            return;
        }
        self.emit(&format!(
            "[{api}] <--- HTTP {status} ({}ms)",
            elapsed.as_millis()
        ));
        if self.level.includes_headers() {
            for (key, value) in headers {
                self.emit(&format!(
                    "[{api}] {key}: {}",
                    value.to_str().unwrap_or("<binary>")
                ));
            }
        }
        if self.level.includes_body() && !body.is_empty() {
            self.emit(&format!("[{api}] {}", String::from_utf8_lossy(body)));
        }
        if self.level.includes_headers() {
            self.emit(&format!("[{api}] <--- END HTTP ({}-byte body)", body.len()));
        }
    }

    pub fn log_io_error(
        &self,
        api: &str,
        method: &Method,
        url: &str,
        error: &dyn std::error::Error,
        elapsed: Duration,
    ) {
        self.emit(&format!(
            "[{api}] <--- ERROR {method} {url}: {error} ({}ms)",
            elapsed.as_millis()
        ));
    }

    pub fn log_retry(&self, api: &str, attempt: u32, wait: Duration) {
        self.emit(&format!(
            "[{api}] ---> RETRYING (attempt {attempt}, after {}ms)",
            wait.as_millis()
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn logger_kind_accepts_legacy_names() {
        let parsed: Vec<LoggerKind> =
            serde_json::from_str(r#"["no_op", "NoOpLogger", "JavaLogger", "basic", "ErrorLogger"]"#)
                .unwrap();
        assert_eq!(
            parsed,
            vec![
                LoggerKind::NoOp,
                LoggerKind::NoOp,
                LoggerKind::Basic,
                LoggerKind::Basic,
                LoggerKind::Error
            ]
        );
    }

    #[test]
    fn disabled_unless_both_sink_and_level_are_set() {
        assert!(!HttpLogger::new(LoggerKind::NoOp, LogLevel::Full).is_enabled());
        assert!(!HttpLogger::new(LoggerKind::Basic, LogLevel::None).is_enabled());
        assert!(HttpLogger::new(LoggerKind::Error, LogLevel::Basic).is_enabled());
    }
}
