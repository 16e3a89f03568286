//! Error taxonomy of the declarative client pipeline.
//!
//! Parse and scan errors surface eagerly at startup; build errors surface on the
//! first lookup of a client; transport errors surface per call.

use bytes::Bytes;
use http::{Method, StatusCode};
use thiserror::Error;

/// Malformed declarative metadata on one API declaration.
///
/// Aborts the registration of that declaration only.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("api client '{api}': url must not be blank")]
    BlankUrl { api: String },
    #[error("api client '{api}': header #{index} has a blank key")]
    BlankHeaderKey { api: String, index: usize },
    #[error("api client '{api}': header '{key}' has a blank value")]
    BlankHeaderValue { api: String, key: String },
    #[error("api client '{api}': read_timeout must be greater than zero")]
    InvalidReadTimeout { api: String },
}

/// Invalid scan settings. Aborts the whole scan.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    #[error("api client scan: base_packages (or value) must not be empty")]
    EmptyBasePackages,
    #[error("api client scan: required setting '{0}' is missing")]
    MissingField(&'static str),
}

/// A client factory was asked to build without its required inputs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InitializationError {
    #[error("client factory for '{api}': descriptor is not set, please check your configuration")]
    MissingDescriptor { api: &'static str },
    #[error(
        "client factory for '{api}': client manager reference is not set, \
         please check your configuration"
    )]
    MissingManagerRef { api: &'static str },
    #[error("client factory for '{api}': client manager '{name}' is not registered")]
    ManagerNotFound { api: &'static str, name: String },
}

/// Failures of the HTTP transport.
#[derive(Debug, Error)]
pub enum HttpError {
    #[error("failed to build HTTP client")]
    Build(#[source] reqwest::Error),
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("{method} {url} failed")]
    Transport {
        method: Method,
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{method} {url} returned status {status}")]
    Status {
        method: Method,
        url: String,
        status: StatusCode,
        body: Bytes,
    },
    #[error("failed to encode request body")]
    Encode(#[source] serde_json::Error),
    #[error("failed to decode response body")]
    Decode(#[source] serde_json::Error),
}

impl HttpError {
    /// HTTP status of a non-success response, if that is what failed.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            HttpError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Transport failures (no response received) are the only retryable errors.
    pub fn is_retryable(&self) -> bool {
        matches!(self, HttpError::Transport { .. })
    }
}

/// Errors returned by [`crate::Container`] lookups.
#[derive(Debug, Error)]
pub enum ContainerError {
    #[error("nothing is registered for '{type_name}'")]
    NotRegistered { type_name: &'static str },
    #[error("client factory for '{api}' produced an instance of an unexpected type")]
    TypeMismatch { api: &'static str },
    #[error(transparent)]
    Initialization(#[from] InitializationError),
    #[error("failed to construct client '{api}'")]
    Build {
        api: &'static str,
        #[source]
        source: HttpError,
    },
}
