//! Parsed client descriptors and the small value types they are made of.

use std::any::TypeId;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::container::Container;
use crate::transport::RequestInterceptor;

/// How much of each HTTP exchange the client logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// No logging.
    #[default]
    None,
    /// Request method and URL, response status and elapsed time.
    Basic,
    /// `Basic` plus request and response headers.
    Headers,
    /// `Headers` plus request and response bodies.
    Full,
}

impl LogLevel {
    pub fn includes_headers(self) -> bool {
        matches!(self, LogLevel::Headers | LogLevel::Full)
    }

    pub fn includes_body(self) -> bool {
        self == LogLevel::Full
    }
}

/// A header as written on the declaration. The value may contain `${...}` placeholders.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeaderMarker {
    pub key: &'static str,
    pub value: &'static str,
}

impl HeaderMarker {
    pub const fn new(key: &'static str, value: &'static str) -> Self {
        Self { key, value }
    }
}

/// An owned header pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderAttr {
    pub key: String,
    pub value: String,
}

impl HeaderAttr {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

type InterceptorLookup = fn(&Container) -> Option<Arc<dyn RequestInterceptor>>;
type InterceptorCtor = fn() -> Arc<dyn RequestInterceptor>;

/// Opaque reference to a [`RequestInterceptor`] type.
///
/// Built in const context so it can sit inside a static declaration. Resolving it
/// prefers an instance registered in the [`Container`] and falls back to `Default`.
#[derive(Clone, Copy)]
pub struct InterceptorRef {
    type_id: fn() -> TypeId,
    type_name: fn() -> &'static str,
    lookup: InterceptorLookup,
    instantiate: InterceptorCtor,
}

impl InterceptorRef {
    pub const fn of<I>() -> Self
    where
        I: RequestInterceptor + Default + 'static,
    {
        Self {
            type_id: TypeId::of::<I>,
            type_name: std::any::type_name::<I>,
            lookup: lookup_registered::<I>,
            instantiate: instantiate_default::<I>,
        }
    }

    pub fn type_id(&self) -> TypeId {
        (self.type_id)()
    }

    pub fn type_name(&self) -> &'static str {
        (self.type_name)()
    }

    /// Look up an instance of the referenced type in the container.
    pub fn lookup(&self, container: &Container) -> Option<Arc<dyn RequestInterceptor>> {
        (self.lookup)(container)
    }

    /// Construct a fresh instance through the type's `Default` impl.
    pub fn instantiate(&self) -> Arc<dyn RequestInterceptor> {
        (self.instantiate)()
    }
}

impl fmt::Debug for InterceptorRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("InterceptorRef")
            .field(&self.type_name())
            .finish()
    }
}

impl PartialEq for InterceptorRef {
    fn eq(&self, other: &Self) -> bool {
        self.type_id() == other.type_id()
    }
}

fn lookup_registered<I>(container: &Container) -> Option<Arc<dyn RequestInterceptor>>
where
    I: RequestInterceptor + 'static,
{
    container
        .lookup::<I>()
        .map(|found| found as Arc<dyn RequestInterceptor>)
}

fn instantiate_default<I>() -> Arc<dyn RequestInterceptor>
where
    I: RequestInterceptor + Default + 'static,
{
    Arc::new(I::default())
}

/// Structured form of one declared API client.
///
/// Created once per declaration during scanning and shared read-only afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientDescriptor {
    /// Base URL; may still contain placeholders.
    pub url: String,
    /// Headers injected on every request, in declaration order.
    pub headers: Vec<HeaderAttr>,
    /// Interceptor types, without duplicates.
    pub interceptors: Vec<InterceptorRef>,
    pub log_level: LogLevel,
    /// Treat 404 responses as an empty result instead of an error.
    pub decode_404: bool,
    pub username: Option<String>,
    pub password: Option<String>,
    pub read_timeout_ms: u64,
    /// Maximum number of attempts per call.
    pub retry_times: u32,
}

impl ClientDescriptor {
    /// Both credentials, or nothing when either one is missing.
    pub fn credentials(&self) -> Option<(&str, &str)> {
        match (self.username.as_deref(), self.password.as_deref()) {
            (Some(user), Some(pass)) => Some((user, pass)),
            _ => None,
        }
    }
}
