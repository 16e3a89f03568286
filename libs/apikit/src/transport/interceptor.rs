use std::fmt;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use http::header::AUTHORIZATION;

use super::request::RequestTemplate;
use crate::descriptor::HeaderAttr;

/// Hook run against every outgoing request, in installation order.
pub trait RequestInterceptor: Send + Sync {
    fn apply(&self, template: &mut RequestTemplate);
}

/// Adapts a closure into a [`RequestInterceptor`].
pub struct FnInterceptor<F>(F);

impl<F> RequestInterceptor for FnInterceptor<F>
where
    F: Fn(&mut RequestTemplate) + Send + Sync,
{
    fn apply(&self, template: &mut RequestTemplate) {
        (self.0)(template)
    }
}

pub fn interceptor_fn<F>(f: F) -> FnInterceptor<F>
where
    F: Fn(&mut RequestTemplate) + Send + Sync,
{
    FnInterceptor(f)
}

/// Adds a fixed set of headers to every request.
#[derive(Debug, Clone, Default)]
pub struct HeaderInjector {
    headers: Vec<HeaderAttr>,
}

impl HeaderInjector {
    pub fn new(headers: Vec<HeaderAttr>) -> Self {
        Self { headers }
    }

    pub fn headers(&self) -> &[HeaderAttr] {
        &self.headers
    }
}

impl RequestInterceptor for HeaderInjector {
    fn apply(&self, template: &mut RequestTemplate) {
        for header in &self.headers {
            template.header(header.key.as_str(), header.value.as_str());
        }
    }
}

/// Sets `Authorization: Basic ...` on every request.
#[derive(Clone)]
pub struct BasicAuthInterceptor {
    header_value: String,
}

impl BasicAuthInterceptor {
    pub fn new(username: &str, password: &str) -> Self {
        let token = STANDARD.encode(format!("{username}:{password}"));
        Self {
            header_value: format!("Basic {token}"),
        }
    }
}

impl fmt::Debug for BasicAuthInterceptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BasicAuthInterceptor")
            .field("header_value", &"<redacted>")
            .finish()
    }
}

impl RequestInterceptor for BasicAuthInterceptor {
    fn apply(&self, template: &mut RequestTemplate) {
        template.remove_header(AUTHORIZATION.as_str());
        template.header(AUTHORIZATION.as_str(), self.header_value.as_str());
    }
}
