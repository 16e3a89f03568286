//! HTTP transport: request templates, codec, retry, logging and the reqwest-backed client.

mod builder;
mod client;
mod codec;
mod interceptor;
mod logger;
mod request;
mod retry;

pub use builder::{ClientOptions, HttpClientBuilder};
pub use client::HttpClient;
pub use codec::JsonCodec;
pub use interceptor::{
    interceptor_fn, BasicAuthInterceptor, FnInterceptor, HeaderInjector, RequestInterceptor,
};
pub use logger::{HttpLogger, LoggerKind};
pub use request::{HttpResponse, RequestTemplate};
pub use retry::{RetryPolicy, Retryer};
