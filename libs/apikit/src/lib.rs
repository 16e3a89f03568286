//! # apikit - Declarative API Clients
//!
//! Declare a remote HTTP API as a Rust trait, annotate it with `#[api_client(...)]`,
//! and let apikit construct and register a fully configured client for it.
//!
//! ## Features
//!
//! - **Declarative**: base URL, headers, timeouts, retries, basic auth and interceptors
//!   live on the trait declaration
//! - **Auto-discovery**: declarations are collected via inventory and scanned by module path
//! - **Lazy**: clients are materialized on first lookup, with placeholders resolved
//!   against the runtime [`Environment`]
//! - **Typed lookup**: clients are fetched as `Arc<dyn YourApi>` from the [`Container`]
//!
//! ## Example
//!
//! ```rust,ignore
//! use apikit::{
//!     api_client, async_trait, Catalog, Container, Environment, HttpClient, HttpError,
//!     ScanSettings,
//! };
//!
//! #[api_client(
//!     url = "${users.url}",
//!     proxy = UsersHttp,
//!     header(key = "X-Env", value = "${env.stage}"),
//!     read_timeout = 5000,
//!     retry_times = 1,
//! )]
//! #[async_trait]
//! pub trait UsersApi: Send + Sync {
//!     async fn user(&self, id: u64) -> Result<Option<User>, HttpError>;
//! }
//!
//! pub struct UsersHttp(HttpClient);
//!
//! impl From<HttpClient> for UsersHttp {
//!     fn from(client: HttpClient) -> Self {
//!         Self(client)
//!     }
//! }
//!
//! #[async_trait]
//! impl UsersApi for UsersHttp {
//!     async fn user(&self, id: u64) -> Result<Option<User>, HttpError> {
//!         self.0.get(&format!("/users/{id}")).await
//!     }
//! }
//!
//! let container = Container::new(Environment::new());
//! let settings = ScanSettings::for_packages(["my_app"]);
//! apikit::enable_api_clients(&container, Catalog::discovered(), &settings)?;
//! let users = container.get::<dyn UsersApi>()?;
//! ```

// Lets the attribute macro refer to `::apikit` from inside this crate's own tests.
extern crate self as apikit;

pub use async_trait::async_trait;

// Re-export inventory for macro-generated registrations
pub use inventory;

pub use apikit_macros::api_client;

pub mod autoconfig;
pub mod container;
pub mod descriptor;
pub mod env;
pub mod error;
pub mod factory;
pub mod marker;
pub mod parser;
pub mod policy;
pub mod scanner;
pub mod transport;

#[cfg(test)]
mod test_support;

pub use autoconfig::{enable_api_clients, install_default_manager};
pub use container::{Container, DefinitionRegistry};
pub use descriptor::{ClientDescriptor, HeaderAttr, HeaderMarker, InterceptorRef, LogLevel};
pub use env::Environment;
pub use error::{
    ConfigurationError, ContainerError, HttpError, InitializationError, ValidationError,
};
pub use factory::{ClientFactory, DefaultFactory, FactoryStrategy};
pub use marker::{ApiDeclaration, ApiInterface, ApiMarker, BoxedClient, Catalog, DeclarationKind};
pub use parser::parse_marker;
pub use policy::{
    ClientManager, DEFAULT_CONNECT_TIMEOUT_MS, DEFAULT_MANAGER_DEF, DEFAULT_READ_TIMEOUT_MS,
    DEFAULT_RETRY_TIMES,
};
pub use scanner::{RegistrationRecord, RejectedDeclaration, ScanReport, ScanSettings, Scanner};
pub use transport::{
    BasicAuthInterceptor, ClientOptions, HeaderInjector, HttpClient, HttpClientBuilder,
    HttpResponse, JsonCodec, LoggerKind, RequestInterceptor, RequestTemplate, RetryPolicy,
};
