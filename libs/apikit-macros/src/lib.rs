//! Procedural macros for apikit.

use proc_macro::TokenStream;
use syn::parse_macro_input;

mod api_client;
mod utils;

/// Declare an HTTP API client for a trait.
///
/// ```ignore
/// #[apikit::api_client(
///     url = "${users.url}",
///     proxy = UsersHttp,
///     header(key = "X-Env", value = "${env.stage}"),
///     request_interceptors = [TraceInterceptor],
///     log_level = "basic",
///     decode_404 = true,
///     username = "${users.user}",
///     password = "${users.password}",
///     read_timeout = 5000,
///     retry_times = 1,
/// )]
/// #[async_trait::async_trait]
/// pub trait UsersApi: Send + Sync { /* ... */ }
/// ```
///
/// `proxy` must implement the trait and `From<apikit::HttpClient>`. The trait is
/// emitted unchanged; an `apikit::ApiDeclaration` describing it is submitted to
/// inventory for discovery by the scanner.
#[proc_macro_attribute]
pub fn api_client(attr: TokenStream, item: TokenStream) -> TokenStream {
    let config = parse_macro_input!(attr as api_client::ApiClientConfig);
    let item = parse_macro_input!(item as syn::Item);

    match api_client::expand_api_client(config, item) {
        Ok(tokens) => tokens.into(),
        Err(e) => e.to_compile_error().into(),
    }
}
