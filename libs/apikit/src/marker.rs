//! Declarative markers attached to API traits and the catalog that collects them.
//!
//! `#[api_client(...)]` expands into a static [`ApiMarker`] plus an
//! `inventory::submit!` of an [`ApiDeclaration`]. [`Catalog::discovered`] gathers
//! every declaration linked into the binary.

use std::any::{Any, TypeId};
use std::fmt;

use crate::descriptor::{HeaderMarker, InterceptorRef, LogLevel};
use crate::policy::{DEFAULT_READ_TIMEOUT_MS, DEFAULT_RETRY_TIMES};
use crate::transport::HttpClient;

/// A type-erased client. Always holds an `Arc<dyn Api>` for the declared trait.
pub type BoxedClient = Box<dyn Any + Send + Sync>;

/// Identity of an API trait and the constructor binding it to an [`HttpClient`].
#[derive(Clone, Copy)]
pub struct ApiInterface {
    name: &'static str,
    type_id: fn() -> TypeId,
    target: fn(HttpClient) -> BoxedClient,
}

impl ApiInterface {
    pub const fn new(
        name: &'static str,
        type_id: fn() -> TypeId,
        target: fn(HttpClient) -> BoxedClient,
    ) -> Self {
        Self {
            name,
            type_id,
            target,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// `TypeId` of `dyn Api`, the key clients are registered under.
    pub fn interface_id(&self) -> TypeId {
        (self.type_id)()
    }

    /// Bind a configured client to the trait.
    pub fn target(&self, client: HttpClient) -> BoxedClient {
        (self.target)(client)
    }
}

impl fmt::Debug for ApiInterface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiInterface")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Declarative metadata of one API trait, exactly as written.
///
/// Placeholders are kept verbatim here; they are resolved when the client is built.
#[derive(Debug, Clone, Copy)]
pub struct ApiMarker {
    pub url: &'static str,
    pub headers: &'static [HeaderMarker],
    pub request_interceptors: &'static [InterceptorRef],
    pub log_level: LogLevel,
    pub decode_404: bool,
    pub username: &'static str,
    pub password: &'static str,
    pub read_timeout_ms: u64,
    pub retry_times: u32,
}

impl ApiMarker {
    /// A marker with every optional attribute at its default.
    pub const fn new(url: &'static str) -> Self {
        Self {
            url,
            headers: &[],
            request_interceptors: &[],
            log_level: LogLevel::None,
            decode_404: false,
            username: "",
            password: "",
            read_timeout_ms: DEFAULT_READ_TIMEOUT_MS,
            retry_times: DEFAULT_RETRY_TIMES,
        }
    }
}

/// Shape of a declared type. Only interfaces are eligible for client generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeclarationKind {
    Interface,
    Concrete,
}

/// One type visible to the scanner.
#[derive(Debug)]
pub struct ApiDeclaration {
    pub name: &'static str,
    /// `module_path!()` of the declaring module.
    pub module_path: &'static str,
    pub kind: DeclarationKind,
    /// False for types nested inside another type that cannot stand alone.
    pub independent: bool,
    pub marker: Option<&'static ApiMarker>,
    pub interface: ApiInterface,
}

impl ApiDeclaration {
    /// Whether this declaration lives at or below `root` in the module tree.
    pub fn is_under(&self, root: &str) -> bool {
        let root = root.trim().trim_end_matches("::");
        if root.is_empty() {
            return false;
        }
        match self.module_path.strip_prefix(root) {
            Some(rest) => rest.is_empty() || rest.starts_with("::"),
            None => false,
        }
    }
}

inventory::collect!(ApiDeclaration);

/// The set of declarations a scan runs over.
#[derive(Debug, Default, Clone)]
pub struct Catalog {
    declarations: Vec<&'static ApiDeclaration>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every declaration submitted through `#[api_client]` in the linked binary.
    pub fn discovered() -> Self {
        let mut declarations: Vec<&'static ApiDeclaration> =
            inventory::iter::<ApiDeclaration>.into_iter().collect();
        // inventory order is unspecified; keep scans reproducible
        declarations.sort_by(|a, b| (a.module_path, a.name).cmp(&(b.module_path, b.name)));
        Self { declarations }
    }

    pub fn declare(&mut self, declaration: &'static ApiDeclaration) -> &mut Self {
        self.declarations.push(declaration);
        self
    }

    pub fn with(mut self, declaration: &'static ApiDeclaration) -> Self {
        self.declarations.push(declaration);
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = &'static ApiDeclaration> + '_ {
        self.declarations.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.declarations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.declarations.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    trait Sample: Send + Sync {}

    fn sample_id() -> TypeId {
        TypeId::of::<dyn Sample>()
    }

    fn no_target(_: HttpClient) -> BoxedClient {
        Box::new(())
    }

    static MARKER: ApiMarker = ApiMarker::new("http://sample");

    static NESTED: ApiDeclaration = ApiDeclaration {
        name: "Sample",
        module_path: "app::clients::sample",
        kind: DeclarationKind::Interface,
        independent: true,
        marker: Some(&MARKER),
        interface: ApiInterface::new("Sample", sample_id, no_target),
    };

    #[test]
    fn marker_defaults() {
        assert_eq!(MARKER.read_timeout_ms, 30_000);
        assert_eq!(MARKER.retry_times, 3);
        assert_eq!(MARKER.log_level, LogLevel::None);
        assert!(!MARKER.decode_404);
        assert!(MARKER.username.is_empty() && MARKER.password.is_empty());
    }

    #[test]
    fn module_root_matching_respects_path_segments() {
        assert!(NESTED.is_under("app"));
        assert!(NESTED.is_under("app::clients"));
        assert!(NESTED.is_under("app::clients::sample"));
        assert!(NESTED.is_under("app::clients::"));
        assert!(!NESTED.is_under("app::client"));
        assert!(!NESTED.is_under("ap"));
        assert!(!NESTED.is_under(""));
    }

    #[test]
    fn catalog_accumulates_declarations() {
        let catalog = Catalog::new().with(&NESTED);
        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog.iter().next().map(|d| d.name), Some("Sample"));
        assert_eq!(
            catalog.iter().next().map(|d| d.interface.interface_id()),
            Some(TypeId::of::<dyn Sample>())
        );
    }
}
