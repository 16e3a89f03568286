//! Deferred construction of one API client.

use std::any::TypeId;
use std::fmt;
use std::sync::{Arc, OnceLock};

use crate::container::Container;
use crate::descriptor::{ClientDescriptor, HeaderAttr};
use crate::env::Environment;
use crate::error::{ContainerError, InitializationError};
use crate::marker::{ApiInterface, BoxedClient};
use crate::policy::ClientManager;
use crate::scanner::RegistrationRecord;
use crate::transport::{HeaderInjector, HttpClientBuilder, LoggerKind};

/// Hook for adjusting how clients are put together.
///
/// The scanner binds every record it produces to one strategy; [`DefaultFactory`]
/// is used unless another one is configured.
pub trait FactoryStrategy: Send + Sync + 'static {
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Whether the container should cache the first built client.
    fn is_singleton(&self) -> bool {
        true
    }

    /// Last chance to modify the builder before the client is created.
    fn customize(
        &self,
        builder: HttpClientBuilder,
        _descriptor: &ClientDescriptor,
    ) -> HttpClientBuilder {
        builder
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultFactory;

impl FactoryStrategy for DefaultFactory {}

/// Builds the client of one API interface from its descriptor.
///
/// Holds only shared, read-only inputs; every build composes a fresh builder, so the
/// factory may be invoked concurrently.
pub struct ClientFactory {
    interface: ApiInterface,
    descriptor: Option<Arc<ClientDescriptor>>,
    manager_ref: Option<String>,
    logger: LoggerKind,
    strategy: Arc<dyn FactoryStrategy>,
    ready: OnceLock<Result<Arc<ClientManager>, InitializationError>>,
}

impl fmt::Debug for ClientFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientFactory")
            .field("api", &self.interface.name())
            .field("descriptor", &self.descriptor)
            .field("manager_ref", &self.manager_ref)
            .field("logger", &self.logger)
            .field("strategy", &self.strategy.name())
            .finish()
    }
}

impl ClientFactory {
    pub fn new(interface: ApiInterface) -> Self {
        Self {
            interface,
            descriptor: None,
            manager_ref: None,
            logger: LoggerKind::default(),
            strategy: Arc::new(DefaultFactory),
            ready: OnceLock::new(),
        }
    }

    pub fn from_record(record: RegistrationRecord) -> Self {
        Self::new(record.interface)
            .with_descriptor(record.descriptor)
            .with_manager_ref(record.manager_ref)
            .with_logger(record.logger)
            .with_strategy(record.strategy)
    }

    pub fn with_descriptor(mut self, descriptor: Arc<ClientDescriptor>) -> Self {
        self.descriptor = Some(descriptor);
        self
    }

    pub fn with_manager_ref(mut self, manager_ref: impl Into<String>) -> Self {
        self.manager_ref = Some(manager_ref.into());
        self
    }

    pub fn with_logger(mut self, logger: LoggerKind) -> Self {
        self.logger = logger;
        self
    }

    pub fn with_strategy(mut self, strategy: Arc<dyn FactoryStrategy>) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn name(&self) -> &'static str {
        self.interface.name()
    }

    /// `api@strategy`, used to tell bindings apart in logs.
    pub fn qualified_name(&self) -> String {
        format!("{}@{}", self.interface.name(), self.strategy.name())
    }

    pub fn interface_id(&self) -> TypeId {
        self.interface.interface_id()
    }

    pub fn is_singleton(&self) -> bool {
        self.strategy.is_singleton()
    }

    /// Check the factory's inputs. Evaluated once; later calls return the same outcome.
    pub fn ensure_ready(
        &self,
        container: &Container,
    ) -> Result<Arc<ClientManager>, InitializationError> {
        self.ready
            .get_or_init(|| self.check_ready(container))
            .clone()
    }

    fn check_ready(
        &self,
        container: &Container,
    ) -> Result<Arc<ClientManager>, InitializationError> {
        let api = self.interface.name();
        if self.descriptor.is_none() {
            return Err(InitializationError::MissingDescriptor { api });
        }
        let name = match self.manager_ref.as_deref() {
            Some(name) if !name.trim().is_empty() => name,
            _ => return Err(InitializationError::MissingManagerRef { api }),
        };
        container
            .definition::<ClientManager>(name)
            .ok_or_else(|| InitializationError::ManagerNotFound {
                api,
                name: name.to_owned(),
            })
    }

    /// Build a new client, type-erased as `Arc<dyn Api>`.
    pub fn build(&self, container: &Container) -> Result<BoxedClient, ContainerError> {
        let api = self.interface.name();
        let manager = self.ensure_ready(container)?;
        let descriptor = self
            .descriptor
            .as_deref()
            .ok_or(InitializationError::MissingDescriptor { api })?;
        let env = container.environment();

        let username = resolve_credential(descriptor.username.as_deref(), env);
        let password = resolve_credential(descriptor.password.as_deref(), env);
        let mut builder = manager
            .compose(
                descriptor.read_timeout_ms,
                descriptor.retry_times,
                username.as_deref(),
                password.as_deref(),
                self.logger,
            )
            .name(api);

        if descriptor.decode_404 {
            builder = builder.decode_404();
        }
        builder = builder.log_level(descriptor.log_level);

        let url = env.resolve_placeholders(&descriptor.url);

        if !descriptor.headers.is_empty() {
            let headers = resolve_headers(&descriptor.headers, env);
            builder = builder.request_interceptor(Arc::new(HeaderInjector::new(headers)));
        }

        for interceptor in &descriptor.interceptors {
            let instance = match interceptor.lookup(container) {
                Some(found) => found,
                None => {
                    tracing::info!(
                        api,
                        interceptor = interceptor.type_name(),
                        "interceptor is not registered in the container, creating a new instance"
                    );
                    interceptor.instantiate()
                }
            };
            builder = builder.request_interceptor(instance);
        }

        builder = self.strategy.customize(builder, descriptor);

        let client = builder
            .target(url)
            .map_err(|source| ContainerError::Build { api, source })?;
        tracing::debug!(api, base_url = client.base_url(), "api client built");
        Ok(self.interface.target(client))
    }
}

/// Resolve placeholders in each header value. The descriptor's headers are left untouched.
pub fn resolve_headers(headers: &[HeaderAttr], env: &Environment) -> Vec<HeaderAttr> {
    headers
        .iter()
        .map(|header| HeaderAttr::new(header.key.clone(), env.resolve_placeholders(&header.value)))
        .collect()
}

fn resolve_credential(raw: Option<&str>, env: &Environment) -> Option<String> {
    raw.filter(|value| !value.trim().is_empty())
        .map(|value| env.resolve_placeholders(value))
        .filter(|value| !value.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::time::Duration;

    use super::*;
    use crate::descriptor::{InterceptorRef, LogLevel};
    use crate::policy::DEFAULT_MANAGER_DEF;
    use crate::test_support::{descriptor, Sample, SAMPLE};
    use crate::transport::{RequestInterceptor, RequestTemplate};

    fn container(props: &[(&str, &str)]) -> Container {
        let props: HashMap<String, String> = props
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        let container = Container::new(Environment::isolated(props));
        container.register_definition(DEFAULT_MANAGER_DEF, Arc::new(ClientManager::new()));
        container
    }

    fn build(factory: &ClientFactory, container: &Container) -> Arc<dyn Sample> {
        let boxed = factory.build(container).unwrap();
        *boxed.downcast::<Arc<dyn Sample>>().unwrap()
    }

    #[test]
    fn resolves_url_and_applies_descriptor() {
        let container = container(&[("svc.url", "http://svc:9000")]);
        let factory = ClientFactory::new(SAMPLE)
            .with_descriptor(Arc::new(ClientDescriptor {
                decode_404: true,
                log_level: LogLevel::Basic,
                read_timeout_ms: 2_500,
                retry_times: 4,
                ..descriptor("${svc.url}/v1")
            }))
            .with_manager_ref(DEFAULT_MANAGER_DEF)
            .with_logger(LoggerKind::Basic);

        let sample = build(&factory, &container);
        let client = sample.client();

        assert_eq!(client.base_url(), "http://svc:9000/v1");
        assert_eq!(client.name(), "Sample");
        assert!(client.options().decode_404);
        assert_eq!(client.options().log_level, LogLevel::Basic);
        assert_eq!(client.options().logger, LoggerKind::Basic);
        assert_eq!(client.options().read_timeout, Duration::from_millis(2_500));
        assert_eq!(client.options().retry.max_attempts, 4);
        assert!(!client.options().basic_auth);
    }

    #[test]
    fn missing_inputs_fail_readiness() {
        let container = container(&[]);

        let no_descriptor = ClientFactory::new(SAMPLE).with_manager_ref(DEFAULT_MANAGER_DEF);
        assert_eq!(
            no_descriptor.ensure_ready(&container).err(),
            Some(InitializationError::MissingDescriptor { api: "Sample" })
        );

        let no_manager =
            ClientFactory::new(SAMPLE).with_descriptor(Arc::new(descriptor("http://svc")));
        assert_eq!(
            no_manager.ensure_ready(&container).err(),
            Some(InitializationError::MissingManagerRef { api: "Sample" })
        );

        let unknown_manager = ClientFactory::new(SAMPLE)
            .with_descriptor(Arc::new(descriptor("http://svc")))
            .with_manager_ref("elsewhere");
        assert!(matches!(
            unknown_manager.build(&container),
            Err(ContainerError::Initialization(InitializationError::ManagerNotFound { .. }))
        ));
    }

    #[test]
    fn credentials_resolving_to_blank_disable_basic_auth() {
        let container = container(&[("svc.user", "svc"), ("svc.pass", "  ")]);
        let resolved_blank = ClientFactory::new(SAMPLE)
            .with_descriptor(Arc::new(ClientDescriptor {
                username: Some("${svc.user}".into()),
                password: Some("${svc.pass}".into()),
                ..descriptor("http://svc")
            }))
            .with_manager_ref(DEFAULT_MANAGER_DEF);
        assert!(!build(&resolved_blank, &container).client().options().basic_auth);

        let container = container_with_secret();
        let resolved = ClientFactory::new(SAMPLE)
            .with_descriptor(Arc::new(ClientDescriptor {
                username: Some("svc".into()),
                password: Some("${svc.pass}".into()),
                ..descriptor("http://svc")
            }))
            .with_manager_ref(DEFAULT_MANAGER_DEF);
        assert!(build(&resolved, &container).client().options().basic_auth);
    }

    fn container_with_secret() -> Container {
        container(&[("svc.pass", "s3cret")])
    }

    #[test]
    fn header_resolution_is_call_local() {
        let env = Environment::isolated(HashMap::new()).with_property("env.stage", "prod");
        let declared = vec![
            HeaderAttr::new("X-Env", "${env.stage}"),
            HeaderAttr::new("X-Empty", "${unset:}"),
        ];

        let resolved = resolve_headers(&declared, &env);

        assert_eq!(
            resolved,
            vec![HeaderAttr::new("X-Env", "prod"), HeaderAttr::new("X-Empty", "")]
        );
        assert_eq!(declared[0].value, "${env.stage}");
    }

    #[derive(Default)]
    struct Tagging {
        tag: &'static str,
    }

    impl RequestInterceptor for Tagging {
        fn apply(&self, template: &mut RequestTemplate) {
            template.header("x-tag", self.tag);
        }
    }

    #[test]
    fn interceptors_are_looked_up_or_instantiated() {
        let container = container(&[]);
        let factory = ClientFactory::new(SAMPLE)
            .with_descriptor(Arc::new(ClientDescriptor {
                headers: vec![HeaderAttr::new("X-A", "1")],
                interceptors: vec![InterceptorRef::of::<Tagging>()],
                ..descriptor("http://svc")
            }))
            .with_manager_ref(DEFAULT_MANAGER_DEF);

        let fallback = build(&factory, &container);
        assert_eq!(fallback.client().options().interceptors, 2);

        container.register::<Tagging>(Arc::new(Tagging { tag: "registered" }));
        let registered = build(&factory, &container);
        assert_eq!(registered.client().options().interceptors, 2);
    }

    struct Stateless;

    impl FactoryStrategy for Stateless {
        fn is_singleton(&self) -> bool {
            false
        }

        fn customize(&self, builder: HttpClientBuilder, _: &ClientDescriptor) -> HttpClientBuilder {
            builder.decode_404()
        }
    }

    #[test]
    fn strategy_customizes_builder() {
        let container = container(&[]);
        let factory = ClientFactory::new(SAMPLE)
            .with_descriptor(Arc::new(descriptor("http://svc")))
            .with_manager_ref(DEFAULT_MANAGER_DEF)
            .with_strategy(Arc::new(Stateless));

        assert!(!factory.is_singleton());
        assert!(factory.qualified_name().starts_with("Sample@"));
        assert!(build(&factory, &container).client().options().decode_404);
    }
}
