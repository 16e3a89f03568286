//! Shared fixtures for unit tests.

use std::any::TypeId;
use std::sync::Arc;

use crate::descriptor::{ClientDescriptor, LogLevel};
use crate::factory::ClientFactory;
use crate::marker::{ApiInterface, BoxedClient};
use crate::policy::DEFAULT_MANAGER_DEF;
use crate::transport::HttpClient;

pub(crate) trait Sample: Send + Sync {
    fn client(&self) -> &HttpClient;
}

struct SampleProxy(HttpClient);

impl Sample for SampleProxy {
    fn client(&self) -> &HttpClient {
        &self.0
    }
}

fn sample_type_id() -> TypeId {
    TypeId::of::<dyn Sample>()
}

fn sample_target(client: HttpClient) -> BoxedClient {
    let api: Arc<dyn Sample> = Arc::new(SampleProxy(client));
    Box::new(api)
}

pub(crate) const SAMPLE: ApiInterface = ApiInterface::new("Sample", sample_type_id, sample_target);

pub(crate) fn descriptor(url: &str) -> ClientDescriptor {
    ClientDescriptor {
        url: url.to_owned(),
        headers: Vec::new(),
        interceptors: Vec::new(),
        log_level: LogLevel::None,
        decode_404: false,
        username: None,
        password: None,
        read_timeout_ms: 1_000,
        retry_times: 1,
    }
}

pub(crate) fn sample_factory(url: &str) -> ClientFactory {
    ClientFactory::new(SAMPLE)
        .with_descriptor(Arc::new(descriptor(url)))
        .with_manager_ref(DEFAULT_MANAGER_DEF)
}
