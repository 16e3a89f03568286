use apikit::{api_client, async_trait, HttpClient, HttpError, RequestInterceptor, RequestTemplate};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const REQUEST_ID_HEADER: &str = "X-Request-Id";

/// Tags every outgoing request with a fresh id.
#[derive(Debug, Default)]
pub struct RequestIdInterceptor;

impl RequestInterceptor for RequestIdInterceptor {
    fn apply(&self, template: &mut RequestTemplate) {
        if template.header_values(REQUEST_ID_HEADER).next().is_none() {
            template.header(REQUEST_ID_HEADER, uuid::Uuid::new_v4().to_string());
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Echo {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub headers: Value,
    #[serde(default)]
    pub args: Value,
}

#[api_client(
    url = "${services.echo.url:https://httpbin.org}",
    proxy = EchoHttp,
    header(key = "X-Env", value = "${env.stage:dev}"),
    request_interceptors = [RequestIdInterceptor],
    log_level = "basic",
    decode_404 = true,
    username = "${services.echo.username:}",
    password = "${services.echo.password:}",
    read_timeout = 5000,
    retry_times = 2,
)]
#[async_trait]
pub trait EchoApi: Send + Sync {
    /// `GET /anything/{path}`; `None` when the service answers 404.
    async fn echo(&self, path: &str) -> Result<Option<Echo>, HttpError>;
}

pub struct EchoHttp(HttpClient);

impl From<HttpClient> for EchoHttp {
    fn from(client: HttpClient) -> Self {
        Self(client)
    }
}

#[async_trait]
impl EchoApi for EchoHttp {
    async fn echo(&self, path: &str) -> Result<Option<Echo>, HttpError> {
        let path = path.trim_start_matches('/');
        self.0.get(&format!("/anything/{path}")).await
    }
}
