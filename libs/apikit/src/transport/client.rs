use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use http::header::{HeaderName, HeaderValue};
use http::{HeaderMap, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::builder::ClientOptions;
use super::codec::JsonCodec;
use super::interceptor::RequestInterceptor;
use super::logger::HttpLogger;
use super::request::{HttpResponse, RequestTemplate};
use crate::error::HttpError;

struct Inner {
    http: reqwest::Client,
    name: String,
    base_url: String,
    options: ClientOptions,
    codec: JsonCodec,
    interceptors: Vec<Arc<dyn RequestInterceptor>>,
}

/// A configured HTTP client bound to one base URL.
///
/// Cheap to clone. Proxies implementing an API trait hold one of these and map
/// their methods onto [`HttpClient::request`] or the verb helpers.
#[derive(Clone)]
pub struct HttpClient {
    inner: Arc<Inner>,
}

impl fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpClient")
            .field("name", &self.inner.name)
            .field("base_url", &self.inner.base_url)
            .field("options", &self.inner.options)
            .finish_non_exhaustive()
    }
}

impl HttpClient {
    pub(super) fn new(
        http: reqwest::Client,
        name: String,
        base_url: String,
        options: ClientOptions,
        codec: JsonCodec,
        interceptors: Vec<Arc<dyn RequestInterceptor>>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                http,
                name,
                base_url,
                options,
                codec,
                interceptors,
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn base_url(&self) -> &str {
        &self.inner.base_url
    }

    pub fn options(&self) -> &ClientOptions {
        &self.inner.options
    }

    pub fn codec(&self) -> &JsonCodec {
        &self.inner.codec
    }

    /// Absolute URL for `path`. Absolute paths are returned unchanged.
    pub fn url_for(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_owned();
        }
        let base = self.inner.base_url.trim_end_matches('/');
        let path = path.trim_start_matches('/');
        if path.is_empty() {
            base.to_owned()
        } else {
            format!("{base}/{path}")
        }
    }

    /// Send a request, retrying transport failures according to the retry policy.
    ///
    /// Non-success statuses are errors, except 404 when decode-404 is enabled.
    pub async fn execute(&self, mut template: RequestTemplate) -> Result<HttpResponse, HttpError> {
        for interceptor in &self.inner.interceptors {
            interceptor.apply(&mut template);
        }

        let url = self.url_for(template.path());
        let headers = header_map(&template)?;
        let logger = HttpLogger::new(self.inner.options.logger, self.inner.options.log_level);
        let mut retryer = self.inner.options.retry.retryer();

        loop {
            logger.log_request(&self.inner.name, &url, &template);
            let started = Instant::now();

            match self.send_once(&template, &url, headers.clone()).await {
                Ok(response) => {
                    logger.log_response(
                        &self.inner.name,
                        response.status,
                        &response.headers,
                        &response.body,
                        started.elapsed(),
                    );
                    return self.check_status(&template, url, response);
                }
                Err(err) => {
                    logger.log_io_error(
                        &self.inner.name,
                        template.method(),
                        &url,
                        &err,
                        started.elapsed(),
                    );
                    match retryer.next_backoff() {
                        Some(wait) => {
                            logger.log_retry(&self.inner.name, retryer.attempt(), wait);
                            tokio::time::sleep(wait).await;
                        }
                        None => {
                            return Err(HttpError::Transport {
                                method: template.method().clone(),
                                url,
                                source: err,
                            });
                        }
                    }
                }
            }
        }
    }

    async fn send_once(
        &self,
        template: &RequestTemplate,
        url: &str,
        headers: HeaderMap,
    ) -> Result<HttpResponse, reqwest::Error> {
        let mut request = self
            .inner
            .http
            .request(template.method().clone(), url)
            .headers(headers);
        if !template.query_pairs().is_empty() {
            request = request.query(template.query_pairs());
        }
        if let Some(body) = template.body() {
            request = request.body(body.clone());
        }

        let response = request.send().await?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await?;
        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }

    fn check_status(
        &self,
        template: &RequestTemplate,
        url: String,
        response: HttpResponse,
    ) -> Result<HttpResponse, HttpError> {
        let accepted = response.status.is_success()
            || (response.status == StatusCode::NOT_FOUND && self.inner.options.decode_404);
        if accepted {
            Ok(response)
        } else {
            Err(HttpError::Status {
                method: template.method().clone(),
                url,
                status: response.status,
                body: response.body,
            })
        }
    }

    /// Execute `template` and decode the response body.
    pub async fn request<R>(&self, template: RequestTemplate) -> Result<R, HttpError>
    where
        R: DeserializeOwned,
    {
        let response = self.execute(template).await?;
        self.inner.codec.decode(&response)
    }

    pub async fn get<R>(&self, path: &str) -> Result<R, HttpError>
    where
        R: DeserializeOwned,
    {
        self.request(RequestTemplate::get(path)).await
    }

    pub async fn delete<R>(&self, path: &str) -> Result<R, HttpError>
    where
        R: DeserializeOwned,
    {
        self.request(RequestTemplate::delete(path)).await
    }

    pub async fn post<B, R>(&self, path: &str, body: &B) -> Result<R, HttpError>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let mut template = RequestTemplate::post(path);
        self.inner.codec.encode(&mut template, body)?;
        self.request(template).await
    }

    pub async fn put<B, R>(&self, path: &str, body: &B) -> Result<R, HttpError>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let mut template = RequestTemplate::put(path);
        self.inner.codec.encode(&mut template, body)?;
        self.request(template).await
    }
}

fn header_map(template: &RequestTemplate) -> Result<HeaderMap, HttpError> {
    let mut map = HeaderMap::with_capacity(template.headers().len());
    for (key, value) in template.headers() {
        let name = HeaderName::from_bytes(key.as_bytes())
            .map_err(|e| HttpError::InvalidRequest(format!("header name '{key}': {e}")))?;
        let value = HeaderValue::from_str(value)
            .map_err(|e| HttpError::InvalidRequest(format!("header '{key}' value: {e}")))?;
        map.append(name, value);
    }
    Ok(map)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::HttpClientBuilder;

    fn client(base: &str) -> HttpClient {
        HttpClientBuilder::new().target(base).unwrap()
    }

    #[test]
    fn url_for_joins_without_double_slashes() {
        let c = client("http://svc:8080/api/");
        assert_eq!(c.url_for("/users/1"), "http://svc:8080/api/users/1");
        assert_eq!(c.url_for("users"), "http://svc:8080/api/users");
        assert_eq!(c.url_for(""), "http://svc:8080/api");
        assert_eq!(c.url_for("https://other/x"), "https://other/x");
    }

    #[test]
    fn header_map_rejects_invalid_names() {
        let template = RequestTemplate::get("/").with_header("bad header", "v");
        assert!(matches!(header_map(&template), Err(HttpError::InvalidRequest(_))));

        let template = RequestTemplate::get("/").with_header("X-A", "1").with_header("x-a", "2");
        let map = header_map(&template).unwrap();
        assert_eq!(map.get_all("x-a").iter().count(), 2);
    }
}
