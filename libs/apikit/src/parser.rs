//! Validation of declarative markers into client descriptors.

use crate::descriptor::{ClientDescriptor, HeaderAttr, InterceptorRef};
use crate::error::ValidationError;
use crate::marker::ApiMarker;

/// Turn the declarative marker of `api` into a [`ClientDescriptor`].
///
/// Pure; placeholders are not resolved here. The first invalid attribute fails the
/// whole declaration.
pub fn parse_marker(api: &str, marker: &ApiMarker) -> Result<ClientDescriptor, ValidationError> {
    if marker.url.trim().is_empty() {
        return Err(ValidationError::BlankUrl { api: api.to_owned() });
    }

    let mut headers = Vec::with_capacity(marker.headers.len());
    for (index, header) in marker.headers.iter().enumerate() {
        if header.key.trim().is_empty() {
            return Err(ValidationError::BlankHeaderKey {
                api: api.to_owned(),
                index,
            });
        }
        if header.value.trim().is_empty() {
            return Err(ValidationError::BlankHeaderValue {
                api: api.to_owned(),
                key: header.key.to_owned(),
            });
        }
        headers.push(HeaderAttr::new(header.key, header.value));
    }

    if marker.read_timeout_ms == 0 {
        return Err(ValidationError::InvalidReadTimeout { api: api.to_owned() });
    }

    let mut interceptors: Vec<InterceptorRef> =
        Vec::with_capacity(marker.request_interceptors.len());
    for candidate in marker.request_interceptors {
        if !interceptors.iter().any(|seen| seen == candidate) {
            interceptors.push(*candidate);
        }
    }

    Ok(ClientDescriptor {
        url: marker.url.to_owned(),
        headers,
        interceptors,
        log_level: marker.log_level,
        decode_404: marker.decode_404,
        username: non_blank(marker.username),
        password: non_blank(marker.password),
        read_timeout_ms: marker.read_timeout_ms,
        retry_times: marker.retry_times,
    })
}

fn non_blank(value: &str) -> Option<String> {
    if value.trim().is_empty() {
        None
    } else {
        Some(value.to_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{HeaderMarker, LogLevel};
    use crate::transport::{RequestInterceptor, RequestTemplate};

    #[derive(Default)]
    struct First;
    impl RequestInterceptor for First {
        fn apply(&self, _: &mut RequestTemplate) {}
    }

    #[derive(Default)]
    struct Second;
    impl RequestInterceptor for Second {
        fn apply(&self, _: &mut RequestTemplate) {}
    }

    static HEADERS: [HeaderMarker; 2] = [
        HeaderMarker::new("X-Env", "${env.stage}"),
        HeaderMarker::new("Accept", "application/json"),
    ];
    static INTERCEPTORS: [InterceptorRef; 3] = [
        InterceptorRef::of::<First>(),
        InterceptorRef::of::<Second>(),
        InterceptorRef::of::<First>(),
    ];

    #[test]
    fn parses_full_marker() {
        let marker = ApiMarker {
            headers: &HEADERS,
            request_interceptors: &INTERCEPTORS,
            log_level: LogLevel::Full,
            decode_404: true,
            username: "u",
            password: "p",
            read_timeout_ms: 5_000,
            retry_times: 1,
            ..ApiMarker::new("${svc.url}")
        };

        let descriptor = parse_marker("Users", &marker).unwrap();

        assert_eq!(descriptor.url, "${svc.url}");
        assert_eq!(
            descriptor.headers,
            vec![
                HeaderAttr::new("X-Env", "${env.stage}"),
                HeaderAttr::new("Accept", "application/json")
            ]
        );
        assert_eq!(descriptor.interceptors.len(), 2);
        assert!(descriptor.interceptors[0].type_name().ends_with("First"));
        assert!(descriptor.interceptors[1].type_name().ends_with("Second"));
        assert_eq!(descriptor.credentials(), Some(("u", "p")));
        assert_eq!(descriptor.read_timeout_ms, 5_000);
        assert_eq!(descriptor.retry_times, 1);
        assert!(descriptor.decode_404);
    }

    #[test]
    fn blank_credentials_become_absent() {
        let marker = ApiMarker {
            username: "u",
            password: "  ",
            ..ApiMarker::new("http://svc")
        };
        let descriptor = parse_marker("Users", &marker).unwrap();

        assert_eq!(descriptor.username.as_deref(), Some("u"));
        assert_eq!(descriptor.password, None);
        assert_eq!(descriptor.credentials(), None);
    }

    #[test]
    fn rejects_blank_url() {
        let err = parse_marker("Users", &ApiMarker::new("  ")).unwrap_err();
        assert_eq!(err, ValidationError::BlankUrl { api: "Users".into() });
    }

    #[test]
    fn rejects_blank_header_parts() {
        static BLANK_KEY: [HeaderMarker; 2] =
            [HeaderMarker::new("X-A", "1"), HeaderMarker::new(" ", "v")];
        static BLANK_VALUE: [HeaderMarker; 1] = [HeaderMarker::new("X-A", "")];

        let marker = ApiMarker {
            headers: &BLANK_KEY,
            ..ApiMarker::new("http://svc")
        };
        assert_eq!(
            parse_marker("Users", &marker).unwrap_err(),
            ValidationError::BlankHeaderKey { api: "Users".into(), index: 1 }
        );

        let marker = ApiMarker {
            headers: &BLANK_VALUE,
            ..ApiMarker::new("http://svc")
        };
        assert_eq!(
            parse_marker("Users", &marker).unwrap_err(),
            ValidationError::BlankHeaderValue { api: "Users".into(), key: "X-A".into() }
        );
    }

    #[test]
    fn rejects_zero_read_timeout() {
        let marker = ApiMarker {
            read_timeout_ms: 0,
            ..ApiMarker::new("http://svc")
        };
        assert!(matches!(
            parse_marker("Users", &marker),
            Err(ValidationError::InvalidReadTimeout { .. })
        ));
    }

    #[test]
    fn zero_retries_is_accepted() {
        let marker = ApiMarker {
            retry_times: 0,
            ..ApiMarker::new("http://svc")
        };
        assert_eq!(parse_marker("Users", &marker).unwrap().retry_times, 0);
    }
}
