use http::header::CONTENT_TYPE;
use http::StatusCode;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use super::request::{HttpResponse, RequestTemplate};
use crate::error::HttpError;

const APPLICATION_JSON: &str = "application/json";

/// JSON request/response codec.
///
/// Responses without content (404 when decode-404 is on, 204, or an empty body)
/// decode into the empty value of the target type: `None`, an empty collection,
/// or a struct whose fields all have defaults.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl JsonCodec {
    pub fn encode<T>(&self, template: &mut RequestTemplate, body: &T) -> Result<(), HttpError>
    where
        T: Serialize + ?Sized,
    {
        let bytes = serde_json::to_vec(body).map_err(HttpError::Encode)?;
        template.remove_header(CONTENT_TYPE.as_str());
        template.header(CONTENT_TYPE.as_str(), APPLICATION_JSON);
        template.set_body(bytes);
        Ok(())
    }

    pub fn decode<R>(&self, response: &HttpResponse) -> Result<R, HttpError>
    where
        R: DeserializeOwned,
    {
        if is_empty_response(response) {
            return empty_value();
        }
        serde_json::from_slice(&response.body).map_err(HttpError::Decode)
    }
}

fn is_empty_response(response: &HttpResponse) -> bool {
    response.status == StatusCode::NOT_FOUND
        || response.status == StatusCode::NO_CONTENT
        || response.body.iter().all(u8::is_ascii_whitespace)
}

fn empty_value<R: DeserializeOwned>() -> Result<R, HttpError> {
    serde_json::from_value(Value::Null)
        .or_else(|_| serde_json::from_value(Value::Array(Vec::new())))
        .or_else(|_| serde_json::from_value(Value::Object(serde_json::Map::new())))
        .map_err(HttpError::Decode)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use bytes::Bytes;
    use http::HeaderMap;
    use serde::Deserialize;

    use super::*;

    fn response(status: StatusCode, body: &'static str) -> HttpResponse {
        HttpResponse {
            status,
            headers: HeaderMap::new(),
            body: Bytes::from_static(body.as_bytes()),
        }
    }

    #[derive(Debug, Deserialize, PartialEq)]
    struct User {
        id: u64,
        name: String,
    }

    #[derive(Debug, Deserialize, PartialEq, Default)]
    struct Page {
        #[serde(default)]
        items: Vec<u64>,
    }

    #[test]
    fn decodes_json_body() {
        let user: User = JsonCodec
            .decode(&response(StatusCode::OK, r#"{"id":7,"name":"ann"}"#))
            .unwrap();
        assert_eq!(user, User { id: 7, name: "ann".into() });
    }

    #[test]
    fn not_found_decodes_to_empty_value() {
        let missing = response(StatusCode::NOT_FOUND, "not here");

        assert_eq!(JsonCodec.decode::<Option<User>>(&missing).unwrap(), None);
        assert!(JsonCodec.decode::<Vec<User>>(&missing).unwrap().is_empty());
        assert!(JsonCodec.decode::<HashMap<String, u64>>(&missing).unwrap().is_empty());
        assert_eq!(JsonCodec.decode::<Page>(&missing).unwrap(), Page::default());
        assert!(JsonCodec.decode::<User>(&missing).is_err());
    }

    #[test]
    fn empty_success_body_decodes_to_unit() {
        JsonCodec.decode::<()>(&response(StatusCode::OK, "")).unwrap();
        JsonCodec.decode::<()>(&response(StatusCode::NO_CONTENT, "")).unwrap();
    }

    #[test]
    fn encode_sets_body_and_content_type() {
        let mut template = RequestTemplate::post("/users");
        JsonCodec.encode(&mut template, &serde_json::json!({"name": "ann"})).unwrap();

        let content_types: Vec<_> = template.header_values("content-type").collect();
        assert_eq!(content_types, vec![APPLICATION_JSON]);
        assert_eq!(template.body().map(|b| b.as_ref()), Some(&br#"{"name":"ann"}"#[..]));
    }
}
