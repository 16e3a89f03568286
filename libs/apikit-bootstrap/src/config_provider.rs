use crate::config::AppConfig;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug, thiserror::Error)]
pub enum SectionError {
    #[error("config section `{0}` is not present")]
    Missing(String),
    #[error("config section `{name}` is invalid: {source}")]
    Invalid {
        name: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Configuration provider for the client registration pipeline
pub trait ConfigProvider: Send + Sync {
    /// Raw value of a top-level section
    fn section(&self, name: &str) -> Option<serde_json::Value>;

    /// Flat `a.b.c` → value map used as the placeholder property source
    fn properties(&self) -> HashMap<String, String>;

    /// Typed view of a section.
    fn section_as<T: DeserializeOwned>(&self, name: &str) -> Result<T, SectionError>
    where
        Self: Sized,
    {
        let raw = self
            .section(name)
            .ok_or_else(|| SectionError::Missing(name.to_owned()))?;
        serde_json::from_value(raw).map_err(|source| SectionError::Invalid {
            name: name.to_owned(),
            source,
        })
    }
}

/// Implementation of ConfigProvider that uses AppConfig
pub struct AppConfigProvider(Arc<AppConfig>);

impl AppConfigProvider {
    pub fn new(config: AppConfig) -> Self {
        Self(Arc::new(config))
    }
}

impl ConfigProvider for AppConfigProvider {
    fn section(&self, name: &str) -> Option<serde_json::Value> {
        match name {
            "api_clients" => self.0.api_clients.clone(),
            "properties" => Some(serde_json::Value::Object(self.0.properties.clone())),
            "logging" => self
                .0
                .logging
                .as_ref()
                .and_then(|v| serde_json::to_value(v).ok()),
            _ => None,
        }
    }

    fn properties(&self) -> HashMap<String, String> {
        self.0.flat_properties()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Clients {
        base_packages: Vec<String>,
    }

    fn provider() -> AppConfigProvider {
        let mut config = AppConfig::default();
        config.api_clients = Some(json!({ "base_packages": ["demo::clients"] }));
        config
            .properties
            .insert("services".into(), json!({ "echo": { "url": "http://echo" } }));
        AppConfigProvider::new(config)
    }

    #[test]
    fn typed_section_is_deserialized() {
        let clients: Clients = provider().section_as("api_clients").unwrap();
        assert_eq!(clients.base_packages, vec!["demo::clients".to_string()]);
    }

    #[test]
    fn missing_and_invalid_sections_are_distinguished() {
        let empty = AppConfigProvider::new(AppConfig::default());
        assert!(matches!(
            empty.section_as::<Clients>("api_clients"),
            Err(SectionError::Missing(name)) if name == "api_clients"
        ));

        let mut config = AppConfig::default();
        config.api_clients = Some(json!({ "base_packages": 5 }));
        let bad = AppConfigProvider::new(config);
        assert!(matches!(
            bad.section_as::<Clients>("api_clients"),
            Err(SectionError::Invalid { .. })
        ));
    }

    #[test]
    fn properties_are_flattened() {
        let props = provider().properties();
        assert_eq!(props.get("services.echo.url").map(String::as_str), Some("http://echo"));
    }

    #[test]
    fn unknown_section_is_none() {
        assert!(provider().section("server").is_none());
        assert!(provider().section("logging").is_some());
    }
}
