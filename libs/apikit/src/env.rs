//! Property source and `${...}` placeholder resolution.

use std::borrow::Cow;
use std::collections::HashMap;
use std::sync::OnceLock;

use regex::{Captures, Regex};

/// Nested placeholders (a property whose value is itself a placeholder) are
/// expanded at most this many times.
const MAX_DEPTH: usize = 8;

fn placeholder_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\$\{([^}:]+)(?::([^}]*))?\}").expect("placeholder pattern is valid")
    })
}

/// Resolves `${key}` and `${key:default}` against configured properties and the
/// process environment.
///
/// Lookup order for a key: explicit properties, the environment variable of the
/// same name, then the relaxed form (`services.echo-api.url` → `SERVICES_ECHO_API_URL`).
/// Placeholders that cannot be resolved and carry no default stay in the text as written.
#[derive(Debug, Clone)]
pub struct Environment {
    properties: HashMap<String, String>,
    system_env: bool,
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}

impl Environment {
    /// Empty properties, backed by the process environment.
    pub fn new() -> Self {
        Self {
            properties: HashMap::new(),
            system_env: true,
        }
    }

    /// The given properties, backed by the process environment.
    pub fn from_properties(properties: HashMap<String, String>) -> Self {
        Self {
            properties,
            system_env: true,
        }
    }

    /// The given properties only; the process environment is ignored.
    pub fn isolated(properties: HashMap<String, String>) -> Self {
        Self {
            properties,
            system_env: false,
        }
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_property(key, value);
        self
    }

    pub fn set_property(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.properties.insert(key.into(), value.into());
    }

    pub fn property(&self, key: &str) -> Option<String> {
        if let Some(value) = self.properties.get(key) {
            return Some(value.clone());
        }
        if !self.system_env {
            return None;
        }
        std::env::var(key)
            .ok()
            .or_else(|| std::env::var(relaxed_env_name(key)).ok())
    }

    /// Replace every resolvable placeholder in `text`.
    pub fn resolve_placeholders(&self, text: &str) -> String {
        let mut current = text.to_owned();
        for _ in 0..MAX_DEPTH {
            let next = match self.resolve_once(&current) {
                Cow::Borrowed(_) => return current,
                Cow::Owned(next) => next,
            };
            if next == current {
                return current;
            }
            current = next;
        }
        current
    }

    fn resolve_once<'t>(&self, text: &'t str) -> Cow<'t, str> {
        placeholder_re().replace_all(text, |caps: &Captures<'_>| {
            let key = caps[1].trim();
            self.property(key)
                .or_else(|| caps.get(2).map(|d| d.as_str().to_owned()))
                .unwrap_or_else(|| caps[0].to_owned())
        })
    }
}

fn relaxed_env_name(key: &str) -> String {
    key.chars()
        .map(|c| match c {
            '.' | '-' => '_',
            c => c.to_ascii_uppercase(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(pairs: &[(&str, &str)]) -> Environment {
        Environment::isolated(
            pairs
                .iter()
                .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
                .collect(),
        )
    }

    #[test]
    fn resolves_properties_and_defaults() {
        let env = env(&[("svc.url", "http://svc:8080")]);

        assert_eq!(env.resolve_placeholders("${svc.url}/api"), "http://svc:8080/api");
        assert_eq!(env.resolve_placeholders("${missing:fallback}"), "fallback");
        assert_eq!(env.resolve_placeholders("${missing:}"), "");
        assert_eq!(env.resolve_placeholders("plain"), "plain");
    }

    #[test]
    fn unresolvable_placeholders_are_left_alone() {
        let env = env(&[]);
        assert_eq!(env.resolve_placeholders("${nope}/x"), "${nope}/x");
    }

    #[test]
    fn nested_values_resolve_with_bounded_depth() {
        let env = env(&[("a", "${b}"), ("b", "${c:deep}"), ("loop", "${loop}")]);

        assert_eq!(env.resolve_placeholders("${a}"), "deep");
        assert_eq!(env.resolve_placeholders("${loop}"), "${loop}");
    }

    #[test]
    fn falls_back_to_relaxed_process_env() {
        let var = "APIKIT_ENV_TEST_RELAXED_URL";
        std::env::set_var(var, "http://from-env");

        let env = Environment::new();
        assert_eq!(
            env.resolve_placeholders("${apikit.env-test.relaxed.url}"),
            "http://from-env"
        );
        assert_eq!(
            Environment::isolated(HashMap::new())
                .resolve_placeholders("${apikit.env-test.relaxed.url}"),
            "${apikit.env-test.relaxed.url}"
        );

        std::env::remove_var(var);
    }

    #[test]
    fn properties_win_over_process_env() {
        std::env::set_var("APIKIT_ENV_TEST_PRIORITY", "env");
        let env = Environment::new().with_property("APIKIT_ENV_TEST_PRIORITY", "props");

        assert_eq!(env.property("APIKIT_ENV_TEST_PRIORITY").as_deref(), Some("props"));
        std::env::remove_var("APIKIT_ENV_TEST_PRIORITY");
    }
}
