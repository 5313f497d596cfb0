//! Filter definitions loaded from YAML or JSON files.
//!
//! ```yaml
//! filters:
//!   - host: api.example.com
//!     path: /login
//!     method: POST
//!     response:
//!       statusCode: 200
//!       contentType: application/json
//!     body: {"token": "abc"}
//! ```

mod filters;

use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::error::MockerError;
use crate::filter::RequestFilter;
use crate::registry::FilterRegistry;

pub use filters::FilterSpec;

/// A batch of filter definitions, in registration order
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct MockerConfig {
    #[serde(default)]
    pub filters: Vec<FilterSpec>,
}

impl MockerConfig {
    /// Load and validate a definitions file.
    ///
    /// `.json` files are parsed as JSON, anything else as YAML.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, anyhow::Error> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read filter definitions from {}", path.display()))?;

        let is_json = path
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case("json"))
            .unwrap_or(false);

        let config = if is_json {
            Self::from_json_str(&contents)
        } else {
            Self::from_yaml_str(&contents)
        };
        config.with_context(|| format!("Invalid filter definitions in {}", path.display()))
    }

    pub fn from_yaml_str(contents: &str) -> Result<Self, anyhow::Error> {
        let config: MockerConfig = serde_yaml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_str(contents: &str) -> Result<Self, anyhow::Error> {
        let config: MockerConfig = serde_json::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate every definition
    pub fn validate(&self) -> Result<(), MockerError> {
        for (index, definition) in self.filters.iter().enumerate() {
            definition.validate(index)?;
        }
        Ok(())
    }

    /// Build the filters, preserving definition order
    pub fn into_filters(self) -> Result<Vec<RequestFilter>, MockerError> {
        self.filters
            .into_iter()
            .enumerate()
            .map(|(index, definition)| definition.into_filter(index))
            .collect()
    }

    /// Build the filters and register them, replacing the registry's rule set.
    ///
    /// Nothing is registered if any definition is invalid.
    pub fn register(self, registry: &FilterRegistry) -> Result<usize, MockerError> {
        let filters = self.into_filters()?;
        let count = filters.len();
        registry.register(filters);
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::MockRequest;
    use crate::resolver::ResponseResolver;
    use std::io::Write;

    const YAML: &str = r#"
filters:
  - host: api.example.com
    path: /login
    method: POST
    body: {"token": "abc"}
  - name: teapot
    host: api.example.com
    path: /brew
    method: GET
    response:
      statusCode: "418"
      headerFields:
        X-Pot: short
      contentType: text/plain
    body: "I'm a teapot"
"#;

    #[test]
    fn test_from_yaml_str() {
        let config = MockerConfig::from_yaml_str(YAML).unwrap();
        assert_eq!(config.filters.len(), 2);
        assert_eq!(config.filters[1].name.as_deref(), Some("teapot"));
        assert_eq!(
            config.filters[1].response.as_ref().unwrap().status_code,
            418
        );
    }

    #[test]
    fn test_from_json_str() {
        let json = r#"{"filters": [{"host": "h", "path": "/p", "method": "GET", "body": "ok"}]}"#;
        let config = MockerConfig::from_json_str(json).unwrap();
        assert_eq!(config.filters.len(), 1);
    }

    #[test]
    fn test_empty_config() {
        let config = MockerConfig::from_yaml_str("{}").unwrap();
        assert!(config.filters.is_empty());
    }

    #[test]
    fn test_invalid_definition_rejected() {
        let yaml = "filters:\n  - host: h\n    path: p\n    method: GET\n    body: x\n";
        let err = MockerConfig::from_yaml_str(yaml).unwrap_err();
        assert!(err.to_string().contains("must start with '/'"));
    }

    #[test]
    fn test_register_resolves_definitions() {
        let registry = FilterRegistry::new();
        let count = MockerConfig::from_yaml_str(YAML)
            .unwrap()
            .register(&registry)
            .unwrap();
        assert_eq!(count, 2);

        let resolver = ResponseResolver::new(registry);
        let login = resolver
            .resolve(&MockRequest::new("POST", "api.example.com", "/login"))
            .unwrap()
            .unwrap();
        assert_eq!(login.status_code, 200);
        assert_eq!(login.body_str(), Some(r#"{"token":"abc"}"#));

        let brew = resolver
            .resolve(&MockRequest::new("GET", "api.example.com", "/brew"))
            .unwrap()
            .unwrap();
        assert_eq!(brew.status_code, 418);
        assert_eq!(brew.header("content-type"), Some("text/plain"));
        assert_eq!(brew.header("x-pot"), Some("short"));
        assert_eq!(brew.body_str(), Some("I'm a teapot"));
    }

    #[test]
    fn test_from_file_yaml_and_json() {
        let dir = tempfile::tempdir().unwrap();

        let yaml_path = dir.path().join("filters.yaml");
        std::fs::File::create(&yaml_path)
            .unwrap()
            .write_all(YAML.as_bytes())
            .unwrap();
        assert_eq!(MockerConfig::from_file(&yaml_path).unwrap().filters.len(), 2);

        let json_path = dir.path().join("filters.json");
        std::fs::write(
            &json_path,
            r#"{"filters": [{"host": "h", "path": "/p", "method": "GET", "body": [1, 2]}]}"#,
        )
        .unwrap();
        assert_eq!(MockerConfig::from_file(&json_path).unwrap().filters.len(), 1);
    }

    #[test]
    fn test_from_file_missing() {
        let err = MockerConfig::from_file("/nonexistent/filters.yaml").unwrap_err();
        assert!(err.to_string().contains("Failed to read filter definitions"));
    }
}
