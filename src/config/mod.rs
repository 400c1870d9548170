use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::predicate::CombinationMode;

/// Optional YAML settings: defaults for the command line and named queries.
#[derive(Debug, Deserialize, Serialize)]
pub struct FilterConfig {
    #[serde(default)]
    pub default_mode: CombinationMode,
    /// Queries are written with `%` and `_` wildcards.
    #[serde(default = "default_true")]
    pub display_wildcards: bool,
    #[serde(default)]
    pub queries: Vec<SavedQueryConfig>,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            default_mode: CombinationMode::Replace,
            display_wildcards: true,
            queries: Vec::new(),
        }
    }
}

impl FilterConfig {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let settings = ::config::Config::builder()
            .add_source(::config::File::from(path))
            .build()?;
        Ok(settings.try_deserialize()?)
    }

    /// Text of the saved query called `name`.
    pub fn query(&self, name: &str) -> Option<&str> {
        self.queries
            .iter()
            .find(|q| q.name == name)
            .map(|q| q.query.as_str())
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct SavedQueryConfig {
    pub name: String,
    pub query: String,
}

fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn load(yaml: &str) -> anyhow::Result<FilterConfig> {
        let mut file = NamedTempFile::with_suffix(".yaml").unwrap();
        file.write_all(yaml.as_bytes()).unwrap();
        FilterConfig::load(file.path())
    }

    #[test]
    fn test_loads_full_config() {
        let config = load(
            r#"
default_mode: and-not
display_wildcards: false
queries:
  - name: costa
    query: "nombre = Cadiz or nombre = Huelva"
  - name: grandes
    query: "poblacion > 1000000"
"#,
        )
        .unwrap();

        assert_eq!(config.default_mode, CombinationMode::AndNotPrevious);
        assert!(!config.display_wildcards);
        assert_eq!(config.queries.len(), 2);
        assert_eq!(config.query("grandes"), Some("poblacion > 1000000"));
        assert_eq!(config.query("interior"), None);
    }

    #[test]
    fn test_missing_keys_use_defaults() {
        let config = load("default_mode: replace\n").unwrap();
        assert_eq!(config.default_mode, CombinationMode::Replace);
        assert!(config.display_wildcards);
        assert!(config.queries.is_empty());
    }

    #[test]
    fn test_rejects_unknown_mode() {
        assert!(load("default_mode: xor\n").is_err());
    }
}
