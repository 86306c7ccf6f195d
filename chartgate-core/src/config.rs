use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const DEFAULT_CONFIG_PATH: &str = "~/.config/chartgate/config.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to write config {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Construction-time settings of a [`crate::Mediator`]. Immutable once the mediator is built.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MediatorConfig {
    /// Allowed domain suffixes keyed by protocol (`http`, `https`, or a pseudo-protocol name;
    /// the trailing colon is optional).
    #[serde(default)]
    pub domains: HashMap<String, Vec<String>>,
    /// Short alias to canonical domain, applied before any allow-list test.
    #[serde(default)]
    pub domain_map: HashMap<String, String>,
    /// Permit raw `http:`/`https:` URLs in chart specs.
    #[serde(default)]
    pub is_trusted: bool,
    /// Default `uselang` for `tabular:` and `map:` requests.
    #[serde(default)]
    pub language_code: Option<String>,
}

impl MediatorConfig {
    /// Builder-style helper for adding an allow-list entry.
    pub fn with_domains<I, S>(mut self, protocol: &str, domains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.domains
            .entry(protocol.to_string())
            .or_default()
            .extend(domains.into_iter().map(Into::into));
        self
    }

    pub fn with_alias(mut self, alias: &str, domain: &str) -> Self {
        self.domain_map.insert(alias.to_string(), domain.to_string());
        self
    }

    pub fn with_trusted(mut self, is_trusted: bool) -> Self {
        self.is_trusted = is_trusted;
        self
    }

    pub fn with_language_code(mut self, code: &str) -> Self {
        self.language_code = Some(code.to_string());
        self
    }

    /// A starting point for a Wikimedia-style deployment, written by `chartgate init`.
    pub fn wikimedia_defaults() -> Self {
        Self::default()
            .with_domains(
                "https",
                [
                    "mediawiki.org",
                    "wikibooks.org",
                    "wikidata.org",
                    "wikimedia.org",
                    "wikinews.org",
                    "wikipedia.org",
                    "wikiquote.org",
                    "wikisource.org",
                    "wikiversity.org",
                    "wikivoyage.org",
                    "wiktionary.org",
                ],
            )
            .with_domains("wikirawupload", ["upload.wikimedia.org"])
            .with_domains("wikidatasparql", ["query.wikidata.org"])
            .with_domains("geoshape", ["maps.wikimedia.org"])
            .with_alias("wikipedia", "en.wikipedia.org")
            .with_alias("commons", "commons.wikimedia.org")
            .with_alias("wikidata", "www.wikidata.org")
    }

    pub fn from_toml_str(data: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(data)?)
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let data = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&data)?;
        tracing::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let data = self.to_toml_string()?;
        let write_err = |source: std::io::Error| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(write_err)?;
        }
        fs::write(path, data).map_err(write_err)?;
        tracing::info!("Wrote config to {}", path.display());
        Ok(())
    }
}

/// Expands a leading `~` in a user-supplied config path.
pub fn expand_path(path: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(path).as_ref())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_toml_with_colon_keys() {
        let config = MediatorConfig::from_toml_str(
            r#"
            is_trusted = true
            language_code = "fr"

            [domains]
            https = ["sec.org"]
            "wikirawupload:" = ["upload.sec.org"]

            [domain_map]
            sec = "sec.org"
            "#,
        )
        .unwrap();

        assert!(config.is_trusted);
        assert_eq!(config.language_code.as_deref(), Some("fr"));
        assert_eq!(config.domains["https"], vec!["sec.org"]);
        assert_eq!(config.domains["wikirawupload:"], vec!["upload.sec.org"]);
        assert_eq!(config.domain_map["sec"], "sec.org");
    }

    #[test]
    fn missing_sections_default() {
        let config = MediatorConfig::from_toml_str("").unwrap();
        assert_eq!(config, MediatorConfig::default());
        assert!(!config.is_trusted);
    }

    #[test]
    fn rejects_wrong_types() {
        let result = MediatorConfig::from_toml_str("is_trusted = \"yes\"");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let config = MediatorConfig::wikimedia_defaults().with_trusted(true);

        config.save(&path).unwrap();
        let loaded = MediatorConfig::load(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn load_missing_file_reports_path() {
        let err = MediatorConfig::load(Path::new("/nonexistent/chartgate.toml")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/chartgate.toml"));
    }

    #[test]
    fn plain_paths_are_unchanged() {
        let path = expand_path("/etc/chartgate.toml");
        assert_eq!(path, PathBuf::from("/etc/chartgate.toml"));
    }
}
