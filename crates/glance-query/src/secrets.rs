//! Secrets store: nested key-value configuration loaded once at process start.
//!
//! The store is partitioned into top-level sections, one per backend
//! (`[bigquery]`, `[snowflake]`, ...). This module only does presence checks
//! and hands entire sections to connector factories verbatim; interpreting the
//! fields is each backend's job.

use crate::error::{DataError, Result};
use std::path::Path;

/// One top-level section of the secrets store, passed verbatim to factories
pub type SecretSection = toml::Table;

/// In-memory secrets store, read-only after load
#[derive(Debug, Clone, Default)]
pub struct SecretStore {
    sections: toml::Table,
}

impl SecretStore {
    /// Empty store (no backend is connectable)
    pub fn empty() -> Self {
        Self::default()
    }

    /// Parse a TOML document into a secrets store
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let sections: toml::Table = toml::from_str(raw)
            .map_err(|e| DataError::InvalidConfiguration(format!("Invalid secrets TOML: {}", e)))?;
        Ok(Self { sections })
    }

    /// Load a secrets file from disk
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            DataError::InvalidConfiguration(format!(
                "Cannot read secrets file {}: {}",
                path.display(),
                e
            ))
        })?;
        Self::from_toml_str(&raw)
    }

    /// Whether a top-level section exists under `key`
    pub fn has_section(&self, key: &str) -> bool {
        matches!(self.sections.get(key), Some(toml::Value::Table(_)))
    }

    /// Get a section by key. Non-table values are treated as absent.
    pub fn section(&self, key: &str) -> Option<&SecretSection> {
        match self.sections.get(key) {
            Some(toml::Value::Table(table)) => Some(table),
            _ => None,
        }
    }

    /// Names of all present sections
    pub fn section_keys(&self) -> Vec<&str> {
        self.sections
            .iter()
            .filter(|(_, v)| v.is_table())
            .map(|(k, _)| k.as_str())
            .collect()
    }
}

/// Deserialize a secret section into a typed credentials struct
pub fn parse_section<T: serde::de::DeserializeOwned>(section: &SecretSection) -> Result<T> {
    toml::Value::Table(section.clone())
        .try_into()
        .map_err(|e| DataError::InvalidCredentials(format!("Malformed secret section: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presence_check() {
        let store = SecretStore::from_toml_str(
            r#"
            [bigquery]
            project_id = "my-project"

            [gsheets]
            public_gsheets_url = "https://docs.google.com/spreadsheets/d/xyz"
            "#,
        )
        .unwrap();

        assert!(store.has_section("bigquery"));
        assert!(store.has_section("gsheets"));
        assert!(!store.has_section("snowflake"));
        assert_eq!(store.section_keys(), vec!["bigquery", "gsheets"]);
    }

    #[test]
    fn test_empty_store_has_nothing() {
        let store = SecretStore::empty();
        assert!(!store.has_section("bigquery"));
        assert!(store.section("bigquery").is_none());
    }

    #[test]
    fn test_non_table_value_is_not_a_section() {
        let store = SecretStore::from_toml_str("bigquery = \"oops\"").unwrap();
        assert!(!store.has_section("bigquery"));
    }

    #[test]
    fn test_invalid_toml_is_rejected() {
        let err = SecretStore::from_toml_str("not [valid toml").unwrap_err();
        assert!(matches!(err, DataError::InvalidConfiguration(_)));
    }

    #[test]
    fn test_parse_section_into_typed_credentials() {
        #[derive(serde::Deserialize)]
        struct Creds {
            public_gsheets_url: String,
        }

        let store = SecretStore::from_toml_str(
            "[gsheets]\npublic_gsheets_url = \"https://docs.google.com/spreadsheets/d/xyz\"\n",
        )
        .unwrap();
        let creds: Creds = parse_section(store.section("gsheets").unwrap()).unwrap();
        assert!(creds.public_gsheets_url.starts_with("https://docs.google.com/"));
    }

    #[test]
    fn test_parse_section_missing_field() {
        #[derive(Debug, serde::Deserialize)]
        #[allow(dead_code)]
        struct Creds {
            public_gsheets_url: String,
        }

        let store = SecretStore::from_toml_str("[gsheets]\nother = 1\n").unwrap();
        let err = parse_section::<Creds>(store.section("gsheets").unwrap()).unwrap_err();
        assert!(matches!(err, DataError::InvalidCredentials(_)));
    }
}
