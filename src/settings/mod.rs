//! Settings document store
//!
//! A `NodeSettings` is a named tree of typed entries that keeps the order in
//! which entries were added. Table metadata (`data.xml`) and table specs
//! (`spec.xml`) are written as settings documents.

pub mod error;

pub use error::{SettingsError, SettingsResult};

use linked_hash_map::LinkedHashMap;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

/// A single typed entry of a settings document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum ConfigEntry {
    Int(i64),
    Bool(bool),
    /// Nullable string
    String(Option<String>),
    StringArray(Vec<String>),
    IntArray(Vec<i64>),
    BoolArray(Vec<bool>),
    Config(NodeSettings),
}

/// Named, insertion-ordered tree of typed entries
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeSettings {
    key: String,
    entries: LinkedHashMap<String, ConfigEntry>,
}

impl NodeSettings {
    /// Create an empty settings document with the given root key
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            entries: LinkedHashMap::new(),
        }
    }

    /// Root key of this document
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Keys in insertion order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(|k| k.as_str())
    }

    pub fn add_int(&mut self, key: &str, value: i64) {
        self.entries.insert(key.to_string(), ConfigEntry::Int(value));
    }

    pub fn add_bool(&mut self, key: &str, value: bool) {
        self.entries.insert(key.to_string(), ConfigEntry::Bool(value));
    }

    pub fn add_string(&mut self, key: &str, value: Option<&str>) {
        self.entries.insert(
            key.to_string(),
            ConfigEntry::String(value.map(|v| v.to_string())),
        );
    }

    pub fn add_string_array(&mut self, key: &str, values: &[String]) {
        self.entries
            .insert(key.to_string(), ConfigEntry::StringArray(values.to_vec()));
    }

    pub fn add_int_array(&mut self, key: &str, values: &[i64]) {
        self.entries
            .insert(key.to_string(), ConfigEntry::IntArray(values.to_vec()));
    }

    pub fn add_bool_array(&mut self, key: &str, values: &[bool]) {
        self.entries
            .insert(key.to_string(), ConfigEntry::BoolArray(values.to_vec()));
    }

    /// Add a sub-config under its own key
    pub fn add_node_settings(&mut self, settings: NodeSettings) {
        self.entries
            .insert(settings.key.clone(), ConfigEntry::Config(settings));
    }

    fn entry(&self, key: &str) -> SettingsResult<&ConfigEntry> {
        self.entries.get(key).ok_or_else(|| SettingsError::MissingKey {
            config: self.key.clone(),
            key: key.to_string(),
        })
    }

    fn wrong_type(key: &str, expected: &'static str) -> SettingsError {
        SettingsError::WrongType {
            key: key.to_string(),
            expected,
        }
    }

    pub fn get_int(&self, key: &str) -> SettingsResult<i64> {
        match self.entry(key)? {
            ConfigEntry::Int(v) => Ok(*v),
            _ => Err(Self::wrong_type(key, "int")),
        }
    }

    pub fn get_bool(&self, key: &str) -> SettingsResult<bool> {
        match self.entry(key)? {
            ConfigEntry::Bool(v) => Ok(*v),
            _ => Err(Self::wrong_type(key, "bool")),
        }
    }

    /// Get a nullable string; a missing key is an error, a null value is `None`
    pub fn get_string(&self, key: &str) -> SettingsResult<Option<String>> {
        match self.entry(key)? {
            ConfigEntry::String(v) => Ok(v.clone()),
            _ => Err(Self::wrong_type(key, "string")),
        }
    }

    pub fn get_string_array(&self, key: &str) -> SettingsResult<Vec<String>> {
        match self.entry(key)? {
            ConfigEntry::StringArray(v) => Ok(v.clone()),
            _ => Err(Self::wrong_type(key, "string array")),
        }
    }

    pub fn get_int_array(&self, key: &str) -> SettingsResult<Vec<i64>> {
        match self.entry(key)? {
            ConfigEntry::IntArray(v) => Ok(v.clone()),
            _ => Err(Self::wrong_type(key, "int array")),
        }
    }

    pub fn get_bool_array(&self, key: &str) -> SettingsResult<Vec<bool>> {
        match self.entry(key)? {
            ConfigEntry::BoolArray(v) => Ok(v.clone()),
            _ => Err(Self::wrong_type(key, "bool array")),
        }
    }

    pub fn get_node_settings(&self, key: &str) -> SettingsResult<&NodeSettings> {
        match self.entry(key)? {
            ConfigEntry::Config(v) => Ok(v),
            _ => Err(Self::wrong_type(key, "config")),
        }
    }

    /// Write the document to `path`, replacing any existing file
    pub fn save_to_file(&self, path: &Path) -> SettingsResult<()> {
        let io_err = |source| SettingsError::Io {
            path: path.to_path_buf(),
            source,
        };
        let file = File::create(path).map_err(io_err)?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, self).map_err(|e| SettingsError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        writer.flush().map_err(io_err)?;
        Ok(())
    }

    /// Read a document previously written by [`NodeSettings::save_to_file`]
    pub fn load_from_file(path: &Path) -> SettingsResult<Self> {
        let file = File::open(path).map_err(|source| SettingsError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_reader(BufReader::new(file)).map_err(|e| SettingsError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_typed_entries() {
        let mut s = NodeSettings::new("root");
        s.add_int("id", 42);
        s.add_string("file", None);
        s.add_string_array("refs", &["r0".to_string(), "r1".to_string()]);

        assert_eq!(s.get_int("id").unwrap(), 42);
        assert_eq!(s.get_string("file").unwrap(), None);
        assert_eq!(s.get_string_array("refs").unwrap().len(), 2);
        assert!(matches!(
            s.get_int("refs"),
            Err(SettingsError::WrongType { .. })
        ));
        assert!(matches!(
            s.get_int("missing"),
            Err(SettingsError::MissingKey { .. })
        ));
    }

    #[test]
    fn test_insertion_order_survives_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("data.xml");

        let mut s = NodeSettings::new("table_meta_info");
        s.add_string("z_last_alphabetically", Some("first"));
        s.add_int("a_first_alphabetically", 2);
        let mut sub = NodeSettings::new("meta_internal");
        sub.add_bool_array("flags", &[true, false]);
        s.add_node_settings(sub);
        s.save_to_file(&path).unwrap();

        let loaded = NodeSettings::load_from_file(&path).unwrap();
        assert_eq!(loaded, s);
        let keys: Vec<&str> = loaded.keys().collect();
        assert_eq!(
            keys,
            vec!["z_last_alphabetically", "a_first_alphabetically", "meta_internal"]
        );
        let sub = loaded.get_node_settings("meta_internal").unwrap();
        assert_eq!(sub.get_bool_array("flags").unwrap(), vec![true, false]);
    }

    #[test]
    fn test_load_garbage_is_parse_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("data.xml");
        std::fs::write(&path, b"<not json>").unwrap();

        let result = NodeSettings::load_from_file(&path);
        assert!(matches!(result, Err(SettingsError::Parse { .. })));
    }
}
