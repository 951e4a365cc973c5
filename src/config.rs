use log::warn;
use serde::Deserialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// One product configuration, loaded from a JSON file.
#[derive(Debug, Deserialize)]
pub struct ProductConfig {
    /// Display name shown in the selection menu.
    pub product_name: Option<String>,

    /// Path to the .docx template.
    pub template_path: PathBuf,

    /// Destination for the filled document. A trailing separator or an
    /// existing directory means "this directory, keep the template's
    /// file name".
    pub output_path: PathBuf,

    /// Ordered placeholder-to-column pairs. Placeholders must be unique.
    pub mappings: Vec<MappingEntry>,

    /// Total replacement count the template is expected to produce.
    pub expected_replacement_count: Option<u64>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct MappingEntry {
    pub placeholder: String,
    pub input_field: String,
}

/// A config file discovered in the config directory, for menu display.
#[derive(Debug, Clone)]
pub struct ConfigSummary {
    pub path: PathBuf,
    pub file_name: String,
    pub product_name: String,
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Config file not found: {0}")]
    NotFound(PathBuf),
    #[error("Config directory not found: {0}")]
    DirNotFound(PathBuf),
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Config file is missing required keys: {}", .0.join(", "))]
    MissingKeys(Vec<String>),
    #[error("Config contains duplicate placeholder: {0}")]
    DuplicatePlaceholder(String),
}

const REQUIRED_KEYS: [&str; 3] = ["template_path", "output_path", "mappings"];

impl ProductConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }
        let content = std::fs::read_to_string(path)?;
        let value: serde_json::Value = serde_json::from_str(&content)?;

        // Check keys against the raw value so the error names the keys
        // instead of surfacing a serde message.
        let missing: Vec<String> = REQUIRED_KEYS
            .iter()
            .filter(|key| value.get(**key).is_none())
            .map(|key| key.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(ConfigError::MissingKeys(missing));
        }

        let config: ProductConfig = serde_json::from_value(value)?;

        let mut seen = HashSet::new();
        for entry in &config.mappings {
            if !seen.insert(entry.placeholder.as_str()) {
                return Err(ConfigError::DuplicatePlaceholder(entry.placeholder.clone()));
            }
        }

        Ok(config)
    }
}

/// Lists all readable JSON config files in `dir`, sorted by file name.
/// Unreadable or invalid files are skipped with a warning.
pub fn list_config_files(dir: &Path) -> Result<Vec<ConfigSummary>, ConfigError> {
    if !dir.exists() {
        return Err(ConfigError::DirNotFound(dir.to_path_buf()));
    }

    let mut summaries = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if path.extension().map_or(true, |ext| ext != "json") {
            continue;
        }
        let file_name = match path.file_name().and_then(|n| n.to_str()) {
            Some(name) => name.to_string(),
            None => continue,
        };
        let value: serde_json::Value = match std::fs::read_to_string(&path)
            .map_err(ConfigError::Io)
            .and_then(|content| serde_json::from_str(&content).map_err(ConfigError::Json))
        {
            Ok(value) => value,
            Err(e) => {
                warn!("Skipping '{}': unable to read or invalid JSON ({})", file_name, e);
                continue;
            }
        };
        let product_name = value
            .get("product_name")
            .and_then(|v| v.as_str())
            .unwrap_or("Unknown Product")
            .to_string();
        summaries.push(ConfigSummary {
            path,
            file_name,
            product_name,
        });
    }

    summaries.sort_by(|a, b| a.file_name.cmp(&b.file_name));
    Ok(summaries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn write_config(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    const VALID: &str = r#"{
        "product_name": "FCN",
        "template_path": "templates/fcn.docx",
        "output_path": "out/fcn.docx",
        "mappings": [
            {"placeholder": "{{NAME}}", "input_field": "Name"},
            {"placeholder": "{{DATE}}", "input_field": "Date"}
        ],
        "expected_replacement_count": 3
    }"#;

    #[test]
    fn test_load_valid() {
        let dir = tempdir().unwrap();
        let path = write_config(dir.path(), "fcn.json", VALID);
        let config = ProductConfig::load(&path).unwrap();
        assert_eq!(config.product_name.as_deref(), Some("FCN"));
        assert_eq!(config.mappings.len(), 2);
        assert_eq!(config.mappings[0].placeholder, "{{NAME}}");
        assert_eq!(config.mappings[0].input_field, "Name");
        assert_eq!(config.expected_replacement_count, Some(3));
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempdir().unwrap();
        let result = ProductConfig::load(&dir.path().join("absent.json"));
        assert!(matches!(result, Err(ConfigError::NotFound(_))));
    }

    #[test]
    fn test_load_invalid_json() {
        let dir = tempdir().unwrap();
        let path = write_config(dir.path(), "bad.json", "{ not json");
        let result = ProductConfig::load(&path);
        assert!(matches!(result, Err(ConfigError::Json(_))));
    }

    #[test]
    fn test_load_missing_keys_named() {
        let dir = tempdir().unwrap();
        let path = write_config(dir.path(), "partial.json", r#"{"template_path": "t.docx"}"#);
        match ProductConfig::load(&path) {
            Err(ConfigError::MissingKeys(keys)) => {
                assert_eq!(keys, vec!["output_path".to_string(), "mappings".to_string()]);
            }
            other => panic!("expected MissingKeys, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_load_duplicate_placeholder() {
        let dir = tempdir().unwrap();
        let path = write_config(
            dir.path(),
            "dup.json",
            r#"{
                "template_path": "t.docx",
                "output_path": "out/t.docx",
                "mappings": [
                    {"placeholder": "{{NAME}}", "input_field": "Name"},
                    {"placeholder": "{{NAME}}", "input_field": "FullName"}
                ]
            }"#,
        );
        match ProductConfig::load(&path) {
            Err(ConfigError::DuplicatePlaceholder(p)) => assert_eq!(p, "{{NAME}}"),
            other => panic!("expected DuplicatePlaceholder, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_list_config_files_sorted_and_filtered() {
        let dir = tempdir().unwrap();
        write_config(dir.path(), "b.json", VALID);
        write_config(dir.path(), "a.json", r#"{"product_name": "ELN"}"#);
        write_config(dir.path(), "broken.json", "{ nope");
        write_config(dir.path(), "notes.txt", "not a config");

        let summaries = list_config_files(dir.path()).unwrap();
        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries[0].file_name, "a.json");
        assert_eq!(summaries[0].product_name, "ELN");
        assert_eq!(summaries[1].file_name, "b.json");
        assert_eq!(summaries[1].product_name, "FCN");
    }

    #[test]
    fn test_list_config_files_missing_dir() {
        let dir = tempdir().unwrap();
        let result = list_config_files(&dir.path().join("nope"));
        assert!(matches!(result, Err(ConfigError::DirNotFound(_))));
    }

    #[test]
    fn test_list_config_files_default_product_name() {
        let dir = tempdir().unwrap();
        write_config(dir.path(), "c.json", r#"{"template_path": "t.docx"}"#);
        let summaries = list_config_files(dir.path()).unwrap();
        assert_eq!(summaries[0].product_name, "Unknown Product");
    }
}
