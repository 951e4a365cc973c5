use thiserror::Error;

use crate::config::ProductConfig;
use crate::input::InputRecord;

/// One resolved placeholder with the value that will replace it.
#[derive(Debug, Clone)]
pub struct Substitution {
    pub placeholder: String,
    pub input_field: String,
    pub value: String,
}

/// Resolved placeholder-to-value pairs, in mapping order.
#[derive(Debug, Clone)]
pub struct SubstitutionMap {
    entries: Vec<Substitution>,
}

impl SubstitutionMap {
    pub fn iter(&self) -> impl Iterator<Item = &Substitution> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Error, Debug)]
pub enum ResolveError {
    #[error("Expected column '{0}' based on config but it was not found in the input data")]
    MissingField(String),
}

/// Joins the configured mappings with one input record. Fails on the first
/// mapping whose input column is absent, before any document is touched.
pub fn resolve(config: &ProductConfig, record: &InputRecord) -> Result<SubstitutionMap, ResolveError> {
    let mut entries = Vec::with_capacity(config.mappings.len());
    for mapping in &config.mappings {
        let value = record
            .get(&mapping.input_field)
            .ok_or_else(|| ResolveError::MissingField(mapping.input_field.clone()))?;
        entries.push(Substitution {
            placeholder: mapping.placeholder.clone(),
            input_field: mapping.input_field.clone(),
            value: value.to_string(),
        });
    }
    Ok(SubstitutionMap { entries })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MappingEntry;
    use std::path::PathBuf;

    fn config_with(mappings: Vec<(&str, &str)>) -> ProductConfig {
        ProductConfig {
            product_name: None,
            template_path: PathBuf::from("t.docx"),
            output_path: PathBuf::from("out/t.docx"),
            mappings: mappings
                .into_iter()
                .map(|(placeholder, input_field)| MappingEntry {
                    placeholder: placeholder.to_string(),
                    input_field: input_field.to_string(),
                })
                .collect(),
            expected_replacement_count: None,
        }
    }

    fn record(content: &str) -> InputRecord {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("input.txt");
        std::fs::write(&path, content).unwrap();
        crate::input::read_records(&path).unwrap().remove(0)
    }

    #[test]
    fn test_resolve_one_entry_per_mapping() {
        let config = config_with(vec![("{{NAME}}", "Name"), ("{{DATE}}", "Date")]);
        let rec = record("Name\tDate\tExtra\nAlice\t2024-01-01\tignored\n");
        let map = resolve(&config, &rec).unwrap();
        assert_eq!(map.len(), 2);
        let entries: Vec<_> = map.iter().collect();
        assert_eq!(entries[0].placeholder, "{{NAME}}");
        assert_eq!(entries[0].value, "Alice");
        assert_eq!(entries[1].placeholder, "{{DATE}}");
        assert_eq!(entries[1].value, "2024-01-01");
    }

    #[test]
    fn test_resolve_missing_field() {
        let config = config_with(vec![("{{NAME}}", "Name")]);
        let rec = record("Date\n2024-01-01\n");
        match resolve(&config, &rec) {
            Err(ResolveError::MissingField(field)) => assert_eq!(field, "Name"),
            other => panic!("expected MissingField, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_resolve_empty_mappings() {
        let config = config_with(vec![]);
        let rec = record("Name\nAlice\n");
        let map = resolve(&config, &rec).unwrap();
        assert!(map.is_empty());
    }
}
