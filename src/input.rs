use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// One row of the input file, keyed by column header.
#[derive(Debug, Clone)]
pub struct InputRecord {
    headers: Vec<String>,
    values: HashMap<String, String>,
}

impl InputRecord {
    pub fn get(&self, field: &str) -> Option<&str> {
        self.values.get(field).map(|v| v.as_str())
    }

    pub fn contains(&self, field: &str) -> bool {
        self.values.contains_key(field)
    }

    /// Column headers in file order.
    pub fn headers(&self) -> &[String] {
        &self.headers
    }
}

#[derive(Error, Debug)]
pub enum InputError {
    #[error("Data file not found: {0}")]
    NotFound(PathBuf),
    #[error("Failed to read data file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Data file '{0}' has no header line")]
    EmptyFile(PathBuf),
    #[error("Data file '{0}' has a header but no data rows")]
    MissingDataRow(PathBuf),
}

/// Reads a delimited input file into records, one per non-blank data line,
/// in file order. The delimiter is tab, or comma for `.csv` files.
pub fn read_records(path: &Path) -> Result<Vec<InputRecord>, InputError> {
    if !path.exists() {
        return Err(InputError::NotFound(path.to_path_buf()));
    }
    let content = std::fs::read_to_string(path)?;
    let delimiter = delimiter_for(path);

    let mut lines = content.lines().filter(|line| !line.trim().is_empty());
    let header_line = match lines.next() {
        Some(line) => line,
        None => return Err(InputError::EmptyFile(path.to_path_buf())),
    };
    let headers: Vec<String> = header_line
        .split(delimiter)
        .map(|h| h.trim().to_string())
        .collect();

    let mut records = Vec::new();
    for line in lines {
        let cells: Vec<String> = line.split(delimiter).map(|v| v.trim().to_string()).collect();
        // Pair up to the shorter row; a short row simply lacks the
        // trailing columns.
        let values = headers
            .iter()
            .cloned()
            .zip(cells)
            .collect::<HashMap<_, _>>();
        records.push(InputRecord {
            headers: headers.clone(),
            values,
        });
    }

    if records.is_empty() {
        return Err(InputError::MissingDataRow(path.to_path_buf()));
    }
    Ok(records)
}

fn delimiter_for(path: &Path) -> char {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("csv") => ',',
        _ => '\t',
    }
}
