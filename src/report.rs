use std::fmt;

use crate::mapper::SubstitutionMap;

/// Per-placeholder replacement counts for one run.
#[derive(Debug, Clone)]
pub struct PlaceholderStats {
    pub placeholder: String,
    /// Counts per document part, in processing order.
    pub per_part: Vec<(String, usize)>,
}

impl PlaceholderStats {
    pub fn total(&self) -> usize {
        self.per_part.iter().map(|(_, n)| n).sum()
    }
}

/// Non-fatal findings attached to a report after a successful save.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportWarning {
    ZeroMatch { placeholder: String },
    CountMismatch { expected: u64, actual: u64 },
}

impl fmt::Display for ReportWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReportWarning::ZeroMatch { placeholder } => {
                write!(f, "Placeholder {} not found in the document", placeholder)
            }
            ReportWarning::CountMismatch { expected, actual } => write!(
                f,
                "Total placeholders replaced ({}) does not match expected count ({})",
                actual, expected
            ),
        }
    }
}

/// Summary of one substitution run: how many occurrences of each
/// placeholder were found and replaced, and where.
#[derive(Debug, Clone)]
pub struct ReplacementReport {
    entries: Vec<PlaceholderStats>,
    expected: Option<u64>,
}

impl ReplacementReport {
    /// Creates an empty report with one entry per placeholder, in map order.
    pub fn new(map: &SubstitutionMap, expected: Option<u64>) -> Self {
        let entries = map
            .iter()
            .map(|sub| PlaceholderStats {
                placeholder: sub.placeholder.clone(),
                per_part: Vec::new(),
            })
            .collect();
        Self { entries, expected }
    }

    /// Records `count` replacements of `placeholder` within `part`.
    /// Zero counts are not recorded.
    pub fn record(&mut self, placeholder: &str, part: &str, count: usize) {
        if count == 0 {
            return;
        }
        if let Some(stats) = self
            .entries
            .iter_mut()
            .find(|s| s.placeholder == placeholder)
        {
            stats.per_part.push((part.to_string(), count));
        }
    }

    pub fn entries(&self) -> &[PlaceholderStats] {
        &self.entries
    }

    pub fn count_for(&self, placeholder: &str) -> usize {
        self.entries
            .iter()
            .find(|s| s.placeholder == placeholder)
            .map_or(0, PlaceholderStats::total)
    }

    pub fn total(&self) -> usize {
        self.entries.iter().map(PlaceholderStats::total).sum()
    }

    pub fn expected(&self) -> Option<u64> {
        self.expected
    }

    /// Zero-match warnings in map order, then the count mismatch if any.
    pub fn warnings(&self) -> Vec<ReportWarning> {
        let mut warnings: Vec<ReportWarning> = self
            .entries
            .iter()
            .filter(|s| s.total() == 0)
            .map(|s| ReportWarning::ZeroMatch {
                placeholder: s.placeholder.clone(),
            })
            .collect();
        if let Some(expected) = self.expected {
            let actual = self.total() as u64;
            if actual != expected {
                warnings.push(ReportWarning::CountMismatch { expected, actual });
            }
        }
        warnings
    }
}
