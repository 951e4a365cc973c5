//! Fills placeholders in `.docx` templates using values read from a
//! tabular input file, guided by JSON configuration files that describe
//! the column-to-placeholder mapping.
//!
//! A run is four steps: load a [`config::ProductConfig`], read one
//! [`input::InputRecord`], join them into a [`mapper::SubstitutionMap`],
//! and hand that to [`document::substitute`], which rewrites the
//! template's text content while leaving formatting untouched and
//! returns a [`report::ReplacementReport`].

pub mod config;
pub mod document;
pub mod input;
pub mod mapper;
pub mod report;

pub use config::{ConfigError, ConfigSummary, MappingEntry, ProductConfig};
pub use document::{substitute, DocumentError};
pub use input::{read_records, InputError, InputRecord};
pub use mapper::{resolve, ResolveError, Substitution, SubstitutionMap};
pub use report::{ReplacementReport, ReportWarning};
