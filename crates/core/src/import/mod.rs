//! Bulk import of clients and products from spreadsheet exports.

pub mod clients;
pub mod csv;
pub mod products;

use serde::Serialize;
use thiserror::Error;

pub use clients::{import_clients, CLIENT_COLUMNS};
pub use products::{import_products, PRODUCT_COLUMNS};

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SkippedRow {
    /// 1-based line of the source file where the row starts.
    pub line: usize,
    pub reason: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ImportReport<T> {
    pub accepted: Vec<T>,
    pub skipped: Vec<SkippedRow>,
}

impl<T> ImportReport<T> {
    fn finish(self) -> Result<Self, ImportError> {
        if self.accepted.is_empty() {
            return Err(ImportError::NoValidRows { skipped: self.skipped.len() });
        }
        Ok(self)
    }
}

impl<T> Default for ImportReport<T> {
    fn default() -> Self {
        Self { accepted: Vec::new(), skipped: Vec::new() }
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ImportError {
    #[error("the file is empty or has no header row")]
    MissingHeader,
    #[error("required column `{0}` is missing from the header")]
    MissingColumn(String),
    #[error("quoted field starting on line {line} is never closed")]
    UnterminatedQuote { line: usize },
    #[error("no valid rows to import ({skipped} skipped)")]
    NoValidRows { skipped: usize },
}
