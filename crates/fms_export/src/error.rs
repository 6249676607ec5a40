//! Export error types.

/// Errors that can occur while rendering or delivering an export.
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    /// The requested format tag is not one of `pdf`, `excel` or `csv`.
    #[error("Unsupported export format: {0}")]
    UnsupportedFormat(String),

    /// Strict projection: a column path did not resolve in a row.
    #[error("Row {row}: field '{path}' is missing")]
    MissingField { row: usize, path: String },

    /// Strict projection: a value could not be coerced for its column type.
    #[error("Row {row}: field '{path}': {reason}")]
    InvalidValue {
        row: usize,
        path: String,
        reason: String,
    },

    /// CSV writer or reader failure.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Workbook construction failure.
    #[error("XLSX error: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),

    /// The sink could not persist the artifact.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
