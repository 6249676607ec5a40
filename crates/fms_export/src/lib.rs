//! Tabular export for FMS list views.
//!
//! Rows are arbitrary JSON objects; [`ColumnDescriptor`]s pick values out of
//! them by dotted path and label them. The [`Exporter`] dispatches on
//! [`ExportFormat`] to the CSV, XLSX or PDF serializer and hands the finished
//! [`Artifact`] to a [`DownloadSink`].

pub mod aging;
pub mod column;
pub mod csv;
pub mod dispatch;
pub mod error;
pub mod pdf;
pub mod projector;
pub mod xlsx;

pub use aging::{AgingBucket, AgingReport, AgingSpec, aging_columns, tally_aging};
pub use column::{ColumnDescriptor, ColumnType};
pub use dispatch::{
    Artifact, DirectorySink, DownloadSink, ExportFormat, ExportRequest, Exporter, MemorySink,
};
pub use error::ExportError;
pub use projector::{ProjectionOptions, format_value, get_nested_value, project_row};

/// Result alias for export operations.
pub type Result<T> = std::result::Result<T, ExportError>;
