//! Export dispatch: format selection, rendering and delivery.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::{DateTime, Local};
use fms_core::ExportConfig;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

use crate::column::ColumnDescriptor;
use crate::projector::ProjectionOptions;
use crate::xlsx::DEFAULT_COLUMN_WIDTH;
use crate::{ExportError, Result, csv, pdf, xlsx};

/// Output format of an export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ExportFormat {
    Pdf,
    Excel,
    Csv,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Excel => "xlsx",
            Self::Csv => "csv",
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            Self::Pdf => "application/pdf",
            Self::Excel => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
            Self::Csv => "text/csv;charset=utf-8",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Excel => "excel",
            Self::Csv => "csv",
        }
    }
}

impl FromStr for ExportFormat {
    type Err = ExportError;

    fn from_str(tag: &str) -> Result<Self> {
        match tag.trim().to_ascii_lowercase().as_str() {
            "pdf" => Ok(Self::Pdf),
            "excel" | "xlsx" => Ok(Self::Excel),
            "csv" => Ok(Self::Csv),
            _ => Err(ExportError::UnsupportedFormat(tag.to_string())),
        }
    }
}

impl TryFrom<String> for ExportFormat {
    type Error = ExportError;

    fn try_from(tag: String) -> Result<Self> {
        tag.parse()
    }
}

impl From<ExportFormat> for String {
    fn from(format: ExportFormat) -> Self {
        format.as_str().to_string()
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One export action: what to render and how to name it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportRequest {
    pub format: ExportFormat,
    /// Base file name; the format extension is appended.
    pub filename: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sheet_name: Option<String>,
    pub columns: Vec<ColumnDescriptor>,
    #[serde(default)]
    pub data: Vec<Value>,
}

impl ExportRequest {
    pub fn new(
        format: ExportFormat,
        filename: impl Into<String>,
        columns: Vec<ColumnDescriptor>,
        data: Vec<Value>,
    ) -> Self {
        Self {
            format,
            filename: filename.into(),
            title: None,
            sheet_name: None,
            columns,
            data,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_sheet_name(mut self, sheet_name: impl Into<String>) -> Self {
        self.sheet_name = Some(sheet_name.into());
        self
    }

    /// Parse a request from JSON. Unknown format tags are rejected.
    pub fn from_json(json: &str) -> std::result::Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// `${filename}.${extension}`
    pub fn artifact_name(&self) -> String {
        format!("{}.{}", self.filename, self.format.extension())
    }
}

/// A rendered export ready for delivery.
#[derive(Debug, Clone, PartialEq)]
pub struct Artifact {
    pub filename: String,
    pub mime_type: &'static str,
    pub bytes: Vec<u8>,
}

/// Destination for finished artifacts.
pub trait DownloadSink: Send + Sync {
    /// Deliver the artifact and return where it ended up.
    fn deliver(&self, artifact: Artifact) -> Result<PathBuf>;
}

/// Writes artifacts into a directory, creating it on first use.
#[derive(Debug, Clone)]
pub struct DirectorySink {
    dir: PathBuf,
}

impl DirectorySink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl DownloadSink for DirectorySink {
    fn deliver(&self, artifact: Artifact) -> Result<PathBuf> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(sanitize_filename(&artifact.filename));
        std::fs::write(&path, &artifact.bytes)?;
        Ok(path)
    }
}

/// Keeps artifacts in memory, for embedding and tests.
#[derive(Debug, Default)]
pub struct MemorySink {
    artifacts: Mutex<Vec<Artifact>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn artifacts(&self) -> Vec<Artifact> {
        self.artifacts.lock().clone()
    }

    pub fn take(&self) -> Vec<Artifact> {
        std::mem::take(&mut *self.artifacts.lock())
    }
}

impl DownloadSink for MemorySink {
    fn deliver(&self, artifact: Artifact) -> Result<PathBuf> {
        let path = PathBuf::from(&artifact.filename);
        self.artifacts.lock().push(artifact);
        Ok(path)
    }
}

/// Path separators and control characters would let a caller-supplied name
/// escape the sink directory.
fn sanitize_filename(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    let trimmed = cleaned.trim_start_matches('.');
    if trimmed.is_empty() {
        return "export".to_string();
    }
    if trimmed.len() != cleaned.len() {
        return format!("_{trimmed}");
    }
    cleaned
}

/// Renders export requests with a fixed set of formatting defaults.
#[derive(Debug, Clone)]
pub struct Exporter {
    options: ProjectionOptions,
    sheet_name: String,
    default_width: f64,
}

impl Default for Exporter {
    fn default() -> Self {
        Self {
            options: ProjectionOptions::default(),
            sheet_name: "Data".into(),
            default_width: DEFAULT_COLUMN_WIDTH,
        }
    }
}

impl Exporter {
    pub fn new(options: ProjectionOptions) -> Self {
        Self {
            options,
            ..Self::default()
        }
    }

    pub fn from_config(config: &ExportConfig) -> Self {
        Self {
            options: ProjectionOptions {
                date_format: config.date_format.clone(),
                strict: config.strict,
            },
            sheet_name: config.sheet_name.clone(),
            default_width: config.default_column_width,
        }
    }

    pub fn options(&self) -> &ProjectionOptions {
        &self.options
    }

    /// Render a request to an in-memory artifact.
    pub fn render(&self, request: &ExportRequest) -> Result<Artifact> {
        self.render_at(request, Local::now())
    }

    /// Render with an explicit export timestamp (shown in PDF headers).
    pub fn render_at(&self, request: &ExportRequest, now: DateTime<Local>) -> Result<Artifact> {
        debug!(
            format = %request.format,
            rows = request.data.len(),
            columns = request.columns.len(),
            "rendering export"
        );

        let bytes = match request.format {
            ExportFormat::Pdf => {
                let title = request.title.as_deref().unwrap_or(&request.filename);
                pdf::generate_pdf_table_with_width(
                    title,
                    &request.columns,
                    &request.data,
                    now,
                    &self.options,
                    self.default_width,
                )?
            }
            ExportFormat::Excel => {
                let sheet = request.sheet_name.as_deref().unwrap_or(&self.sheet_name);
                xlsx::generate_xlsx_with_width(
                    &request.columns,
                    &request.data,
                    sheet,
                    &self.options,
                    self.default_width,
                )?
            }
            ExportFormat::Csv => {
                csv::generate_csv(&request.columns, &request.data, &self.options)?.into_bytes()
            }
        };

        Ok(Artifact {
            filename: request.artifact_name(),
            mime_type: request.format.mime_type(),
            bytes,
        })
    }

    /// Render a request and hand it to `sink`.
    pub fn export_data(&self, request: &ExportRequest, sink: &dyn DownloadSink) -> Result<PathBuf> {
        let artifact = self.render(request)?;
        let size = artifact.bytes.len();
        let path = sink.deliver(artifact)?;
        info!(path = %path.display(), bytes = size, "export delivered");
        Ok(path)
    }

    /// Export using a raw format tag, overriding `request.format`.
    ///
    /// Unknown tags fail with [`ExportError::UnsupportedFormat`] before
    /// anything is rendered.
    pub fn export_tagged(
        &self,
        tag: &str,
        request: &ExportRequest,
        sink: &dyn DownloadSink,
    ) -> Result<PathBuf> {
        let format: ExportFormat = tag.parse()?;
        let request = ExportRequest {
            format,
            ..request.clone()
        };
        self.export_data(&request, sink)
    }
}
