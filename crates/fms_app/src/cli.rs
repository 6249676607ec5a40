use std::path::PathBuf;

use chrono::NaiveDate;
use clap::Parser;

/// Command-line arguments for `fms-export`.
#[derive(Parser, Debug, Clone)]
#[command(name = "fms-export")]
#[command(about = "Export FMS list data as PDF, Excel or CSV")]
#[command(version)]
pub struct Args {
    /// API resource to fetch, e.g. `companies` or `sales/invoices`
    #[arg(short = 'r', long = "resource", value_name = "NAME")]
    pub resource: Option<String>,

    /// Read rows from a JSON file instead of the API
    #[arg(short = 'i', long = "input", value_name = "FILE", conflicts_with = "resource")]
    pub input: Option<PathBuf>,

    /// Output format: pdf, excel (xlsx) or csv
    #[arg(short = 'f', long = "format", value_name = "FORMAT")]
    pub format: String,

    /// JSON file with the column descriptors
    #[arg(short = 'c', long = "columns", value_name = "FILE", required_unless_present = "aging")]
    pub columns: Option<PathBuf>,

    /// Tally rows into an aging report using this JSON spec
    #[arg(long = "aging", value_name = "FILE")]
    pub aging: Option<PathBuf>,

    /// Reference date for aging (defaults to today)
    #[arg(long = "as-of", value_name = "YYYY-MM-DD", requires = "aging")]
    pub as_of: Option<NaiveDate>,

    /// Document title (PDF header)
    #[arg(short = 't', long = "title", value_name = "TEXT")]
    pub title: Option<String>,

    /// Base file name without extension
    #[arg(short = 'n', long = "filename", value_name = "NAME")]
    pub filename: Option<String>,

    /// Directory to write the export into
    #[arg(short = 'o', long = "output-dir", value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Configuration file path (defaults to ~/.fms/config.json)
    #[arg(long = "config-file", value_name = "FILE")]
    pub config_file: Option<PathBuf>,

    /// Fail on missing fields and non-numeric amounts
    #[arg(long = "strict")]
    pub strict: bool,
}

impl Args {
    /// Base name for the artifact: explicit, else derived from the data source.
    pub fn base_filename(&self) -> String {
        if let Some(name) = &self.filename {
            return name.clone();
        }
        if let Some(resource) = &self.resource {
            return resource.trim_matches('/').replace('/', "-");
        }
        self.input
            .as_ref()
            .and_then(|p| p.file_stem())
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "export".into())
    }
}
