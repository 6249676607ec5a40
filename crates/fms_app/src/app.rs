use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Local;
use fms_api::{FmsClient, extract_rows};
use fms_core::{ConfigError, FmsConfig};
use fms_export::{
    AgingSpec, ColumnDescriptor, DirectorySink, ExportFormat, ExportRequest, Exporter,
    aging_columns, tally_aging,
};
use serde_json::Value;
use tracing::info;

use crate::cli::Args;

/// Resolve the effective config: explicit file, else `~/.fms/config.json`,
/// then CLI overrides.
///
/// Runs before logging exists, so an unusable default config file is handed
/// back alongside the defaults for the caller to report.
pub fn load_config(args: &Args) -> Result<(FmsConfig, Option<ConfigError>)> {
    let default_path = match &args.config_file {
        Some(path) => path.clone(),
        None => FmsConfig::config_path()?,
    };
    load_config_from(args, &default_path)
}

fn load_config_from(
    args: &Args,
    default_path: &Path,
) -> Result<(FmsConfig, Option<ConfigError>)> {
    let (mut config, fallback) = match &args.config_file {
        Some(path) => (FmsConfig::load_from_path(path)?, None),
        None => FmsConfig::load_with_fallback(default_path),
    };
    if let Some(dir) = &args.output_dir {
        config.export.output_dir = Some(dir.clone());
    }
    if args.strict {
        config.export.strict = true;
    }
    Ok((config, fallback))
}

/// Run one export and return the written file's path.
pub async fn run(args: &Args, config: &FmsConfig) -> Result<PathBuf> {
    // Reject unknown formats before any network or file I/O.
    let format: ExportFormat = args.format.parse()?;

    let rows = load_rows(args, config).await?;

    let (columns, data) = match &args.aging {
        Some(spec_path) => {
            let spec: AgingSpec = read_json(spec_path)?;
            let as_of = args.as_of.unwrap_or_else(|| Local::now().date_naive());
            let report = tally_aging(&rows, &spec, as_of);
            info!(
                counted = report.counted,
                skipped = report.skipped,
                as_of = %as_of,
                "aging report built"
            );
            (aging_columns(), report.to_rows())
        }
        None => {
            let path = args
                .columns
                .as_ref()
                .context("--columns is required unless --aging is given")?;
            let columns: Vec<ColumnDescriptor> = read_json(path)?;
            (columns, rows)
        }
    };

    let filename = args.base_filename();
    let title = args.title.clone().unwrap_or_else(|| filename.clone());
    let request = ExportRequest::new(format, filename, columns, data).with_title(title);

    let exporter = Exporter::from_config(&config.export);
    let sink = DirectorySink::new(config.output_dir()?);
    let path = exporter.export_data(&request, &sink)?;
    Ok(path)
}

async fn load_rows(args: &Args, config: &FmsConfig) -> Result<Vec<Value>> {
    if let Some(input) = &args.input {
        let body: Value = read_json(input)?;
        return extract_rows(body).with_context(|| format!("no rows in {}", input.display()));
    }
    let resource = args
        .resource
        .as_deref()
        .context("either --resource or --input is required")?;
    let client = FmsClient::new(&config.api)?;
    let rows = client.list(resource).await?;
    info!(resource, rows = rows.len(), "fetched rows");
    Ok(rows)
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("Failed to parse {}", path.display()))
}
