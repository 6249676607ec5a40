use serde_json::Value;

use crate::column::{ColumnDescriptor, labels};
use crate::projector::{ProjectionOptions, project_rows};
use crate::{ExportError, Result};

/// Generate CSV text: a header line of column labels, then one line per row.
///
/// Fields containing a delimiter, a double quote or a line break are quoted,
/// with inner quotes doubled. Lines end in `\n`.
pub fn generate_csv(
    columns: &[ColumnDescriptor],
    data: &[Value],
    options: &ProjectionOptions,
) -> Result<String> {
    let rows = project_rows(data, columns, options)?;
    generate_delimited(&labels(columns), &rows, b',')
}

/// Same as [`generate_csv`] with tab separators.
pub fn generate_tsv(
    columns: &[ColumnDescriptor],
    data: &[Value],
    options: &ProjectionOptions,
) -> Result<String> {
    let rows = project_rows(data, columns, options)?;
    generate_delimited(&labels(columns), &rows, b'\t')
}

/// Parse CSV text into headers and rows. The first record is the header row.
pub fn parse_csv(input: &str) -> Result<(Vec<String>, Vec<Vec<String>>)> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(input.as_bytes());

    let headers: Vec<String> = reader.headers()?.iter().map(String::from).collect();

    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result?;
        rows.push(record.iter().map(String::from).collect());
    }

    Ok((headers, rows))
}

fn generate_delimited(headers: &[&str], rows: &[Vec<String>], delimiter: u8) -> Result<String> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .terminator(csv::Terminator::Any(b'\n'))
        .quote_style(csv::QuoteStyle::Necessary)
        .from_writer(Vec::new());

    writer.write_record(headers)?;
    for row in rows {
        writer.write_record(row)?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| ExportError::Io(e.into_error()))?;

    String::from_utf8(bytes).map_err(|e| {
        ExportError::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    })
}
