use rust_xlsxwriter::{Format, Workbook};
use serde_json::Value;

use crate::Result;
use crate::column::{ColumnDescriptor, ColumnType};
use crate::projector::{ProjectionOptions, lookup, project_rows};

/// Column width, in character units, when a descriptor carries none.
pub const DEFAULT_COLUMN_WIDTH: f64 = 15.0;

/// Generate a single-sheet XLSX workbook from column descriptors and rows.
///
/// Row 0 holds the bold column labels; each record follows in column order.
/// Returns the raw bytes of the xlsx file.
pub fn generate_xlsx(
    columns: &[ColumnDescriptor],
    data: &[Value],
    sheet_name: &str,
    options: &ProjectionOptions,
) -> Result<Vec<u8>> {
    generate_xlsx_with_width(columns, data, sheet_name, options, DEFAULT_COLUMN_WIDTH)
}

/// [`generate_xlsx`] with an explicit fallback column width.
pub fn generate_xlsx_with_width(
    columns: &[ColumnDescriptor],
    data: &[Value],
    sheet_name: &str,
    options: &ProjectionOptions,
    default_width: f64,
) -> Result<Vec<u8>> {
    let rows = project_rows(data, columns, options)?;

    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name(sheet_name)?;

    let header_format = Format::new().set_bold();
    let number_format = Format::new().set_num_format("0.00");
    let blank_format = Format::new();

    for (col, column) in columns.iter().enumerate() {
        let col = col as u16;
        worksheet.write_string_with_format(0, col, &column.label, &header_format)?;
        worksheet.set_column_width(col, column.width_or(default_width))?;
    }

    for (row_idx, (row, record)) in rows.iter().zip(data).enumerate() {
        let excel_row = (row_idx + 1) as u32;
        for (col_idx, (cell, column)) in row.iter().zip(columns).enumerate() {
            let col = col_idx as u16;
            // Written as blank cells so every record still owns a row.
            if cell.is_empty() {
                worksheet.write_blank(excel_row, col, &blank_format)?;
                continue;
            }
            match column.kind {
                Some(ColumnType::Number) => match cell.parse::<f64>() {
                    Ok(num) if num.is_finite() => {
                        worksheet.write_number_with_format(excel_row, col, num, &number_format)?;
                    }
                    _ => {
                        worksheet.write_string(excel_row, col, cell)?;
                    }
                },
                // Untyped JSON numbers stay numeric; numeric-looking strings stay text.
                None => match lookup(record, &column.key).and_then(Value::as_f64) {
                    Some(num) if num.is_finite() => {
                        worksheet.write_number(excel_row, col, num)?;
                    }
                    _ => {
                        worksheet.write_string(excel_row, col, cell)?;
                    }
                },
                Some(_) => {
                    worksheet.write_string(excel_row, col, cell)?;
                }
            }
        }
    }

    let bytes = workbook.save_to_buffer()?;
    tracing::debug!(
        sheet = sheet_name,
        rows = rows.len(),
        bytes = bytes.len(),
        "generated xlsx"
    );
    Ok(bytes)
}
