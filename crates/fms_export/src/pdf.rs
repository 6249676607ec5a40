//! PDF table export.
//!
//! Builds valid PDF 1.4 files directly: landscape A4 pages, a title block
//! on the first page, and one table that paginates automatically with the
//! header row repeated on every page. Uses the built-in Helvetica fonts, so
//! no font files are embedded.

use chrono::{DateTime, Local};
use serde_json::Value;

use crate::Result;
use crate::column::{ColumnDescriptor, labels};
use crate::projector::{ProjectionOptions, project_rows};
use crate::xlsx::DEFAULT_COLUMN_WIDTH;

const PAGE_WIDTH: f64 = 842.0;
const PAGE_HEIGHT: f64 = 595.0;
const MARGIN: f64 = 40.0;
const USABLE_WIDTH: f64 = PAGE_WIDTH - 2.0 * MARGIN;
const ROW_HEIGHT: f64 = 18.0;
const FONT_SIZE: f64 = 9.0;
const CELL_PADDING: f64 = 4.0;
/// Average Helvetica glyph width as a fraction of the font size.
const GLYPH_RATIO: f64 = 0.5;

/// Generate a paginated PDF table with a title and export timestamp.
pub fn generate_pdf_table(
    title: &str,
    columns: &[ColumnDescriptor],
    data: &[Value],
    generated_at: DateTime<Local>,
    options: &ProjectionOptions,
) -> Result<Vec<u8>> {
    generate_pdf_table_with_width(
        title,
        columns,
        data,
        generated_at,
        options,
        DEFAULT_COLUMN_WIDTH,
    )
}

/// [`generate_pdf_table`] with an explicit fallback column width.
///
/// Column widths are relative: each column gets its share of the usable
/// page width in proportion to `width` (or `default_width`).
pub fn generate_pdf_table_with_width(
    title: &str,
    columns: &[ColumnDescriptor],
    data: &[Value],
    generated_at: DateTime<Local>,
    options: &ProjectionOptions,
    default_width: f64,
) -> Result<Vec<u8>> {
    let rows = project_rows(data, columns, options)?;
    let widths = column_widths(columns, default_width);
    let headers = labels(columns);

    let mut pages = Vec::new();
    let mut content = String::new();
    let mut y = PAGE_HEIGHT - MARGIN;

    // Title block
    push_text(&mut content, "/F1", 16.0, MARGIN, y - 16.0, title);
    y -= 24.0;
    let stamp = format!("Exported on: {}", generated_at.format("%Y-%m-%d %H:%M:%S"));
    push_text(&mut content, "/F2", FONT_SIZE, MARGIN, y - FONT_SIZE, &stamp);
    y -= 24.0;

    let mut table_top = y;
    y = draw_header(&mut content, &headers, &widths, y);

    for (row_idx, row) in rows.iter().enumerate() {
        if y - ROW_HEIGHT < MARGIN {
            draw_border(&mut content, table_top, y);
            pages.push(std::mem::take(&mut content));
            table_top = PAGE_HEIGHT - MARGIN;
            y = draw_header(&mut content, &headers, &widths, table_top);
        }

        // Alternating background
        if row_idx % 2 == 0 {
            content.push_str("0.96 0.96 0.96 rg\n");
            push_rect(&mut content, y - ROW_HEIGHT, "f");
        }
        content.push_str("0 0 0 rg\n");
        draw_cells(&mut content, "/F2", row.as_slice(), &widths, y);
        y -= ROW_HEIGHT;
    }

    draw_border(&mut content, table_top, y);
    pages.push(content);

    tracing::debug!(pages = pages.len(), rows = rows.len(), "generated pdf");

    let mut builder = PdfBuilder::new();
    for page in pages {
        builder.add_page(page);
    }
    Ok(builder.build(title))
}

fn column_widths(columns: &[ColumnDescriptor], default_width: f64) -> Vec<f64> {
    let weights: Vec<f64> = columns.iter().map(|c| c.width_or(default_width)).collect();
    let total: f64 = weights.iter().sum();
    if total <= 0.0 {
        return vec![0.0; columns.len()];
    }
    weights.iter().map(|w| USABLE_WIDTH * w / total).collect()
}

fn draw_header(content: &mut String, headers: &[&str], widths: &[f64], y: f64) -> f64 {
    content.push_str("0.9 0.9 0.9 rg\n");
    push_rect(content, y - ROW_HEIGHT, "f");
    content.push_str("0 0 0 rg\n");
    draw_cells(content, "/F1", headers, widths, y);
    y - ROW_HEIGHT
}

fn draw_cells<S: AsRef<str>>(content: &mut String, font: &str, cells: &[S], widths: &[f64], y: f64) {
    let mut x = MARGIN;
    for (cell, width) in cells.iter().zip(widths) {
        let text = fit_text(cell.as_ref(), *width);
        if !text.is_empty() {
            push_text(
                content,
                font,
                FONT_SIZE,
                x + CELL_PADDING,
                y - ROW_HEIGHT + 5.0,
                &text,
            );
        }
        x += width;
    }
}

fn draw_border(content: &mut String, top: f64, bottom: f64) {
    content.push_str("0.6 0.6 0.6 RG\n");
    content.push_str("0.5 w\n");
    content.push_str(&format!(
        "{MARGIN:.1} {bottom:.1} {USABLE_WIDTH:.1} {:.1} re S\n",
        top - bottom
    ));
}

fn push_rect(content: &mut String, y: f64, op: &str) {
    content.push_str(&format!(
        "{MARGIN:.1} {y:.1} {USABLE_WIDTH:.1} {ROW_HEIGHT:.1} re {op}\n"
    ));
}

fn push_text(content: &mut String, font: &str, size: f64, x: f64, y: f64, text: &str) {
    content.push_str("BT\n");
    content.push_str(&format!("{font} {size:.0} Tf\n"));
    content.push_str(&format!("{x:.1} {y:.1} Td\n"));
    content.push_str(&format!("({}) Tj\n", pdf_escape(text)));
    content.push_str("ET\n");
}

/// Clip `text` so it fits a column of `width` points, marking cuts with `...`.
fn fit_text(text: &str, width: f64) -> String {
    let available = (width - 2.0 * CELL_PADDING).max(0.0);
    let max_chars = (available / (FONT_SIZE * GLYPH_RATIO)).floor() as usize;
    let len = text.chars().count();
    if len <= max_chars {
        return text.to_string();
    }
    if max_chars <= 3 {
        return text.chars().take(max_chars).collect();
    }
    let mut clipped: String = text.chars().take(max_chars - 3).collect();
    clipped.push_str("...");
    clipped
}

/// Escape text for a PDF string literal in WinAnsi encoding.
///
/// Latin-1 characters become octal escapes; anything wider becomes `?`.
/// Line breaks collapse to spaces since cells are single-line.
fn pdf_escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '(' => out.push_str("\\("),
            ')' => out.push_str("\\)"),
            '\n' | '\r' | '\t' => out.push(' '),
            ' '..='~' => out.push(ch),
            _ if (ch as u32) >= 0xA0 && (ch as u32) <= 0xFF => {
                out.push_str(&format!("\\{:03o}", ch as u32));
            }
            _ => out.push('?'),
        }
    }
    out
}

/// Minimal PDF file builder. Constructs valid PDF 1.4 files.
struct PdfBuilder {
    pages: Vec<String>,
}

impl PdfBuilder {
    fn new() -> Self {
        Self { pages: Vec::new() }
    }

    fn add_page(&mut self, content: String) {
        self.pages.push(content);
    }

    /// Build the complete PDF file as bytes.
    ///
    /// Object layout: 1 catalog, 2 page tree, 3-4 fonts, 5 info, then a
    /// page object and its content stream for each page.
    fn build(&self, title: &str) -> Vec<u8> {
        let mut pdf = String::new();
        let mut offsets: Vec<usize> = Vec::new();

        let page_ids: Vec<usize> = (0..self.pages.len()).map(|i| 6 + 2 * i).collect();

        pdf.push_str("%PDF-1.4\n");

        // Obj 1: Catalog
        offsets.push(pdf.len());
        pdf.push_str("1 0 obj\n<< /Type /Catalog /Pages 2 0 R >>\nendobj\n");

        // Obj 2: Pages
        offsets.push(pdf.len());
        let kids: Vec<String> = page_ids.iter().map(|id| format!("{id} 0 R")).collect();
        pdf.push_str(&format!(
            "2 0 obj\n<< /Type /Pages /Kids [{}] /Count {} >>\nendobj\n",
            kids.join(" "),
            page_ids.len()
        ));

        // Obj 3: Font (Helvetica-Bold)
        offsets.push(pdf.len());
        pdf.push_str(
            "3 0 obj\n<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica-Bold \
             /Encoding /WinAnsiEncoding >>\nendobj\n",
        );

        // Obj 4: Font (Helvetica)
        offsets.push(pdf.len());
        pdf.push_str(
            "4 0 obj\n<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica \
             /Encoding /WinAnsiEncoding >>\nendobj\n",
        );

        // Obj 5: Info (title)
        offsets.push(pdf.len());
        pdf.push_str(&format!(
            "5 0 obj\n<< /Title ({}) /Producer (FMS) >>\nendobj\n",
            pdf_escape(title)
        ));

        for (page, id) in self.pages.iter().zip(&page_ids) {
            offsets.push(pdf.len());
            pdf.push_str(&format!(
                "{id} 0 obj\n<< /Type /Page /Parent 2 0 R \
                 /MediaBox [0 0 {PAGE_WIDTH:.0} {PAGE_HEIGHT:.0}] /Contents {} 0 R \
                 /Resources << /Font << /F1 3 0 R /F2 4 0 R >> >> >>\nendobj\n",
                id + 1
            ));

            offsets.push(pdf.len());
            pdf.push_str(&format!(
                "{} 0 obj\n<< /Length {} >>\nstream\n{}\nendstream\nendobj\n",
                id + 1,
                page.len(),
                page
            ));
        }

        // Cross-reference table
        let xref_offset = pdf.len();
        let num_objects = offsets.len() + 1; // +1 for free entry
        pdf.push_str(&format!("xref\n0 {num_objects}\n"));
        pdf.push_str("0000000000 65535 f \n");
        for offset in &offsets {
            pdf.push_str(&format!("{offset:010} 00000 n \n"));
        }

        // Trailer
        pdf.push_str(&format!(
            "trailer\n<< /Size {num_objects} /Root 1 0 R /Info 5 0 R >>\n"
        ));
        pdf.push_str(&format!("startxref\n{xref_offset}\n%%EOF\n"));

        pdf.into_bytes()
    }
}
