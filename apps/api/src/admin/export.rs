use std::time::Duration;

use rust_xlsxwriter::{Format, Workbook, XlsxError};
use tokio::time::Instant;
use tracing::info;

use crate::errors::AppError;
use crate::models::student::StudentRecord;

pub const EXPORT_FILENAME: &str = "students_data.xlsx";
pub const SHEET_NAME: &str = "Students";
pub const XLSX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// Column order of the export: the record's keys as serialized.
pub const EXPORT_COLUMNS: [&str; 7] = ["id", "uid", "name", "email", "branch", "cgpa", "resumeURL"];

#[derive(Debug, Clone, PartialEq)]
pub enum ExportCell {
    Text(String),
    Number(f64),
}

#[derive(Debug, Clone)]
pub struct ExportTable {
    pub sheet_name: &'static str,
    pub headers: &'static [&'static str],
    pub rows: Vec<Vec<ExportCell>>,
}

pub fn build_export_table(records: &[StudentRecord]) -> ExportTable {
    let rows = records
        .iter()
        .map(|r| {
            vec![
                ExportCell::Text(r.id().to_string()),
                ExportCell::Text(r.uid.clone()),
                ExportCell::Text(r.name.clone()),
                ExportCell::Text(r.email.clone()),
                ExportCell::Text(r.branch.label().to_string()),
                ExportCell::Number(r.cgpa),
                ExportCell::Text(r.resume_url.clone()),
            ]
        })
        .collect();

    ExportTable {
        sheet_name: SHEET_NAME,
        headers: &EXPORT_COLUMNS,
        rows,
    }
}

fn xlsx_error(e: XlsxError) -> AppError {
    AppError::Export(e.to_string())
}

pub fn render_workbook(table: &ExportTable) -> Result<Vec<u8>, AppError> {
    let mut workbook = Workbook::new();
    let header_format = Format::new().set_bold();

    let sheet = workbook.add_worksheet();
    sheet.set_name(table.sheet_name).map_err(xlsx_error)?;

    for (col, header) in table.headers.iter().enumerate() {
        sheet
            .write_string_with_format(0, col as u16, *header, &header_format)
            .map_err(xlsx_error)?;
    }

    for (i, row) in table.rows.iter().enumerate() {
        let row_num = (i + 1) as u32;
        for (col, cell) in row.iter().enumerate() {
            match cell {
                ExportCell::Text(text) => sheet.write_string(row_num, col as u16, text),
                ExportCell::Number(n) => sheet.write_number(row_num, col as u16, *n),
            }
            .map_err(xlsx_error)?;
        }
    }

    workbook.save_to_buffer().map_err(xlsx_error)
}

/// Builds the workbook for `records`, taking at least `min_duration`.
pub async fn export_students(
    records: Vec<StudentRecord>,
    min_duration: Duration,
) -> Result<Vec<u8>, AppError> {
    let started = Instant::now();
    let count = records.len();

    let bytes = tokio::task::spawn_blocking(move || render_workbook(&build_export_table(&records)))
        .await
        .map_err(|e| AppError::Internal(e.into()))??;

    let elapsed = started.elapsed();
    if elapsed < min_duration {
        tokio::time::sleep(min_duration - elapsed).await;
    }

    info!("Exported {count} student records ({} bytes)", bytes.len());
    Ok(bytes)
}
