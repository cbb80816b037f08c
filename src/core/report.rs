use crate::domain::model::Record;
use crate::utils::error::{EtlError, Result};
use serde::Serialize;
use serde_json::Value;
use std::io::Write;
use zip::write::{FileOptions, ZipWriter};

pub const ENRICHED_ROWS_FILE: &str = "flattened_response_domain_ip.csv";
pub const TOP_DOMAINS_FILE: &str = "top_10_infringing_domains.csv";
pub const TIME_DISTRIBUTION_FILE: &str = "dmca_notices_time_distribution.csv";
pub const TOP_REPORTERS_FILE: &str = "copyright_holders_rank_wise.csv";
pub const BUNDLE_FILE: &str = "dmca_reports.zip";

pub const TOP_DOMAINS_HEADERS: &[&str] = &["domain", "notice_count", "unique_copyrighted_urls"];
pub const TIME_DISTRIBUTION_HEADERS: &[&str] = &["date_sent", "notice_count"];
pub const TOP_REPORTERS_HEADERS: &[&str] = &[
    "principal_name",
    "notice_count",
    "top_infringing_domain",
    "unique_infringing_domains",
];

fn cell(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

/// 所有欄位的聯集，依首次出現順序
pub fn column_order(rows: &[Record]) -> Vec<String> {
    let mut columns: Vec<String> = Vec::new();
    for row in rows {
        for key in row.data.keys() {
            if !columns.contains(key) {
                columns.push(key.clone());
            }
        }
    }
    columns
}

/// Writes rows as CSV. A row lacking a column gets an empty cell.
pub fn records_to_csv(rows: &[Record]) -> Result<Vec<u8>> {
    let columns = column_order(rows);
    let mut writer = csv::Writer::from_writer(Vec::new());

    if !columns.is_empty() {
        writer.write_record(&columns)?;
    }
    for row in rows {
        writer.write_record(columns.iter().map(|column| cell(row.data.get(column))))?;
    }

    writer
        .into_inner()
        .map_err(|e| EtlError::processing(format!("failed to flush CSV buffer: {}", e)))
}

/// Writes report rows as CSV; the header is written even when `items` is empty.
pub fn summary_to_csv<T: Serialize>(items: &[T], headers: &[&str]) -> Result<Vec<u8>> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());

    writer.write_record(headers)?;
    for item in items {
        writer.serialize(item)?;
    }

    writer
        .into_inner()
        .map_err(|e| EtlError::processing(format!("failed to flush CSV buffer: {}", e)))
}

/// Packs already-rendered files into one ZIP archive.
pub fn bundle_zip(files: &[(&str, &[u8])]) -> Result<Vec<u8>> {
    let mut zip = ZipWriter::new(std::io::Cursor::new(Vec::new()));

    for (name, data) in files {
        zip.start_file::<_, ()>(*name, FileOptions::default())?;
        zip.write_all(data)?;
    }

    let cursor = zip.finish()?;
    Ok(cursor.into_inner())
}
