//! Tabular decoder
//!
//! Turns uploaded delimited text into `CompanyRecord`s:
//! - `;` delimiter when the header row contains one, `,` otherwise
//! - lower-cased, trimmed header keys
//! - company name from a priority list of columns, then the first usable cell
//!
//! There is no quoting or escaping support; a delimiter inside a cell splits it.

use crate::errors::{AppError, Result};
use crate::models::{guess_website, CompanyRecord};
use std::collections::HashMap;
use tracing::{debug, warn};

/// Columns that name the company, highest priority first
pub const NAME_COLUMNS: &[&str] = &[
    "company_name",
    "company",
    "name",
    "organization",
    "business",
    "corp",
    "corporation",
];

const WEBSITE_COLUMNS: &[&str] = &["website", "url", "site"];
const INDUSTRY_COLUMNS: &[&str] = &["industry", "sector", "vertical"];
const SIZE_COLUMNS: &[&str] = &["size", "employees", "employee_count"];
const LOCATION_COLUMNS: &[&str] = &["location", "address", "city"];

/// Upload extensions the dashboard accepts
pub const ACCEPTED_EXTENSIONS: &[&str] = &["csv", "xlsx", "xls"];

/// Decode raw delimited text into company records, preserving row order
pub fn decode(raw: &str) -> Result<Vec<CompanyRecord>> {
    let raw = raw.strip_prefix('\u{feff}').unwrap_or(raw);
    let lines: Vec<&str> = raw
        .split('\n')
        .map(|line| line.strip_suffix('\r').unwrap_or(line))
        .filter(|line| !line.trim().is_empty())
        .collect();

    if lines.len() < 2 {
        return Err(AppError::InsufficientData { lines: lines.len() });
    }

    let header_line = lines[0];
    let delimiter = detect_delimiter(header_line);
    let headers: Vec<String> = header_line
        .split(delimiter)
        .map(|h| h.trim().to_lowercase())
        .collect();

    debug!(?headers, delimiter = %delimiter, rows = lines.len() - 1, "Decoding tabular input");

    let records: Vec<CompanyRecord> = lines[1..]
        .iter()
        .filter_map(|line| decode_row(&headers, line, delimiter))
        .collect();

    if records.is_empty() {
        let sample_row = lines.get(1).map(|line| line.to_string());
        warn!(?headers, sample_row = ?sample_row, "No company names found in input");
        return Err(AppError::NoValidRecords { headers, sample_row });
    }

    metrics::counter!(format!("{}_records_decoded_total", crate::metrics::METRICS_PREFIX))
        .increment(records.len() as u64);

    Ok(records)
}

/// `;` wins when present in the header, otherwise `,`
pub fn detect_delimiter(header_line: &str) -> char {
    if header_line.contains(';') {
        ';'
    } else {
        ','
    }
}

fn decode_row(headers: &[String], line: &str, delimiter: char) -> Option<CompanyRecord> {
    let values: Vec<&str> = line.trim().split(delimiter).map(str::trim).collect();
    if values.len() < 2 {
        return None;
    }

    // Header order is kept so the name fallback is deterministic
    let cells: Vec<(&str, &str)> = headers
        .iter()
        .zip(values.iter())
        .filter(|(_, value)| !value.is_empty())
        .map(|(header, value)| (header.as_str(), *value))
        .collect();
    let by_key: HashMap<&str, &str> = cells.iter().copied().collect();

    let company_name = first_present(&by_key, NAME_COLUMNS).or_else(|| {
        cells
            .iter()
            .find(|(_, value)| value.chars().count() > 1)
            .map(|(header, value)| {
                debug!(column = %header, "Using fallback column as company name");
                *value
            })
    })?;

    let mut record = CompanyRecord::new(company_name);
    record.website = first_present(&by_key, WEBSITE_COLUMNS)
        .map(String::from)
        .or_else(|| guess_website(company_name));
    record.industry = first_present(&by_key, INDUSTRY_COLUMNS).map(String::from);
    record.size = first_present(&by_key, SIZE_COLUMNS).map(String::from);
    record.location = first_present(&by_key, LOCATION_COLUMNS).map(String::from);

    Some(record)
}

fn first_present<'a>(cells: &HashMap<&str, &'a str>, keys: &[&str]) -> Option<&'a str> {
    keys.iter().find_map(|key| cells.get(key).copied())
}

/// Validate an upload by file name and size, returning its text content.
///
/// `.xlsx` / `.xls` are accepted only when the bytes are already plain text
/// (e.g. a CSV saved with the wrong extension); binary workbooks must be
/// converted upstream.
pub fn validate_upload(file_name: &str, bytes: &[u8], max_bytes: usize) -> Result<String> {
    if bytes.len() > max_bytes {
        return Err(AppError::PayloadTooLarge {
            size: bytes.len(),
            limit: max_bytes,
        });
    }

    let extension = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();

    if !ACCEPTED_EXTENSIONS.contains(&extension.as_str()) {
        return Err(AppError::UnsupportedFileType {
            message: format!("{} (please upload a CSV or Excel file)", file_name),
        });
    }

    match std::str::from_utf8(bytes) {
        Ok(text) => Ok(text.to_string()),
        Err(_) if extension == "csv" => Err(AppError::Validation {
            message: "CSV file is not valid UTF-8 text".to_string(),
            field: Some("content".to_string()),
        }),
        Err(_) => Err(AppError::UnsupportedFileType {
            message: format!("{} is a binary spreadsheet; export it as CSV first", file_name),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_basic_csv() {
        let raw = "Company,Website,Industry,Employees,City\n\
                   Acme Corp,acme.com,Manufacturing,500-1000,New York\n\
                   Globex,,Energy,,\n";
        let records = decode(raw).unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].company_name, "Acme Corp");
        assert_eq!(records[0].website.as_deref(), Some("acme.com"));
        assert_eq!(records[0].industry.as_deref(), Some("Manufacturing"));
        assert_eq!(records[0].size.as_deref(), Some("500-1000"));
        assert_eq!(records[0].location.as_deref(), Some("New York"));

        assert_eq!(records[1].company_name, "Globex");
        assert_eq!(records[1].website.as_deref(), Some("globex.com"));
        assert_eq!(records[1].size, None);
    }

    #[test]
    fn test_decode_is_deterministic() {
        let raw = "name;sector\r\nInitech;Software\r\nHooli;Search\r\n";
        assert_eq!(decode(raw).unwrap(), decode(raw).unwrap());
    }

    #[test]
    fn test_semicolon_delimiter() {
        let raw = "name;sector\nInitech;Software\n";
        let records = decode(raw).unwrap();
        assert_eq!(records[0].company_name, "Initech");
        assert_eq!(records[0].industry.as_deref(), Some("Software"));
    }

    #[test]
    fn test_name_priority() {
        let raw = "business,company_name,url\nBiz Name,Real Name,real.com\n";
        let records = decode(raw).unwrap();
        assert_eq!(records[0].company_name, "Real Name");
    }

    #[test]
    fn test_name_fallback_first_usable_column() {
        let raw = "id,label,notes\nX,Umbrella Corp,some notes\n";
        let records = decode(raw).unwrap();
        // "X" is a single character, so the next usable cell wins
        assert_eq!(records[0].company_name, "Umbrella Corp");
    }

    #[test]
    fn test_optional_field_order() {
        let raw = "company,site,url,address,location\nAcme,site.com,url.com,Main St,Berlin\n";
        let records = decode(raw).unwrap();
        assert_eq!(records[0].website.as_deref(), Some("url.com"));
        assert_eq!(records[0].location.as_deref(), Some("Berlin"));
    }

    #[test]
    fn test_header_only_is_insufficient() {
        let err = decode("company,website\n").unwrap_err();
        assert!(matches!(err, AppError::InsufficientData { lines: 1 }));
    }

    #[test]
    fn test_blank_lines_do_not_count() {
        let err = decode("company,website\n\n   \n").unwrap_err();
        assert!(matches!(err, AppError::InsufficientData { .. }));
    }

    #[test]
    fn test_all_empty_cells_is_no_valid_records() {
        let err = decode("company,website\n,\n").unwrap_err();
        match err {
            AppError::NoValidRecords { headers, sample_row } => {
                assert_eq!(headers, vec!["company", "website"]);
                assert_eq!(sample_row.as_deref(), Some(","));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_single_value_rows_skipped() {
        let raw = "company,website\nLonely\nAcme,acme.com\n";
        let records = decode(raw).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].company_name, "Acme");
    }

    #[test]
    fn test_bom_is_stripped() {
        let raw = "\u{feff}Company,Website\nAcme,acme.com\n";
        assert_eq!(decode(raw).unwrap()[0].company_name, "Acme");
    }

    #[test]
    fn test_validate_upload_extensions() {
        let csv = b"company,website\nAcme,acme.com\n";
        assert!(validate_upload("leads.CSV", csv, 1024).is_ok());
        assert!(validate_upload("leads.xls", csv, 1024).is_ok());

        let err = validate_upload("leads.pdf", csv, 1024).unwrap_err();
        assert!(matches!(err, AppError::UnsupportedFileType { .. }));

        let err = validate_upload("noextension", csv, 1024).unwrap_err();
        assert!(matches!(err, AppError::UnsupportedFileType { .. }));
    }

    #[test]
    fn test_validate_upload_binary_and_size() {
        let zip_magic = [0x50, 0x4b, 0x03, 0x04, 0xff, 0xfe];
        let err = validate_upload("book.xlsx", &zip_magic, 1024).unwrap_err();
        assert!(matches!(err, AppError::UnsupportedFileType { .. }));

        let err = validate_upload("big.csv", &[b'a'; 16], 8).unwrap_err();
        assert!(matches!(err, AppError::PayloadTooLarge { size: 16, limit: 8 }));
    }
}
