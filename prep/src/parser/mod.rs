//! CSV loaders for the demand and promotion tables.
//!
//! Both loaders accept a path, raw bytes (encoding auto-detected) or an
//! already decoded string. The date column is parsed with [`parse_date`] and
//! becomes the row's time index; every column the loader does not interpret
//! is kept verbatim in the row's attributes. Rows keep their file order.

use chrono::NaiveDate;
use csv::StringRecord;
use std::path::Path;

use crate::error::{FormatError, PrepResult};
use crate::logs::log_info;
use crate::models::{Attributes, DemandRecord, DemandTable, PromotionRecord, PromotionTable};

/// Date format of every date column.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

pub const DATE_COLUMN: &str = "date";
pub const PROMOTION_DATE_COLUMN: &str = "promotion_date";
pub const SKU_COLUMN: &str = "sku";
pub const SUPERMARKET_COLUMN: &str = "supermarket";
pub const DEMAND_COLUMN: &str = "demand";

/// Cell values read as a missing number.
const MISSING_MARKERS: &[&str] = &["", "nan", "-nan", "na", "n/a", "null", "none"];

/// Parse a `YYYY-MM-DD` string into a calendar date.
///
/// ```
/// use demandprep::parse_date;
///
/// assert!(parse_date("2024-02-29").is_ok());
/// assert!(parse_date("2024-02-30").is_err());
/// ```
pub fn parse_date(s: &str) -> Result<NaiveDate, FormatError> {
    NaiveDate::parse_from_str(s, DATE_FORMAT).map_err(|_| FormatError::InvalidDate {
        value: s.to_string(),
        line: None,
    })
}

// =============================================================================
// Decoding
// =============================================================================

/// Detect the encoding of raw bytes using chardet
pub fn detect_encoding(bytes: &[u8]) -> String {
    let charset = chardet::detect(bytes).0;

    match charset.to_lowercase().as_str() {
        "" | "ascii" | "utf-8" | "utf8" => "utf-8".to_string(),
        "iso-8859-1" | "iso-8859-15" | "latin-1" | "latin1" => "iso-8859-1".to_string(),
        "windows-1252" | "cp1252" => "windows-1252".to_string(),
        _ => charset,
    }
}

/// Decode bytes to string using the specified encoding.
///
/// Latin-1 labels decode as Windows-1252, its WHATWG superset. Any other
/// label is read as UTF-8, falling back to Windows-1252 when the bytes are
/// not valid UTF-8.
pub fn decode_content(bytes: &[u8], encoding: &str) -> String {
    let decoded = match encoding.to_lowercase().as_str() {
        "iso-8859-1" | "latin-1" | "latin1" | "windows-1252" | "cp1252" => {
            encoding_rs::WINDOWS_1252.decode(bytes).0.into_owned()
        }
        _ => match std::str::from_utf8(bytes) {
            Ok(text) => text.to_string(),
            Err(_) => encoding_rs::WINDOWS_1252.decode(bytes).0.into_owned(),
        },
    };
    match decoded.strip_prefix('\u{feff}') {
        Some(rest) => rest.to_string(),
        None => decoded,
    }
}

fn read_file<P: AsRef<Path>>(path: P) -> PrepResult<String> {
    let bytes = std::fs::read(path.as_ref())?;
    let encoding = detect_encoding(&bytes);
    log_info(format!("Read {} ({} bytes, {})", path.as_ref().display(), bytes.len(), encoding));
    Ok(decode_content(&bytes, &encoding))
}

// =============================================================================
// Raw table
// =============================================================================

/// Header plus records, each with the file line it came from.
struct RawTable {
    headers: Vec<String>,
    records: Vec<(usize, StringRecord)>,
}

impl RawTable {
    fn parse(content: &str) -> PrepResult<Self> {
        // Short rows read their absent trailing cells as blank
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(b',')
            .has_headers(true)
            .flexible(true)
            .from_reader(content.as_bytes());

        let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();

        let mut records = Vec::new();
        for result in reader.records() {
            let record = result?;
            let line = record.position().map(|p| p.line() as usize).unwrap_or(0);
            if record.len() > headers.len() {
                return Err(FormatError::TooManyFields {
                    expected: headers.len(),
                    found: record.len(),
                    line,
                }
                .into());
            }
            records.push((line, record));
        }

        Ok(Self { headers, records })
    }

    /// Index of `name`, looking only at columns from `first` onwards.
    fn column(&self, name: &str, first: usize) -> Result<usize, FormatError> {
        self.headers
            .iter()
            .enumerate()
            .skip(first)
            .find(|(_, h)| h.as_str() == name)
            .map(|(i, _)| i)
            .ok_or_else(|| FormatError::MissingColumn(name.to_string()))
    }

    fn attributes(&self, record: &StringRecord, used: &[usize], first: usize) -> Attributes {
        self.headers
            .iter()
            .enumerate()
            .skip(first)
            .filter(|(i, _)| !used.contains(i))
            .map(|(i, h)| (h.clone(), record.get(i).unwrap_or("").to_string()))
            .collect()
    }
}

fn field<'a>(record: &'a StringRecord, idx: usize) -> &'a str {
    record.get(idx).unwrap_or("")
}

fn parse_date_at(raw: &str, line: usize) -> Result<NaiveDate, FormatError> {
    parse_date(raw).map_err(|e| e.at_line(line))
}

fn parse_demand_value(raw: &str, line: usize) -> Result<Option<f64>, FormatError> {
    let trimmed = raw.trim();
    match trimmed.parse::<f64>() {
        Ok(v) if v.is_nan() => Ok(None),
        Ok(v) => Ok(Some(v)),
        Err(_) if MISSING_MARKERS.contains(&trimmed.to_lowercase().as_str()) => Ok(None),
        Err(_) => Err(FormatError::InvalidNumber {
            column: DEMAND_COLUMN.to_string(),
            value: raw.to_string(),
            line,
        }),
    }
}

// =============================================================================
// Demand
// =============================================================================

/// Load the demand table from a CSV file.
pub fn read_demand<P: AsRef<Path>>(path: P) -> PrepResult<DemandTable> {
    let content = read_file(path)?;
    read_demand_str(&content)
}

/// Load the demand table from raw CSV bytes.
pub fn read_demand_bytes(bytes: &[u8]) -> PrepResult<DemandTable> {
    let encoding = detect_encoding(bytes);
    read_demand_str(&decode_content(bytes, &encoding))
}

/// Load the demand table from decoded CSV text.
///
/// Required columns: `date`, `sku`, `supermarket`, `demand`.
pub fn read_demand_str(content: &str) -> PrepResult<DemandTable> {
    let raw = RawTable::parse(content)?;

    let date = raw.column(DATE_COLUMN, 0)?;
    let sku = raw.column(SKU_COLUMN, 0)?;
    let supermarket = raw.column(SUPERMARKET_COLUMN, 0)?;
    let demand = raw.column(DEMAND_COLUMN, 0)?;
    let used = [date, sku, supermarket, demand];

    let mut table = Vec::with_capacity(raw.records.len());
    for (line, record) in &raw.records {
        table.push(DemandRecord {
            date: parse_date_at(field(record, date), *line)?,
            sku: field(record, sku).to_string(),
            supermarket: field(record, supermarket).to_string(),
            demand: parse_demand_value(field(record, demand), *line)?,
            attributes: raw.attributes(record, &used, 0),
        });
    }

    log_info(format!("Loaded {} demand rows", table.len()));
    Ok(table)
}

// =============================================================================
// Promotions
// =============================================================================

/// Load the promotion table from a CSV file.
pub fn read_promotions<P: AsRef<Path>>(path: P) -> PrepResult<PromotionTable> {
    let content = read_file(path)?;
    read_promotions_str(&content)
}

/// Load the promotion table from raw CSV bytes.
pub fn read_promotions_bytes(bytes: &[u8]) -> PrepResult<PromotionTable> {
    let encoding = detect_encoding(bytes);
    read_promotions_str(&decode_content(bytes, &encoding))
}

/// Load the promotion table from decoded CSV text.
///
/// Column 0 is the file's row key and is dropped; the promotion date takes
/// its place as the index. Required columns after it: `promotion_date`,
/// `sku`, `supermarket`.
pub fn read_promotions_str(content: &str) -> PrepResult<PromotionTable> {
    let raw = RawTable::parse(content)?;

    let date = raw.column(PROMOTION_DATE_COLUMN, 1)?;
    let sku = raw.column(SKU_COLUMN, 1)?;
    let supermarket = raw.column(SUPERMARKET_COLUMN, 1)?;
    let used = [date, sku, supermarket];

    let mut table = Vec::with_capacity(raw.records.len());
    for (line, record) in &raw.records {
        table.push(PromotionRecord {
            promotion_date: parse_date_at(field(record, date), *line)?,
            sku: field(record, sku).to_string(),
            supermarket: field(record, supermarket).to_string(),
            promotion_id: None,
            attributes: raw.attributes(record, &used, 1),
        });
    }

    log_info(format!("Loaded {} promotion rows", table.len()));
    Ok(table)
}
