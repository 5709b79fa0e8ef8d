//! Writing tables back out as CSV or JSON.
//!
//! CSV output uses the same conventions the loaders read: `YYYY-MM-DD`
//! dates, empty cells for missing demand. Attribute columns follow the fixed
//! columns, sorted by name. In JSON, `NaN` demand is written as `null`.

use serde::Serialize;
use std::collections::BTreeSet;
use std::io::Write;
use std::path::Path;

use crate::error::PrepResult;
use crate::models::{Attributes, DemandRecord, MergedRecord, PromotionRecord, WeeklyRecord};
use crate::parser::{DATE_COLUMN, DEMAND_COLUMN, PROMOTION_DATE_COLUMN, SKU_COLUMN, SUPERMARKET_COLUMN};

/// A row type that can be written as a CSV record.
pub trait CsvExport {
    /// Fixed leading columns.
    const COLUMNS: &'static [&'static str];

    /// Values of the fixed columns, in order.
    fn fields(&self) -> Vec<String>;

    /// Attribute maps written after the fixed columns, one column group each.
    fn attribute_groups(&self) -> Vec<&Attributes> {
        Vec::new()
    }
}

fn number(v: Option<f64>) -> String {
    v.map(|v| v.to_string()).unwrap_or_default()
}

fn id(v: Option<usize>) -> String {
    v.map(|v| v.to_string()).unwrap_or_default()
}

impl CsvExport for DemandRecord {
    const COLUMNS: &'static [&'static str] = &[DATE_COLUMN, SKU_COLUMN, SUPERMARKET_COLUMN, DEMAND_COLUMN];

    fn fields(&self) -> Vec<String> {
        vec![
            self.date.to_string(),
            self.sku.clone(),
            self.supermarket.clone(),
            number(self.demand),
        ]
    }

    fn attribute_groups(&self) -> Vec<&Attributes> {
        vec![&self.attributes]
    }
}

impl CsvExport for PromotionRecord {
    const COLUMNS: &'static [&'static str] = &[PROMOTION_DATE_COLUMN, SKU_COLUMN, SUPERMARKET_COLUMN, "promotion_id"];

    fn fields(&self) -> Vec<String> {
        vec![
            self.promotion_date.to_string(),
            self.sku.clone(),
            self.supermarket.clone(),
            id(self.promotion_id),
        ]
    }

    fn attribute_groups(&self) -> Vec<&Attributes> {
        vec![&self.attributes]
    }
}

impl CsvExport for MergedRecord {
    const COLUMNS: &'static [&'static str] =
        &[DATE_COLUMN, SKU_COLUMN, SUPERMARKET_COLUMN, DEMAND_COLUMN, "promotion", "promotion_id"];

    fn fields(&self) -> Vec<String> {
        vec![
            self.date.to_string(),
            self.sku.clone(),
            self.supermarket.clone(),
            number(self.demand),
            self.promotion.to_string(),
            id(self.promotion_id),
        ]
    }

    fn attribute_groups(&self) -> Vec<&Attributes> {
        vec![&self.demand_attributes, &self.promotion_attributes]
    }
}

impl CsvExport for WeeklyRecord {
    const COLUMNS: &'static [&'static str] = &[DATE_COLUMN, SKU_COLUMN, SUPERMARKET_COLUMN, DEMAND_COLUMN, "promotion"];

    fn fields(&self) -> Vec<String> {
        vec![
            self.week_end.to_string(),
            self.sku.clone(),
            self.supermarket.clone(),
            self.demand.to_string(),
            self.promotion.to_string(),
        ]
    }
}

/// Write `rows` as CSV with a header line.
pub fn write_csv<T: CsvExport, W: Write>(rows: &[T], writer: W) -> PrepResult<()> {
    let n_groups = rows.first().map_or(0, |r| r.attribute_groups().len());
    let mut groups: Vec<BTreeSet<&str>> = vec![BTreeSet::new(); n_groups];
    for row in rows {
        for (keys, attrs) in groups.iter_mut().zip(row.attribute_groups()) {
            keys.extend(attrs.keys().map(String::as_str));
        }
    }

    let mut out = csv::Writer::from_writer(writer);

    let mut header: Vec<&str> = T::COLUMNS.to_vec();
    header.extend(groups.iter().flatten().copied());
    out.write_record(&header)?;

    for row in rows {
        let mut record = row.fields();
        for (keys, attrs) in groups.iter().zip(row.attribute_groups()) {
            record.extend(keys.iter().map(|k| attrs.get(*k).cloned().unwrap_or_default()));
        }
        out.write_record(&record)?;
    }

    out.flush()?;
    Ok(())
}

/// Write `rows` as CSV to `path`.
pub fn write_csv_file<T: CsvExport>(rows: &[T], path: impl AsRef<Path>) -> PrepResult<()> {
    let file = std::fs::File::create(path)?;
    write_csv(rows, std::io::BufWriter::new(file))
}

/// Pretty-printed JSON array of `rows`.
pub fn to_json<T: Serialize>(rows: &[T]) -> PrepResult<String> {
    Ok(serde_json::to_string_pretty(rows)?)
}
