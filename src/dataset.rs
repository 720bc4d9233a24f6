//! CSV gateway: load a table, find the rows that still need a label, merge
//! labels back and write the result as UTF-8 with BOM.

use crate::error::{Result, SentimentError};
use crate::label::SentimentLabel;
use std::fs;
use std::io::Write;
use std::path::Path;
use tracing::debug;

const UTF8_BOM: &str = "\u{feff}";

/// A CSV table held as strings. Column order and unknown columns are preserved.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Dataset {
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        let dataset = Self::from_csv_str(&content)?;
        debug!("Loaded {} rows from {}", dataset.len(), path.display());
        Ok(dataset)
    }

    /// Parse CSV text, with or without a leading BOM.
    pub fn from_csv_str(content: &str) -> Result<Self> {
        let content = content.trim_start_matches(UTF8_BOM);
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_reader(content.as_bytes());

        let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
        let mut rows = Vec::new();
        for (index, record) in reader.records().enumerate() {
            let record = record?;
            if record.len() > headers.len() {
                return Err(SentimentError::InputFormat(format!(
                    "row {} has {} fields but the header has {}",
                    index + 1,
                    record.len(),
                    headers.len()
                )));
            }
            let mut row: Vec<String> = record.iter().map(str::to_string).collect();
            row.resize(headers.len(), String::new());
            rows.push(row);
        }
        Ok(Self { headers, rows })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Position of `name`, ignoring whitespace around either side. Header
    /// text itself is kept as loaded.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        let name = name.trim();
        self.headers.iter().position(|h| h.trim() == name)
    }

    /// Index of a column that must exist.
    pub fn require_column(&self, name: &str) -> Result<usize> {
        self.column_index(name).ok_or_else(|| {
            SentimentError::InputFormat(format!(
                "column '{}' not found (available: {})",
                name,
                self.headers.join(", ")
            ))
        })
    }

    /// Append `name` as the last column, filled with `default`, if missing.
    /// Returns the column index either way.
    pub fn ensure_column(&mut self, name: &str, default: &str) -> usize {
        if let Some(index) = self.column_index(name) {
            return index;
        }
        self.headers.push(name.to_string());
        for row in &mut self.rows {
            row.push(default.to_string());
        }
        self.headers.len() - 1
    }

    pub fn cell(&self, row: usize, column: usize) -> Option<&str> {
        self.rows.get(row)?.get(column).map(String::as_str)
    }

    /// Cells of `column`; empty cells read as missing.
    pub fn comments(&self, column: usize) -> Vec<Option<&str>> {
        (0..self.len())
            .map(|row| self.cell(row, column).filter(|c| !c.is_empty()))
            .collect()
    }

    /// Rows whose label cell is empty (after trimming). These are the rows
    /// still to be scored.
    pub fn pending_rows(&self, label_column: usize) -> Vec<usize> {
        (0..self.len())
            .filter(|&row| self.cell(row, label_column).map_or(true, |c| c.trim().is_empty()))
            .collect()
    }

    /// Write `labels[i]` into row `rows[i]`.
    pub fn set_labels(&mut self, label_column: usize, rows: &[usize], labels: &[SentimentLabel]) {
        for (&row, label) in rows.iter().zip(labels) {
            if let Some(cell) = self.rows.get_mut(row).and_then(|r| r.get_mut(label_column)) {
                *cell = label.to_string();
            }
        }
    }

    /// Serialize as CSV, preceded by a UTF-8 BOM.
    pub fn to_writer<W: Write>(&self, mut out: W) -> Result<()> {
        out.write_all(UTF8_BOM.as_bytes())?;
        let mut writer = csv::Writer::from_writer(out);
        writer.write_record(&self.headers)?;
        for row in &self.rows {
            writer.write_record(row)?;
        }
        writer.flush()?;
        Ok(())
    }

    pub fn to_csv_bytes(&self) -> Result<Vec<u8>> {
        let mut buffer = Vec::new();
        self.to_writer(&mut buffer)?;
        Ok(buffer)
    }

    pub fn write_csv(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let file = fs::File::create(path)?;
        self.to_writer(std::io::BufWriter::new(file))?;
        debug!("Wrote {} rows to {}", self.len(), path.display());
        Ok(())
    }
}
