//! The flat output table: one row per line item, document fields repeated.

use std::fmt;
use std::fs::File;
use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};

use crate::parser::events::{Event, Observer};
use crate::parser::model::{DocumentRecord, LINE_ITEM_COLUMNS};

pub const COLUMNS: [&str; 21] = [
    "Source File",
    "PR Number",
    "PR Title",
    "CLIN",
    "SLIN",
    "Title",
    "Quantity",
    "Estimated Unit Price ($)",
    "Unit",
    "Amount ($)",
    "Amount Committed ($)",
    "Amount Reserved ($)",
    "Optional",
    "Not to Exceed",
    "Description",
    "POP Start Date",
    "POP End Date",
    "Group",
    "Line Item Type",
    "NSP",
    "Place of Performance",
];

const DOCUMENT_COLUMNS: usize = COLUMNS.len() - LINE_ITEM_COLUMNS.len();

#[derive(Debug, thiserror::Error)]
#[error("row has {found} cells but the schema has {expected} columns")]
pub struct SchemaError {
    pub found: usize,
    pub expected: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputRow {
    cells: Vec<String>,
}

impl OutputRow {
    pub fn new(cells: Vec<String>) -> std::result::Result<Self, SchemaError> {
        if cells.len() != COLUMNS.len() {
            return Err(SchemaError {
                found: cells.len(),
                expected: COLUMNS.len(),
            });
        }
        Ok(OutputRow { cells })
    }

    pub fn cells(&self) -> &[String] {
        &self.cells
    }
}

impl fmt::Display for OutputRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, (col, val)) in COLUMNS.iter().zip(&self.cells).enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "'{}': '{}'", col, val)?;
        }
        f.write_str("}")
    }
}

/// Flatten a record. A record without line items still gets one row.
pub fn rows_for(record: &DocumentRecord) -> std::result::Result<Vec<OutputRow>, SchemaError> {
    let document = [
        record.source_file.clone(),
        record.fields.requisition_number().to_string(),
        record.fields.pr_title().to_string(),
    ];
    debug_assert_eq!(document.len(), DOCUMENT_COLUMNS);

    if record.line_items.is_empty() {
        let mut cells = document.to_vec();
        cells.resize(COLUMNS.len(), String::new());
        return Ok(vec![OutputRow::new(cells)?]);
    }

    record
        .line_items
        .iter()
        .map(|item| {
            let mut cells = document.to_vec();
            cells.extend(item.labeled_values().into_iter().map(|(_, v)| v));
            OutputRow::new(cells)
        })
        .collect()
}

/// CSV writer that emits the header once and reports each row it writes.
pub struct RowWriter<W: Write> {
    writer: csv::Writer<W>,
    rows: usize,
}

impl RowWriter<File> {
    /// Truncates any existing file at `path`.
    pub fn create(path: &Path) -> Result<Self> {
        let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
        RowWriter::new(file)
    }
}

impl<W: Write> RowWriter<W> {
    pub fn new(inner: W) -> Result<Self> {
        let mut writer = csv::Writer::from_writer(inner);
        writer.write_record(COLUMNS)?;
        Ok(RowWriter { writer, rows: 0 })
    }

    pub fn write_document(&mut self, record: &DocumentRecord, observer: &dyn Observer) -> Result<usize> {
        let rows = rows_for(record)?;
        for row in &rows {
            self.writer.write_record(row.cells())?;
            observer.observe(&Event::RowWritten { row: &row.to_string() });
        }
        self.rows += rows.len();
        Ok(rows.len())
    }

    pub fn rows_written(&self) -> usize {
        self.rows
    }

    pub fn finish(mut self) -> Result<W> {
        self.writer.flush()?;
        self.writer
            .into_inner()
            .map_err(|e| anyhow::anyhow!("flushing CSV output: {}", e.error()))
    }
}
