//! CSV reading, writing, and delimiter resolution.
//!
//! All file I/O flows through this module: extension-based delimiter
//! auto-detection (`.csv` comma, `.tsv` tab) with manual override, the `-`
//! path convention for standard streams, and dataset load/store. Output
//! always quotes for round-trip safety.

use std::{
    fs::File,
    io::{BufReader, BufWriter, Read, Write},
    path::Path,
};

use anyhow::{Context, Result};
use csv::QuoteStyle;

use crate::data::{Dataset, Value};

pub const DEFAULT_CSV_DELIMITER: u8 = b',';
pub const DEFAULT_TSV_DELIMITER: u8 = b'\t';

pub fn is_dash(path: &Path) -> bool {
    path == Path::new("-")
}

pub fn resolve_input_delimiter(path: &Path, provided: Option<u8>) -> u8 {
    provided.unwrap_or_else(|| match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("tsv") => DEFAULT_TSV_DELIMITER,
        _ => DEFAULT_CSV_DELIMITER,
    })
}

pub fn resolve_output_delimiter(path: Option<&Path>, provided: Option<u8>, fallback: u8) -> u8 {
    if let Some(delim) = provided {
        return delim;
    }
    if let Some(path) = path {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("tsv") => return DEFAULT_TSV_DELIMITER,
            Some(ext) if ext.eq_ignore_ascii_case("csv") => return DEFAULT_CSV_DELIMITER,
            _ => {}
        }
    }
    fallback
}

pub fn open_csv_reader<R>(reader: R, delimiter: u8) -> csv::Reader<R>
where
    R: Read,
{
    let mut builder = csv::ReaderBuilder::new();
    builder
        .has_headers(true)
        .delimiter(delimiter)
        .double_quote(true)
        .flexible(true);
    builder.from_reader(reader)
}

pub fn open_csv_reader_from_path(path: &Path, delimiter: u8) -> Result<csv::Reader<Box<dyn Read>>> {
    let reader: Box<dyn Read> = if is_dash(path) {
        Box::new(std::io::stdin().lock())
    } else {
        Box::new(BufReader::new(
            File::open(path).with_context(|| format!("Opening input file {path:?}"))?,
        ))
    };
    Ok(open_csv_reader(reader, delimiter))
}

pub fn open_csv_writer(path: Option<&Path>, delimiter: u8) -> Result<csv::Writer<Box<dyn Write>>> {
    let base: Box<dyn Write> = match path {
        Some(p) if !is_dash(p) => Box::new(BufWriter::new(
            File::create(p).with_context(|| format!("Creating output file {p:?}"))?,
        )),
        _ => Box::new(std::io::stdout()),
    };
    let mut builder = csv::WriterBuilder::new();
    builder
        .delimiter(delimiter)
        .quote_style(QuoteStyle::Always)
        .double_quote(true);
    Ok(builder.from_writer(base))
}

/// Loads a delimited file into a raw dataset. Every cell comes in as text;
/// empty cells become missing. Type interpretation happens downstream.
/// Short rows are padded with missing cells, long rows truncated.
pub fn read_dataset(path: &Path, delimiter: u8) -> Result<Dataset> {
    let mut reader = open_csv_reader_from_path(path, delimiter)?;
    let columns: Vec<String> = reader
        .headers()
        .with_context(|| format!("Reading header row from {path:?}"))?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let mut rows = Vec::new();
    for (row_idx, record) in reader.records().enumerate() {
        let record =
            record.with_context(|| format!("Reading record {} from {path:?}", row_idx + 1))?;
        let mut row: Vec<Option<Value>> = record
            .iter()
            .take(columns.len())
            .map(|cell| {
                if cell.is_empty() {
                    None
                } else {
                    Some(Value::Text(cell.to_string()))
                }
            })
            .collect();
        row.resize(columns.len(), None);
        rows.push(row);
    }
    Ok(Dataset { columns, rows })
}

/// Writes a dataset back out. Missing cells become empty fields.
pub fn write_dataset(dataset: &Dataset, path: Option<&Path>, delimiter: u8) -> Result<()> {
    let mut writer = open_csv_writer(path, delimiter)?;
    writer
        .write_record(&dataset.columns)
        .context("Writing header row")?;
    for (row_idx, row) in dataset.rows.iter().enumerate() {
        let record: Vec<String> = row
            .iter()
            .map(|cell| cell.as_ref().map(Value::as_display).unwrap_or_default())
            .collect();
        writer
            .write_record(&record)
            .with_context(|| format!("Writing record {}", row_idx + 1))?;
    }
    writer.flush().context("Flushing output")?;
    Ok(())
}
