//! CSV I/O around the in-memory [`Table`].
//!
//! Everything that touches the filesystem or standard streams lives here:
//!
//! - **Delimiter resolution**: `.tsv` implies tab, anything else comma,
//!   unless overridden.
//! - **Encoding**: exports are decoded with `encoding_rs` (UTF-8 by default,
//!   BOMs stripped); output is always UTF-8.
//! - **stdin/stdout**: the `-` path routes through the standard streams.
//! - **Quoting**: every output field is quoted.

use std::{
    fs::File,
    io::{BufReader, BufWriter, Read, Write},
    path::Path,
};

use anyhow::{Context, Result, anyhow};
use csv::QuoteStyle;
use encoding_rs::{Encoding, UTF_8};
use log::debug;

use crate::frame::Table;

pub const DEFAULT_CSV_DELIMITER: u8 = b',';
pub const DEFAULT_TSV_DELIMITER: u8 = b'\t';

pub fn is_dash(path: &Path) -> bool {
    path == Path::new("-")
}

pub fn resolve_encoding(label: Option<&str>) -> Result<&'static Encoding> {
    if let Some(value) = label {
        Encoding::for_label(value.trim().as_bytes())
            .ok_or_else(|| anyhow!("Unknown encoding '{value}'"))
    } else {
        Ok(UTF_8)
    }
}

pub fn resolve_delimiter(path: Option<&Path>, provided: Option<u8>) -> u8 {
    if let Some(delimiter) = provided {
        return delimiter;
    }
    match path.and_then(|p| p.extension()).and_then(|ext| ext.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("tsv") => DEFAULT_TSV_DELIMITER,
        _ => DEFAULT_CSV_DELIMITER,
    }
}

pub fn open_csv_reader<R>(reader: R, delimiter: u8) -> csv::Reader<R>
where
    R: Read,
{
    csv::ReaderBuilder::new()
        .has_headers(true)
        .delimiter(delimiter)
        .double_quote(true)
        .flexible(false)
        .from_reader(reader)
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
    let writer: Box<dyn Write> = match path {
        Some(p) if !is_dash(p) => Box::new(BufWriter::new(
            File::create(p).with_context(|| format!("Creating output file {p:?}"))?,
        )),
        _ => Box::new(std::io::stdout()),
    };
    Ok(csv::WriterBuilder::new()
        .delimiter(delimiter)
        .quote_style(QuoteStyle::Always)
        .double_quote(true)
        .from_writer(writer))
}

pub fn decode_bytes(bytes: &[u8], encoding: &'static Encoding) -> Result<String> {
    let (text, _, had_errors) = encoding.decode(bytes);
    if had_errors {
        Err(anyhow!(
            "Failed to decode text with encoding {}",
            encoding.name()
        ))
    } else {
        Ok(text.into_owned())
    }
}

pub fn decode_record(record: &csv::ByteRecord, encoding: &'static Encoding) -> Result<Vec<String>> {
    record
        .iter()
        .map(|field| decode_bytes(field, encoding))
        .collect()
}

/// Reads a whole CSV export into a [`Table`] of text cells.
pub fn read_table<R>(reader: &mut csv::Reader<R>, encoding: &'static Encoding) -> Result<Table>
where
    R: Read,
{
    let headers = decode_record(&reader.byte_headers()?.clone(), encoding)
        .context("Decoding header row")?;
    let mut rows = Vec::new();
    for (row_idx, record) in reader.byte_records().enumerate() {
        let record = record.with_context(|| format!("Reading row {}", row_idx + 2))?;
        let decoded = decode_record(&record, encoding)
            .with_context(|| format!("Decoding row {}", row_idx + 2))?;
        rows.push(decoded);
    }
    debug!("Read {} row(s) across {} column(s)", rows.len(), headers.len());
    Ok(Table::from_text_rows(&headers, &rows))
}

pub fn read_table_from_path(
    path: &Path,
    delimiter: u8,
    encoding: &'static Encoding,
) -> Result<Table> {
    let mut reader = open_csv_reader_from_path(path, delimiter)?;
    read_table(&mut reader, encoding).with_context(|| format!("Reading {path:?}"))
}

pub fn write_table<W>(writer: &mut csv::Writer<W>, table: &Table) -> Result<()>
where
    W: Write,
{
    writer
        .write_record(table.headers())
        .context("Writing output headers")?;
    for (row_idx, row) in table.to_text_rows().iter().enumerate() {
        writer
            .write_record(row)
            .with_context(|| format!("Writing row {}", row_idx + 2))?;
    }
    writer.flush().context("Flushing output")?;
    Ok(())
}

pub fn write_table_to_path(path: Option<&Path>, table: &Table, delimiter: u8) -> Result<()> {
    let mut writer = open_csv_writer(path, delimiter)?;
    write_table(&mut writer, table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use encoding_rs::WINDOWS_1252;

    #[test]
    fn tsv_extension_implies_tab() {
        assert_eq!(resolve_delimiter(Some(Path::new("export.TSV")), None), b'\t');
        assert_eq!(resolve_delimiter(Some(Path::new("export.csv")), None), b',');
        assert_eq!(resolve_delimiter(None, Some(b';')), b';');
    }

    #[test]
    fn read_table_strips_bom_and_keeps_empty_cells_missing() {
        let data = "\u{feff}Ad ID,Cost\n1,\n2,3.5\n";
        let mut reader = open_csv_reader(data.as_bytes(), b',');
        let table = read_table(&mut reader, UTF_8).unwrap();
        assert_eq!(table.headers(), ["Ad ID", "Cost"]);
        assert_eq!(table.cell(0, "Cost"), None);
        assert_eq!(table.to_text_rows()[1], vec!["2", "3.5"]);
    }

    #[test]
    fn read_table_decodes_legacy_encodings() {
        let bytes = b"ad_id,name\n1,Caf\xe9\n";
        let mut reader = open_csv_reader(&bytes[..], b',');
        let table = read_table(&mut reader, WINDOWS_1252).unwrap();
        assert_eq!(table.to_text_rows()[0][1], "Café");
    }

    #[test]
    fn write_table_quotes_every_field() {
        let table = Table::from_text_rows(&["ad_id", "date"], &[vec!["1", "2024-06-10"]]);
        let mut writer = csv::WriterBuilder::new()
            .quote_style(QuoteStyle::Always)
            .from_writer(Vec::new());
        write_table(&mut writer, &table).unwrap();
        let output = String::from_utf8(writer.into_inner().unwrap()).unwrap();
        assert_eq!(output, "\"ad_id\",\"date\"\n\"1\",\"2024-06-10\"\n");
    }
}
