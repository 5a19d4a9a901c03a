//! Spreadsheet export: OpenDocument Flat Spreadsheet (`.fods`).
//!
//! One table, a header row, then one three-cell row per entry in traversal
//! order. Every cell is a string cell.

use super::odf::{OdfWriter, read_blocks, xml_error};
use super::{DocumentCodec, ExportFormat};
use crate::TenderError;
use crate::primitives::{SHEET_NAME, SPREADSHEET_HEADER};
use crate::traversal::{Entry, TenderDocument};
use std::collections::BTreeMap;

const MIMETYPE: &str = "application/vnd.oasis.opendocument.spreadsheet";

/// Flat ODS codec.
#[derive(Debug, Clone, Copy, Default)]
pub struct SheetCodec;

impl SheetCodec {
    fn row(out: &mut OdfWriter, cells: [&str; 3]) -> Result<(), TenderError> {
        out.start("table:table-row", &[])?;
        for cell in cells {
            out.start("table:table-cell", &[("office:value-type", "string")])?;
            out.text_element("text:p", &[], cell)?;
            out.end("table:table-cell")?;
        }
        out.end("table:table-row")
    }
}

impl DocumentCodec for SheetCodec {
    fn format(&self) -> ExportFormat {
        ExportFormat::Spreadsheet
    }

    fn encode(&self, document: &TenderDocument) -> Result<Vec<u8>, TenderError> {
        let mut out = OdfWriter::begin(MIMETYPE)?;
        out.start("office:body", &[])?;
        out.start("office:spreadsheet", &[])?;
        out.start("table:table", &[("table:name", SHEET_NAME)])?;
        out.empty("table:table-column", &[("table:number-columns-repeated", "3")])?;

        Self::row(&mut out, SPREADSHEET_HEADER)?;
        for section in &document.sections {
            for entry in &section.entries {
                Self::row(
                    &mut out,
                    [
                        section.title.as_str(),
                        entry.label.as_str(),
                        entry.description.as_str(),
                    ],
                )?;
            }
        }

        out.end("table:table")?;
        out.end("office:spreadsheet")?;
        out.end("office:body")?;
        out.finish()
    }

    fn decode_entries(&self, bytes: &[u8]) -> Result<Vec<Entry>, TenderError> {
        let mut rows: BTreeMap<usize, Vec<String>> = BTreeMap::new();
        for block in read_blocks(bytes)? {
            if let Some(row) = block.row {
                rows.entry(row).or_default().push(block.text);
            }
        }

        let mut rows = rows.into_values();
        let header = rows.next().unwrap_or_default();
        if header != SPREADSHEET_HEADER {
            return Err(xml_error(format!("unexpected header row {:?}", header)));
        }

        rows.map(|cells| match <[String; 3]>::try_from(cells) {
            Ok([category, label, description]) => Ok(Entry {
                category,
                label,
                description,
            }),
            Err(cells) => Err(xml_error(format!(
                "expected 3 cells per row, found {}",
                cells.len()
            ))),
        })
        .collect()
    }
}
