//! Word-processor export: OpenDocument Flat Text (`.fodt`).
//!
//! Body layout:
//!
//! ```text
//! text:p  Title        document heading
//! text:p  Title        tender title
//! text:p  Meta         "Sector: ..."
//! text:p  Meta         "Generated on: YYYY-MM-DD"
//! text:h  Heading_1    category title          (outline level 1)
//! text:p  Label        sub-criterion label
//! text:p  Description  sub-criterion description
//! ```

use super::odf::{BlockKind, OdfWriter, read_blocks, xml_error};
use super::{DocumentCodec, ExportFormat};
use crate::TenderError;
use crate::primitives::DOCUMENT_HEADING;
use crate::traversal::{Entry, TenderDocument};

const MIMETYPE: &str = "application/vnd.oasis.opendocument.text";

const STYLE_TITLE: &str = "Title";
const STYLE_META: &str = "Meta";
const STYLE_HEADING: &str = "Heading_20_1";
const STYLE_LABEL: &str = "Label";
const STYLE_DESCRIPTION: &str = "Description";

/// Flat ODT codec.
#[derive(Debug, Clone, Copy, Default)]
pub struct WordCodec;

impl DocumentCodec for WordCodec {
    fn format(&self) -> ExportFormat {
        ExportFormat::Word
    }

    fn encode(&self, document: &TenderDocument) -> Result<Vec<u8>, TenderError> {
        let mut out = OdfWriter::begin(MIMETYPE)?;

        out.start("office:styles", &[])?;
        out.paragraph_style(STYLE_TITLE, &[("fo:font-size", "18pt"), ("fo:font-weight", "bold")])?;
        out.paragraph_style(STYLE_META, &[("fo:font-size", "10pt"), ("fo:color", "#555555")])?;
        out.paragraph_style(STYLE_HEADING, &[("fo:font-size", "14pt"), ("fo:font-weight", "bold")])?;
        out.paragraph_style(STYLE_LABEL, &[("fo:font-size", "11pt"), ("fo:font-weight", "bold")])?;
        out.paragraph_style(STYLE_DESCRIPTION, &[("fo:font-size", "10pt")])?;
        out.end("office:styles")?;

        out.start("office:body", &[])?;
        out.start("office:text", &[])?;

        let title = [("text:style-name", STYLE_TITLE)];
        let meta = [("text:style-name", STYLE_META)];
        out.text_element("text:p", &title, DOCUMENT_HEADING)?;
        out.text_element("text:p", &title, &document.title)?;
        out.text_element("text:p", &meta, &format!("Sector: {}", document.sector_name))?;
        out.text_element(
            "text:p",
            &meta,
            &format!("Generated on: {}", document.generated_at.format("%Y-%m-%d")),
        )?;

        let heading = [("text:style-name", STYLE_HEADING), ("text:outline-level", "1")];
        let label = [("text:style-name", STYLE_LABEL)];
        let description = [("text:style-name", STYLE_DESCRIPTION)];
        for section in &document.sections {
            out.text_element("text:h", &heading, &section.title)?;
            for entry in &section.entries {
                out.text_element("text:p", &label, &entry.label)?;
                out.text_element("text:p", &description, &entry.description)?;
            }
        }

        out.end("office:text")?;
        out.end("office:body")?;
        out.finish()
    }

    fn decode_entries(&self, bytes: &[u8]) -> Result<Vec<Entry>, TenderError> {
        let mut entries = Vec::new();
        let mut heading: Option<String> = None;
        let mut label: Option<String> = None;

        for block in read_blocks(bytes)? {
            match (block.kind, block.style.as_deref()) {
                (BlockKind::Heading, _) => heading = Some(block.text),
                (BlockKind::Paragraph, Some(STYLE_LABEL)) => label = Some(block.text),
                (BlockKind::Paragraph, Some(STYLE_DESCRIPTION)) => {
                    let (Some(category), Some(label)) = (heading.clone(), label.take()) else {
                        return Err(xml_error("description without heading and label"));
                    };
                    entries.push(Entry {
                        category,
                        label,
                        description: block.text,
                    });
                }
                _ => {}
            }
        }
        Ok(entries)
    }
}
