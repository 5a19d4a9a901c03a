//! Shared OpenDocument flat-XML plumbing for the word-processor and
//! spreadsheet codecs.
//!
//! Writing: a thin wrapper over `quick_xml::Writer` that emits the
//! `office:document` root and paragraph text with ODF whitespace elements
//! (`text:s`, `text:tab`, `text:line-break`).
//!
//! Reading: a flat list of text blocks (`text:h` and `text:p`), each with
//! its style name and the table row it sits in, if any.

use crate::TenderError;
use quick_xml::Reader;
use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use std::fmt::Display;

const NAMESPACES: [(&str, &str); 5] = [
    ("xmlns:office", "urn:oasis:names:tc:opendocument:xmlns:office:1.0"),
    ("xmlns:style", "urn:oasis:names:tc:opendocument:xmlns:style:1.0"),
    ("xmlns:text", "urn:oasis:names:tc:opendocument:xmlns:text:1.0"),
    ("xmlns:table", "urn:oasis:names:tc:opendocument:xmlns:table:1.0"),
    ("xmlns:fo", "urn:oasis:names:tc:opendocument:xmlns:xsl-fo-compatible:1.0"),
];

/// Longest `text:s` run accepted when reading.
const MAX_SPACE_RUN: usize = 4096;

pub(super) fn xml_error(e: impl Display) -> TenderError {
    TenderError::SerializationError(format!("XML: {}", e))
}

// =============================================================================
// WRITER
// =============================================================================

pub(super) struct OdfWriter {
    writer: Writer<Vec<u8>>,
}

impl OdfWriter {
    /// Start a flat document of the given ODF mimetype.
    pub(super) fn begin(mimetype: &str) -> Result<Self, TenderError> {
        let mut writer = Writer::new(Vec::new());
        writer
            .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
            .map_err(xml_error)?;
        let root = BytesStart::new("office:document")
            .with_attributes(NAMESPACES)
            .with_attributes([("office:version", "1.2"), ("office:mimetype", mimetype)]);
        writer.write_event(Event::Start(root)).map_err(xml_error)?;
        Ok(Self { writer })
    }

    pub(super) fn start(&mut self, name: &str, attributes: &[(&str, &str)]) -> Result<(), TenderError> {
        let element = BytesStart::new(name).with_attributes(attributes.iter().copied());
        self.writer
            .write_event(Event::Start(element))
            .map_err(xml_error)
    }

    pub(super) fn empty(&mut self, name: &str, attributes: &[(&str, &str)]) -> Result<(), TenderError> {
        let element = BytesStart::new(name).with_attributes(attributes.iter().copied());
        self.writer
            .write_event(Event::Empty(element))
            .map_err(xml_error)
    }

    pub(super) fn end(&mut self, name: &str) -> Result<(), TenderError> {
        self.writer
            .write_event(Event::End(BytesEnd::new(name)))
            .map_err(xml_error)
    }

    /// Write `<name attrs>text</name>` with ODF whitespace handling.
    pub(super) fn text_element(
        &mut self,
        name: &str,
        attributes: &[(&str, &str)],
        text: &str,
    ) -> Result<(), TenderError> {
        self.start(name, attributes)?;
        self.text(text)?;
        self.end(name)
    }

    /// A paragraph style with text properties, inside `office:styles`.
    pub(super) fn paragraph_style(
        &mut self,
        name: &str,
        properties: &[(&str, &str)],
    ) -> Result<(), TenderError> {
        self.start(
            "style:style",
            &[("style:name", name), ("style:family", "paragraph")],
        )?;
        self.empty("style:text-properties", properties)?;
        self.end("style:style")
    }

    /// Close the root element and return the bytes.
    pub(super) fn finish(mut self) -> Result<Vec<u8>, TenderError> {
        self.end("office:document")?;
        Ok(self.writer.into_inner())
    }

    /// Literal runs go out as escaped text. A space that starts the text or
    /// follows another space becomes `text:s`, as ODF collapses those.
    fn text(&mut self, text: &str) -> Result<(), TenderError> {
        let mut run = String::new();
        let mut spaces = 0usize;
        let mut previous: Option<char> = None;

        for ch in text.chars() {
            let collapsible = ch == ' ' && matches!(previous, None | Some(' '));
            if !collapsible && spaces > 0 {
                self.spaces(spaces)?;
                spaces = 0;
            }
            match ch {
                ' ' if collapsible => {
                    self.flush(&mut run)?;
                    spaces += 1;
                }
                '\t' => {
                    self.flush(&mut run)?;
                    self.empty("text:tab", &[])?;
                }
                '\n' => {
                    self.flush(&mut run)?;
                    self.empty("text:line-break", &[])?;
                }
                _ => run.push(ch),
            }
            previous = Some(ch);
        }
        if spaces > 0 {
            self.spaces(spaces)?;
        }
        self.flush(&mut run)
    }

    fn spaces(&mut self, count: usize) -> Result<(), TenderError> {
        if count == 1 {
            self.empty("text:s", &[])
        } else {
            self.empty("text:s", &[("text:c", count.to_string().as_str())])
        }
    }

    fn flush(&mut self, run: &mut String) -> Result<(), TenderError> {
        if run.is_empty() {
            return Ok(());
        }
        self.writer
            .write_event(Event::Text(BytesText::new(run.as_str())))
            .map_err(xml_error)?;
        run.clear();
        Ok(())
    }
}

// =============================================================================
// READER
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum BlockKind {
    Heading,
    Paragraph,
}

/// One `text:h` or `text:p` with its decoded text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) struct Block {
    pub(super) kind: BlockKind,
    pub(super) style: Option<String>,
    /// Zero-based index of the enclosing `table:table-row`.
    pub(super) row: Option<usize>,
    pub(super) text: String,
}

fn block_kind(name: &[u8]) -> Option<BlockKind> {
    match name {
        b"text:h" => Some(BlockKind::Heading),
        b"text:p" => Some(BlockKind::Paragraph),
        _ => None,
    }
}

fn style_of(element: &BytesStart<'_>) -> Result<Option<String>, TenderError> {
    match element.try_get_attribute("text:style-name").map_err(xml_error)? {
        Some(attribute) => Ok(Some(
            attribute.unescape_value().map_err(xml_error)?.into_owned(),
        )),
        None => Ok(None),
    }
}

fn space_count(element: &BytesStart<'_>) -> Result<usize, TenderError> {
    let count: usize = match element.try_get_attribute("text:c").map_err(xml_error)? {
        Some(attribute) => attribute
            .unescape_value()
            .map_err(xml_error)?
            .parse()
            .map_err(xml_error)?,
        None => 1,
    };
    if count > MAX_SPACE_RUN {
        return Err(xml_error(format!("space run of {} is too long", count)));
    }
    Ok(count)
}

/// Collect every text block in document order.
pub(super) fn read_blocks(bytes: &[u8]) -> Result<Vec<Block>, TenderError> {
    let source = std::str::from_utf8(bytes).map_err(xml_error)?;
    let mut reader = Reader::from_str(source);
    reader.config_mut().trim_text(false);

    let mut blocks = Vec::new();
    let mut current: Option<Block> = None;
    let mut row: Option<usize> = None;
    let mut next_row = 0usize;

    loop {
        match reader.read_event().map_err(xml_error)? {
            Event::Start(e) => {
                let name = e.name();
                if name.as_ref() == b"table:table-row" {
                    row = Some(next_row);
                    next_row += 1;
                } else if let Some(kind) = block_kind(name.as_ref()) {
                    if current.is_some() {
                        return Err(xml_error("nested text block"));
                    }
                    current = Some(Block {
                        kind,
                        style: style_of(&e)?,
                        row,
                        text: String::new(),
                    });
                }
            }
            Event::Empty(e) => {
                let name = e.name();
                if let Some(kind) = block_kind(name.as_ref()) {
                    blocks.push(Block {
                        kind,
                        style: style_of(&e)?,
                        row,
                        text: String::new(),
                    });
                } else if let Some(block) = current.as_mut() {
                    match name.as_ref() {
                        b"text:s" => block.text.push_str(&" ".repeat(space_count(&e)?)),
                        b"text:tab" => block.text.push('\t'),
                        b"text:line-break" => block.text.push('\n'),
                        _ => {}
                    }
                }
            }
            Event::Text(e) => {
                if let Some(block) = current.as_mut() {
                    block.text.push_str(&e.unescape().map_err(xml_error)?);
                }
            }
            Event::CData(e) => {
                if let Some(block) = current.as_mut() {
                    block
                        .text
                        .push_str(&String::from_utf8_lossy(&e.into_inner()));
                }
            }
            Event::End(e) => {
                let name = e.name();
                if name.as_ref() == b"table:table-row" {
                    row = None;
                } else if block_kind(name.as_ref()).is_some() {
                    if let Some(block) = current.take() {
                        blocks.push(block);
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if current.is_some() {
        return Err(xml_error("unterminated text block"));
    }
    Ok(blocks)
}
