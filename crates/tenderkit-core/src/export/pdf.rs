//! # PDF Export
//!
//! A minimal PDF 1.4 writer: A4 pages, the standard Helvetica and
//! Helvetica-Bold fonts in WinAnsi encoding, uncompressed content streams.
//!
//! Layout is integer points. Text is wrapped on spaces so that the wrapped
//! lines concatenate back to the original string, and every logical text
//! element is wrapped in a marked-content span:
//!
//! | Tag            | Content                                   |
//! |----------------|-------------------------------------------|
//! | `/Meta`        | document heading, title, sector, date     |
//! | `/Heading`     | category title                            |
//! | `/Label`       | sub-criterion label                       |
//! | `/Description` | sub-criterion description                 |
//! | `/Cont`        | continuation of the previous span after a page break |
//!
//! The decoder reads those spans back in file order. Characters outside
//! WinAnsi are written as `?` and do not survive a round trip; the codec
//! reports them through [`DocumentCodec::unrepresentable`] and logs a
//! warning per affected element.

use super::{DocumentCodec, ExportFormat};
use crate::TenderError;
use crate::primitives::DOCUMENT_HEADING;
use crate::traversal::{Entry, TenderDocument};
use std::collections::BTreeSet;

// =============================================================================
// LAYOUT
// =============================================================================

const PAGE_WIDTH: i32 = 595;
const PAGE_HEIGHT: i32 = 842;
const MARGIN: i32 = 50;
const TEXT_WIDTH: i32 = PAGE_WIDTH - 2 * MARGIN;

/// One text style.
#[derive(Debug, Clone, Copy)]
struct Style {
    resource: &'static str,
    size: i32,
    leading: i32,
    indent: i32,
    /// Extra space above the first line.
    space_before: i32,
}

impl Style {
    /// Characters per line, assuming an average glyph width of half the
    /// font size.
    fn columns(self) -> usize {
        ((TEXT_WIDTH - self.indent) * 2 / self.size).max(1) as usize
    }
}

const DOCUMENT: Style = Style { resource: "F2", size: 18, leading: 24, indent: 0, space_before: 0 };
const TITLE: Style = Style { resource: "F2", size: 14, leading: 20, indent: 0, space_before: 0 };
const META: Style = Style { resource: "F1", size: 10, leading: 14, indent: 0, space_before: 0 };
const HEADING: Style = Style { resource: "F2", size: 13, leading: 18, indent: 0, space_before: 12 };
const LABEL: Style = Style { resource: "F2", size: 11, leading: 15, indent: 12, space_before: 4 };
const DESCRIPTION: Style = Style { resource: "F1", size: 10, leading: 14, indent: 24, space_before: 0 };

// =============================================================================
// CODEC
// =============================================================================

/// PDF codec.
#[derive(Debug, Clone, Copy, Default)]
pub struct PdfCodec;

impl DocumentCodec for PdfCodec {
    fn format(&self) -> ExportFormat {
        ExportFormat::Pdf
    }

    fn encode(&self, document: &TenderDocument) -> Result<Vec<u8>, TenderError> {
        let mut pages = PageWriter::new();
        pages.element("Meta", DOCUMENT, DOCUMENT_HEADING);
        pages.element("Meta", TITLE, &document.title);
        pages.element("Meta", META, &format!("Sector: {}", document.sector_name));
        pages.element(
            "Meta",
            META,
            &format!("Generated on: {}", document.generated_at.format("%Y-%m-%d")),
        );
        if document.sections.is_empty() {
            pages.element("Meta", HEADING, "No categories selected.");
        }
        for section in &document.sections {
            pages.element("Heading", HEADING, &section.title);
            for entry in &section.entries {
                pages.element("Label", LABEL, &entry.label);
                pages.element("Description", DESCRIPTION, &entry.description);
            }
        }

        let info = format!(
            "<< /Title ({}) /Producer (tenderkit) /CreationDate (D:{}Z) >>",
            escape_text(&document.title),
            document.generated_at.format("%Y%m%d%H%M%S")
        );
        Ok(assemble(&pages.finish(), &info))
    }

    fn decode_entries(&self, bytes: &[u8]) -> Result<Vec<Entry>, TenderError> {
        if !bytes.starts_with(b"%PDF-") {
            return Err(TenderError::SerializationError(
                "Invalid file format".to_string(),
            ));
        }

        let mut spans: Vec<(String, String)> = Vec::new();
        for stream in content_streams(bytes) {
            for (tag, text) in parse_spans(stream)? {
                if tag != "Cont" {
                    spans.push((tag, text));
                    continue;
                }
                let Some((_, previous)) = spans.last_mut() else {
                    return Err(TenderError::SerializationError(
                        "Continuation without a preceding element".to_string(),
                    ));
                };
                previous.push_str(&text);
            }
        }

        let mut entries = Vec::new();
        let mut heading: Option<String> = None;
        let mut label: Option<String> = None;
        for (tag, text) in spans {
            match tag.as_str() {
                "Heading" => heading = Some(text),
                "Label" => label = Some(text),
                "Description" => {
                    let (Some(category), Some(label)) = (heading.clone(), label.take()) else {
                        return Err(TenderError::SerializationError(
                            "Description without heading and label".to_string(),
                        ));
                    };
                    entries.push(Entry {
                        category,
                        label,
                        description: text,
                    });
                }
                _ => {}
            }
        }
        Ok(entries)
    }

    fn unrepresentable(&self, document: &TenderDocument) -> Vec<char> {
        let texts = [document.title.as_str(), document.sector_name.as_str()]
            .into_iter()
            .chain(document.sections.iter().flat_map(|section| {
                std::iter::once(section.title.as_str()).chain(
                    section
                        .entries
                        .iter()
                        .flat_map(|e| [e.label.as_str(), e.description.as_str()]),
                )
            }));
        let missing: BTreeSet<char> = texts.flat_map(unencodable).collect();
        missing.into_iter().collect()
    }
}

// =============================================================================
// PAGE LAYOUT
// =============================================================================

/// Lays out marked text elements into page content streams.
struct PageWriter {
    pages: Vec<String>,
    current: String,
    y: i32,
}

impl PageWriter {
    fn new() -> Self {
        Self {
            pages: Vec::new(),
            current: String::new(),
            y: PAGE_HEIGHT - MARGIN,
        }
    }

    fn fits(&self, height: i32) -> bool {
        self.y - height >= MARGIN
    }

    fn break_page(&mut self) {
        self.pages.push(std::mem::take(&mut self.current));
        self.y = PAGE_HEIGHT - MARGIN;
    }

    /// Write one element as a marked-content span, breaking pages as
    /// needed.
    fn element(&mut self, tag: &str, style: Style, text: &str) {
        let at_top = self.y == PAGE_HEIGHT - MARGIN;
        if !at_top {
            if self.fits(style.space_before + style.leading) {
                self.y -= style.space_before;
            } else {
                self.break_page();
            }
        }

        if text.chars().any(|ch| to_win_ansi(ch).is_none()) {
            tracing::warn!(
                element = tag,
                characters = %unencodable(text).collect::<String>(),
                "PDF cannot encode characters; writing '?'"
            );
        }

        self.current.push_str(&format!("/{} BMC\n", tag));
        for line in wrap(text, style.columns()) {
            if !self.fits(style.leading) {
                self.current.push_str("EMC\n");
                self.break_page();
                self.current.push_str("/Cont BMC\n");
            }
            self.y -= style.leading;
            self.current.push_str(&format!(
                "BT /{} {} Tf {} {} Td ({}) Tj ET\n",
                style.resource,
                style.size,
                MARGIN + style.indent,
                self.y,
                escape_text(&line)
            ));
        }
        self.current.push_str("EMC\n");
    }

    fn finish(mut self) -> Vec<String> {
        if !self.current.is_empty() || self.pages.is_empty() {
            self.pages.push(self.current);
        }
        self.pages
    }
}

/// Split `text` into lines of at most `columns` characters, breaking after
/// the last space that fits. Concatenating the lines yields `text`.
fn wrap(text: &str, columns: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    let mut lines = Vec::new();
    let mut start = 0;
    while chars.len() - start > columns {
        let window = &chars[start..start + columns];
        let cut = window
            .iter()
            .rposition(|c| *c == ' ')
            .map_or(columns, |p| p + 1);
        lines.push(chars[start..start + cut].iter().collect());
        start += cut;
    }
    lines.push(chars[start..].iter().collect());
    lines
}

// =============================================================================
// FILE STRUCTURE
// =============================================================================

/// Object numbers: 1 catalog, 2 page tree, 3-4 fonts, then a page and its
/// content stream per page, then the info dictionary.
fn assemble(pages: &[String], info: &str) -> Vec<u8> {
    let first_page = 5;
    let kids: Vec<String> = (0..pages.len())
        .map(|i| format!("{} 0 R", first_page + 2 * i))
        .collect();

    let mut objects = vec![
        "<< /Type /Catalog /Pages 2 0 R >>".to_string(),
        format!(
            "<< /Type /Pages /Kids [{}] /Count {} >>",
            kids.join(" "),
            pages.len()
        ),
        font("Helvetica"),
        font("Helvetica-Bold"),
    ];
    for (i, content) in pages.iter().enumerate() {
        objects.push(format!(
            "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 {} {}] \
             /Resources << /Font << /F1 3 0 R /F2 4 0 R >> >> /Contents {} 0 R >>",
            PAGE_WIDTH,
            PAGE_HEIGHT,
            first_page + 2 * i + 1
        ));
        objects.push(format!(
            "<< /Length {} >>\nstream\n{}\nendstream",
            content.len(),
            content
        ));
    }
    objects.push(info.to_string());
    let info_number = objects.len();

    let mut out: Vec<u8> = b"%PDF-1.4\n%\xE2\xE3\xCF\xD3\n".to_vec();
    let mut offsets = Vec::with_capacity(objects.len());
    for (i, body) in objects.iter().enumerate() {
        offsets.push(out.len());
        out.extend_from_slice(format!("{} 0 obj\n{}\nendobj\n", i + 1, body).as_bytes());
    }

    let xref_offset = out.len();
    let mut xref = format!("xref\n0 {}\n0000000000 65535 f \n", objects.len() + 1);
    for offset in offsets {
        xref.push_str(&format!("{:010} 00000 n \n", offset));
    }
    xref.push_str(&format!(
        "trailer\n<< /Size {} /Root 1 0 R /Info {} 0 R >>\nstartxref\n{}\n%%EOF\n",
        objects.len() + 1,
        info_number,
        xref_offset
    ));
    out.extend_from_slice(xref.as_bytes());
    out
}

fn font(base: &str) -> String {
    format!(
        "<< /Type /Font /Subtype /Type1 /BaseFont /{} /Encoding /WinAnsiEncoding >>",
        base
    )
}

// =============================================================================
// TEXT ENCODING
// =============================================================================

/// WinAnsi code points 0x80-0x9F that differ from Latin-1.
const WIN_ANSI_HIGH: [(u8, char); 27] = [
    (0x80, '€'),
    (0x82, '‚'),
    (0x83, 'ƒ'),
    (0x84, '„'),
    (0x85, '…'),
    (0x86, '†'),
    (0x87, '‡'),
    (0x88, 'ˆ'),
    (0x89, '‰'),
    (0x8A, 'Š'),
    (0x8B, '‹'),
    (0x8C, 'Œ'),
    (0x8E, 'Ž'),
    (0x91, '‘'),
    (0x92, '’'),
    (0x93, '“'),
    (0x94, '”'),
    (0x95, '•'),
    (0x96, '–'),
    (0x97, '—'),
    (0x98, '˜'),
    (0x99, '™'),
    (0x9A, 'š'),
    (0x9B, '›'),
    (0x9C, 'œ'),
    (0x9E, 'ž'),
    (0x9F, 'Ÿ'),
];

/// The WinAnsi byte for `ch`. Control characters map to themselves.
fn to_win_ansi(ch: char) -> Option<u8> {
    match ch as u32 {
        code @ (0x00..=0x7F | 0xA0..=0xFF) => Some(code as u8),
        _ => WIN_ANSI_HIGH
            .iter()
            .find(|(_, c)| *c == ch)
            .map(|(byte, _)| *byte),
    }
}

fn unencodable(text: &str) -> impl Iterator<Item = char> + '_ {
    text.chars().filter(|ch| to_win_ansi(*ch).is_none())
}

fn from_win_ansi(byte: u8) -> char {
    match byte {
        0x80..=0x9F => WIN_ANSI_HIGH
            .iter()
            .find(|(b, _)| *b == byte)
            .map_or('?', |(_, c)| *c),
        _ => char::from(byte),
    }
}

/// Encode text as the body of a PDF literal string. Output is ASCII.
fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match to_win_ansi(ch).unwrap_or(b'?') {
            b'\n' => out.push_str("\\n"),
            b'\r' => out.push_str("\\r"),
            b'\t' => out.push_str("\\t"),
            b'(' => out.push_str("\\("),
            b')' => out.push_str("\\)"),
            b'\\' => out.push_str("\\\\"),
            byte @ 0x20..=0x7E => out.push(char::from(byte)),
            byte => out.push_str(&format!("\\{:03o}", byte)),
        }
    }
    out
}

// =============================================================================
// DECODING
// =============================================================================

/// Content stream bodies in file order.
fn content_streams(bytes: &[u8]) -> Vec<&[u8]> {
    const START: &[u8] = b">>\nstream\n";
    const END: &[u8] = b"\nendstream";

    let mut streams = Vec::new();
    let mut rest = bytes;
    while let Some(start) = find(rest, START) {
        let body = &rest[start + START.len()..];
        let Some(end) = find(body, END) else { break };
        streams.push(&body[..end]);
        rest = &body[end + END.len()..];
    }
    streams
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

/// Read `(tag, text)` pairs from one content stream.
fn parse_spans(stream: &[u8]) -> Result<Vec<(String, String)>, TenderError> {
    let mut spans = Vec::new();
    let mut open: Option<(String, String)> = None;
    let mut last_name: Option<String> = None;
    let mut last_string: Option<String> = None;
    let mut pos = 0;

    while pos < stream.len() {
        let byte = stream[pos];
        if byte.is_ascii_whitespace() {
            pos += 1;
        } else if byte == b'(' {
            let (text, next) = read_string(stream, pos + 1)?;
            last_string = Some(text);
            pos = next;
        } else {
            let end = stream[pos..]
                .iter()
                .position(|b| b.is_ascii_whitespace() || *b == b'(')
                .map_or(stream.len(), |p| pos + p);
            let token = String::from_utf8_lossy(&stream[pos..end]);
            match token.as_ref() {
                "BMC" => {
                    let tag = last_name.take().ok_or_else(|| {
                        TenderError::SerializationError("BMC without a tag".to_string())
                    })?;
                    open = Some((tag, String::new()));
                }
                "Tj" => {
                    if let (Some((_, text)), Some(s)) = (open.as_mut(), last_string.take()) {
                        text.push_str(&s);
                    }
                }
                "EMC" => {
                    let span = open.take().ok_or_else(|| {
                        TenderError::SerializationError("EMC without BMC".to_string())
                    })?;
                    spans.push(span);
                }
                name if name.starts_with('/') => {
                    last_name = Some(name[1..].to_string());
                }
                _ => {}
            }
            pos = end;
        }
    }

    if open.is_some() {
        return Err(TenderError::SerializationError(
            "Unterminated marked content".to_string(),
        ));
    }
    Ok(spans)
}

/// Read a literal string starting just after its opening parenthesis.
/// Returns the decoded text and the position after the closing one.
fn read_string(stream: &[u8], mut pos: usize) -> Result<(String, usize), TenderError> {
    let mut text = String::new();
    let mut depth = 0usize;
    while pos < stream.len() {
        let byte = stream[pos];
        pos += 1;
        match byte {
            b'\\' => {
                let Some(&next) = stream.get(pos) else { break };
                pos += 1;
                match next {
                    b'n' => text.push('\n'),
                    b'r' => text.push('\r'),
                    b't' => text.push('\t'),
                    b'0'..=b'7' => {
                        let mut code = u32::from(next - b'0');
                        for _ in 0..2 {
                            match stream.get(pos) {
                                Some(d @ b'0'..=b'7') => {
                                    code = code * 8 + u32::from(d - b'0');
                                    pos += 1;
                                }
                                _ => break,
                            }
                        }
                        text.push(from_win_ansi((code & 0xFF) as u8));
                    }
                    other => text.push(from_win_ansi(other)),
                }
            }
            b'(' => {
                depth += 1;
                text.push('(');
            }
            b')' if depth == 0 => return Ok((text, pos)),
            b')' => {
                depth -= 1;
                text.push(')');
            }
            other => text.push(from_win_ansi(other)),
        }
    }
    Err(TenderError::SerializationError(
        "Unterminated string".to_string(),
    ))
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::catalog::Subcriterion;
    use crate::traversal::Section;
    use crate::{CategoryId, SectorId};
    use chrono::{TimeZone, Utc};

    fn document(sections: Vec<Section>) -> TenderDocument {
        TenderDocument {
            title: "Bridge (phase 2)".to_string(),
            sector: SectorId::new("construction"),
            sector_name: "Construction".to_string(),
            generated_at: Utc.with_ymd_and_hms(2025, 9, 1, 0, 0, 0).single().unwrap(),
            sections,
        }
    }

    fn section(id: &str, title: &str, entries: &[(&str, &str)]) -> Section {
        Section {
            id: CategoryId::new(id),
            title: title.to_string(),
            entries: entries
                .iter()
                .map(|(label, description)| Subcriterion {
                    label: label.to_string(),
                    description: description.to_string(),
                })
                .collect(),
        }
    }

    #[test]
    fn wrap_concatenates_to_original() {
        let text = "Complete set of technical documents, datasheets, drawings and manuals.";
        let lines = wrap(text, 20);
        assert!(lines.len() > 1);
        assert!(lines.iter().all(|l| l.chars().count() <= 20));
        assert_eq!(lines.concat(), text);

        let unbroken = "x".repeat(45);
        assert_eq!(wrap(&unbroken, 20).len(), 3);
        assert_eq!(wrap("", 20), vec![String::new()]);
    }

    #[test]
    fn escape_handles_delimiters_and_win_ansi() {
        assert_eq!(escape_text("a(b)c\\"), "a\\(b\\)c\\\\");
        assert_eq!(escape_text("client’s"), "client\\222s");
        assert_eq!(escape_text("café"), "caf\\351");
        assert_eq!(escape_text("日本"), "??");
        assert_eq!(escape_text("a\nb\tc\rd"), "a\\nb\\tc\\rd");
        assert_eq!(escape_text("\u{7}"), "\\007");
    }

    #[test]
    fn control_characters_round_trip() {
        let doc = document(vec![section(
            "C1",
            "C1. Technical",
            &[("C1.1\tScope", "Line one\nLine two\twith tab\r\nend")],
        )]);
        let bytes = PdfCodec.encode(&doc).unwrap();
        assert_eq!(PdfCodec.decode_entries(&bytes).unwrap(), doc.entries());
        assert!(PdfCodec.unrepresentable(&doc).is_empty());
    }

    #[test]
    fn unrepresentable_characters_are_reported() {
        let doc = document(vec![section(
            "C2",
            "C2. Financial ₹",
            &[("C2.1", "EMD of ₹50,000 payable"), ("C2.2", "नमस्ते, client’s €")],
        )]);
        let missing = PdfCodec.unrepresentable(&doc);
        assert!(missing.contains(&'₹'));
        assert!(missing.contains(&'न'));
        assert!(!missing.contains(&'’'));
        assert!(!missing.contains(&'€'));
        assert!(missing.windows(2).all(|w| w[0] < w[1]));

        let decoded = PdfCodec.decode_entries(&PdfCodec.encode(&doc).unwrap()).unwrap();
        assert_eq!(decoded[0].description, "EMD of ?50,000 payable");
    }

    #[test]
    fn output_is_structurally_valid() {
        let doc = document(vec![section("C1", "C1. Technical", &[("C1.1", "Specs")])]);
        let bytes = PdfCodec.encode(&doc).unwrap();
        let text = String::from_utf8_lossy(&bytes);

        assert!(bytes.starts_with(b"%PDF-1.4"));
        assert!(text.ends_with("%%EOF\n"));
        assert!(text.contains("/BaseFont /Helvetica-Bold"));
        assert!(text.contains("/Title (Bridge \\(phase 2\\))"));

        let startxref = text.rfind("startxref\n").unwrap();
        let offset: usize = text[startxref + 10..]
            .lines()
            .next()
            .unwrap()
            .parse()
            .unwrap();
        assert!(bytes[offset..].starts_with(b"xref"));
    }

    #[test]
    fn round_trip_entries() {
        let doc = document(vec![
            section("C3", "C3. Vendor Experience", &[("C3.2", "Bidder’s (sector) experience")]),
            section("C7", "C7. Innovation", &[]),
            section("C1", "C1. Technical", &[("C1.1", "Specs"), ("C1.4", "")]),
        ]);
        let bytes = PdfCodec.encode(&doc).unwrap();
        assert_eq!(PdfCodec.decode_entries(&bytes).unwrap(), doc.entries());
    }

    #[test]
    fn long_documents_break_pages_without_losing_text() {
        let description = "Provision for training, documentation and knowledge transfer. ".repeat(12);
        let entries: Vec<(String, String)> = (0..40)
            .map(|i| (format!("C1.{}", i), description.clone()))
            .collect();
        let borrowed: Vec<(&str, &str)> = entries
            .iter()
            .map(|(l, d)| (l.as_str(), d.as_str()))
            .collect();
        let doc = document(vec![section("C1", "C1. Technical", &borrowed)]);

        let bytes = PdfCodec.encode(&doc).unwrap();
        let text = String::from_utf8_lossy(&bytes);
        assert!(!text.contains("/Count 1 "));
        assert!(text.contains("/Cont BMC"));
        assert_eq!(PdfCodec.decode_entries(&bytes).unwrap(), doc.entries());
    }

    #[test]
    fn empty_document_has_one_page_and_no_entries() {
        let bytes = PdfCodec.encode(&document(Vec::new())).unwrap();
        let text = String::from_utf8_lossy(&bytes);
        assert!(text.contains("/Count 1 "));
        assert!(PdfCodec.decode_entries(&bytes).unwrap().is_empty());
    }

    #[test]
    fn decode_rejects_non_pdf() {
        assert!(PdfCodec.decode_entries(b"hello").is_err());
    }
}
