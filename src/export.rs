//! Word export: extracted text → `.docx`.
//!
//! The text is split into lines and each line becomes one paragraph:
//!
//! | Line | Block |
//! |------|-------|
//! | exactly `--- Page Break ---` | page break, no visible text |
//! | < 80 chars, all upper-case   | Heading 1, bold, 14 pt |
//! | anything else non-empty      | body paragraph, 11 pt |
//! | empty                        | empty paragraph |
//!
//! The package is the smallest set of OOXML parts Word opens without
//! complaint: content types, package relationships, the document body and a
//! style sheet defining `Heading1`.

use crate::error::DocuScanError;
use crate::prompts::PAGE_BREAK;
use once_cell::sync::Lazy;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use regex::Regex;
use std::io::{Cursor, Write};
use tracing::debug;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// MIME type of the generated file.
pub const DOCX_MEDIA_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

/// Lines at or above this length are never headings.
const HEADING_MAX_CHARS: usize = 80;

const FONT: &str = "Calibri";
/// Run sizes are in half-points.
const HEADING_SIZE: &str = "28";
const BODY_SIZE: &str = "22";
/// Space after each paragraph, in twentieths of a point.
const SPACING_AFTER: &str = "120";

const W_NS: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";

static PDF_EXTENSION: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\.pdf$").unwrap());

/// One paragraph of the output document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    Heading(String),
    Paragraph(String),
    Blank,
    PageBreak,
}

/// Classify one line of extracted text.
pub fn classify_line(line: &str) -> Block {
    let trimmed = line.trim();
    if trimmed == PAGE_BREAK {
        Block::PageBreak
    } else if trimmed.is_empty() {
        Block::Blank
    } else if is_heading(trimmed) {
        Block::Heading(trimmed.to_string())
    } else {
        Block::Paragraph(trimmed.to_string())
    }
}

fn is_heading(trimmed: &str) -> bool {
    trimmed.chars().count() < HEADING_MAX_CHARS
        && trimmed == trimmed.to_uppercase()
        && trimmed.chars().any(char::is_uppercase)
}

/// `report.PDF` → `report.docx`; names without a PDF extension get `.docx` appended.
pub fn docx_filename(filename: &str) -> String {
    if PDF_EXTENSION.is_match(filename) {
        PDF_EXTENSION.replace(filename, ".docx").into_owned()
    } else {
        format!("{filename}.docx")
    }
}

/// A document ready to be written as `.docx`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DocxDocument {
    pub blocks: Vec<Block>,
}

impl DocxDocument {
    pub fn from_text(text: &str) -> Self {
        Self {
            blocks: text.split('\n').map(classify_line).collect(),
        }
    }

    /// Serialise as a zipped OOXML package.
    pub fn to_bytes(&self) -> Result<Vec<u8>, DocuScanError> {
        let document_xml = self.document_xml()?;

        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

        for (name, contents) in [
            ("[Content_Types].xml", CONTENT_TYPES_XML.as_bytes()),
            ("_rels/.rels", PACKAGE_RELS_XML.as_bytes()),
            ("word/_rels/document.xml.rels", DOCUMENT_RELS_XML.as_bytes()),
            ("word/styles.xml", STYLES_XML.as_bytes()),
            ("word/document.xml", document_xml.as_slice()),
        ] {
            zip.start_file(name, options).map_err(export_err)?;
            zip.write_all(contents).map_err(export_err)?;
        }

        let bytes = zip.finish().map_err(export_err)?.into_inner();
        debug!("Wrote DOCX: {} blocks, {} bytes", self.blocks.len(), bytes.len());
        Ok(bytes)
    }

    /// `word/document.xml` for the current blocks.
    pub fn document_xml(&self) -> Result<Vec<u8>, DocuScanError> {
        let mut w = Writer::new(Cursor::new(Vec::new()));
        write(&mut w, Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), Some("yes"))))?;
        write(
            &mut w,
            Event::Start(BytesStart::new("w:document").with_attributes([("xmlns:w", W_NS)])),
        )?;
        write(&mut w, Event::Start(BytesStart::new("w:body")))?;

        for block in &self.blocks {
            match block {
                Block::PageBreak => {
                    write(&mut w, Event::Start(BytesStart::new("w:p")))?;
                    write(&mut w, Event::Start(BytesStart::new("w:pPr")))?;
                    write(&mut w, Event::Empty(BytesStart::new("w:pageBreakBefore")))?;
                    write(&mut w, Event::End(BytesEnd::new("w:pPr")))?;
                    write(&mut w, Event::End(BytesEnd::new("w:p")))?;
                }
                Block::Heading(text) => write_paragraph(&mut w, text, true)?,
                Block::Paragraph(text) => write_paragraph(&mut w, text, false)?,
                Block::Blank => write_paragraph(&mut w, "", false)?,
            }
        }

        write(&mut w, Event::Empty(BytesStart::new("w:sectPr")))?;
        write(&mut w, Event::End(BytesEnd::new("w:body")))?;
        write(&mut w, Event::End(BytesEnd::new("w:document")))?;
        Ok(w.into_inner().into_inner())
    }
}

/// A generated file and the name it should be offered under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocxExport {
    pub filename: String,
    pub bytes: Vec<u8>,
}

/// Build the `.docx` for `text`, named after the source PDF.
pub fn export_docx(text: &str, source_filename: &str) -> Result<DocxExport, DocuScanError> {
    Ok(DocxExport {
        filename: docx_filename(source_filename),
        bytes: DocxDocument::from_text(text).to_bytes()?,
    })
}

// ── XML helpers ──────────────────────────────────────────────────────────

fn export_err(e: impl std::fmt::Display) -> DocuScanError {
    DocuScanError::Export(e.to_string())
}

fn write(w: &mut Writer<Cursor<Vec<u8>>>, event: Event<'_>) -> Result<(), DocuScanError> {
    w.write_event(event).map_err(export_err)
}

fn write_paragraph(
    w: &mut Writer<Cursor<Vec<u8>>>,
    text: &str,
    heading: bool,
) -> Result<(), DocuScanError> {
    write(w, Event::Start(BytesStart::new("w:p")))?;

    write(w, Event::Start(BytesStart::new("w:pPr")))?;
    if heading {
        write(
            w,
            Event::Empty(BytesStart::new("w:pStyle").with_attributes([("w:val", "Heading1")])),
        )?;
    }
    write(
        w,
        Event::Empty(BytesStart::new("w:spacing").with_attributes([("w:after", SPACING_AFTER)])),
    )?;
    write(w, Event::End(BytesEnd::new("w:pPr")))?;

    write(w, Event::Start(BytesStart::new("w:r")))?;
    write(w, Event::Start(BytesStart::new("w:rPr")))?;
    write(
        w,
        Event::Empty(BytesStart::new("w:rFonts").with_attributes([
            ("w:ascii", FONT),
            ("w:hAnsi", FONT),
            ("w:cs", FONT),
        ])),
    )?;
    if heading {
        write(w, Event::Empty(BytesStart::new("w:b")))?;
    }
    let size = if heading { HEADING_SIZE } else { BODY_SIZE };
    write(
        w,
        Event::Empty(BytesStart::new("w:sz").with_attributes([("w:val", size)])),
    )?;
    write(w, Event::End(BytesEnd::new("w:rPr")))?;

    write(
        w,
        Event::Start(BytesStart::new("w:t").with_attributes([("xml:space", "preserve")])),
    )?;
    write(w, Event::Text(BytesText::new(text)))?;
    write(w, Event::End(BytesEnd::new("w:t")))?;
    write(w, Event::End(BytesEnd::new("w:r")))?;

    write(w, Event::End(BytesEnd::new("w:p")))
}

// ── Fixed package parts ──────────────────────────────────────────────────

const CONTENT_TYPES_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/><Override PartName="/word/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.styles+xml"/></Types>"#;

const PACKAGE_RELS_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/></Relationships>"#;

const DOCUMENT_RELS_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/></Relationships>"#;

const STYLES_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:styles xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:style w:type="paragraph" w:default="1" w:styleId="Normal"><w:name w:val="Normal"/><w:qFormat/></w:style><w:style w:type="paragraph" w:styleId="Heading1"><w:name w:val="heading 1"/><w:basedOn w:val="Normal"/><w:next w:val="Normal"/><w:qFormat/><w:pPr><w:keepNext/><w:outlineLvl w:val="0"/></w:pPr></w:style></w:styles>"#;
