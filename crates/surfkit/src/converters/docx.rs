//! DOCX converter

use crate::convert::{escape_html, html_to_markdown};
use crate::converters::DocumentConverter;
use crate::error::ConvertError;
use crate::types::{ConversionResult, ConvertHints};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::fs;
use std::io::Read;
use std::path::Path;

/// Converts `.docx` files to Markdown.
///
/// The document body (`word/document.xml`) is lowered to intermediate HTML
/// (headings from paragraph styles, paragraphs, tables) and then converted
/// through the shared HTML-to-Markdown path.
pub struct DocxConverter;

impl DocxConverter {
    /// Create a new DOCX converter
    pub fn new() -> Self {
        Self
    }
}

impl Default for DocxConverter {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentConverter for DocxConverter {
    fn name(&self) -> &'static str {
        "docx"
    }

    fn convert(
        &self,
        path: &Path,
        hints: &ConvertHints,
    ) -> Result<Option<ConversionResult>, ConvertError> {
        if !hints.extension_is(&[".docx"]) {
            return Ok(None);
        }

        let file = fs::File::open(path)
            .map_err(|e| ConvertError::Failed(format!("could not open DOCX file: {e}")))?;
        let mut archive = zip::ZipArchive::new(file)
            .map_err(|e| ConvertError::Failed(format!("not a DOCX archive: {e}")))?;
        let mut xml = String::new();
        archive
            .by_name("word/document.xml")
            .map_err(|e| ConvertError::Failed(format!("missing word/document.xml: {e}")))?
            .read_to_string(&mut xml)
            .map_err(|e| ConvertError::Failed(format!("could not read document body: {e}")))?;

        let html = document_to_html(&xml)?;
        Ok(Some(ConversionResult::text_only(html_to_markdown(&html))))
    }
}

fn attr_val(e: &BytesStart, name: &[u8]) -> Option<String> {
    for attr in e.attributes().flatten() {
        if attr.key.local_name().as_ref() == name {
            return attr.unescape_value().ok().map(|v| v.into_owned());
        }
    }
    None
}

/// Heading tag for a paragraph style like `Heading1`, else a plain `<p>`
fn tag_for_style(style: Option<&str>) -> (String, String) {
    if let Some(style) = style {
        if let Some(digits) = style.strip_prefix("Heading") {
            if let Ok(level) = digits.parse::<usize>() {
                let level = level.clamp(1, 6);
                return (format!("<h{level}>"), format!("</h{level}>"));
            }
        }
        if style == "Title" {
            return ("<h1>".to_string(), "</h1>".to_string());
        }
    }
    ("<p>".to_string(), "</p>".to_string())
}

/// Lower WordprocessingML to intermediate HTML
fn document_to_html(xml: &str) -> Result<String, ConvertError> {
    let mut reader = Reader::from_str(xml);
    let mut html = String::new();
    let mut para = String::new();
    let mut style: Option<String> = None;
    let mut in_text = false;
    let mut table_depth: usize = 0;
    let mut rows: Vec<Vec<String>> = Vec::new();
    let mut row: Vec<String> = Vec::new();
    let mut cell = String::new();
    let mut in_cell = false;

    loop {
        let event = match reader.read_event() {
            Ok(ev) => ev,
            Err(e) => return Err(ConvertError::Failed(format!("invalid DOCX XML: {e}"))),
        };
        match event {
            Event::Start(e) | Event::Empty(e) => match e.name().local_name().as_ref() {
                b"p" if !in_cell => {
                    para.clear();
                    style = None;
                }
                b"pStyle" if !in_cell => style = attr_val(&e, b"val"),
                b"t" => in_text = true,
                b"tbl" => {
                    table_depth += 1;
                    if table_depth == 1 {
                        rows.clear();
                    }
                }
                b"tr" if table_depth == 1 => row.clear(),
                b"tc" if table_depth == 1 => {
                    in_cell = true;
                    cell.clear();
                }
                _ => {}
            },
            Event::Text(t) if in_text => {
                let text = t.unescape().map(|c| c.into_owned()).unwrap_or_default();
                if in_cell {
                    cell.push_str(&text);
                } else {
                    para.push_str(&text);
                }
            }
            Event::End(e) => match e.name().local_name().as_ref() {
                b"t" => in_text = false,
                b"p" => {
                    if in_cell {
                        cell.push(' ');
                    } else if !para.trim().is_empty() {
                        let (open, close) = tag_for_style(style.as_deref());
                        html.push_str(&open);
                        html.push_str(&escape_html(para.trim()));
                        html.push_str(&close);
                    }
                }
                b"tc" => {
                    if in_cell {
                        row.push(cell.trim().to_string());
                        in_cell = false;
                    }
                }
                b"tr" if table_depth == 1 => rows.push(std::mem::take(&mut row)),
                b"tbl" => {
                    table_depth = table_depth.saturating_sub(1);
                    if table_depth == 0 && !rows.is_empty() {
                        html.push_str("<table>");
                        for (i, r) in rows.iter().enumerate() {
                            html.push_str("<tr>");
                            for c in r {
                                let c = escape_html(c);
                                if i == 0 {
                                    html.push_str(&format!("<th>{c}</th>"));
                                } else {
                                    html.push_str(&format!("<td>{c}</td>"));
                                }
                            }
                            html.push_str("</tr>");
                        }
                        html.push_str("</table>");
                        rows.clear();
                    }
                }
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(html)
}
