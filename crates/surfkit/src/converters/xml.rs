//! XML converter: WordprocessingML text and table-bearing XML

use crate::converters::DocumentConverter;
use crate::error::ConvertError;
use crate::types::{ConversionResult, ConvertHints};
use quick_xml::events::{BytesText, Event};
use quick_xml::Reader;
use std::fs;
use std::path::Path;

/// Converts `.xml` files.
///
/// Two dialects are recognized: Word 2003 XML (root element ending in
/// `wordDocument`), from which running paragraph text is extracted, and
/// generic table-bearing XML, from which the first `<table>` subtree is
/// rendered as a Markdown table. Anything else is a conversion failure.
pub struct XmlConverter;

impl XmlConverter {
    /// Create a new XML converter
    pub fn new() -> Self {
        Self
    }
}

impl Default for XmlConverter {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentConverter for XmlConverter {
    fn name(&self) -> &'static str {
        "xml"
    }

    fn convert(
        &self,
        path: &Path,
        hints: &ConvertHints,
    ) -> Result<Option<ConversionResult>, ConvertError> {
        if !hints.extension_is(&[".xml"]) {
            return Ok(None);
        }
        let xml = fs::read_to_string(path)
            .map_err(|e| ConvertError::Failed(format!("could not read XML file: {e}")))?;

        let markdown = if root_name(&xml)?.ends_with("wordDocument") {
            extract_wordml_text(&xml)?
        } else {
            extract_table(&xml)?
        };

        Ok(Some(ConversionResult::text_only(
            markdown.trim().to_string(),
        )))
    }
}

/// Qualified name of the document's root element
fn root_name(xml: &str) -> Result<String, ConvertError> {
    let mut reader = Reader::from_str(xml);
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => {
                return Ok(String::from_utf8_lossy(e.name().as_ref()).into_owned());
            }
            Ok(Event::Eof) => {
                return Err(ConvertError::Failed("empty XML document".to_string()));
            }
            Err(e) => {
                return Err(ConvertError::Failed(format!("invalid XML: {e}")));
            }
            _ => {}
        }
    }
}

fn unescaped(text: &BytesText) -> String {
    text.unescape().map(|c| c.into_owned()).unwrap_or_default()
}

/// Collect `w:t` run text, one line per `w:p` paragraph
fn extract_wordml_text(xml: &str) -> Result<String, ConvertError> {
    let mut reader = Reader::from_str(xml);
    let mut paragraphs: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut in_text = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => match e.name().local_name().as_ref() {
                b"p" => current.clear(),
                b"t" => in_text = true,
                _ => {}
            },
            Ok(Event::Text(t)) if in_text => current.push_str(&unescaped(&t)),
            Ok(Event::End(e)) => match e.name().local_name().as_ref() {
                b"t" => in_text = false,
                b"p" => paragraphs.push(current.clone()),
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(ConvertError::Failed(format!("invalid XML: {e}"))),
            _ => {}
        }
    }

    Ok(paragraphs.join("\n"))
}

/// Render the first `<table>` subtree (`thead`/`th` headers, `tr`/`td` rows)
/// as a Markdown table
fn extract_table(xml: &str) -> Result<String, ConvertError> {
    let mut reader = Reader::from_str(xml);
    let mut in_table = false;
    let mut in_thead = false;
    let mut in_row = false;
    let mut found_table = false;
    let mut headers: Vec<String> = Vec::new();
    let mut rows: Vec<Vec<String>> = Vec::new();
    let mut row: Vec<String> = Vec::new();
    let mut cell: Option<String> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => match e.name().local_name().as_ref() {
                b"table" => {
                    in_table = true;
                    found_table = true;
                }
                b"thead" if in_table => in_thead = true,
                b"th" if in_thead => cell = Some(String::new()),
                b"tr" if in_table && !in_thead => {
                    in_row = true;
                    row.clear();
                }
                b"td" if in_row => cell = Some(String::new()),
                _ => {}
            },
            Ok(Event::Text(t)) => {
                if let Some(c) = cell.as_mut() {
                    c.push_str(&unescaped(&t));
                }
            }
            Ok(Event::End(e)) => match e.name().local_name().as_ref() {
                b"table" => in_table = false,
                b"thead" => in_thead = false,
                b"th" => {
                    if let Some(c) = cell.take() {
                        headers.push(c.trim().to_string());
                    }
                }
                b"td" => {
                    if let Some(c) = cell.take() {
                        row.push(c.trim().to_string());
                    }
                }
                b"tr" if in_row => {
                    in_row = false;
                    rows.push(std::mem::take(&mut row));
                }
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(ConvertError::Failed(format!("invalid XML: {e}"))),
            _ => {}
        }
    }

    if !found_table || (headers.is_empty() && rows.is_empty()) {
        return Err(ConvertError::Failed("no table found in the XML".to_string()));
    }

    let mut markdown = String::new();
    markdown.push_str(&format!("| {} |\n", headers.join(" | ")));
    markdown.push_str(&format!("| {} |\n", vec!["---"; headers.len()].join(" | ")));
    for r in rows {
        markdown.push_str(&format!("| {} |\n", r.join(" | ")));
    }
    Ok(markdown)
}
