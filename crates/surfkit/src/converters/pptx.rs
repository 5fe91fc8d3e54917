//! PPTX converter

use crate::convert::{escape_html, html_to_markdown};
use crate::converters::DocumentConverter;
use crate::error::ConvertError;
use crate::types::{ConversionResult, ConvertHints};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::fs;
use std::io::Read;
use std::path::Path;

/// Converts `.pptx` presentations to Markdown.
///
/// Slides are walked in order with a slide-boundary marker per slide.
/// Pictures become markdown image placeholders (alt text from the embedded
/// description, else the shape name), tables go through the shared
/// HTML-table path, the title shape is promoted to a heading, and speaker
/// notes are appended per slide when present.
pub struct PptxConverter;

impl PptxConverter {
    /// Create a new PPTX converter
    pub fn new() -> Self {
        Self
    }
}

impl Default for PptxConverter {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentConverter for PptxConverter {
    fn name(&self) -> &'static str {
        "pptx"
    }

    fn convert(
        &self,
        path: &Path,
        hints: &ConvertHints,
    ) -> Result<Option<ConversionResult>, ConvertError> {
        if !hints.extension_is(&[".pptx"]) {
            return Ok(None);
        }

        let file = fs::File::open(path)
            .map_err(|e| ConvertError::Failed(format!("could not open PPTX file: {e}")))?;
        let mut archive = zip::ZipArchive::new(file)
            .map_err(|e| ConvertError::Failed(format!("not a PPTX archive: {e}")))?;

        // Slide entry names, ordered by slide number
        let mut slides: Vec<(usize, String)> = archive
            .file_names()
            .filter_map(|name| {
                let number = name
                    .strip_prefix("ppt/slides/slide")?
                    .strip_suffix(".xml")?
                    .parse::<usize>()
                    .ok()?;
                Some((number, name.to_string()))
            })
            .collect();
        slides.sort();

        let mut md_content = String::new();
        for (number, entry_name) in slides {
            let mut xml = String::new();
            archive
                .by_name(&entry_name)
                .map_err(|e| ConvertError::Failed(format!("missing slide entry: {e}")))?
                .read_to_string(&mut xml)
                .map_err(|e| ConvertError::Failed(format!("could not read slide: {e}")))?;

            md_content.push_str(&format!("\n\n<!-- Slide number: {number} -->\n"));
            md_content.push_str(&slide_to_markdown(&xml)?);
            md_content = md_content.trim().to_string();

            let notes_entry = format!("ppt/notesSlides/notesSlide{number}.xml");
            if let Ok(mut entry) = archive.by_name(&notes_entry) {
                let mut notes_xml = String::new();
                entry
                    .read_to_string(&mut notes_xml)
                    .map_err(|e| ConvertError::Failed(format!("could not read notes: {e}")))?;
                let notes = notes_text(&notes_xml)?;
                if !notes.is_empty() {
                    md_content.push_str("\n\n### Notes:\n");
                    md_content.push_str(&notes);
                    md_content = md_content.trim().to_string();
                }
            }
        }

        Ok(Some(ConversionResult::text_only(
            md_content.trim().to_string(),
        )))
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

/// Render one slide's shapes, in document order
fn slide_to_markdown(xml: &str) -> Result<String, ConvertError> {
    let mut reader = Reader::from_str(xml);
    let mut out = String::new();

    let mut in_sp = false;
    let mut shape_is_title = false;
    let mut shape_text = String::new();
    let mut in_pic = false;
    let mut pic_name = String::new();
    let mut pic_descr = String::new();
    let mut in_text = false;
    let mut tbl_depth: usize = 0;
    let mut rows: Vec<Vec<String>> = Vec::new();
    let mut row: Vec<String> = Vec::new();
    let mut cell: Option<String> = None;

    loop {
        let event = match reader.read_event() {
            Ok(ev) => ev,
            Err(e) => return Err(ConvertError::Failed(format!("invalid slide XML: {e}"))),
        };
        match event {
            Event::Start(e) | Event::Empty(e) => match e.name().local_name().as_ref() {
                b"sp" => {
                    in_sp = true;
                    shape_is_title = false;
                    shape_text.clear();
                }
                b"ph" if in_sp && !in_pic => {
                    if let Some(kind) = attr_val(&e, b"type") {
                        if kind == "title" || kind == "ctrTitle" {
                            shape_is_title = true;
                        }
                    }
                }
                b"pic" => {
                    in_pic = true;
                    pic_name.clear();
                    pic_descr.clear();
                }
                b"cNvPr" if in_pic => {
                    pic_name = attr_val(&e, b"name").unwrap_or_default();
                    pic_descr = attr_val(&e, b"descr").unwrap_or_default();
                }
                b"tbl" => {
                    tbl_depth += 1;
                    if tbl_depth == 1 {
                        rows.clear();
                    }
                }
                b"tr" if tbl_depth == 1 => row.clear(),
                b"tc" if tbl_depth == 1 => cell = Some(String::new()),
                b"t" => in_text = true,
                _ => {}
            },
            Event::Text(t) if in_text => {
                let text = t.unescape().map(|c| c.into_owned()).unwrap_or_default();
                if let Some(c) = cell.as_mut() {
                    c.push_str(&text);
                } else if in_sp {
                    shape_text.push_str(&text);
                }
            }
            Event::End(e) => match e.name().local_name().as_ref() {
                b"t" => in_text = false,
                b"p" => {
                    if let Some(c) = cell.as_mut() {
                        c.push(' ');
                    } else if in_sp {
                        shape_text.push('\n');
                    }
                }
                b"tc" => {
                    if let Some(c) = cell.take() {
                        row.push(c.trim().to_string());
                    }
                }
                b"tr" if tbl_depth == 1 => rows.push(std::mem::take(&mut row)),
                b"tbl" => {
                    tbl_depth = tbl_depth.saturating_sub(1);
                    if tbl_depth == 0 && !rows.is_empty() {
                        let mut html = String::from("<table>");
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
                        out.push('\n');
                        out.push_str(html_to_markdown(&html).trim());
                        out.push('\n');
                        rows.clear();
                    }
                }
                b"pic" => {
                    in_pic = false;
                    let alt = if pic_descr.is_empty() {
                        pic_name.clone()
                    } else {
                        pic_descr.clone()
                    };
                    let filename: String = pic_name
                        .chars()
                        .filter(|c| c.is_alphanumeric() || *c == '_')
                        .collect();
                    out.push_str(&format!("\n![{alt}]({filename}.jpg)\n"));
                }
                b"sp" => {
                    in_sp = false;
                    let text = shape_text.trim_end();
                    if !text.trim().is_empty() {
                        if shape_is_title {
                            out.push_str(&format!("# {} ", text.trim_start()));
                        } else {
                            out.push_str(&format!("{text} "));
                        }
                    }
                }
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(out)
}

/// Speaker-notes text: the body placeholder of a notes slide
fn notes_text(xml: &str) -> Result<String, ConvertError> {
    let mut reader = Reader::from_str(xml);
    let mut out = String::new();
    let mut in_sp = false;
    let mut is_body = false;
    let mut in_text = false;
    let mut shape_text = String::new();

    loop {
        let event = match reader.read_event() {
            Ok(ev) => ev,
            Err(e) => return Err(ConvertError::Failed(format!("invalid notes XML: {e}"))),
        };
        match event {
            Event::Start(e) | Event::Empty(e) => match e.name().local_name().as_ref() {
                b"sp" => {
                    in_sp = true;
                    is_body = false;
                    shape_text.clear();
                }
                b"ph" if in_sp => {
                    if attr_val(&e, b"type").as_deref() == Some("body") {
                        is_body = true;
                    }
                }
                b"t" => in_text = true,
                _ => {}
            },
            Event::Text(t) if in_text && in_sp => {
                shape_text.push_str(&t.unescape().map(|c| c.into_owned()).unwrap_or_default());
            }
            Event::End(e) => match e.name().local_name().as_ref() {
                b"t" => in_text = false,
                b"p" if in_sp => shape_text.push('\n'),
                b"sp" => {
                    in_sp = false;
                    if is_body {
                        out.push_str(shape_text.trim());
                    }
                }
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(out.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SLIDE: &str = r#"<?xml version="1.0"?>
<p:sld xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main"
       xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main">
  <p:cSld><p:spTree>
    <p:sp>
      <p:nvSpPr><p:cNvPr id="2" name="Title 1"/><p:nvPr><p:ph type="title"/></p:nvPr></p:nvSpPr>
      <p:txBody><a:p><a:r><a:t>Quarterly Update</a:t></a:r></a:p></p:txBody>
    </p:sp>
    <p:sp>
      <p:nvSpPr><p:cNvPr id="3" name="Content 2"/><p:nvPr/></p:nvSpPr>
      <p:txBody><a:p><a:r><a:t>Revenue grew.</a:t></a:r></a:p></p:txBody>
    </p:sp>
    <p:pic>
      <p:nvPicPr><p:cNvPr id="4" name="Picture 3" descr="a chart"/></p:nvPicPr>
    </p:pic>
  </p:spTree></p:cSld>
</p:sld>"#;

    const NOTES: &str = r#"<?xml version="1.0"?>
<p:notes xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main"
         xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main">
  <p:cSld><p:spTree>
    <p:sp>
      <p:nvSpPr><p:cNvPr id="2" name="Notes Placeholder"/><p:nvPr><p:ph type="body"/></p:nvPr></p:nvSpPr>
      <p:txBody><a:p><a:r><a:t>Mention the forecast.</a:t></a:r></a:p></p:txBody>
    </p:sp>
  </p:spTree></p:cSld>
</p:notes>"#;

    fn pptx_file(with_notes: bool) -> tempfile::NamedTempFile {
        let f = tempfile::NamedTempFile::new().unwrap();
        let mut zip = zip::ZipWriter::new(f.reopen().unwrap());
        let options = zip::write::SimpleFileOptions::default();
        zip.start_file("ppt/slides/slide1.xml", options).unwrap();
        zip.write_all(SLIDE.as_bytes()).unwrap();
        if with_notes {
            zip.start_file("ppt/notesSlides/notesSlide1.xml", options)
                .unwrap();
            zip.write_all(NOTES.as_bytes()).unwrap();
        }
        zip.finish().unwrap();
        f
    }

    #[test]
    fn test_declines_other_extensions() {
        let converter = PptxConverter::new();
        let res = converter
            .convert(Path::new("/tmp/x"), &ConvertHints::with_extension(".ppt"))
            .unwrap();
        assert!(res.is_none());
    }

    #[test]
    fn test_slide_marker_title_text_and_picture() {
        let f = pptx_file(false);
        let res = PptxConverter::new()
            .convert(f.path(), &ConvertHints::with_extension(".pptx"))
            .unwrap()
            .unwrap();
        assert!(res.text.contains("<!-- Slide number: 1 -->"));
        assert!(res.text.contains("# Quarterly Update"));
        assert!(res.text.contains("Revenue grew."));
        assert!(res.text.contains("![a chart](Picture3.jpg)"));
    }

    #[test]
    fn test_notes_section() {
        let f = pptx_file(true);
        let res = PptxConverter::new()
            .convert(f.path(), &ConvertHints::with_extension(".pptx"))
            .unwrap()
            .unwrap();
        assert!(res.text.contains("### Notes:"));
        assert!(res.text.contains("Mention the forecast."));
    }
}
