//! Spreadsheet converter

use crate::convert::{escape_html, html_to_markdown};
use crate::converters::DocumentConverter;
use crate::error::ConvertError;
use crate::types::{ConversionResult, ConvertHints};
use calamine::{open_workbook_auto, Reader};
use std::path::Path;

/// Converts `.xlsx`/`.xls` workbooks to Markdown.
///
/// One `## <sheet name>` section per sheet; each sheet's rows are rendered
/// as an HTML table (first row as header) and converted through the shared
/// HTML-to-Markdown path, matching how the other tabular converters work.
pub struct XlsxConverter;

impl XlsxConverter {
    /// Create a new spreadsheet converter
    pub fn new() -> Self {
        Self
    }
}

impl Default for XlsxConverter {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentConverter for XlsxConverter {
    fn name(&self) -> &'static str {
        "xlsx"
    }

    fn convert(
        &self,
        path: &Path,
        hints: &ConvertHints,
    ) -> Result<Option<ConversionResult>, ConvertError> {
        if !hints.extension_is(&[".xlsx", ".xls"]) {
            return Ok(None);
        }

        let mut workbook = open_workbook_auto(path)
            .map_err(|e| ConvertError::Failed(format!("could not open workbook: {e}")))?;

        let mut md_content = String::new();
        let sheet_names = workbook.sheet_names().to_owned();
        for name in sheet_names {
            let range = workbook
                .worksheet_range(&name)
                .map_err(|e| ConvertError::Failed(format!("could not read sheet '{name}': {e}")))?;

            let mut html = String::from("<table>");
            for (i, row) in range.rows().enumerate() {
                html.push_str("<tr>");
                for cell in row {
                    let text = escape_html(&cell.to_string());
                    if i == 0 {
                        html.push_str(&format!("<th>{text}</th>"));
                    } else {
                        html.push_str(&format!("<td>{text}</td>"));
                    }
                }
                html.push_str("</tr>");
            }
            html.push_str("</table>");

            md_content.push_str(&format!("## {name}\n"));
            md_content.push_str(html_to_markdown(&html).trim());
            md_content.push_str("\n\n");
        }

        Ok(Some(ConversionResult::text_only(
            md_content.trim().to_string(),
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_declines_other_extensions() {
        let converter = XlsxConverter::new();
        let res = converter
            .convert(Path::new("/tmp/x"), &ConvertHints::with_extension(".csv"))
            .unwrap();
        assert!(res.is_none());
    }

    #[test]
    fn test_garbage_workbook_is_recoverable_failure() {
        let converter = XlsxConverter::new();
        let mut f = tempfile::NamedTempFile::new().unwrap();
        std::io::Write::write_all(&mut f, b"not a workbook").unwrap();
        let res = converter.convert(f.path(), &ConvertHints::with_extension(".xlsx"));
        assert!(matches!(res, Err(ConvertError::Failed(_))));
    }
}
