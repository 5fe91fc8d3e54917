//! HTML conversion utilities
//!
//! A small dependency-free HTML walker that turns markup into Markdown.
//! It is deliberately forgiving: unknown tags pass through as text breaks,
//! script/style subtrees are dropped, and entities are decoded in place.

use crate::types::ConversionResult;

/// Elements whose entire subtree is dropped
const SKIP_TAGS: &[&str] = &["script", "style", "noscript", "iframe", "svg"];

/// Convert a full HTML document to Markdown.
///
/// Prefers the `<body>` subtree when one exists and pulls the title from the
/// document's `<title>` element.
pub fn convert_html(html: &str) -> ConversionResult {
    let fragment = body_slice(html).unwrap_or(html);
    ConversionResult {
        title: extract_title(html),
        text: html_to_markdown(fragment),
    }
}

/// Convert an HTML fragment to Markdown
pub fn html_to_markdown(html: &str) -> String {
    let mut output = String::new();
    let mut skip_elements: Vec<String> = Vec::new();
    let mut list_depth: usize = 0;
    let mut in_pre = false;
    let mut in_blockquote = false;
    let mut link_stack: Vec<Option<String>> = Vec::new();

    // Table capture state. Cells are collected and rendered as a pipe table
    // when the outermost </table> closes.
    let mut table_depth: usize = 0;
    let mut table_rows: Vec<Vec<String>> = Vec::new();
    let mut current_row: Vec<String> = Vec::new();
    let mut cell: Option<String> = None;

    let mut chars = html.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '<' {
            // Parse tag
            let mut tag = String::new();
            while let Some(&next) = chars.peek() {
                if next == '>' {
                    chars.next();
                    break;
                }
                tag.push(next);
                chars.next();
            }

            let tag_lower = tag.to_ascii_lowercase();
            let is_closing = tag_lower.starts_with('/');
            let tag_name = if is_closing {
                tag_lower[1..].split_whitespace().next().unwrap_or("")
            } else {
                tag_lower.split_whitespace().next().unwrap_or("")
            };

            // Handle skip elements
            if SKIP_TAGS.contains(&tag_name) {
                if is_closing {
                    if let Some(pos) = skip_elements.iter().rposition(|t| t == tag_name) {
                        skip_elements.remove(pos);
                    }
                } else if !tag.ends_with('/') {
                    skip_elements.push(tag_name.to_string());
                }
                continue;
            }

            if !skip_elements.is_empty() {
                continue;
            }

            // Table structure
            if tag_name == "table" {
                if is_closing {
                    table_depth = table_depth.saturating_sub(1);
                    if table_depth == 0 {
                        // Header cells written without a surrounding <tr>
                        if !current_row.is_empty() {
                            table_rows.push(std::mem::take(&mut current_row));
                        }
                        if !table_rows.is_empty() {
                            output.push('\n');
                            output.push_str(&render_table(&table_rows));
                            output.push('\n');
                            table_rows.clear();
                        }
                    }
                } else {
                    table_depth += 1;
                    if table_depth == 1 {
                        table_rows.clear();
                        current_row.clear();
                        cell = None;
                    }
                }
                continue;
            }
            if table_depth > 0 {
                // Only the outermost table is captured
                match tag_name {
                    "tr" if table_depth == 1 => {
                        if !current_row.is_empty() {
                            table_rows.push(std::mem::take(&mut current_row));
                        }
                    }
                    "th" | "td" if table_depth == 1 => {
                        if is_closing {
                            if let Some(text) = cell.take() {
                                current_row.push(text.trim().to_string());
                            }
                        } else {
                            cell = Some(String::new());
                        }
                    }
                    "br" | "p" => {
                        if let Some(ref mut text) = cell {
                            text.push(' ');
                        }
                    }
                    _ => {}
                }
                continue;
            }

            // Handle markdown conversion
            match tag_name {
                "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
                    if !is_closing {
                        let level = tag_name[1..].parse::<usize>().unwrap_or(1);
                        output.push('\n');
                        output.push_str(&"#".repeat(level));
                        output.push(' ');
                    } else {
                        output.push_str("\n\n");
                    }
                }
                "p" | "div" | "section" | "article" | "main" | "header" | "footer" => {
                    if is_closing {
                        output.push_str("\n\n");
                    }
                }
                "br" => {
                    output.push('\n');
                }
                "hr" => {
                    output.push_str("\n---\n");
                }
                "ul" | "ol" => {
                    if is_closing {
                        list_depth = list_depth.saturating_sub(1);
                        if list_depth == 0 {
                            output.push('\n');
                        }
                    } else {
                        list_depth += 1;
                    }
                }
                "li" => {
                    if !is_closing {
                        output.push('\n');
                        for _ in 0..list_depth.saturating_sub(1) {
                            output.push_str("  ");
                        }
                        output.push_str("- ");
                    }
                }
                "strong" | "b" => {
                    output.push_str("**");
                }
                "em" | "i" => {
                    output.push('*');
                }
                "pre" => {
                    output.push_str("\n```\n");
                    in_pre = !is_closing;
                }
                "code" => {
                    if !in_pre {
                        output.push('`');
                    }
                }
                "blockquote" => {
                    if !is_closing {
                        in_blockquote = true;
                        output.push_str("\n> ");
                    } else {
                        in_blockquote = false;
                        output.push('\n');
                    }
                }
                "a" => {
                    if is_closing {
                        if let Some(Some(href)) = link_stack.pop() {
                            output.push_str("](");
                            output.push_str(&href);
                            output.push(')');
                        }
                    } else {
                        let href = extract_attribute(&tag, "href");
                        if href.is_some() {
                            output.push('[');
                        }
                        link_stack.push(href);
                    }
                }
                "img" => {
                    if let Some(src) = extract_attribute(&tag, "src") {
                        let alt = extract_attribute(&tag, "alt").unwrap_or_default();
                        output.push_str("\n![");
                        output.push_str(&alt);
                        output.push_str("](");
                        output.push_str(&src);
                        output.push_str(")\n");
                    }
                }
                _ => {}
            }
        } else if skip_elements.is_empty() {
            // Text content
            let decoded = decode_entity(c, &mut chars);
            if let Some(ref mut text) = cell {
                text.push(decoded);
            } else if table_depth > 0 {
                // Whitespace between cells
            } else if in_blockquote && decoded == '\n' {
                output.push_str("\n> ");
            } else {
                output.push(decoded);
            }
        }
    }

    clean_whitespace(&output)
}

/// Render captured table rows as a Markdown pipe table.
///
/// The first row becomes the header; the column count follows the widest row.
fn render_table(rows: &[Vec<String>]) -> String {
    let columns = rows.iter().map(Vec::len).max().unwrap_or(0);
    if columns == 0 {
        return String::new();
    }

    let format_row = |row: &[String]| {
        let mut line = String::from("|");
        for i in 0..columns {
            let text = row.get(i).map(String::as_str).unwrap_or("");
            line.push(' ');
            line.push_str(&text.replace('\n', " ").replace('|', "\\|"));
            line.push_str(" |");
        }
        line
    };

    let mut out = String::new();
    out.push_str(&format_row(&rows[0]));
    out.push('\n');
    out.push('|');
    for _ in 0..columns {
        out.push_str(" --- |");
    }
    out.push('\n');
    for row in &rows[1..] {
        out.push_str(&format_row(row));
        out.push('\n');
    }
    out
}

/// Extract the `<title>` text from an HTML document
pub(crate) fn extract_title(html: &str) -> Option<String> {
    let lower = html.to_ascii_lowercase();
    let open = lower.find("<title")?;
    let start = lower[open..].find('>').map(|i| open + i + 1)?;
    let end = lower[start..].find("</title").map(|i| start + i)?;
    let title = decode_text(&html[start..end]);
    let title = title.split_whitespace().collect::<Vec<_>>().join(" ");
    if title.is_empty() {
        None
    } else {
        Some(title)
    }
}

/// Slice out the `<body>` subtree, if the document has one
fn body_slice(html: &str) -> Option<&str> {
    let lower = html.to_ascii_lowercase();
    let open = lower.find("<body")?;
    let start = lower[open..].find('>').map(|i| open + i + 1)?;
    let end = lower[start..].find("</body").map(|i| start + i).unwrap_or(html.len());
    Some(&html[start..end])
}

/// Escape text for embedding in an intermediate HTML table
pub(crate) fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

/// Decode entities in a plain-text slice (no tag handling)
pub(crate) fn decode_text(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();
    while let Some(c) = chars.next() {
        out.push(decode_entity(c, &mut chars));
    }
    out
}

/// Extract attribute value from tag
pub(crate) fn extract_attribute(tag: &str, attr: &str) -> Option<String> {
    let pattern = format!("{}=", attr);
    let tag_lower = tag.to_ascii_lowercase();

    if let Some(start) = tag_lower.find(&pattern) {
        let rest = &tag[start + pattern.len()..];
        let rest = rest.trim_start();

        if let Some(rest) = rest.strip_prefix('"') {
            if let Some(end) = rest.find('"') {
                return Some(rest[..end].to_string());
            }
        } else if let Some(rest) = rest.strip_prefix('\'') {
            if let Some(end) = rest.find('\'') {
                return Some(rest[..end].to_string());
            }
        } else {
            let end = rest
                .find(|c: char| c.is_whitespace() || c == '>')
                .unwrap_or(rest.len());
            return Some(rest[..end].to_string());
        }
    }
    None
}

/// Decode HTML entity starting from ampersand
fn decode_entity(c: char, chars: &mut std::iter::Peekable<std::str::Chars>) -> char {
    if c != '&' {
        return c;
    }

    let mut entity = String::new();
    while let Some(&next) = chars.peek() {
        if next == ';' {
            chars.next();
            break;
        }
        if next.is_whitespace() || entity.len() > 10 {
            // Not a valid entity
            return '&';
        }
        entity.push(next);
        chars.next();
    }

    match entity.as_str() {
        "amp" => '&',
        "lt" => '<',
        "gt" => '>',
        "quot" => '"',
        "apos" => '\'',
        "#39" => '\'',
        "nbsp" => ' ',
        "copy" => '©',
        "reg" => '®',
        _ => {
            // Check for numeric entities
            if let Some(num_str) = entity.strip_prefix('#') {
                if let Some(stripped) = num_str.strip_prefix('x') {
                    // Hex entity
                    if let Ok(code) = u32::from_str_radix(stripped, 16) {
                        if let Some(ch) = char::from_u32(code) {
                            return ch;
                        }
                    }
                } else if let Ok(code) = num_str.parse::<u32>() {
                    if let Some(ch) = char::from_u32(code) {
                        return ch;
                    }
                }
            }
            // Unknown entity - return original
            '&'
        }
    }
}

/// Clean whitespace: collapse runs, trim, keep max 2 newlines
pub(crate) fn clean_whitespace(s: &str) -> String {
    let mut result = String::new();
    let mut last_was_space = false;
    let mut newline_count = 0;

    for c in s.chars() {
        if c == '\n' {
            // Remove trailing space before newline
            if last_was_space && result.ends_with(' ') {
                result.pop();
            }
            newline_count += 1;
            // Treat newline as space for next char collapsing
            last_was_space = true;
            if newline_count <= 2 {
                result.push(c);
            }
        } else if c.is_whitespace() {
            newline_count = 0;
            if !last_was_space {
                result.push(' ');
                last_was_space = true;
            }
        } else {
            newline_count = 0;
            last_was_space = false;
            result.push(c);
        }
    }

    result.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_headers() {
        let html = "<h1>Title</h1><h2>Subtitle</h2>";
        let md = html_to_markdown(html);
        assert!(md.contains("# Title"));
        assert!(md.contains("## Subtitle"));
    }

    #[test]
    fn test_lists() {
        let html = "<ul><li>Item 1</li><li>Item 2</li></ul>";
        let md = html_to_markdown(html);
        assert!(md.contains("- Item 1"));
        assert!(md.contains("- Item 2"));
    }

    #[test]
    fn test_emphasis() {
        let html = "<p><strong>bold</strong> and <em>italic</em></p>";
        let md = html_to_markdown(html);
        assert!(md.contains("**bold**"));
        assert!(md.contains("*italic*"));
    }

    #[test]
    fn test_links() {
        let html = r#"<a href="https://example.com">example</a>"#;
        let md = html_to_markdown(html);
        assert!(md.contains("[example](https://example.com)"));
    }

    #[test]
    fn test_images() {
        let html = r#"<img src="cat.png" alt="a cat">"#;
        let md = html_to_markdown(html);
        assert!(md.contains("![a cat](cat.png)"));
    }

    #[test]
    fn test_skip_script_and_style() {
        let html = "<p>Before</p><script>alert('bad');</script><style>p{}</style><p>After</p>";
        let md = html_to_markdown(html);
        assert!(md.contains("Before"));
        assert!(md.contains("After"));
        assert!(!md.contains("alert"));
        assert!(!md.contains("p{}"));
    }

    #[test]
    fn test_table_to_pipe_table() {
        let html = "<table><tr><th>Name</th><th>Age</th></tr>\
                    <tr><td>Ada</td><td>36</td></tr></table>";
        let md = html_to_markdown(html);
        assert!(md.contains("| Name | Age |"));
        assert!(md.contains("| --- | --- |"));
        assert!(md.contains("| Ada | 36 |"));
    }

    #[test]
    fn test_table_with_thead_tbody() {
        let html = "<table><thead><tr><th>H</th></tr></thead>\
                    <tbody><tr><td>v1</td></tr><tr><td>v2</td></tr></tbody></table>";
        let md = html_to_markdown(html);
        assert!(md.contains("| H |"));
        assert!(md.contains("| v1 |"));
        assert!(md.contains("| v2 |"));
    }

    #[test]
    fn test_entity_decoding() {
        let html = "<p>&amp; &lt; &gt; &quot; &apos; &#39; &#169;</p>";
        let md = html_to_markdown(html);
        assert!(md.contains('&'));
        assert!(md.contains('<'));
        assert!(md.contains('>'));
        assert!(md.contains('"'));
        assert!(md.contains('\''));
        assert!(md.contains('©'));
    }

    #[test]
    fn test_convert_html_extracts_title_and_prefers_body() {
        let html = "<html><head><title>My&nbsp;Page</title><style>h1{}</style></head>\
                    <body><h1>Heading</h1></body></html>";
        let res = convert_html(html);
        assert_eq!(res.title.as_deref(), Some("My Page"));
        assert!(res.text.contains("# Heading"));
        assert!(!res.text.contains("h1{}"));
    }

    #[test]
    fn test_convert_html_without_body() {
        let res = convert_html("<p>loose fragment</p>");
        assert_eq!(res.title, None);
        assert!(res.text.contains("loose fragment"));
    }

    #[test]
    fn test_clean_whitespace() {
        let input = "  hello   world  \n\n\n\n  test  ";
        let output = clean_whitespace(input);
        assert_eq!(output, "hello world\n\ntest");
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html("a < b & c"), "a &lt; b &amp; c");
    }

    #[test]
    fn test_extract_attribute() {
        assert_eq!(
            extract_attribute("a href=\"https://example.com\" class=\"link\"", "href"),
            Some("https://example.com".to_string())
        );
        assert_eq!(
            extract_attribute("img src='image.png'", "src"),
            Some("image.png".to_string())
        );
        assert_eq!(
            extract_attribute("div class=test", "class"),
            Some("test".to_string())
        );
    }
}
