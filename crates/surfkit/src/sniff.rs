//! Format inference: mime-type mapping and magic-byte sniffing
//!
//! Both functions produce candidate extensions for the conversion engine's
//! trial list. They are hints, not verdicts: a wrong guess costs one failed
//! converter attempt, nothing more.

use std::fs;
use std::io::Read;
use std::path::Path;

/// Map an HTTP content-type to a file extension
pub fn extension_for_mime(content_type: &str) -> Option<&'static str> {
    let mime = content_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase();
    let ext = match mime.as_str() {
        "text/html" | "application/xhtml+xml" => ".html",
        "text/plain" => ".txt",
        "text/markdown" => ".md",
        "text/csv" => ".csv",
        "text/xml" | "application/xml" => ".xml",
        "application/json" => ".json",
        "application/pdf" => ".pdf",
        "application/msword" => ".doc",
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document" => ".docx",
        "application/vnd.ms-excel" => ".xls",
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet" => ".xlsx",
        "application/vnd.openxmlformats-officedocument.presentationml.presentation" => ".pptx",
        "application/zip" => ".zip",
        "audio/mpeg" | "audio/mp3" => ".mp3",
        "audio/wav" | "audio/x-wav" | "audio/wave" => ".wav",
        "audio/flac" | "audio/x-flac" => ".flac",
        "audio/mp4" | "audio/x-m4a" => ".m4a",
        "image/png" => ".png",
        "image/jpeg" => ".jpg",
        "image/gif" => ".gif",
        _ => return None,
    };
    Some(ext)
}

/// Guess a file's extension from its first bytes.
///
/// Returns `None` for unreadable paths, directories, and unrecognized
/// signatures — sniffing failures are never errors.
pub fn guess_extension(path: &Path) -> Option<String> {
    let mut file = fs::File::open(path).ok()?;
    let mut head = [0u8; 512];
    let n = file.read(&mut head).ok()?;
    let head = &head[..n];

    if head.starts_with(b"%PDF") {
        return Some(".pdf".to_string());
    }
    if head.starts_with(b"PK\x03\x04") {
        return Some(refine_zip(path));
    }
    if head.starts_with(b"\x89PNG") {
        return Some(".png".to_string());
    }
    if head.starts_with(&[0xFF, 0xD8, 0xFF]) {
        return Some(".jpg".to_string());
    }
    if head.starts_with(b"GIF8") {
        return Some(".gif".to_string());
    }
    if head.starts_with(b"ID3") || head.starts_with(&[0xFF, 0xFB]) || head.starts_with(&[0xFF, 0xF3])
    {
        return Some(".mp3".to_string());
    }
    if head.starts_with(b"RIFF") && head.len() >= 12 && &head[8..12] == b"WAVE" {
        return Some(".wav".to_string());
    }
    if head.starts_with(b"fLaC") {
        return Some(".flac".to_string());
    }
    if head.len() >= 12 && &head[4..8] == b"ftyp" {
        return Some(".m4a".to_string());
    }

    let text = String::from_utf8_lossy(head);
    let trimmed = text.trim_start();
    let trimmed_lower = trimmed.to_ascii_lowercase();
    if trimmed_lower.starts_with("<!doctype html") || trimmed_lower.starts_with("<html") {
        return Some(".html".to_string());
    }
    if trimmed.starts_with("<?xml") {
        return Some(".xml".to_string());
    }

    None
}

/// Distinguish the OOXML flavors by peeking at the archive's entry names
fn refine_zip(path: &Path) -> String {
    let Ok(file) = fs::File::open(path) else {
        return ".zip".to_string();
    };
    let Ok(archive) = zip::ZipArchive::new(file) else {
        return ".zip".to_string();
    };
    for name in archive.file_names() {
        if name.starts_with("word/") {
            return ".docx".to_string();
        }
        if name.starts_with("xl/") {
            return ".xlsx".to_string();
        }
        if name.starts_with("ppt/") {
            return ".pptx".to_string();
        }
    }
    ".zip".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_extension_for_mime() {
        assert_eq!(extension_for_mime("text/html"), Some(".html"));
        assert_eq!(extension_for_mime("text/html; charset=utf-8"), Some(".html"));
        assert_eq!(extension_for_mime("application/pdf"), Some(".pdf"));
        assert_eq!(
            extension_for_mime(
                "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
            ),
            Some(".xlsx")
        );
        assert_eq!(extension_for_mime("audio/mpeg"), Some(".mp3"));
        assert_eq!(extension_for_mime("application/x-unknown"), None);
    }

    #[test]
    fn test_guess_pdf() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(b"%PDF-1.7 rest of file").unwrap();
        assert_eq!(guess_extension(f.path()).as_deref(), Some(".pdf"));
    }

    #[test]
    fn test_guess_html() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(b"  <!DOCTYPE HTML><html></html>").unwrap();
        assert_eq!(guess_extension(f.path()).as_deref(), Some(".html"));
    }

    #[test]
    fn test_guess_xml() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(b"<?xml version=\"1.0\"?><root/>").unwrap();
        assert_eq!(guess_extension(f.path()).as_deref(), Some(".xml"));
    }

    #[test]
    fn test_guess_wav() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(b"RIFF\x24\x00\x00\x00WAVEfmt ").unwrap();
        assert_eq!(guess_extension(f.path()).as_deref(), Some(".wav"));
    }

    #[test]
    fn test_guess_ooxml_flavors() {
        for (dir, expected) in [
            ("word/", ".docx"),
            ("xl/", ".xlsx"),
            ("ppt/", ".pptx"),
            ("data/", ".zip"),
        ] {
            let f = tempfile::NamedTempFile::new().unwrap();
            let mut zip = zip::ZipWriter::new(f.reopen().unwrap());
            let options = zip::write::SimpleFileOptions::default();
            zip.start_file(format!("{dir}content.xml"), options).unwrap();
            std::io::Write::write_all(&mut zip, b"<x/>").unwrap();
            zip.finish().unwrap();
            assert_eq!(guess_extension(f.path()).as_deref(), Some(expected), "{dir}");
        }
    }

    #[test]
    fn test_unreadable_path_is_none() {
        assert_eq!(guess_extension(Path::new("/no/such/file")), None);
    }

    #[test]
    fn test_unrecognized_bytes_are_none() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(b"just some plain prose").unwrap();
        assert_eq!(guess_extension(f.path()), None);
    }
}
