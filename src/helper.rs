//! Utilities shared by the engine and the upload path: data URIs and download files.

use std::fs;
use std::path::{Path, PathBuf};

use base64::{engine::general_purpose::STANDARD, Engine as _};

use crate::config::ExportFormat;
use crate::error::EngineError;

/// Base name of downloaded files, e.g. `qr.png`.
pub const DOWNLOAD_NAME: &str = "qr";

/// Encodes image bytes as a base64 data URI, sniffing the MIME type from the content.
///
/// Returns `None` when the bytes are not a format `image` recognises.
///
/// # Example
///
/// ```rust
/// use qrstyle::helper::encode_data_uri;
///
/// let png = [0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a];
/// let uri = encode_data_uri(&png).unwrap();
/// assert!(uri.starts_with("data:image/png;base64,"));
/// ```
pub fn encode_data_uri(bytes: &[u8]) -> Option<String> {
    let format = image::guess_format(bytes).ok()?;
    Some(format!(
        "data:{};base64,{}",
        format.to_mime_type(),
        STANDARD.encode(bytes)
    ))
}

/// Decodes a base64 data URI back into its bytes.
///
/// # Errors
///
/// Returns [`EngineError::MalformedDataUri`] when the URI is not
/// `data:image/<subtype>;base64,<payload>` or the payload is not valid base64.
pub fn decode_data_uri(uri: &str) -> Result<Vec<u8>, EngineError> {
    let malformed = || EngineError::MalformedDataUri(truncate(uri, 48));
    let rest = uri.strip_prefix("data:").ok_or_else(malformed)?;
    let (header, payload) = rest.split_once(',').ok_or_else(malformed)?;
    let subtype = header
        .strip_suffix(";base64")
        .and_then(|mime| mime.strip_prefix("image/"))
        .ok_or_else(malformed)?;
    let token = |c: char| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.');
    if subtype.is_empty() || !subtype.chars().all(token) {
        return Err(malformed());
    }
    STANDARD.decode(payload.trim()).map_err(|_| malformed())
}

/// Escapes text for use inside a double-quoted XML attribute.
pub fn xml_escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Writes a downloaded artifact into `directory` as `qr.<ext>`, creating the directory
/// if it does not exist yet.
///
/// # Arguments
///
/// * `bytes` - The encoded file contents.
/// * `directory` - Target directory.
/// * `format` - Decides the file extension.
pub fn save_download(bytes: &[u8], directory: &Path, format: ExportFormat) -> std::io::Result<PathBuf> {
    if !directory.exists() {
        fs::create_dir_all(directory)?;
    }
    let path = directory.join(format!("{}.{}", DOWNLOAD_NAME, format.extension()));
    fs::write(&path, bytes)?;
    Ok(path)
}

fn truncate(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((end, _)) => format!("{}...", &text[..end]),
        None => text.to_string(),
    }
}

// Tests
#[cfg(test)]
mod tests {
    use super::*;

    const PNG_MAGIC: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a];

    #[test]
    fn test_data_uri_round_trip() {
        let uri = encode_data_uri(&PNG_MAGIC).unwrap();
        assert!(uri.starts_with("data:image/png;base64,"));
        assert_eq!(decode_data_uri(&uri).unwrap(), PNG_MAGIC);
    }

    #[test]
    fn test_encode_rejects_unknown_bytes() {
        assert_eq!(encode_data_uri(b"plain text"), None);
    }

    #[test]
    fn test_decode_rejects_malformed_uris() {
        for uri in [
            "",
            "https://example.com/logo.png",
            "data:image/png,AAAA",
            "data:image/png;base64",
            "data:image/png;base64,***",
            "data:text/plain;base64,AAAA",
            "data:image/;base64,AAAA",
            "data:image/png\" onload=\"x;base64,AAAA",
            "data:image/png<x;base64,AAAA",
        ] {
            assert!(matches!(decode_data_uri(uri), Err(EngineError::MalformedDataUri(_))), "{uri}");
        }
    }

    #[test]
    fn test_decode_accepts_image_subtypes() {
        assert_eq!(decode_data_uri("data:image/svg+xml;base64,AAAA").unwrap(), vec![0, 0, 0]);
        assert_eq!(decode_data_uri("data:image/x-icon;base64,AAAA").unwrap(), vec![0, 0, 0]);
    }

    #[test]
    fn test_xml_escape() {
        assert_eq!(xml_escape("a\"b<c>&'d"), "a&quot;b&lt;c&gt;&amp;&apos;d");
        assert_eq!(xml_escape("data:image/png;base64,AA+/"), "data:image/png;base64,AA+/");
    }

    #[test]
    fn test_save_download_creates_directory() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("nested").join("out");

        let path = save_download(b"<svg/>", &target, ExportFormat::Svg).unwrap();

        assert_eq!(path, target.join("qr.svg"));
        assert_eq!(fs::read(&path).unwrap(), b"<svg/>");
    }
}
