//! Byte-level input decoding.
//!
//! Byte inputs (`&[u8]`, readers, file descriptors) go through
//! [`decode_to_utf8`] before the parser sees them:
//!
//! 1. A byte order mark selects UTF-8, UTF-16BE or UTF-16LE and is skipped.
//! 2. Without a BOM the bytes are taken as UTF-8.
//! 3. An `encoding="..."` in the XML declaration that names something else
//!    makes `encoding_rs` re-decode the bytes with that encoding.

/// An input that could not be decoded to UTF-8.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("encoding error: {message}")]
pub struct EncodingError {
    /// A human-readable description of the problem.
    pub message: String,
}

impl EncodingError {
    fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Detects the encoding of a byte stream from its byte order mark.
///
/// Returns the encoding label and the number of BOM bytes to skip. Input
/// without a BOM is reported as UTF-8.
///
/// # Examples
///
/// ```
/// use sprigxml::encoding::detect_encoding;
///
/// assert_eq!(detect_encoding(b"\xEF\xBB\xBF<a/>"), ("UTF-8", 3));
/// assert_eq!(detect_encoding(b"\xFF\xFE<\x00"), ("UTF-16LE", 2));
/// assert_eq!(detect_encoding(b"<a/>"), ("UTF-8", 0));
/// ```
#[must_use]
pub fn detect_encoding(bytes: &[u8]) -> (&'static str, usize) {
    match bytes {
        [0xEF, 0xBB, 0xBF, ..] => ("UTF-8", 3),
        [0xFE, 0xFF, ..] => ("UTF-16BE", 2),
        [0xFF, 0xFE, ..] => ("UTF-16LE", 2),
        _ => ("UTF-8", 0),
    }
}

/// Decodes `bytes` from the encoding named `label` into a `String`.
///
/// # Errors
///
/// Returns `EncodingError` if `encoding_rs` does not know the label or the
/// bytes are malformed for that encoding.
pub fn transcode(bytes: &[u8], label: &str) -> Result<String, EncodingError> {
    let encoding = encoding_rs::Encoding::for_label(label.as_bytes())
        .ok_or_else(|| EncodingError::new(format!("unsupported encoding: {label}")))?;

    let (text, had_errors) = encoding.decode_without_bom_handling(bytes);
    if had_errors {
        return Err(EncodingError::new(format!(
            "malformed byte sequence for encoding {label}"
        )));
    }
    Ok(text.into_owned())
}

/// Decodes raw XML bytes into UTF-8, honoring the BOM and any encoding
/// named in the XML declaration.
///
/// # Errors
///
/// Returns `EncodingError` for invalid byte sequences or unsupported
/// declared encodings.
///
/// # Examples
///
/// ```
/// use sprigxml::encoding::decode_to_utf8;
///
/// let text = decode_to_utf8(b"<?xml version=\"1.0\" encoding=\"ISO-8859-1\"?><a>caf\xE9</a>").unwrap();
/// assert!(text.ends_with("<a>caf\u{e9}</a>"));
/// ```
pub fn decode_to_utf8(bytes: &[u8]) -> Result<String, EncodingError> {
    let (bom_encoding, skip) = detect_encoding(bytes);
    let content = &bytes[skip..];

    if bom_encoding == "UTF-8" {
        if let Some(declared) = declared_encoding(content) {
            if !is_utf8_label(&declared) && skip == 0 {
                return transcode(content, &declared);
            }
        }
        return std::str::from_utf8(content)
            .map(str::to_string)
            .map_err(|e| EncodingError::new(format!("input is not valid UTF-8: {e}")));
    }

    let text = transcode(content, bom_encoding)?;
    match declared_encoding(text.as_bytes()) {
        Some(declared) if !is_compatible_with_bom(&declared, bom_encoding) => {
            transcode(content, &declared)
        }
        _ => Ok(text),
    }
}

/// Pulls the `encoding` pseudo-attribute out of a leading XML declaration.
/// The declaration is ASCII, so this works on undecoded bytes too.
fn declared_encoding(bytes: &[u8]) -> Option<String> {
    let scan = &bytes[..bytes.len().min(256)];
    if !scan.starts_with(b"<?xml") {
        return None;
    }
    let end = scan.windows(2).position(|w| w == b"?>")?;
    let decl = &scan[..end];

    let needle = b"encoding";
    let at = decl.windows(needle.len()).position(|w| w == needle)?;
    let rest = trim_ascii_start(&decl[at + needle.len()..]);
    let rest = trim_ascii_start(rest.strip_prefix(b"=")?);

    let (&quote, rest) = rest.split_first()?;
    if quote != b'"' && quote != b'\'' {
        return None;
    }
    let value = &rest[..rest.iter().position(|&b| b == quote)?];
    value
        .is_ascii()
        .then(|| String::from_utf8_lossy(value).into_owned())
}

fn trim_ascii_start(bytes: &[u8]) -> &[u8] {
    let skip = bytes
        .iter()
        .take_while(|b| matches!(b, b' ' | b'\t' | b'\r' | b'\n'))
        .count();
    &bytes[skip..]
}

/// Returns `true` for the labels that name UTF-8 itself.
pub(crate) fn is_utf8_label(label: &str) -> bool {
    label.eq_ignore_ascii_case("utf-8") || label.eq_ignore_ascii_case("utf8")
}

fn is_compatible_with_bom(declared: &str, bom_encoding: &str) -> bool {
    declared.eq_ignore_ascii_case(bom_encoding) || declared.eq_ignore_ascii_case("utf-16")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_detect_boms() {
        assert_eq!(detect_encoding(b"\xEF\xBB\xBF<root/>"), ("UTF-8", 3));
        assert_eq!(detect_encoding(b"\xFE\xFF\x00<"), ("UTF-16BE", 2));
        assert_eq!(detect_encoding(b"\xFF\xFE<\x00"), ("UTF-16LE", 2));
    }

    #[test]
    fn test_detect_short_and_empty_input() {
        assert_eq!(detect_encoding(b""), ("UTF-8", 0));
        assert_eq!(detect_encoding(b"\xEF"), ("UTF-8", 0));
    }

    #[test]
    fn test_decode_plain_utf8() {
        let text = decode_to_utf8(b"<?xml version=\"1.0\"?><root>hello</root>").unwrap();
        assert_eq!(text, "<?xml version=\"1.0\"?><root>hello</root>");
    }

    #[test]
    fn test_decode_strips_utf8_bom() {
        let text = decode_to_utf8(b"\xEF\xBB\xBF<root/>").unwrap();
        assert_eq!(text, "<root/>");
    }

    #[test]
    fn test_decode_declared_latin1() {
        let mut bytes = b"<?xml version=\"1.0\" encoding=\"ISO-8859-1\"?>".to_vec();
        bytes.extend_from_slice(b"<root>caf\xE9</root>");
        let text = decode_to_utf8(&bytes).unwrap();
        assert!(text.ends_with("<root>caf\u{e9}</root>"));
    }

    #[test]
    fn test_decode_utf16le_with_bom() {
        let mut bytes = vec![0xFF, 0xFE];
        for unit in "<a>\u{e9}</a>".encode_utf16() {
            bytes.extend_from_slice(&unit.to_le_bytes());
        }
        assert_eq!(decode_to_utf8(&bytes).unwrap(), "<a>\u{e9}</a>");
    }

    #[test]
    fn test_decode_rejects_invalid_utf8() {
        let err = decode_to_utf8(b"<a>\xFF\xFE\xFD</a>").unwrap_err();
        assert!(err.message.contains("not valid UTF-8"));
    }

    #[test]
    fn test_transcode_known_labels() {
        assert_eq!(transcode(b"caf\xE9", "ISO-8859-1").unwrap(), "caf\u{e9}");
        assert_eq!(transcode(b"\x80 5", "windows-1252").unwrap(), "\u{20ac} 5");
        let err = transcode(b"\xFF", "UTF-8").unwrap_err();
        assert!(err.message.contains("malformed byte sequence"));
    }

    #[test]
    fn test_transcode_unknown_label() {
        let err = transcode(b"hello", "UNKNOWN-ENCODING-42").unwrap_err();
        assert_eq!(err.to_string(), "encoding error: unsupported encoding: UNKNOWN-ENCODING-42");
    }

    #[test]
    fn test_declared_encoding_quotes() {
        assert_eq!(
            declared_encoding(b"<?xml version='1.0' encoding='UTF-8'?><r/>"),
            Some("UTF-8".to_string())
        );
        assert_eq!(declared_encoding(b"<?xml version=\"1.0\"?><r/>"), None);
        assert_eq!(declared_encoding(b"<r/>"), None);
    }
}
