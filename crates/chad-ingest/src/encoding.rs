//! Character encoding detection.
//!
//! Extracts arrive in whatever encoding the exporting system used. Detection
//! order: a byte-order mark wins, then strict UTF-8 validation, then
//! Windows-1252 (which maps every byte and so never fails).

use std::borrow::Cow;
use std::path::Path;

use encoding_rs::{Encoding, UTF_8, WINDOWS_1252};

use crate::error::{IngestError, Result};

/// File contents decoded to UTF-8 together with the detected encoding.
#[derive(Debug, Clone)]
pub struct DecodedText {
    pub text: String,
    pub encoding: &'static Encoding,
}

/// Detect the encoding of `bytes`, returning it with the BOM length to skip.
fn detect(bytes: &[u8]) -> (&'static Encoding, usize) {
    if let Some((encoding, bom_len)) = Encoding::for_bom(bytes) {
        return (encoding, bom_len);
    }
    if std::str::from_utf8(bytes).is_ok() {
        return (UTF_8, 0);
    }
    (WINDOWS_1252, 0)
}

/// Decode raw bytes read from `path`.
pub fn decode_bytes(bytes: &[u8], path: &Path) -> Result<DecodedText> {
    let (encoding, bom_len) = detect(bytes);
    let (text, had_errors) = encoding.decode_without_bom_handling(&bytes[bom_len..]);
    if had_errors {
        return Err(IngestError::Decode {
            path: path.to_path_buf(),
            encoding: encoding.name(),
        });
    }
    let text = match text {
        Cow::Borrowed(borrowed) => borrowed.to_string(),
        Cow::Owned(owned) => owned,
    };
    Ok(DecodedText { text, encoding })
}

/// Read and decode a whole file.
pub fn read_decoded(path: &Path) -> Result<DecodedText> {
    let bytes = std::fs::read(path).map_err(|source| IngestError::FileRead {
        path: path.to_path_buf(),
        source,
    })?;
    let decoded = decode_bytes(&bytes, path)?;
    tracing::debug!(
        path = %path.display(),
        encoding = decoded.encoding.name(),
        bytes = bytes.len(),
        "decoded extract"
    );
    Ok(decoded)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(bytes: &[u8]) -> DecodedText {
        decode_bytes(bytes, Path::new("test.csv")).unwrap()
    }

    #[test]
    fn test_plain_utf8() {
        let decoded = decode("PATIENT_ID,TEXT\n1,Négatif\n".as_bytes());
        assert_eq!(decoded.encoding, UTF_8);
        assert!(decoded.text.contains("Négatif"));
    }

    #[test]
    fn test_utf8_bom_is_stripped() {
        let mut bytes = vec![0xEF, 0xBB, 0xBF];
        bytes.extend_from_slice(b"PATIENT_ID\n1\n");
        let decoded = decode(&bytes);
        assert_eq!(decoded.encoding, UTF_8);
        assert!(decoded.text.starts_with("PATIENT_ID"));
    }

    #[test]
    fn test_utf16_le_bom() {
        let mut bytes = vec![0xFF, 0xFE];
        for unit in "ID\n7\n".encode_utf16() {
            bytes.extend_from_slice(&unit.to_le_bytes());
        }
        let decoded = decode(&bytes);
        assert_eq!(decoded.encoding, encoding_rs::UTF_16LE);
        assert_eq!(decoded.text, "ID\n7\n");
    }

    #[test]
    fn test_latin1_falls_back_to_windows_1252() {
        // "Caf\xe9" is not valid UTF-8
        let decoded = decode(b"NAME\nCaf\xe9\n");
        assert_eq!(decoded.encoding, WINDOWS_1252);
        assert_eq!(decoded.text, "NAME\nCafé\n");
    }
}
