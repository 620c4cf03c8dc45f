//! Conversion between on-disk bytes and the cache's string representation
//!
//! The cache only stores `String`s. Bytes are decoded once when a file is
//! loaded and encoded once when it is saved.

use crate::error::{Error, Result};

/// Byte encoding used for INI text on the storage side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextEncoding {
    /// One byte per character (ISO-8859-1). Text with characters above
    /// U+00FF cannot be written in this encoding.
    #[default]
    Latin1,
    /// UTF-8. Invalid sequences are replaced when decoding.
    Utf8,
}

/// Decode raw bytes into text, stopping at the first zero byte
pub fn decode(bytes: &[u8], encoding: TextEncoding) -> String {
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    let bytes = &bytes[..end];

    match encoding {
        TextEncoding::Latin1 => bytes.iter().map(|&b| char::from(b)).collect(),
        TextEncoding::Utf8 => String::from_utf8_lossy(bytes).into_owned(),
    }
}

fn latin1_byte(c: char) -> Result<u8> {
    u8::try_from(u32::from(c)).map_err(|_| Error::Unencodable { character: c })
}

/// Number of bytes `text` occupies once encoded
///
/// # Returns
/// * `Result<usize>` - Encoded length, or `Error::Unencodable` for the first
///   character the encoding cannot represent
pub fn encoded_len(text: &str, encoding: TextEncoding) -> Result<usize> {
    match encoding {
        TextEncoding::Latin1 => text.chars().try_fold(0usize, |len, c| {
            latin1_byte(c)?;
            Ok(len + 1)
        }),
        TextEncoding::Utf8 => Ok(text.len()),
    }
}

/// Append the encoded form of `text` to `out`
///
/// On `Error::Unencodable` nothing is appended.
pub fn encode_into(text: &str, encoding: TextEncoding, out: &mut Vec<u8>) -> Result<()> {
    match encoding {
        TextEncoding::Latin1 => {
            let start = out.len();
            for c in text.chars() {
                match latin1_byte(c) {
                    Ok(b) => out.push(b),
                    Err(e) => {
                        out.truncate(start);
                        return Err(e);
                    }
                }
            }
        }
        TextEncoding::Utf8 => out.extend_from_slice(text.as_bytes()),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_latin1_high_bytes() {
        let text = decode(b"caf\xe9", TextEncoding::Latin1);
        assert_eq!(text, "café");
    }

    #[test]
    fn test_decode_stops_at_nul() {
        assert_eq!(decode(b"[A]\r\n\0[B]", TextEncoding::Latin1), "[A]\r\n");
        assert_eq!(decode(b"abc\0", TextEncoding::Utf8), "abc");
    }

    #[test]
    fn test_encode_latin1_rejects_wide_chars() {
        let mut out = b"x".to_vec();
        let result = encode_into("é€", TextEncoding::Latin1, &mut out);

        assert!(matches!(result, Err(Error::Unencodable { character: '€' })));
        assert_eq!(out, b"x");
        assert!(matches!(
            encoded_len("Name=Ω", TextEncoding::Latin1),
            Err(Error::Unencodable { character: 'Ω' })
        ));
    }

    #[test]
    fn test_encode_latin1_full_range() {
        let mut out = Vec::new();
        encode_into("\u{1}é\u{ff}", TextEncoding::Latin1, &mut out).unwrap();
        assert_eq!(out, vec![0x01, 0xe9, 0xff]);
    }

    #[test]
    fn test_encode_utf8_accepts_everything() {
        let mut out = Vec::new();
        encode_into("é€", TextEncoding::Utf8, &mut out).unwrap();
        assert_eq!(out, "é€".as_bytes());
    }

    #[test]
    fn test_encoded_len_matches_output() {
        for encoding in [TextEncoding::Latin1, TextEncoding::Utf8] {
            let mut out = Vec::new();
            encode_into("Größe=ß", encoding, &mut out).unwrap();
            assert_eq!(out.len(), encoded_len("Größe=ß", encoding).unwrap());
        }
    }
}
