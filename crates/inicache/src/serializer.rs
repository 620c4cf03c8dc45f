//! Canonical INI output
//!
//! Output format:
//! ```text
//! [Section]\r\n
//! Key=Value\r\n
//! \r\n              (between sections only)
//! [Next]\r\n
//! ```
//!
//! The exact output size is computed first so the buffer is allocated once.

use tracing::{debug, warn};

use crate::cache::IniCache;
use crate::encoding::{encode_into, encoded_len, TextEncoding};
use crate::error::{Error, Result};

const CRLF: &[u8] = b"\r\n";

/// `[`, `]` and the line terminator around a section name
const SECTION_OVERHEAD: usize = 4;

/// `=` and the line terminator around a key/value pair
const KEY_OVERHEAD: usize = 3;

/// Blank line between two sections
const SEPARATOR_LEN: usize = 2;

/// Exact number of bytes [`render`] produces for `cache`
///
/// Fails with `Error::Unencodable` if any section name, key name or value
/// cannot be represented in `encoding`.
pub fn serialized_len(cache: &IniCache, encoding: TextEncoding) -> Result<usize> {
    let mut size = 0;
    for (i, section) in cache.sections().enumerate() {
        if i > 0 {
            size += SEPARATOR_LEN;
        }
        size += encoded_len(section.name(), encoding)? + SECTION_OVERHEAD;
        for key in section.keys() {
            size += encoded_len(key.name(), encoding)?
                + encoded_len(key.data(), encoding)?
                + KEY_OVERHEAD;
        }
    }
    Ok(size)
}

/// Render `cache` into a single buffer in canonical form
///
/// Every string is checked against `encoding` before the buffer is
/// allocated, so a rejected cache produces no output at all.
///
/// # Returns
/// * `Result<Vec<u8>>` - Encoded text, `Error::Unencodable` or
///   `Error::OutOfMemory`
pub fn render(cache: &IniCache, encoding: TextEncoding) -> Result<Vec<u8>> {
    let size = serialized_len(cache, encoding).map_err(|e| {
        warn!(?encoding, error = %e, "cache text does not fit the storage encoding");
        e
    })?;
    debug!(size, sections = cache.len(), "serializing INI cache");

    let mut buffer = Vec::new();
    buffer
        .try_reserve_exact(size)
        .map_err(Error::out_of_memory(size))?;

    for (i, section) in cache.sections().enumerate() {
        if i > 0 {
            buffer.extend_from_slice(CRLF);
        }
        buffer.push(b'[');
        encode_into(section.name(), encoding, &mut buffer)?;
        buffer.push(b']');
        buffer.extend_from_slice(CRLF);

        for key in section.keys() {
            encode_into(key.name(), encoding, &mut buffer)?;
            buffer.push(b'=');
            encode_into(key.data(), encoding, &mut buffer)?;
            buffer.extend_from_slice(CRLF);
        }
    }

    debug_assert_eq!(buffer.len(), size);
    Ok(buffer)
}

impl IniCache {
    /// Canonical text of the cache in `encoding`
    pub fn to_bytes(&self, encoding: TextEncoding) -> Result<Vec<u8>> {
        render(self, encoding)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::Insertion;
    use crate::options::LoadOptions;

    fn two_sections() -> IniCache {
        let mut cache = IniCache::new();
        let a = cache.add_section("A").unwrap();
        cache.section_mut(a).unwrap().add_key("K1", "V1").unwrap();
        let b = cache.add_section("B").unwrap();
        cache.section_mut(b).unwrap().add_key("K2", "V2").unwrap();
        cache
    }

    #[test]
    fn test_render_shape() {
        let cache = two_sections();

        let out = render(&cache, TextEncoding::Latin1).unwrap();
        assert_eq!(out, b"[A]\r\nK1=V1\r\n\r\n[B]\r\nK2=V2\r\n");
    }

    #[test]
    fn test_serialized_len_is_exact() {
        let cache = two_sections();

        // [A]\r\n = 5, K1=V1\r\n = 7, separator = 2, twice minus one separator
        assert_eq!(serialized_len(&cache, TextEncoding::Latin1).unwrap(), 26);
        assert_eq!(render(&cache, TextEncoding::Latin1).unwrap().len(), 26);
    }

    #[test]
    fn test_render_empty_cache() {
        let cache = IniCache::new();

        assert_eq!(serialized_len(&cache, TextEncoding::Latin1).unwrap(), 0);
        assert!(render(&cache, TextEncoding::Latin1).unwrap().is_empty());
    }

    #[test]
    fn test_render_empty_section() {
        let mut cache = IniCache::new();
        cache.add_section("Empty").unwrap();
        cache.add_section("Next").unwrap();

        let out = render(&cache, TextEncoding::Latin1).unwrap();
        assert_eq!(out, b"[Empty]\r\n\r\n[Next]\r\n");
    }

    #[test]
    fn test_render_follows_anchored_order() {
        let mut cache = IniCache::new();
        let id = cache.add_section("S").unwrap();
        let section = cache.section_mut(id).unwrap();
        section.add_key("B", "2").unwrap();
        section.insert_key(None, Insertion::First, "A", "1").unwrap();

        let out = render(&cache, TextEncoding::Latin1).unwrap();
        assert_eq!(out, b"[S]\r\nA=1\r\nB=2\r\n");
    }

    #[test]
    fn test_render_does_not_restore_quotes() {
        let options = LoadOptions::new().with_string_mode(true);
        let cache = IniCache::parse("[Version]\nSignature=\"$ReactOS$\"\n", &options).unwrap();

        let out = render(&cache, TextEncoding::Latin1).unwrap();
        assert_eq!(out, b"[Version]\r\nSignature=$ReactOS$\r\n");
    }

    #[test]
    fn test_render_encodings() {
        let mut cache = IniCache::new();
        let id = cache.add_section("Strings").unwrap();
        cache.section_mut(id).unwrap().add_key("Name", "Café").unwrap();

        let latin1 = render(&cache, TextEncoding::Latin1).unwrap();
        assert_eq!(latin1, b"[Strings]\r\nName=Caf\xe9\r\n");
        assert_eq!(latin1.len(), serialized_len(&cache, TextEncoding::Latin1).unwrap());

        let utf8 = render(&cache, TextEncoding::Utf8).unwrap();
        assert_eq!(utf8, "[Strings]\r\nName=Café\r\n".as_bytes());
        assert_eq!(utf8.len(), serialized_len(&cache, TextEncoding::Utf8).unwrap());
    }

    #[test]
    fn test_render_rejects_text_outside_latin1() {
        let mut cache = IniCache::new();
        let id = cache.add_section("Currency").unwrap();
        let section = cache.section_mut(id).unwrap();
        section.add_key("Euro€", "one").unwrap();
        section.add_key("Euro₤", "two").unwrap();
        section.add_key("Name", "Ω").unwrap();

        let err = render(&cache, TextEncoding::Latin1).unwrap_err();
        assert!(matches!(err, Error::Unencodable { character: '€' }));
        assert!(serialized_len(&cache, TextEncoding::Latin1).is_err());

        let utf8 = render(&cache, TextEncoding::Utf8).unwrap();
        assert_eq!(
            utf8,
            "[Currency]\r\nEuro€=one\r\nEuro₤=two\r\nName=Ω\r\n".as_bytes()
        );
    }

    #[test]
    fn test_render_rejects_section_name_outside_latin1() {
        let mut cache = IniCache::new();
        cache.add_section("Ωmega").unwrap();

        assert!(matches!(
            cache.to_bytes(TextEncoding::Latin1),
            Err(Error::Unencodable { character: 'Ω' })
        ));
    }
}
