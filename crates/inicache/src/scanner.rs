//! INI text scanner using nom
//!
//! Grammar:
//! ```text
//! [Section Name]   ; anything after ']' is ignored
//! Key = Value      ; trailing comment
//! Quoted = "value; kept verbatim"   (string mode only)
//! ; comment line
//! ```
//!
//! The scanner makes a single forward pass and never backtracks. Malformed
//! lines are dropped and scanning continues; the only hard failure is an
//! unterminated quote when `strict_quotes` is set. Without it, an
//! unterminated quote ends the scan and the rest of the text is discarded.

use nom::{
    bytes::complete::{take_till, take_while},
    character::complete::char,
    combinator::opt,
    sequence::{delimited, terminated},
    IResult,
};
use tracing::{debug, trace, warn};

use crate::cache::{IniCache, SectionId};
use crate::error::{Error, Result};
use crate::options::LoadOptions;

/// Counters describing one scan
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanSummary {
    /// Section headers accepted (repeated headers count each time)
    pub sections: usize,
    /// Key lines accepted, including updates of existing keys
    pub keys: usize,
    /// Headers or key lines that were dropped
    pub skipped: usize,
    /// Bytes left unscanned after an unterminated quoted value
    pub abandoned: usize,
}

/// Result of reading the part of a key line before `=`
#[derive(Debug, PartialEq, Eq)]
enum KeyToken<'a> {
    Name(&'a str),
    Comment,
}

/// Result of reading the part of a key line from `=` on
#[derive(Debug, PartialEq, Eq)]
enum Value<'a> {
    Data(&'a str),
    /// No `=` after the key name
    Missing,
    /// Opening quote with no closing quote; holds the text from the quote on
    Unterminated(&'a str),
}

fn is_space(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\n' | '\r' | '\x0b' | '\x0c')
}

fn is_inline_space(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\x0b' | '\x0c')
}

fn whitespace(input: &str) -> IResult<&str, &str> {
    take_while(is_space)(input)
}

fn inline_whitespace(input: &str) -> IResult<&str, &str> {
    take_while(is_inline_space)(input)
}

/// Rest of the physical line, consuming the `\n` terminator
fn rest_of_line(input: &str) -> IResult<&str, &str> {
    terminated(take_till(|c: char| c == '\n'), opt(char('\n')))(input)
}

/// Section name after the opening `[`
fn section_name(input: &str) -> IResult<&str, &str> {
    let (input, _) = inline_whitespace(input)?;
    let (input, name) = take_till(|c: char| c == ']' || c == '\r' || c == '\n')(input)?;
    let (input, _) = rest_of_line(input)?;
    Ok((input, name))
}

/// Key name, or a comment if the name runs into `;`
fn key_token(input: &str) -> IResult<&str, KeyToken<'_>> {
    let (input, name) = take_till(|c: char| is_space(c) || c == '=' || c == ';')(input)?;
    if input.starts_with(';') {
        let (input, _) = rest_of_line(input)?;
        return Ok((input, KeyToken::Comment));
    }
    Ok((input, KeyToken::Name(name)))
}

/// `= value` part of a key line, through the end of the line
fn key_value(input: &str, string_mode: bool) -> IResult<&str, Value<'_>> {
    let (input, _) = inline_whitespace(input)?;
    let (input, equals) = opt(char('='))(input)?;
    if equals.is_none() {
        let (input, _) = rest_of_line(input)?;
        return Ok((input, Value::Missing));
    }
    let (input, _) = inline_whitespace(input)?;

    if string_mode && input.starts_with('"') {
        let (rest, body) = opt(delimited(char('"'), take_till(|c: char| c == '"'), char('"')))(input)?;
        return match body {
            Some(body) => {
                let (rest, _) = rest_of_line(rest)?;
                Ok((rest, Value::Data(body)))
            }
            None => Ok(("", Value::Unterminated(input))),
        };
    }

    let (input, data) = take_till(|c: char| c == '\r' || c == '\n' || c == ';')(input)?;
    let (input, _) = rest_of_line(input)?;
    Ok((input, Value::Data(data)))
}

/// Skip lines until one starts (after indentation) with `[`
fn skip_to_next_section(input: &str) -> IResult<&str, ()> {
    let mut input = input;
    loop {
        let (line, _) = inline_whitespace(input)?;
        if line.is_empty() || line.starts_with('[') {
            return Ok((line, ()));
        }
        let (rest, _) = rest_of_line(line)?;
        input = rest;
    }
}

/// Build a parse error pointing at `at`, which must be a suffix of `text`
fn parse_error(text: &str, at: &str, message: impl Into<String>) -> Error {
    let offset = text.len() - at.len();
    let line = text[..offset].matches('\n').count() + 1;
    Error::Parse {
        line,
        offset,
        message: message.into(),
    }
}

fn nom_error(text: &str, at: &str, err: nom::Err<nom::error::Error<&str>>) -> Error {
    parse_error(text, at, format!("{:?}", err))
}

/// Scan `text` and add every section and key it contains to `cache`.
///
/// Keys are appended to their section; a repeated key name updates the
/// existing key. Text before the first section header is ignored.
///
/// A quoted value without a closing quote fails the scan with
/// `Error::Parse` when `strict_quotes` is set. Otherwise the key is dropped
/// and scanning stops there: everything from the opening quote to the end of
/// the text, later sections included, is discarded and counted in
/// [`ScanSummary::abandoned`].
///
/// # Returns
/// * `Result<ScanSummary>` - What was accepted and what was dropped
pub fn scan(text: &str, options: &LoadOptions, cache: &mut IniCache) -> Result<ScanSummary> {
    let mut summary = ScanSummary::default();
    let mut current: Option<SectionId> = None;
    let mut input = text;

    loop {
        let (rest, _) = whitespace(input).map_err(|e| nom_error(text, input, e))?;
        input = rest;
        if input.is_empty() {
            break;
        }

        if let Some(header) = input.strip_prefix('[') {
            let (rest, name) = section_name(header).map_err(|e| nom_error(text, header, e))?;
            input = rest;

            match cache.add_section(name) {
                Ok(id) => {
                    trace!(section = name, "section header");
                    current = Some(id);
                    summary.sections += 1;
                }
                Err(err) => {
                    debug!(error = %err, "dropping section header");
                    current = None;
                    summary.skipped += 1;
                    let (rest, _) =
                        skip_to_next_section(input).map_err(|e| nom_error(text, input, e))?;
                    input = rest;
                }
            }
            continue;
        }

        let Some(id) = current else {
            let (rest, _) = skip_to_next_section(input).map_err(|e| nom_error(text, input, e))?;
            input = rest;
            continue;
        };

        let (rest, token) = key_token(input).map_err(|e| nom_error(text, input, e))?;
        input = rest;
        let name = match token {
            KeyToken::Name(name) => name,
            KeyToken::Comment => continue,
        };

        let (rest, value) =
            key_value(input, options.string_mode).map_err(|e| nom_error(text, input, e))?;
        input = rest;

        let data = match value {
            Value::Data(data) => data,
            Value::Missing => {
                debug!(key = name, "dropping key without '='");
                summary.skipped += 1;
                continue;
            }
            Value::Unterminated(at) => {
                if options.strict_quotes {
                    return Err(parse_error(text, at, "unterminated quoted value"));
                }
                summary.skipped += 1;
                summary.abandoned = at.len();
                warn!(
                    key = name,
                    abandoned = at.len(),
                    "unterminated quoted value, discarding the rest of the text"
                );
                continue;
            }
        };

        let Some(section) = cache.section_mut(id) else {
            summary.skipped += 1;
            continue;
        };
        match section.add_key(name, data) {
            Ok(_) => {
                trace!(key = name, value = data, "key");
                summary.keys += 1;
            }
            Err(err) => {
                debug!(key = name, error = %err, "dropping key");
                summary.skipped += 1;
            }
        }
    }

    Ok(summary)
}

impl IniCache {
    /// Build a cache from INI text
    pub fn parse(text: &str, options: &LoadOptions) -> Result<Self> {
        let mut cache = IniCache::new();
        let summary = scan(text, options, &mut cache)?;
        debug!(
            sections = summary.sections,
            keys = summary.keys,
            skipped = summary.skipped,
            abandoned = summary.abandoned,
            "parsed INI text"
        );
        Ok(cache)
    }

    /// Build a cache from raw bytes in `options.encoding`.
    ///
    /// A zero byte ends the text.
    pub fn from_bytes(bytes: &[u8], options: &LoadOptions) -> Result<Self> {
        let text = crate::encoding::decode(bytes, options.encoding);
        Self::parse(&text, options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoding::TextEncoding;

    fn parse(text: &str) -> IniCache {
        IniCache::parse(text, &LoadOptions::new()).unwrap()
    }

    fn strings(text: &str) -> IniCache {
        IniCache::parse(text, &LoadOptions::new().with_string_mode(true)).unwrap()
    }

    fn pairs(cache: &IniCache, section: &str) -> Vec<(String, String)> {
        cache
            .get_section(section)
            .unwrap()
            .keys()
            .map(|k| (k.name().to_string(), k.data().to_string()))
            .collect()
    }

    #[test]
    fn test_section_name() {
        let (rest, name) = section_name("  Version] trailing junk\r\nnext").unwrap();
        assert_eq!(name, "Version");
        assert_eq!(rest, "next");
    }

    #[test]
    fn test_key_token() {
        let (rest, token) = key_token("Signature = x").unwrap();
        assert_eq!(token, KeyToken::Name("Signature"));
        assert_eq!(rest, " = x");

        let (rest, token) = key_token("; comment\r\nKey=Val").unwrap();
        assert_eq!(token, KeyToken::Comment);
        assert_eq!(rest, "Key=Val");
    }

    #[test]
    fn test_key_value() {
        let (rest, value) = key_value(" = hello ; note\r\nnext", false).unwrap();
        assert_eq!(value, Value::Data("hello "));
        assert_eq!(rest, "next");

        let (rest, value) = key_value(" oops\nnext", false).unwrap();
        assert_eq!(value, Value::Missing);
        assert_eq!(rest, "next");
    }

    #[test]
    fn test_key_value_quoted() {
        let (rest, value) = key_value("=\"a;b\" junk\r\nnext", true).unwrap();
        assert_eq!(value, Value::Data("a;b"));
        assert_eq!(rest, "next");

        let (rest, value) = key_value("=\"open", true).unwrap();
        assert_eq!(value, Value::Unterminated("\"open"));
        assert_eq!(rest, "");
    }

    #[test]
    fn test_parse_basic() {
        let cache = parse("[Version]\r\nSignature=$Windows NT$\r\n\r\n[Files]\r\nA=1\r\nB=2\r\n");

        assert_eq!(cache.len(), 2);
        assert_eq!(
            pairs(&cache, "version"),
            vec![("Signature".into(), "$Windows NT$".into())]
        );
        assert_eq!(
            pairs(&cache, "Files"),
            vec![("A".into(), "1".into()), ("B".into(), "2".into())]
        );
    }

    #[test]
    fn test_parse_quoted_value_in_string_mode() {
        let cache = strings("[Version]\r\nSignature=\"$ReactOS$\"\r\n");

        let section = cache.get_section("Version").unwrap();
        assert_eq!(section.get_key("Signature").unwrap(), "$ReactOS$");
    }

    #[test]
    fn test_parse_quotes_kept_without_string_mode() {
        let cache = parse("[Version]\r\nSignature=\"$ReactOS$\"\r\n");

        let section = cache.get_section("Version").unwrap();
        assert_eq!(section.get_key("Signature").unwrap(), "\"$ReactOS$\"");
    }

    #[test]
    fn test_parse_skips_comment_lines() {
        let cache = parse("[S]\r\n; comment\r\nKey=Val\r\n");

        assert_eq!(pairs(&cache, "S"), vec![("Key".into(), "Val".into())]);
    }

    #[test]
    fn test_parse_comment_before_header() {
        let cache = parse("[A]\n; trailing comment\n[B]\nK=V\n");

        assert_eq!(cache.len(), 2);
        assert!(cache.get_section("A").unwrap().is_empty());
        assert_eq!(pairs(&cache, "B"), vec![("K".into(), "V".into())]);
    }

    #[test]
    fn test_parse_trailing_comment() {
        let cache = parse("[S]\nKey=Val;comment\nNext=1\n");

        assert_eq!(
            pairs(&cache, "S"),
            vec![("Key".into(), "Val".into()), ("Next".into(), "1".into())]
        );
    }

    #[test]
    fn test_parse_whitespace_around_equals() {
        let cache = parse("[S]\n   Key   =   Val\n\tOther\t=\tx\n");

        assert_eq!(
            pairs(&cache, "S"),
            vec![("Key".into(), "Val".into()), ("Other".into(), "x".into())]
        );
    }

    #[test]
    fn test_parse_ignores_text_before_first_section() {
        let cache = parse("Orphan=1\nmore junk\n  [Real]\nKey=1\n");

        assert_eq!(cache.len(), 1);
        assert_eq!(pairs(&cache, "Real"), vec![("Key".into(), "1".into())]);
    }

    #[test]
    fn test_parse_drops_empty_section_name() {
        let mut cache = IniCache::new();
        let summary = scan("[]\nLost=1\n[Kept]\nKey=1\n", &LoadOptions::new(), &mut cache).unwrap();

        assert_eq!(cache.len(), 1);
        assert_eq!(pairs(&cache, "Kept"), vec![("Key".into(), "1".into())]);
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.sections, 1);
        assert_eq!(summary.keys, 1);
    }

    #[test]
    fn test_parse_drops_key_without_equals() {
        let cache = parse("[S]\nBroken\nKey=1\n");

        assert_eq!(pairs(&cache, "S"), vec![("Key".into(), "1".into())]);
    }

    #[test]
    fn test_parse_drops_empty_value() {
        let cache = parse("[S]\nEmpty=\nKey=1\n");

        assert_eq!(pairs(&cache, "S"), vec![("Key".into(), "1".into())]);
    }

    #[test]
    fn test_parse_repeated_key_updates() {
        let cache = parse("[S]\nA=1\nB=2\na=3\n");

        assert_eq!(
            pairs(&cache, "S"),
            vec![("A".into(), "3".into()), ("B".into(), "2".into())]
        );
    }

    #[test]
    fn test_parse_repeated_section_merges() {
        let cache = parse("[S]\nA=1\n[T]\nX=1\n[s]\nB=2\n");

        assert_eq!(cache.len(), 2);
        assert_eq!(
            pairs(&cache, "S"),
            vec![("A".into(), "1".into()), ("B".into(), "2".into())]
        );
    }

    #[test]
    fn test_parse_unterminated_quote_lenient() {
        let mut cache = IniCache::new();
        let options = LoadOptions::new().with_string_mode(true);
        let summary = scan("[S]\nA=1\nB=\"open\nC=3\n", &options, &mut cache).unwrap();

        assert_eq!(pairs(&cache, "S"), vec![("A".into(), "1".into())]);
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.abandoned, "\"open\nC=3\n".len());
    }

    #[test]
    fn test_parse_unterminated_quote_discards_later_sections() {
        let mut cache = IniCache::new();
        let options = LoadOptions::new().with_string_mode(true);
        let text = "[S]\nA=\"open\n[T]\nB=2\n";
        let summary = scan(text, &options, &mut cache).unwrap();

        assert!(cache.get_section("T").is_none());
        assert!(cache.get_section("S").unwrap().is_empty());
        assert_eq!(summary.sections, 1);
        assert_eq!(summary.abandoned, "\"open\n[T]\nB=2\n".len());
    }

    #[test]
    fn test_parse_unterminated_quote_strict() {
        let options = LoadOptions::new()
            .with_string_mode(true)
            .with_strict_quotes(true);
        let result = IniCache::parse("[S]\nA=1\nB=\"open\n", &options);

        match result {
            Err(Error::Parse { line, offset, .. }) => {
                assert_eq!(line, 3);
                assert_eq!(offset, 10);
            }
            other => panic!("expected parse error, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_bare_newlines_and_missing_terminator() {
        let cache = parse("[S]\nA=1\nB=2");

        assert_eq!(
            pairs(&cache, "S"),
            vec![("A".into(), "1".into()), ("B".into(), "2".into())]
        );
    }

    #[test]
    fn test_parse_empty_input() {
        assert!(parse("").is_empty());
        assert!(parse(" \r\n\t\n").is_empty());
    }

    #[test]
    fn test_from_bytes_stops_at_nul() {
        let cache =
            IniCache::from_bytes(b"[A]\r\nK=V\r\n\0[B]\r\nX=Y\r\n", &LoadOptions::new()).unwrap();

        assert_eq!(cache.len(), 1);
        assert_eq!(pairs(&cache, "A"), vec![("K".into(), "V".into())]);
    }

    #[test]
    fn test_from_bytes_latin1() {
        let options = LoadOptions::new().with_encoding(TextEncoding::Latin1);
        let cache = IniCache::from_bytes(b"[Strings]\nName=Caf\xe9\n", &options).unwrap();

        assert_eq!(cache.get_section("strings").unwrap().get_key("name").unwrap(), "Café");
    }
}
