//! Load configuration

use crate::encoding::TextEncoding;

/// Options controlling how INI text is read
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LoadOptions {
    /// Recognise `"quoted"` values and strip the quotes
    pub string_mode: bool,
    /// Fail on an unterminated quoted value instead of dropping the key
    pub strict_quotes: bool,
    /// Byte encoding of the source text
    pub encoding: TextEncoding,
}

impl LoadOptions {
    /// Default options: unquoted values, lenient, Latin-1
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable or disable string mode
    pub fn with_string_mode(mut self, string_mode: bool) -> Self {
        self.string_mode = string_mode;
        self
    }

    /// Enable or disable strict handling of unterminated quotes
    pub fn with_strict_quotes(mut self, strict_quotes: bool) -> Self {
        self.strict_quotes = strict_quotes;
        self
    }

    /// Set the source encoding
    pub fn with_encoding(mut self, encoding: TextEncoding) -> Self {
        self.encoding = encoding;
        self
    }
}
