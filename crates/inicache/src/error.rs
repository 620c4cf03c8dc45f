//! Error types for inicache

use std::collections::TryReserveError;
use std::fmt;
use std::io;

/// Result type alias for inicache operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for cache, parse and storage operations
#[derive(Debug)]
pub enum Error {
    /// I/O error reported by the storage collaborator
    Io(io::Error),

    /// A buffer could not be allocated
    OutOfMemory {
        /// Number of bytes (or elements) that were requested
        requested: usize,
    },

    /// Empty name or data, or a handle that does not belong here
    InvalidArgument(&'static str),

    /// Key not found
    NotFound,

    /// Text contains a character the storage encoding cannot represent
    Unencodable {
        /// First character that failed to encode
        character: char,
    },

    /// Malformed input rejected in strict mode
    Parse {
        /// 1-based line of the offending construct
        line: usize,
        /// Byte offset into the decoded text
        offset: usize,
        /// What went wrong
        message: String,
    },
}

impl Error {
    pub(crate) fn out_of_memory(requested: usize) -> impl FnOnce(TryReserveError) -> Error {
        move |_| Error::OutOfMemory { requested }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Io(e) => write!(f, "I/O error: {}", e),
            Error::OutOfMemory { requested } => {
                write!(f, "Out of memory: failed to allocate {} bytes", requested)
            }
            Error::InvalidArgument(what) => write!(f, "Invalid argument: {}", what),
            Error::NotFound => write!(f, "Key not found"),
            Error::Unencodable { character } => write!(
                f,
                "Unencodable character {:?} (U+{:04X})",
                character,
                u32::from(*character)
            ),
            Error::Parse {
                line,
                offset,
                message,
            } => write!(f, "Parse error at line {} (offset {}): {}", line, offset, message),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Error::Io(err)
    }
}
