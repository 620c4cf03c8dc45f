//! # inicache
//!
//! In-memory cache for INI configuration files, used by setup tooling to
//! read and edit `.ini`, `.inf` and `.sif` files without re-parsing them on
//! every access.
//!
//! ## Architecture
//! - **Scanner**: single-pass nom scanner, drops malformed lines instead of failing
//! - **Cache**: ordered sections and keys with case-insensitive lookup (AHash)
//! - **Cursor**: explicit first/next/close walk over one section
//! - **Serializer**: canonical `\r\n` output, sized exactly before rendering
//! - **Storage**: pluggable collaborator (file system or memory) for load/save
//!
//! ```
//! use inicache::{IniCache, Insertion, LoadOptions, TextEncoding};
//!
//! let options = LoadOptions::new().with_string_mode(true);
//! let mut cache = IniCache::parse("[Version]\nSignature=\"$ReactOS$\"\n", &options).unwrap();
//!
//! let section = cache.get_section_mut("version").unwrap();
//! let anchor = section.find_key("Signature");
//! section.insert_key(anchor, Insertion::Before, "Class", "Setup").unwrap();
//!
//! let text = cache.to_bytes(TextEncoding::Latin1).unwrap();
//! assert_eq!(text, b"[Version]\r\nClass=Setup\r\nSignature=$ReactOS$\r\n");
//! ```

#![warn(missing_docs)]

mod cache;
mod encoding;
mod error;
mod iter;
mod list;
mod options;
mod scanner;
mod serializer;
mod shared;
mod storage;

pub use cache::{IniCache, Insertion, Key, KeyId, Keys, Section, SectionId};
pub use encoding::TextEncoding;
pub use error::{Error, Result};
pub use iter::KeyCursor;
pub use options::LoadOptions;
pub use scanner::{scan, ScanSummary};
pub use serializer::{render, serialized_len};
pub use shared::SharedCache;
pub use storage::{FsHandle, FsStorage, MemHandle, MemStorage, Storage};
