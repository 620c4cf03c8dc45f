//! IniCache: ordered tree of sections and keys
//!
//! The cache owns its sections, each section owns its keys. Both levels keep
//! insertion order and look names up case-insensitively.

use std::sync::atomic::{AtomicU64, Ordering};

use tracing::trace;

use crate::error::{Error, Result};
use crate::list::{OrderedList, Position};

/// Source of per-cache identities, so handles from one cache never resolve
/// in another
static NEXT_CACHE: AtomicU64 = AtomicU64::new(1);

/// Handle to a section inside an [`IniCache`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SectionId {
    cache: u64,
    index: usize,
}

/// Handle to a key inside a [`Section`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeyId {
    section: SectionId,
    index: usize,
}

impl KeyId {
    /// Section this key belongs to
    pub fn section(&self) -> SectionId {
        self.section
    }
}

/// Placement of a newly created key relative to an anchor key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Insertion {
    /// New key becomes the first key, the anchor is ignored
    First,
    /// New key becomes the last key, the anchor is ignored
    #[default]
    Last,
    /// Immediately before the anchor; first when there is no anchor
    Before,
    /// Immediately after the anchor; last when there is no anchor
    After,
}

/// A name/value pair owned by a section
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Key {
    name: String,
    data: String,
}

impl Key {
    /// Key name as it was first inserted
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current value
    pub fn data(&self) -> &str {
        &self.data
    }
}

/// A named, ordered group of keys
pub struct Section {
    id: SectionId,
    name: String,
    keys: OrderedList<Key>,
}

/// Copy `text` into a freshly allocated string, reporting allocation failure
fn owned(text: &str) -> Result<String> {
    let mut out = String::new();
    out.try_reserve_exact(text.len())
        .map_err(Error::out_of_memory(text.len()))?;
    out.push_str(text);
    Ok(out)
}

impl Section {
    /// Handle of this section inside its cache
    pub fn id(&self) -> SectionId {
        self.id
    }

    /// Section name as it was first added
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of keys in the section
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Check if the section has no keys
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Find a key by name, ignoring case
    pub fn find_key(&self, name: &str) -> Option<KeyId> {
        self.keys.find(name).map(|index| KeyId {
            section: self.id,
            index,
        })
    }

    /// Resolve a key handle. Handles from another section, or from a section
    /// of another cache, resolve to `None`.
    pub fn key(&self, id: KeyId) -> Option<&Key> {
        if id.section != self.id {
            return None;
        }
        self.keys.get(id.index)
    }

    /// Value stored under `name`
    ///
    /// # Returns
    /// * `Result<&str>` - Borrowed value, or `Error::NotFound`
    pub fn get_key(&self, name: &str) -> Result<&str> {
        self.keys
            .find(name)
            .and_then(|index| self.keys.get(index))
            .map(Key::data)
            .ok_or(Error::NotFound)
    }

    /// Keys in order
    pub fn keys(&self) -> Keys<'_> {
        Keys {
            inner: self.keys.iter(),
        }
    }

    /// Append a key, or replace the value of an existing one
    pub fn add_key(&mut self, name: &str, data: &str) -> Result<KeyId> {
        self.insert_key(None, Insertion::Last, name, data)
    }

    /// Create or update a key.
    ///
    /// If a key with the same name (ignoring case) exists, its value is
    /// replaced and it keeps its position. Otherwise a new key is placed
    /// according to `insertion` relative to `anchor`.
    ///
    /// # Arguments
    /// * `anchor` - Reference key for `Before`/`After`, must belong to this section
    /// * `insertion` - Placement of a new key
    /// * `name` - Key name, non-empty
    /// * `data` - Key value, non-empty
    ///
    /// # Returns
    /// * `Result<KeyId>` - Handle of the created or updated key
    pub fn insert_key(
        &mut self,
        anchor: Option<KeyId>,
        insertion: Insertion,
        name: &str,
        data: &str,
    ) -> Result<KeyId> {
        if name.is_empty() {
            return Err(Error::InvalidArgument("key name is empty"));
        }
        if data.is_empty() {
            return Err(Error::InvalidArgument("key data is empty"));
        }

        let anchor = match anchor {
            Some(id) if self.key(id).is_none() => {
                return Err(Error::InvalidArgument("anchor key does not belong to this section"));
            }
            Some(id) => Some(id.index),
            None => None,
        };

        if let Some(index) = self.keys.find(name) {
            // The replacement is fully built before the old value is dropped.
            let data = owned(data)?;
            if let Some(key) = self.keys.get_mut(index) {
                trace!(section = %self.name, key = %key.name, "updating key");
                key.data = data;
            }
            return Ok(KeyId {
                section: self.id,
                index,
            });
        }

        let position = match (insertion, anchor) {
            (Insertion::First, _) | (Insertion::Before, None) => Position::Front,
            (Insertion::Last, _) | (Insertion::After, None) => Position::Back,
            (Insertion::Before, Some(index)) => Position::Before(index),
            (Insertion::After, Some(index)) => Position::After(index),
        };

        let key = Key {
            name: owned(name)?,
            data: owned(data)?,
        };
        let index = self.keys.insert(name, key, position)?;
        trace!(section = %self.name, key = name, ?position, "inserted key");

        Ok(KeyId {
            section: self.id,
            index,
        })
    }

    pub(crate) fn first_key(&self) -> Option<usize> {
        self.keys.first()
    }

    pub(crate) fn next_key(&self, index: usize) -> Option<usize> {
        self.keys.next_of(index)
    }

    pub(crate) fn key_at(&self, index: usize) -> &Key {
        self.keys.at(index)
    }

    pub(crate) fn key_id(&self, index: usize) -> KeyId {
        KeyId {
            section: self.id,
            index,
        }
    }
}

impl std::fmt::Debug for Section {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Section")
            .field("name", &self.name)
            .field("keys", &self.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// In-order iterator over the keys of a [`Section`]
pub struct Keys<'a> {
    inner: crate::list::Iter<'a, Key>,
}

impl<'a> Iterator for Keys<'a> {
    type Item = &'a Key;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(_, key)| key)
    }
}

/// In-memory INI document
pub struct IniCache {
    id: u64,
    sections: OrderedList<Section>,
}

impl IniCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self {
            id: NEXT_CACHE.fetch_add(1, Ordering::Relaxed),
            sections: OrderedList::new(),
        }
    }

    fn section_id(&self, index: usize) -> SectionId {
        SectionId {
            cache: self.id,
            index,
        }
    }

    /// Number of sections
    pub fn len(&self) -> usize {
        self.sections.len()
    }

    /// Check if the cache has no sections
    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    /// Return the section named `name`, creating it at the end if needed.
    ///
    /// Names compare case-insensitively; an existing section keeps its
    /// original spelling.
    pub fn add_section(&mut self, name: &str) -> Result<SectionId> {
        if name.is_empty() {
            return Err(Error::InvalidArgument("section name is empty"));
        }

        if let Some(index) = self.sections.find(name) {
            return Ok(self.section_id(index));
        }

        let id = self.section_id(self.sections.len());
        let section = Section {
            id,
            name: owned(name)?,
            keys: OrderedList::new(),
        };
        let index = self.sections.insert(name, section, Position::Back)?;
        debug_assert_eq!(index, id.index);
        trace!(section = name, "added section");

        Ok(id)
    }

    /// Find a section by name, ignoring case
    pub fn find_section(&self, name: &str) -> Option<SectionId> {
        self.sections.find(name).map(|index| self.section_id(index))
    }

    /// Borrow a section by name, ignoring case
    pub fn get_section(&self, name: &str) -> Option<&Section> {
        self.sections
            .find(name)
            .and_then(|index| self.sections.get(index))
    }

    /// Mutably borrow a section by name, ignoring case
    pub fn get_section_mut(&mut self, name: &str) -> Option<&mut Section> {
        let index = self.sections.find(name)?;
        self.sections.get_mut(index)
    }

    /// Resolve a section handle. Handles from another cache resolve to `None`.
    pub fn section(&self, id: SectionId) -> Option<&Section> {
        if id.cache != self.id {
            return None;
        }
        self.sections.get(id.index)
    }

    /// Resolve a section handle for mutation
    pub fn section_mut(&mut self, id: SectionId) -> Option<&mut Section> {
        if id.cache != self.id {
            return None;
        }
        self.sections.get_mut(id.index)
    }

    /// Sections in order
    pub fn sections(&self) -> impl Iterator<Item = &Section> + '_ {
        self.sections.iter().map(|(_, section)| section)
    }
}

impl Default for IniCache {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for IniCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.sections()).finish()
    }
}
