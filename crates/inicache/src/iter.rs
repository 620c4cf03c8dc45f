//! Explicit cursor over the keys of one section
//!
//! A cursor borrows its section, so the section cannot be modified while
//! the cursor is alive. Dropping the cursor releases it; `close` does the
//! same thing explicitly.

use crate::cache::{Key, KeyId, Section};

/// Position within a section's key sequence
pub struct KeyCursor<'a> {
    section: &'a Section,
    current: usize,
}

impl Section {
    /// Open a cursor on the first key.
    ///
    /// # Returns
    /// * `Option<KeyCursor>` - `None` when the section has no keys
    pub fn iterate_first(&self) -> Option<KeyCursor<'_>> {
        let current = self.first_key()?;
        Some(KeyCursor {
            section: self,
            current,
        })
    }
}

impl<'a> KeyCursor<'a> {
    /// Key under the cursor
    pub fn key(&self) -> &'a Key {
        self.section.key_at(self.current)
    }

    /// Handle of the key under the cursor
    pub fn id(&self) -> KeyId {
        self.section.key_id(self.current)
    }

    /// Name of the key under the cursor
    pub fn name(&self) -> &'a str {
        self.key().name()
    }

    /// Value of the key under the cursor
    pub fn data(&self) -> &'a str {
        self.key().data()
    }

    /// Move to the next key.
    ///
    /// Returns `false` when there are no more entries; the cursor then stays
    /// on the last key.
    pub fn advance(&mut self) -> bool {
        match self.section.next_key(self.current) {
            Some(next) => {
                self.current = next;
                true
            }
            None => false,
        }
    }

    /// Move to the next key and return its name and value
    pub fn next_entry(&mut self) -> Option<(&'a str, &'a str)> {
        if self.advance() {
            Some((self.name(), self.data()))
        } else {
            None
        }
    }

    /// Release the cursor
    pub fn close(self) {}
}
