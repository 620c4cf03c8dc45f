//! Command implementations on top of inicache

use std::path::Path;

use anyhow::{anyhow, Context, Result};
use inicache::{FsStorage, IniCache, Insertion, KeyId, LoadOptions};
use tracing::info;

/// Where `set` places a key that does not exist yet
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Placement {
    First,
    Last,
    Before(String),
    After(String),
}

/// Load/save settings shared by every command
pub struct Session {
    options: LoadOptions,
}

impl Session {
    pub fn new(options: LoadOptions) -> Self {
        Self { options }
    }

    fn load(&self, file: &Path) -> Result<IniCache> {
        IniCache::load(&FsStorage, file, &self.options)
            .with_context(|| format!("failed to load {}", file.display()))
    }

    fn save(&self, cache: &IniCache, file: &Path) -> Result<()> {
        cache
            .save(&FsStorage, file, self.options.encoding)
            .with_context(|| format!("failed to save {}", file.display()))
    }

    pub fn get(&self, file: &Path, section: &str, key: &str) -> Result<String> {
        let cache = self.load(file)?;
        let found = cache
            .get_section(section)
            .ok_or_else(|| anyhow!("section [{}] not found in {}", section, file.display()))?;
        let value = found
            .get_key(key)
            .with_context(|| format!("key {} not found in [{}]", key, found.name()))?;
        Ok(value.to_string())
    }

    pub fn set(
        &self,
        file: &Path,
        section: &str,
        key: &str,
        value: &str,
        placement: Placement,
    ) -> Result<()> {
        let mut cache = if file.exists() {
            self.load(file)?
        } else {
            IniCache::new()
        };

        let id = cache.add_section(section)?;
        let target = cache
            .section_mut(id)
            .ok_or_else(|| anyhow!("section [{}] vanished", section))?;

        let anchor_of = |name: &str| -> Result<KeyId> {
            target
                .find_key(name)
                .ok_or_else(|| anyhow!("anchor key {} not found in [{}]", name, section))
        };
        let (anchor, insertion) = match &placement {
            Placement::First => (None, Insertion::First),
            Placement::Last => (None, Insertion::Last),
            Placement::Before(name) => (Some(anchor_of(name)?), Insertion::Before),
            Placement::After(name) => (Some(anchor_of(name)?), Insertion::After),
        };

        target.insert_key(anchor, insertion, key, value)?;
        self.save(&cache, file)?;
        info!(file = %file.display(), section, key, "updated key");
        Ok(())
    }

    pub fn list(&self, file: &Path, section: Option<&str>) -> Result<Vec<String>> {
        let cache = self.load(file)?;

        let Some(section) = section else {
            return Ok(cache.sections().map(|s| s.name().to_string()).collect());
        };

        let found = cache
            .get_section(section)
            .ok_or_else(|| anyhow!("section [{}] not found in {}", section, file.display()))?;
        let mut lines = Vec::with_capacity(found.len());
        if let Some(mut cursor) = found.iterate_first() {
            lines.push(format!("{}={}", cursor.name(), cursor.data()));
            while let Some((name, data)) = cursor.next_entry() {
                lines.push(format!("{}={}", name, data));
            }
            cursor.close();
        }
        Ok(lines)
    }

    pub fn fmt(&self, file: &Path, output: &Path) -> Result<()> {
        let cache = self.load(file)?;
        self.save(&cache, output)
    }
}
