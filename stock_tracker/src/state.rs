//! Small key-value state files kept between polling cycles
//!
//! One entry per line as `key :: value`. A line without the separator is a
//! key with an empty value. The file is rewritten in full on every save.

use crate::error::Result;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

const SEPARATOR: &str = " :: ";

/// Notified watch-list items, keyed by entity id
pub const NOTIFIED_ITEMS_FILE: &str = "notified_items.txt";
/// Last time each entity was seen available, keyed by entity id
pub const LAST_IN_STOCK_FILE: &str = "last_in_stock.txt";

pub type StateMap = BTreeMap<String, String>;

pub trait StateStore {
    /// Current contents; an absent store is empty
    fn load(&self) -> Result<StateMap>;

    /// Replace the contents
    fn save(&mut self, entries: &StateMap) -> Result<()>;
}

/// State kept in a text file
#[derive(Debug, Clone)]
pub struct FileStateStore {
    path: PathBuf,
}

impl FileStateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `<dir>/<file_name>`
    pub fn in_dir(dir: &Path, file_name: &str) -> Self {
        Self::new(dir.join(file_name))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn parse_entries(content: &str) -> StateMap {
    content
        .lines()
        .map(str::trim_end)
        .filter(|line| !line.is_empty())
        .map(|line| match line.split_once(SEPARATOR) {
            Some((key, value)) => (key.to_string(), value.to_string()),
            None => (line.to_string(), String::new()),
        })
        .collect()
}

fn render_entries(entries: &StateMap) -> String {
    let mut content = String::new();
    for (key, value) in entries {
        content.push_str(key);
        content.push_str(SEPARATOR);
        content.push_str(value);
        content.push('\n');
    }
    content
}

impl StateStore for FileStateStore {
    fn load(&self) -> Result<StateMap> {
        match std::fs::read_to_string(&self.path) {
            Ok(content) => Ok(parse_entries(&content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::debug!("{} does not exist yet", self.path.display());
                Ok(StateMap::new())
            }
            Err(e) => Err(e.into()),
        }
    }

    fn save(&mut self, entries: &StateMap) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(&self.path, render_entries(entries))?;
        log::debug!("Saved {} entries to {}", entries.len(), self.path.display());
        Ok(())
    }
}

/// In-memory state for tests
#[derive(Debug, Default, Clone)]
pub struct MemoryStateStore {
    pub entries: StateMap,
}

impl StateStore for MemoryStateStore {
    fn load(&self) -> Result<StateMap> {
        Ok(self.entries.clone())
    }

    fn save(&mut self, entries: &StateMap) -> Result<()> {
        self.entries = entries.clone();
        Ok(())
    }
}
