//! Watch list of item patterns that trigger notifications

use crate::error::Result;
use regex::Regex;
use stock_common::EntityId;

/// Case-sensitive patterns matched anywhere in `"<product>: <item>"`
#[derive(Debug, Clone, Default)]
pub struct Watchlist {
    patterns: Vec<Regex>,
}

impl Watchlist {
    /// Compile every term; the first invalid one is an error
    pub fn new<S: AsRef<str>>(terms: &[S]) -> Result<Self> {
        let patterns = terms
            .iter()
            .map(|t| Regex::new(t.as_ref()))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(Self { patterns })
    }

    pub fn is_watched(&self, entity_id: &EntityId) -> bool {
        let id = entity_id.to_string();
        self.patterns.iter().any(|re| re.is_match(&id))
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}
