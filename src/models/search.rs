use std::collections::HashMap;

/// One hit on a search results page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchResultRef {
    pub auction_id: String,
    pub name: String,
    pub uri: String,
}

impl SearchResultRef {
    pub fn new(
        auction_id: impl Into<String>,
        name: impl Into<String>,
        uri: impl Into<String>,
    ) -> Self {
        Self {
            auction_id: auction_id.into(),
            name: name.into(),
            uri: uri.into(),
        }
    }
}

/// Search hits keyed by auction id, in first-seen order
///
/// Inserting an id that is already present keeps the earlier entry.
#[derive(Debug, Clone, Default)]
pub struct SearchResults {
    entries: Vec<SearchResultRef>,
    index: HashMap<String, usize>,
}

impl SearchResults {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a hit unless its auction id is already present
    ///
    /// Returns `true` if the hit was added.
    pub fn insert(&mut self, result: SearchResultRef) -> bool {
        if self.index.contains_key(&result.auction_id) {
            return false;
        }
        self.index
            .insert(result.auction_id.clone(), self.entries.len());
        self.entries.push(result);
        true
    }

    /// Merges another result set into this one, first occurrence winning
    ///
    /// Returns the number of new ids added.
    pub fn merge(&mut self, other: SearchResults) -> usize {
        let mut added = 0;
        for result in other.entries {
            if self.insert(result) {
                added += 1;
            }
        }
        added
    }

    /// Drops the most recently inserted hits until at most `len` remain
    pub fn truncate(&mut self, len: usize) {
        for dropped in self.entries.drain(len.min(self.entries.len())..) {
            self.index.remove(&dropped.auction_id);
        }
    }

    pub fn get(&self, auction_id: &str) -> Option<&SearchResultRef> {
        self.index.get(auction_id).map(|&i| &self.entries[i])
    }

    pub fn contains(&self, auction_id: &str) -> bool {
        self.index.contains_key(auction_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SearchResultRef> {
        self.entries.iter()
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|r| r.auction_id.as_str())
    }
}

impl IntoIterator for SearchResults {
    type Item = SearchResultRef;
    type IntoIter = std::vec::IntoIter<SearchResultRef>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl FromIterator<SearchResultRef> for SearchResults {
    fn from_iter<I: IntoIterator<Item = SearchResultRef>>(iter: I) -> Self {
        let mut results = Self::new();
        for result in iter {
            results.insert(result);
        }
        results
    }
}
