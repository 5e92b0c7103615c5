//! Insertion-ordered multi-valued metadata with a cursor protocol.
//!
//! Container metadata and codec parameters are key/value string pairs where
//! the same key may repeat (e.g. multiple `comment` tags). Iteration follows
//! a cursor handshake: seed a cursor with [`Metadata::first`] (all entries)
//! or [`Metadata::find`] (only entries for one key), then advance it with
//! [`Metadata::next`], which consumes the cursor. Exhaustion returns `None`.

/// Insertion-ordered multimap of string metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Metadata {
    entries: Vec<(String, String)>,
}

/// A cursor positioned on one entry. Opaque beyond its key/value accessors;
/// advance it with [`Metadata::next`].
#[derive(Debug, Clone)]
pub struct Entry<'a> {
    key: &'a str,
    value: &'a str,
    index: usize,
    /// Set for cursors seeded by `find`: only same-key entries are visited.
    seeded: bool,
}

impl<'a> Entry<'a> {
    /// The entry's key.
    pub fn key(&self) -> &'a str {
        self.key
    }

    /// The entry's value.
    pub fn value(&self) -> &'a str {
        self.value
    }
}

impl Metadata {
    /// An empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry. Duplicate keys are kept, in insertion order.
    pub fn push(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.push((key.into(), value.into()));
    }

    /// Number of entries (counting duplicates).
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the map holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// First value stored for `key`, if any.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    fn entry(&self, index: usize, seeded: bool) -> Entry<'_> {
        let (key, value) = &self.entries[index];
        Entry {
            key,
            value,
            index,
            seeded,
        }
    }

    /// Cursor on the first entry, visiting everything in insertion order.
    pub fn first(&self) -> Option<Entry<'_>> {
        (!self.entries.is_empty()).then(|| self.entry(0, false))
    }

    /// Cursor on the first entry for `key`, visiting only that key's entries.
    pub fn find(&self, key: &str) -> Option<Entry<'_>> {
        self.entries
            .iter()
            .position(|(k, _)| k == key)
            .map(|index| self.entry(index, true))
    }

    /// Advance a cursor. Consumes it; `None` means iteration is finished.
    pub fn next(&self, cursor: Entry<'_>) -> Option<Entry<'_>> {
        let remaining = self.entries.iter().enumerate().skip(cursor.index + 1);
        if cursor.seeded {
            let key = cursor.key;
            for (index, (k, _)) in remaining {
                if k == key {
                    return Some(self.entry(index, true));
                }
            }
            return None;
        }
        let next = cursor.index + 1;
        (next < self.entries.len()).then(|| self.entry(next, false))
    }

    /// Iterator over all entries, layered on the cursor protocol.
    pub fn iter(&self) -> Iter<'_> {
        Iter {
            meta: self,
            cursor: None,
            started: false,
        }
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Metadata {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut meta = Metadata::new();
        for (k, v) in iter {
            meta.push(k, v);
        }
        meta
    }
}

/// Iterator adapter over [`Metadata`] entries in insertion order.
pub struct Iter<'a> {
    meta: &'a Metadata,
    cursor: Option<Entry<'a>>,
    started: bool,
}

impl<'a> Iterator for Iter<'a> {
    type Item = (&'a str, &'a str);

    fn next(&mut self) -> Option<Self::Item> {
        self.cursor = if self.started {
            self.meta.next(self.cursor.take()?)
        } else {
            self.started = true;
            self.meta.first()
        };
        self.cursor.as_ref().map(|e| (e.key(), e.value()))
    }
}
