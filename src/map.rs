//! Ordered String Map
//!
//! String-keyed container backing test metadata, configuration variables and
//! environment mappings.
//!
//! ## Ownership
//!
//! Every value is tagged at insertion time:
//!
//! - `Value::Managed(v)`: the map owns `v` and drops it when the entry is
//!   overwritten or the map is dropped
//! - `Value::Unmanaged(&v)`: the caller owns `v`; the map only borrows it and
//!   never releases it
//!
//! ## Ordering
//!
//! Entries live in a key-sorted `Vec` (byte-wise order) so that enumeration is
//! identical for the same set of keys no matter how they were inserted.
//! Lookup is a binary search.
//!
//! ## Key Stability
//!
//! Keys are copied into map-owned storage on insert. Changing the caller's
//! key buffer afterwards has no effect on the map.

use crate::error::MapError;
use std::fmt;
use std::mem;
use tracing::{debug, trace};

/// A value stored in the map together with its ownership
#[derive(Debug)]
pub enum Value<'a, V> {
    /// Owned by the map
    Managed(V),
    /// Owned by the caller, borrowed for the map's lifetime
    Unmanaged(&'a V),
}

impl<'a, V> Value<'a, V> {
    pub fn get(&self) -> &V {
        match self {
            Value::Managed(value) => value,
            Value::Unmanaged(value) => *value,
        }
    }

    pub fn is_managed(&self) -> bool {
        matches!(self, Value::Managed(_))
    }
}

struct Entry<'a, V> {
    /// Map-owned copy of the caller's key, never mutated after insert
    key: Box<str>,
    value: Value<'a, V>,
}

/// Associative container with unique string keys enumerated in key order
pub struct StrMap<'a, V> {
    entries: Vec<Entry<'a, V>>,
}

impl<'a, V> StrMap<'a, V> {
    /// Create an empty map
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Build a map of managed values from `(key, value)` pairs.
    ///
    /// Later duplicates replace earlier ones.
    pub fn from_pairs<K, I>(pairs: I) -> Result<Self, MapError>
    where
        K: AsRef<str>,
        I: IntoIterator<Item = (K, V)>,
    {
        let mut map = Self::new();
        for (key, value) in pairs {
            map.insert_managed(key.as_ref(), value)?;
        }
        Ok(map)
    }

    /// Number of distinct keys
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn search(&self, key: &str) -> Result<usize, usize> {
        self.entries
            .binary_search_by(|entry| entry.key.as_bytes().cmp(key.as_bytes()))
    }

    /// Insert `value` under `key`, replacing any existing value.
    ///
    /// A replaced managed value is dropped before the new one is stored; a
    /// replaced unmanaged value is left alone. Fails only when storage for a
    /// new entry cannot be reserved, in which case the map is unchanged.
    pub fn insert(&mut self, key: &str, value: Value<'a, V>) -> Result<(), MapError> {
        match self.search(key) {
            Ok(pos) => {
                let old = mem::replace(&mut self.entries[pos].value, value);
                release(key, old);
            }
            Err(pos) => {
                let stored = copy_key(key)?;
                self.entries
                    .try_reserve(1)
                    .map_err(|_| MapError::OutOfMemory {
                        bytes: mem::size_of::<Entry<'a, V>>(),
                    })?;
                self.entries.insert(pos, Entry { key: stored, value });
            }
        }
        Ok(())
    }

    /// Insert a value the map takes ownership of
    pub fn insert_managed(&mut self, key: &str, value: V) -> Result<(), MapError> {
        self.insert(key, Value::Managed(value))
    }

    /// Insert a reference to a value the caller keeps ownership of
    pub fn insert_unmanaged(&mut self, key: &str, value: &'a V) -> Result<(), MapError> {
        self.insert(key, Value::Unmanaged(value))
    }

    /// Cursor at the entry whose key equals `key` byte for byte, or `end()`
    pub fn find<'m>(&'m self, key: &str) -> Cursor<'m, 'a, V> {
        let pos = match self.search(key) {
            Ok(pos) => pos,
            Err(_) => self.entries.len(),
        };
        Cursor { map: self, pos }
    }

    /// Cursor at the first entry in key order
    pub fn begin<'m>(&'m self) -> Cursor<'m, 'a, V> {
        Cursor { map: self, pos: 0 }
    }

    /// The sentinel cursor past the last entry
    pub fn end<'m>(&'m self) -> Cursor<'m, 'a, V> {
        Cursor {
            map: self,
            pos: self.entries.len(),
        }
    }

    pub fn get(&self, key: &str) -> Option<&V> {
        self.search(key)
            .ok()
            .map(|pos| self.entries[pos].value.get())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.search(key).is_ok()
    }

    /// Iterate `(key, value)` pairs in key order
    pub fn iter<'m>(&'m self) -> Iter<'m, 'a, V> {
        Iter {
            cursor: self.begin(),
        }
    }

    pub fn keys<'m>(&'m self) -> Keys<'m, 'a, V> {
        Keys { inner: self.iter() }
    }

    /// Flatten into owned `(key, value)` pairs in key order
    pub fn to_pairs(&self) -> Vec<(String, V)>
    where
        V: Clone,
    {
        self.iter()
            .map(|(key, value)| (key.to_string(), value.clone()))
            .collect()
    }

    /// Remove every entry, dropping managed values only
    pub fn clear(&mut self) {
        let mut released = 0usize;
        for entry in self.entries.drain(..) {
            match entry.value {
                Value::Managed(value) => {
                    drop(value);
                    released += 1;
                }
                Value::Unmanaged(_) => {}
            }
        }
        if released > 0 {
            trace!(released, "released managed map values");
        }
    }
}

impl<'a, V> Default for StrMap<'a, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a, V> Drop for StrMap<'a, V> {
    fn drop(&mut self) {
        self.clear();
    }
}

impl<'a, V: fmt::Debug> fmt::Debug for StrMap<'a, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<'m, 'a, V> IntoIterator for &'m StrMap<'a, V> {
    type Item = (&'m str, &'m V);
    type IntoIter = Iter<'m, 'a, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

fn copy_key(key: &str) -> Result<Box<str>, MapError> {
    let mut stored = String::new();
    stored
        .try_reserve_exact(key.len())
        .map_err(|_| MapError::OutOfMemory { bytes: key.len() })?;
    stored.push_str(key);
    Ok(stored.into_boxed_str())
}

fn release<V>(key: &str, old: Value<'_, V>) {
    match old {
        Value::Managed(value) => {
            debug!(key, "releasing replaced managed value");
            drop(value);
        }
        Value::Unmanaged(_) => {}
    }
}

// =============================================================================
// Cursor
// =============================================================================

/// Immutable position in a [`StrMap`]: either a live entry or the end sentinel.
///
/// Cursors compare equal when they point at the same position of the same map.
pub struct Cursor<'m, 'a, V> {
    map: &'m StrMap<'a, V>,
    /// `pos == map.len()` is the end sentinel
    pos: usize,
}

impl<'m, 'a, V> Cursor<'m, 'a, V> {
    pub fn is_end(&self) -> bool {
        self.pos >= self.map.entries.len()
    }

    fn entry(&self) -> &'m Entry<'a, V> {
        assert!(!self.is_end(), "dereferenced the end cursor of a StrMap");
        &self.map.entries[self.pos]
    }

    /// Key of the entry. Panics on the end cursor.
    pub fn key(&self) -> &'m str {
        &self.entry().key
    }

    /// Value of the entry. Panics on the end cursor.
    pub fn value(&self) -> &'m V {
        self.entry().value.get()
    }

    /// Whether the map owns the entry's value. Panics on the end cursor.
    pub fn is_managed(&self) -> bool {
        self.entry().value.is_managed()
    }

    /// Cursor at the next entry in key order, or the end cursor.
    ///
    /// Panics when called on the end cursor.
    pub fn advance(self) -> Self {
        assert!(!self.is_end(), "advanced past the end of a StrMap");
        Cursor {
            map: self.map,
            pos: self.pos + 1,
        }
    }
}

impl<'m, 'a, V> Clone for Cursor<'m, 'a, V> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<'m, 'a, V> Copy for Cursor<'m, 'a, V> {}

impl<'m, 'a, V> PartialEq for Cursor<'m, 'a, V> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.map, other.map) && self.pos == other.pos
    }
}

impl<'m, 'a, V> Eq for Cursor<'m, 'a, V> {}

impl<'m, 'a, V> fmt::Debug for Cursor<'m, 'a, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_end() {
            f.write_str("Cursor(end)")
        } else {
            f.debug_struct("Cursor")
                .field("pos", &self.pos)
                .field("key", &self.key())
                .finish()
        }
    }
}

/// Key-ordered iterator over a [`StrMap`]
pub struct Iter<'m, 'a, V> {
    cursor: Cursor<'m, 'a, V>,
}

impl<'m, 'a, V> Iterator for Iter<'m, 'a, V> {
    type Item = (&'m str, &'m V);

    fn next(&mut self) -> Option<Self::Item> {
        if self.cursor.is_end() {
            return None;
        }
        let item = (self.cursor.key(), self.cursor.value());
        self.cursor = self.cursor.advance();
        Some(item)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.cursor.map.len() - self.cursor.pos;
        (remaining, Some(remaining))
    }
}

impl<'m, 'a, V> ExactSizeIterator for Iter<'m, 'a, V> {}

pub struct Keys<'m, 'a, V> {
    inner: Iter<'m, 'a, V>,
}

impl<'m, 'a, V> Iterator for Keys<'m, 'a, V> {
    type Item = &'m str;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(key, _)| key)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    /// Counts how many times it was dropped
    struct Tracked {
        drops: Rc<Cell<usize>>,
    }

    impl Drop for Tracked {
        fn drop(&mut self) {
            self.drops.set(self.drops.get() + 1);
        }
    }

    #[test]
    fn test_new_map_is_empty() {
        let map: StrMap<'_, u32> = StrMap::new();
        assert_eq!(map.len(), 0);
        assert!(map.is_empty());
        assert_eq!(map.begin(), map.end());
    }

    #[test]
    fn test_entries_sorted_bytewise() {
        let mut map = StrMap::new();
        for key in ["b", "a", "B", "ab", "A"] {
            map.insert_managed(key, key.len()).unwrap();
        }
        let keys: Vec<&str> = map.keys().collect();
        // Uppercase sorts before lowercase, no locale collation
        assert_eq!(keys, vec!["A", "B", "a", "ab", "b"]);
    }

    #[test]
    fn test_lookup_is_case_sensitive() {
        let mut map = StrMap::new();
        map.insert_managed("Descr", 1).unwrap();
        assert!(map.find("descr").is_end());
        assert_eq!(map.get("Descr"), Some(&1));
    }

    #[test]
    fn test_empty_key_is_valid() {
        let mut map = StrMap::new();
        map.insert_managed("", "empty").unwrap();
        assert_eq!(map.begin().key(), "");
        assert_eq!(map.get(""), Some(&"empty"));
    }

    #[test]
    fn test_replace_managed_with_unmanaged() {
        let drops = Rc::new(Cell::new(0));
        let borrowed = Tracked {
            drops: Rc::new(Cell::new(0)),
        };
        let mut map = StrMap::new();
        map.insert_managed(
            "k",
            Tracked {
                drops: drops.clone(),
            },
        )
        .unwrap();
        assert!(map.find("k").is_managed());

        map.insert_unmanaged("k", &borrowed).unwrap();
        assert_eq!(drops.get(), 1);
        assert!(!map.find("k").is_managed());
        assert!(std::ptr::eq(map.find("k").value(), &borrowed));

        drop(map);
        assert_eq!(borrowed.drops.get(), 0);
    }

    #[test]
    fn test_replace_unmanaged_does_not_release() {
        let original = Tracked {
            drops: Rc::new(Cell::new(0)),
        };
        let replacement = Tracked {
            drops: Rc::new(Cell::new(0)),
        };
        let mut map = StrMap::new();
        map.insert_unmanaged("k", &original).unwrap();
        map.insert_unmanaged("k", &replacement).unwrap();
        assert_eq!(map.len(), 1);
        assert_eq!(original.drops.get(), 0);
        drop(map);
        assert_eq!(replacement.drops.get(), 0);
    }

    #[test]
    fn test_clear_releases_managed_only() {
        let drops = Rc::new(Cell::new(0));
        let borrowed = Tracked {
            drops: Rc::new(Cell::new(0)),
        };
        let mut map = StrMap::new();
        map.insert_managed(
            "owned",
            Tracked {
                drops: drops.clone(),
            },
        )
        .unwrap();
        map.insert_unmanaged("borrowed", &borrowed).unwrap();

        map.clear();
        assert!(map.is_empty());
        assert_eq!(drops.get(), 1);
        assert_eq!(borrowed.drops.get(), 0);

        // Dropping the cleared map must not release anything again
        drop(map);
        assert_eq!(drops.get(), 1);
    }

    #[test]
    fn test_cursor_equality_requires_same_map() {
        let a: StrMap<'_, u8> = StrMap::new();
        let b: StrMap<'_, u8> = StrMap::new();
        assert_eq!(a.end(), a.end());
        assert_ne!(a.end(), b.end());
    }

    #[test]
    fn test_cursor_debug() {
        let mut map = StrMap::new();
        map.insert_managed("K1", 1).unwrap();
        assert_eq!(format!("{:?}", map.end()), "Cursor(end)");
        assert_eq!(
            format!("{:?}", map.begin()),
            "Cursor { pos: 0, key: \"K1\" }"
        );
    }

    #[test]
    #[should_panic(expected = "dereferenced the end cursor")]
    fn test_key_of_end_panics() {
        let map: StrMap<'_, u8> = StrMap::new();
        let _ = map.end().key();
    }

    #[test]
    #[should_panic(expected = "dereferenced the end cursor")]
    fn test_value_of_end_panics() {
        let mut map = StrMap::new();
        map.insert_managed("K1", 1u8).unwrap();
        let _ = map.find("missing").value();
    }

    #[test]
    #[should_panic(expected = "advanced past the end")]
    fn test_advance_past_end_panics() {
        let mut map = StrMap::new();
        map.insert_managed("K1", 1u8).unwrap();
        let _ = map.begin().advance().advance();
    }

    #[test]
    fn test_from_pairs_last_duplicate_wins() {
        let map = StrMap::from_pairs([("b", 2), ("a", 1), ("b", 3)]).unwrap();
        assert_eq!(map.len(), 2);
        assert_eq!(map.get("b"), Some(&3));
    }

    #[test]
    fn test_to_pairs_in_key_order() {
        let map = StrMap::from_pairs([("z", "last"), ("m", "mid"), ("a", "first")]).unwrap();
        assert_eq!(
            map.to_pairs(),
            vec![
                ("a".to_string(), "first"),
                ("m".to_string(), "mid"),
                ("z".to_string(), "last"),
            ]
        );
    }

    #[test]
    fn test_iter_size_hint() {
        let map = StrMap::from_pairs([("a", 1), ("b", 2), ("c", 3)]).unwrap();
        let mut iter = map.iter();
        assert_eq!(iter.len(), 3);
        iter.next();
        assert_eq!(iter.len(), 2);
    }

    #[test]
    fn test_debug_formats_as_map() {
        let map = StrMap::from_pairs([("b", 2), ("a", 1)]).unwrap();
        assert_eq!(format!("{:?}", map), "{\"a\": 1, \"b\": 2}");
    }
}
