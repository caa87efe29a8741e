//! Integration tests for the ordered string map
//!
//! Covers lookup, replacement, ownership release and enumeration order.

use std::cell::Cell;
use std::rc::Rc;
use tach_map::{StrMap, Value};

/// Value that counts its drops
struct Tracked {
    label: &'static str,
    drops: Rc<Cell<usize>>,
}

impl Tracked {
    fn new(label: &'static str) -> Self {
        Self {
            label,
            drops: Rc::new(Cell::new(0)),
        }
    }
}

impl Drop for Tracked {
    fn drop(&mut self) {
        self.drops.set(self.drops.get() + 1);
    }
}

fn collect_keys<V>(map: &StrMap<'_, V>) -> Vec<String> {
    let mut keys = Vec::new();
    let mut cursor = map.begin();
    while cursor != map.end() {
        keys.push(cursor.key().to_string());
        cursor = cursor.advance();
    }
    keys
}

#[test]
fn test_map_init() {
    let map: StrMap<'_, String> = StrMap::new();
    assert_eq!(map.len(), 0);
    assert_eq!(map.begin(), map.end());
}

#[test]
fn test_find() {
    let val1 = "V1".to_string();
    let val2 = "V2".to_string();
    let mut map = StrMap::new();
    map.insert_unmanaged("K1", &val1).unwrap();
    map.insert_unmanaged("K2", &val2).unwrap();

    assert_eq!(map.find("K0"), map.end());

    let iter = map.find("K1");
    assert_ne!(iter, map.end());
    assert_eq!(iter.value(), "V1");

    let iter = map.find("K2");
    assert_ne!(iter, map.end());
    assert_eq!(iter.value(), "V2");
}

#[test]
fn test_insert_and_replace() {
    let buf = "1st test string".to_string();
    let buf2 = "2nd test string".to_string();
    let mut map = StrMap::new();

    map.insert_unmanaged("K1", &buf).unwrap();
    assert_eq!(map.len(), 1);
    map.insert_unmanaged("K2", &buf).unwrap();
    assert_eq!(map.len(), 2);
    map.insert_unmanaged("K3", &buf).unwrap();
    assert_eq!(map.len(), 3);

    let iter = map.find("K3");
    assert_ne!(iter, map.end());
    assert!(std::ptr::eq(iter.value(), &buf));

    map.insert_unmanaged("K3", &buf2).unwrap();
    assert_eq!(map.len(), 3);
    let iter = map.find("K3");
    assert_ne!(iter, map.end());
    assert!(std::ptr::eq(iter.value(), &buf2));
}

#[test]
fn test_stable_keys() {
    let mut key = String::from("K1");
    let mut map = StrMap::new();
    map.insert_managed(&key, "test-value".to_string()).unwrap();

    assert_ne!(map.find("K1"), map.end());
    assert_eq!(map.find("K2"), map.end());

    key.replace_range(.., "K2");
    assert_eq!(key, "K2");

    assert_ne!(map.find("K1"), map.end());
    assert_eq!(map.find("K2"), map.end());
    assert_eq!(collect_keys(&map), vec!["K1"]);
}

#[test]
fn test_managed_overwrite_releases_once() {
    let first = Tracked::new("first");
    let first_drops = first.drops.clone();
    let second = Tracked::new("second");
    let second_drops = second.drops.clone();

    let mut map = StrMap::new();
    map.insert_managed("K", first).unwrap();
    map.insert_managed("K", second).unwrap();

    assert_eq!(first_drops.get(), 1);
    assert_eq!(second_drops.get(), 0);
    assert_eq!(map.find("K").value().label, "second");
    assert_eq!(map.len(), 1);

    drop(map);
    assert_eq!(first_drops.get(), 1);
    assert_eq!(second_drops.get(), 1);
}

#[test]
fn test_destroy_frees_only_managed() {
    let unmanaged = Tracked::new("caller");
    let managed = Tracked::new("map");
    let managed_drops = managed.drops.clone();

    let mut map = StrMap::new();
    map.insert("managed", Value::Managed(managed)).unwrap();
    map.insert("unmanaged", Value::Unmanaged(&unmanaged)).unwrap();
    assert!(map.find("managed").is_managed());
    assert!(!map.find("unmanaged").is_managed());

    drop(map);

    assert_eq!(managed_drops.get(), 1);
    assert_eq!(unmanaged.drops.get(), 0);
    // Still owned and usable by the caller
    assert_eq!(unmanaged.label, "caller");
}

#[test]
fn test_deterministic_enumeration() {
    let keys = ["descr", "isolated", "ident", "timeout", "require.progs", "X-custom"];

    let mut forward = StrMap::new();
    for key in keys {
        forward.insert_managed(key, key.len()).unwrap();
    }
    let mut backward = StrMap::new();
    for key in keys.iter().rev() {
        backward.insert_managed(key, key.len()).unwrap();
    }

    let forward_keys = collect_keys(&forward);
    assert_eq!(forward_keys, collect_keys(&backward));

    let mut sorted: Vec<String> = keys.iter().map(|k| k.to_string()).collect();
    sorted.sort();
    assert_eq!(forward_keys, sorted);
}

#[test]
fn test_missing_keys_find_end() {
    let mut map = StrMap::new();
    for key in ["a", "c", "e"] {
        map.insert_managed(key, ()).unwrap();
    }
    for missing in ["", "b", "d", "f", "A", "aa"] {
        assert_eq!(map.find(missing), map.end(), "key {:?}", missing);
    }
}

#[test]
fn test_scenario_replace_third_key() {
    let v1 = 1u32;
    let v2 = 2u32;
    let v1_alt = 10u32;
    let v2_alt = 20u32;

    let mut map = StrMap::new();
    map.insert_unmanaged("K1", &v1).unwrap();
    map.insert_unmanaged("K2", &v2).unwrap();
    map.insert_unmanaged("K3", &v1_alt).unwrap();
    assert_eq!(map.len(), 3);

    assert_eq!(*map.find("K3").value(), 10);
    map.insert_unmanaged("K3", &v2_alt).unwrap();
    assert_eq!(map.len(), 3);
    assert_eq!(*map.find("K3").value(), 20);
}

#[test]
fn test_advance_reaches_end() {
    let map = StrMap::from_pairs([("K2", 2), ("K1", 1)]).unwrap();
    let first = map.begin();
    assert_eq!(first.key(), "K1");
    let second = first.advance();
    assert_eq!(second.key(), "K2");
    assert_eq!(*second.value(), 2);
    assert_eq!(second.advance(), map.end());
}

#[test]
fn test_iter_matches_cursor_walk() {
    let map = StrMap::from_pairs([("b", 2), ("c", 3), ("a", 1)]).unwrap();
    let pairs: Vec<(&str, i32)> = map.iter().map(|(k, v)| (k, *v)).collect();
    assert_eq!(pairs, vec![("a", 1), ("b", 2), ("c", 3)]);

    let mut via_ref = Vec::new();
    for (key, _) in &map {
        via_ref.push(key);
    }
    assert_eq!(via_ref, vec!["a", "b", "c"]);
}
