//! Allocation failure tests for the ordered string map
//!
//! Runs under a global allocator that can be told to refuse every allocation
//! made by the current thread. Kept in its own test target so the switch
//! cannot affect other tests.

use std::alloc::{GlobalAlloc, Layout, System};
use std::cell::Cell;
use std::rc::Rc;
use tach_map::{MapError, StrMap};

thread_local! {
    static FAIL_ALLOCATIONS: Cell<bool> = const { Cell::new(false) };
}

/// System allocator that returns null while `FAIL_ALLOCATIONS` is set
struct SwitchableAlloc;

unsafe impl GlobalAlloc for SwitchableAlloc {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        if FAIL_ALLOCATIONS.with(Cell::get) {
            return std::ptr::null_mut();
        }
        System.alloc(layout)
    }

    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        System.dealloc(ptr, layout)
    }

    unsafe fn realloc(&self, ptr: *mut u8, layout: Layout, new_size: usize) -> *mut u8 {
        if FAIL_ALLOCATIONS.with(Cell::get) {
            return std::ptr::null_mut();
        }
        System.realloc(ptr, layout, new_size)
    }
}

#[global_allocator]
static ALLOCATOR: SwitchableAlloc = SwitchableAlloc;

/// Run `f` with every allocation on this thread failing
fn without_memory<T>(f: impl FnOnce() -> T) -> T {
    FAIL_ALLOCATIONS.with(|fail| fail.set(true));
    let result = f();
    FAIL_ALLOCATIONS.with(|fail| fail.set(false));
    result
}

struct Tracked {
    drops: Rc<Cell<usize>>,
}

impl Drop for Tracked {
    fn drop(&mut self) {
        self.drops.set(self.drops.get() + 1);
    }
}

fn tracked(drops: &Rc<Cell<usize>>) -> Tracked {
    Tracked {
        drops: drops.clone(),
    }
}

fn keys_of<V>(map: &StrMap<'_, V>) -> Vec<String> {
    map.keys().map(str::to_string).collect()
}

#[test]
fn test_failed_insert_leaves_map_unchanged() {
    let a_drops = Rc::new(Cell::new(0));
    let b_drops = Rc::new(Cell::new(0));
    let rejected_drops = Rc::new(Cell::new(0));
    let replacement_drops = Rc::new(Cell::new(0));

    let mut map = StrMap::new();
    map.insert_managed("a", tracked(&a_drops)).unwrap();
    map.insert_managed("b", tracked(&b_drops)).unwrap();
    let keys_before = keys_of(&map);

    let rejected = tracked(&rejected_drops);
    let replacement = tracked(&replacement_drops);

    let (new_key, existing_key) = without_memory(|| {
        let new_key = map.insert_managed("zz", rejected);
        // Replacing a present key allocates nothing
        let existing_key = map.insert_managed("a", replacement);
        (new_key, existing_key)
    });

    assert!(matches!(new_key, Err(MapError::OutOfMemory { .. })));
    assert_eq!(existing_key, Ok(()));

    assert_eq!(map.len(), 2);
    assert_eq!(keys_of(&map), keys_before);
    assert!(!map.contains_key("zz"));

    // Only the replaced value of "a" was released; "b" untouched
    assert_eq!(a_drops.get(), 1);
    assert_eq!(b_drops.get(), 0);
    assert_eq!(replacement_drops.get(), 0);
    // The rejected value went down with the failed call
    assert_eq!(rejected_drops.get(), 1);

    // The map keeps working once memory is available again
    let late_drops = Rc::new(Cell::new(0));
    map.insert_managed("c", tracked(&late_drops)).unwrap();
    assert_eq!(keys_of(&map), vec!["a", "b", "c"]);
}

#[test]
fn test_failed_insert_into_empty_map() {
    let mut map: StrMap<'_, u32> = StrMap::new();
    let result = without_memory(|| map.insert_managed("K1", 1));

    assert!(matches!(result, Err(MapError::OutOfMemory { bytes: 2 })));
    assert!(map.is_empty());
    assert_eq!(map.begin(), map.end());
}
