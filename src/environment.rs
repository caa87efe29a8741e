//! Environment snapshots for test execution
//!
//! The runner captures the process environment once and layers the
//! `[tool.pytest_env]` overrides on top of it. The effective view borrows the
//! captured values instead of copying them.

use crate::error::MapError;
use crate::map::StrMap;
use crate::vars::Vars;
use std::borrow::Cow;
use std::ffi::OsStr;
use tracing::{debug, warn};

/// Snapshot the current process environment.
///
/// Names or values that are not valid UTF-8 are converted lossily.
pub fn capture_environment() -> Result<Vars, MapError> {
    let mut vars = Vars::new();
    for (name, value) in std::env::vars_os() {
        insert_lossy(&mut vars, &name, &value)?;
    }
    debug!(count = vars.len(), "captured process environment");
    Ok(vars)
}

/// Insert one variable, converting non-UTF-8 text lossily.
///
/// Returns `true` when a lossily converted name replaced an existing entry.
fn insert_lossy(vars: &mut Vars, name: &OsStr, value: &OsStr) -> Result<bool, MapError> {
    let converted = name.to_string_lossy();
    // Borrowed means the name was valid UTF-8 and nothing was replaced
    let collided = matches!(converted, Cow::Owned(_)) && vars.has(&converted);
    if collided {
        warn!(
            name = %converted,
            "non-UTF-8 environment variable collides with an earlier one after conversion; keeping the later value"
        );
    }
    vars.set(&converted, value.to_string_lossy())?;
    Ok(collided)
}

/// Effective environment: `base` borrowed as-is, `overrides` owned on top.
///
/// The returned map never releases anything from `base`; only the override
/// copies belong to it.
pub fn overlay<'a>(base: &'a Vars, overrides: &Vars) -> Result<StrMap<'a, String>, MapError> {
    let mut effective = StrMap::new();
    for (name, value) in base.iter() {
        effective.insert_unmanaged(name, value)?;
    }
    for (name, value) in overrides.iter() {
        effective.insert_managed(name, value.clone())?;
    }
    Ok(effective)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capture_includes_set_variable() {
        std::env::set_var("TACH_MAP_CAPTURE_TEST", "captured");
        let env = capture_environment().unwrap();
        assert_eq!(env.get("TACH_MAP_CAPTURE_TEST"), Some("captured"));
        std::env::remove_var("TACH_MAP_CAPTURE_TEST");
    }

    #[test]
    fn test_overlay_borrows_base_and_owns_overrides() {
        let base = Vars::from_assignments(["HOME=/home/tach", "TZ=UTC"]).unwrap();
        let overrides = Vars::from_assignments(["TZ=Europe/Berlin", "DB_URL=sqlite://"]).unwrap();

        let effective = overlay(&base, &overrides).unwrap();
        assert_eq!(effective.len(), 3);

        let home = effective.find("HOME");
        assert!(!home.is_managed());
        assert!(std::ptr::eq(home.value(), base.as_map().get("HOME").unwrap()));

        let tz = effective.find("TZ");
        assert!(tz.is_managed());
        assert_eq!(tz.value(), "Europe/Berlin");

        drop(effective);
        // Base still intact after the view is gone
        assert_eq!(base.get("TZ"), Some("UTC"));
    }

    #[cfg(unix)]
    #[test]
    fn test_lossy_name_collision_keeps_later_value() {
        use std::os::unix::ffi::OsStrExt;

        let mut vars = Vars::new();
        let first = OsStr::from_bytes(b"TACH_\xff");
        let second = OsStr::from_bytes(b"TACH_\xfe");

        assert!(!insert_lossy(&mut vars, first, OsStr::new("one")).unwrap());
        assert!(insert_lossy(&mut vars, second, OsStr::new("two")).unwrap());
        assert_eq!(vars.len(), 1);
        assert_eq!(vars.get("TACH_\u{FFFD}"), Some("two"));
    }

    #[test]
    fn test_utf8_name_replacement_is_not_a_collision() {
        let mut vars = Vars::new();
        assert!(!insert_lossy(&mut vars, OsStr::new("HOME"), OsStr::new("/a")).unwrap());
        assert!(!insert_lossy(&mut vars, OsStr::new("HOME"), OsStr::new("/b")).unwrap());
        assert_eq!(vars.get("HOME"), Some("/b"));
    }

    #[test]
    fn test_overlay_without_overrides() {
        let base = Vars::from_assignments(["A=1"]).unwrap();
        let effective = overlay(&base, &Vars::new()).unwrap();
        assert_eq!(effective.len(), 1);
        assert!(!effective.begin().is_managed());
    }
}
