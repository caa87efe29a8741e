//! Variable tables for test metadata and configuration
//!
//! Test cases carry metadata variables (`descr`, `isolated`, ...) and receive
//! configuration variables from the runner. Both are string-to-string tables
//! whose values are always owned by the table.

use crate::error::{MapError, VarError};
use crate::map::{Iter, StrMap};

/// String-to-string table enumerated in key order
#[derive(Debug, Default)]
pub struct Vars {
    map: StrMap<'static, String>,
}

impl Vars {
    pub fn new() -> Self {
        Self {
            map: StrMap::new(),
        }
    }

    /// Build a table from `NAME=VALUE` assignments; later names win
    pub fn from_assignments<S, I>(assignments: I) -> Result<Self, VarError>
    where
        S: AsRef<str>,
        I: IntoIterator<Item = S>,
    {
        let mut vars = Self::new();
        for assignment in assignments {
            let (name, value) = parse_assignment(assignment.as_ref())?;
            vars.set(&name, value)?;
        }
        Ok(vars)
    }

    pub fn set(&mut self, name: &str, value: impl Into<String>) -> Result<(), MapError> {
        self.map.insert_managed(name, value.into())
    }

    pub fn has(&self, name: &str) -> bool {
        self.map.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.map.get(name).map(String::as_str)
    }

    /// Value of `name`, or `default` when unset
    pub fn get_or<'s>(&'s self, name: &str, default: &'s str) -> &'s str {
        self.get(name).unwrap_or(default)
    }

    /// Copy every variable of `other` into this table, replacing clashes
    pub fn merge(&mut self, other: &Vars) -> Result<(), MapError> {
        for (name, value) in other.iter() {
            self.map.insert_managed(name, value.clone())?;
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn iter(&self) -> Iter<'_, 'static, String> {
        self.map.iter()
    }

    pub fn as_map(&self) -> &StrMap<'static, String> {
        &self.map
    }
}

/// Split `NAME=VALUE` on the first `=`.
///
/// The value may be empty or contain further `=` characters; the name may not
/// be empty.
pub fn parse_assignment(assignment: &str) -> Result<(String, String), VarError> {
    let (name, value) = assignment
        .split_once('=')
        .ok_or_else(|| VarError::MissingSeparator(assignment.to_string()))?;
    if name.is_empty() {
        return Err(VarError::EmptyName(assignment.to_string()));
    }
    Ok((name.to_string(), value.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unset_variable() {
        let vars = Vars::new();
        assert!(!vars.has("test"));
        assert_eq!(vars.get("test"), None);
        assert_eq!(vars.get_or("isolated", "yes"), "yes");
    }

    #[test]
    fn test_empty_value_is_set() {
        let mut vars = Vars::new();
        vars.set("test", "").unwrap();
        assert!(vars.has("test"));
        assert_eq!(vars.get("test"), Some(""));
        assert_eq!(vars.get_or("test", "fallback"), "");
    }

    #[test]
    fn test_multi_word_value() {
        let vars = Vars::from_assignments(["test=foo bar"]).unwrap();
        assert_eq!(vars.get("test"), Some("foo bar"));
    }

    #[test]
    fn test_set_replaces_value() {
        let mut vars = Vars::new();
        vars.set("descr", "first").unwrap();
        vars.set("descr", "second").unwrap();
        assert_eq!(vars.len(), 1);
        assert_eq!(vars.get("descr"), Some("second"));
    }

    #[test]
    fn test_parse_assignment_splits_on_first_equals() {
        assert_eq!(
            parse_assignment("url=a=b").unwrap(),
            ("url".to_string(), "a=b".to_string())
        );
        assert_eq!(
            parse_assignment("empty=").unwrap(),
            ("empty".to_string(), String::new())
        );
    }

    #[test]
    fn test_parse_assignment_rejects_malformed() {
        assert_eq!(
            parse_assignment("novalue"),
            Err(VarError::MissingSeparator("novalue".to_string()))
        );
        assert_eq!(
            parse_assignment("=value"),
            Err(VarError::EmptyName("=value".to_string()))
        );
    }

    #[test]
    fn test_from_assignments_later_wins() {
        let vars = Vars::from_assignments(["1st=a", "2nd=b", "1st=c"]).unwrap();
        assert_eq!(vars.len(), 2);
        assert_eq!(vars.get("1st"), Some("c"));
    }

    #[test]
    fn test_merge_overrides() {
        let mut base = Vars::from_assignments(["a=1", "b=2"]).unwrap();
        let overrides = Vars::from_assignments(["b=20", "c=30"]).unwrap();
        base.merge(&overrides).unwrap();

        let pairs: Vec<(&str, &str)> = base.iter().map(|(k, v)| (k, v.as_str())).collect();
        assert_eq!(pairs, vec![("a", "1"), ("b", "20"), ("c", "30")]);
    }
}
