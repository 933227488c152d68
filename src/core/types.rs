//! Strongly-typed wrappers for names used across the core
//!
//! Mode names, class names and weapon names all come from configuration as
//! plain strings. Wrapping them keeps a weapon name from being looked up in
//! the mode table by accident.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Registered mode name (unique within the mode table)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModeName(String);

impl ModeName {
    pub fn new(s: impl Into<String>) -> Self {
        ModeName(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for ModeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ModeName {
    fn from(s: &str) -> Self {
        ModeName(s.to_string())
    }
}

impl From<String> for ModeName {
    fn from(s: String) -> Self {
        ModeName(s)
    }
}

/// Registered class name (unique within the class table)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClassName(String);

impl ClassName {
    pub fn new(s: impl Into<String>) -> Self {
        ClassName(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for ClassName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ClassName {
    fn from(s: &str) -> Self {
        ClassName(s.to_string())
    }
}

impl From<String> for ClassName {
    fn from(s: String) -> Self {
        ClassName(s)
    }
}

/// Weapon entry of a loadout (e.g. "weapon_knife")
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WeaponName(String);

impl WeaponName {
    pub fn new(s: impl Into<String>) -> Self {
        WeaponName(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WeaponName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for WeaponName {
    fn from(s: &str) -> Self {
        WeaponName(s.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_names_are_empty() {
        assert!(ModeName::new("   ").is_empty());
        assert!(ClassName::new("").is_empty());
        assert!(!ModeName::from("swarm").is_empty());
    }
}
