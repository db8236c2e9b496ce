//! TargetName - Cheap-to-clone trackable name
//!
//! Uses Arc<str> internally; registry entries, observations and log fields
//! all share one allocation per name.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::borrow::Borrow;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::Deref;
use std::sync::Arc;

use crate::ContractError;

/// Name of a trackable target, unique within its category.
///
/// Engine result records carry a 256-byte NUL-terminated name field, so a
/// valid name is non-empty, at most [`TargetName::MAX_LEN`] bytes and has no
/// interior NUL.
///
/// # Examples
/// ```
/// use contracts::TargetName;
///
/// let name = TargetName::try_new("Logo").unwrap();
/// assert_eq!(name, "Logo");
/// assert!(TargetName::try_new("").is_err());
/// ```
#[derive(Clone, Default)]
pub struct TargetName(Arc<str>);

impl TargetName {
    /// Longest name the engine can report back.
    pub const MAX_LEN: usize = 255;

    /// Validate and wrap a name.
    pub fn try_new(s: &str) -> Result<Self, ContractError> {
        if s.is_empty() {
            return Err(ContractError::invalid_target_name(s, "name is empty"));
        }
        if s.len() > Self::MAX_LEN {
            return Err(ContractError::invalid_target_name(
                s,
                format!("name is {} bytes, limit is {}", s.len(), Self::MAX_LEN),
            ));
        }
        if s.contains('\0') {
            return Err(ContractError::invalid_target_name(s, "name contains NUL"));
        }
        Ok(Self(Arc::from(s)))
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Deref for TargetName {
    type Target = str;

    #[inline]
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AsRef<str> for TargetName {
    #[inline]
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for TargetName {
    #[inline]
    fn borrow(&self) -> &str {
        &self.0
    }
}

// Unchecked conversions are for engine-reported names, which are already
// bounded by the engine's record layout.
impl From<&str> for TargetName {
    #[inline]
    fn from(s: &str) -> Self {
        Self(Arc::from(s))
    }
}

impl From<String> for TargetName {
    #[inline]
    fn from(s: String) -> Self {
        Self(Arc::from(s))
    }
}

impl fmt::Display for TargetName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for TargetName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TargetName({:?})", self.0)
    }
}

impl PartialEq for TargetName {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0) || self.0 == other.0
    }
}

impl Eq for TargetName {}

impl PartialEq<str> for TargetName {
    #[inline]
    fn eq(&self, other: &str) -> bool {
        self.0.as_ref() == other
    }
}

impl PartialEq<&str> for TargetName {
    #[inline]
    fn eq(&self, other: &&str) -> bool {
        self.0.as_ref() == *other
    }
}

impl Hash for TargetName {
    #[inline]
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.hash(state)
    }
}

impl Serialize for TargetName {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for TargetName {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::try_new(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_clone_shares_allocation() {
        let a = TargetName::try_new("Logo").unwrap();
        let b = a.clone();
        assert_eq!(a.as_str().as_ptr(), b.as_str().as_ptr());
    }

    #[test]
    fn test_rejects_empty_and_oversized() {
        assert!(TargetName::try_new("").is_err());
        assert!(TargetName::try_new(&"x".repeat(256)).is_err());
        assert!(TargetName::try_new(&"x".repeat(255)).is_ok());
        assert!(TargetName::try_new("bad\0name").is_err());
    }

    #[test]
    fn test_set_lookup_by_str() {
        let mut set: HashSet<TargetName> = HashSet::new();
        set.insert(TargetName::try_new("Engine").unwrap());
        assert!(set.contains("Engine"));
        assert!(!set.contains("Logo"));
    }

    #[test]
    fn test_serde_validates() {
        let name = TargetName::try_new("Logo").unwrap();
        let json = serde_json::to_string(&name).unwrap();
        assert_eq!(json, "\"Logo\"");
        let parsed: TargetName = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, name);

        let empty: Result<TargetName, _> = serde_json::from_str("\"\"");
        assert!(empty.is_err());
    }
}
