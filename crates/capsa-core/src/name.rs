//! Capsule type tags.

use std::ffi::{CStr, CString};
use std::fmt;
use std::sync::Arc;

use crate::error::{CapsuleError, CapsuleResult};

/// The immutable name a capsule is tagged with.
///
/// The capsule keeps its own copy of the name, so the caller's string does not
/// need to outlive it. Comparison is exact and case-sensitive.
///
/// The copy is NUL-terminated UTF-8, so it can be handed to C code without
/// another allocation.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CapsuleName(Arc<CStr>);

impl CapsuleName {
    /// Create a name tag.
    ///
    /// # Errors
    ///
    /// Returns [`CapsuleError::InvalidArgument`] if the name contains a NUL
    /// byte, since it could not be handed back across the C ABI intact.
    pub fn new(name: impl AsRef<str>) -> CapsuleResult<Self> {
        let name = name.as_ref();
        let owned = CString::new(name).map_err(|_| {
            CapsuleError::InvalidArgument(format!("capsule name {name:?} contains a NUL byte"))
        })?;
        Ok(Self(Arc::from(owned)))
    }

    /// Create a name tag from a C string.
    ///
    /// # Errors
    ///
    /// Returns [`CapsuleError::InvalidArgument`] if the string is not UTF-8.
    pub fn from_c_str(name: &CStr) -> CapsuleResult<Self> {
        name.to_str().map_err(|e| {
            CapsuleError::InvalidArgument(format!("capsule name is not valid UTF-8: {e}"))
        })?;
        Ok(Self(Arc::from(name)))
    }

    /// The name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        // Both constructors reject non-UTF-8 input.
        self.0.to_str().unwrap_or_default()
    }

    /// The name as a NUL-terminated C string.
    #[must_use]
    pub fn as_c_str(&self) -> &CStr {
        &self.0
    }
}

/// Compare a stored tag against the tag presented at access.
///
/// Both absent is a match; one absent and one present is a mismatch.
pub(crate) fn tags_match(stored: Option<&CapsuleName>, expected: Option<&str>) -> bool {
    match (stored, expected) {
        (None, None) => true,
        (Some(stored), Some(expected)) => stored.as_str() == expected,
        _ => false,
    }
}

impl AsRef<str> for CapsuleName {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl PartialEq<str> for CapsuleName {
    fn eq(&self, other: &str) -> bool {
        self.as_str() == other
    }
}

impl PartialEq<&str> for CapsuleName {
    fn eq(&self, other: &&str) -> bool {
        self.as_str() == *other
    }
}

impl fmt::Display for CapsuleName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Debug for CapsuleName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self.as_str(), f)
    }
}

impl TryFrom<&str> for CapsuleName {
    type Error = CapsuleError;

    fn try_from(value: &str) -> CapsuleResult<Self> {
        Self::new(value)
    }
}

impl TryFrom<String> for CapsuleName {
    type Error = CapsuleError;

    fn try_from(value: String) -> CapsuleResult<Self> {
        Self::new(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_copies_input() {
        let source = String::from("buffer");
        let name = CapsuleName::new(&source).unwrap();
        drop(source);
        assert_eq!(name, "buffer");
        assert_eq!(name.to_string(), "buffer");
    }

    #[test]
    fn test_c_string_view() {
        let name = CapsuleName::new("buffer").unwrap();
        assert_eq!(name.as_c_str().to_bytes_with_nul(), b"buffer\0");

        let from_c = CapsuleName::from_c_str(c"buffer").unwrap();
        assert_eq!(from_c, name);

        let invalid = CStr::from_bytes_with_nul(b"\xff\0").unwrap();
        assert!(CapsuleName::from_c_str(invalid).is_err());
    }

    #[test]
    fn test_name_rejects_nul() {
        let err = CapsuleName::new("buf\0fer").unwrap_err();
        assert!(matches!(err, CapsuleError::InvalidArgument(_)));
    }

    #[test]
    fn test_tags_match() {
        let buffer = CapsuleName::new("buffer").unwrap();

        assert!(tags_match(None, None));
        assert!(tags_match(Some(&buffer), Some("buffer")));
        assert!(!tags_match(Some(&buffer), Some("Buffer")));
        assert!(!tags_match(Some(&buffer), Some("buffer ")));
        assert!(!tags_match(Some(&buffer), None));
        assert!(!tags_match(None, Some("buffer")));
    }
}
