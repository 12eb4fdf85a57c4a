//! API keys.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{ApiError, ApiResult};

/// Identifier grouping a set of exported functions, e.g. `promise_api`.
///
/// Keys are normalized to lowercase; the uppercase form names the C macros
/// generated for the key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ApiKey(String);

impl ApiKey {
    /// Validate and normalize a key.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::InvalidKey`] unless the key matches
    /// `[a-zA-Z_][a-zA-Z0-9_]+`.
    pub fn new(key: impl AsRef<str>) -> ApiResult<Self> {
        let key = key.as_ref().trim();
        if !is_valid_key(key) {
            return Err(ApiError::InvalidKey(key.to_string()));
        }
        Ok(Self(key.to_ascii_lowercase()))
    }

    /// The normalized (lowercase) key.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The uppercase macro name for this key.
    #[must_use]
    pub fn macro_name(&self) -> String {
        self.0.to_ascii_uppercase()
    }
}

fn is_valid_key(key: &str) -> bool {
    let mut chars = key.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    if !(first.is_ascii_alphabetic() || first == '_') {
        return false;
    }
    let mut rest = chars.peekable();
    rest.peek().is_some() && rest.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

impl fmt::Display for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for ApiKey {
    type Error = ApiError;

    fn try_from(value: String) -> ApiResult<Self> {
        Self::new(value)
    }
}

impl From<ApiKey> for String {
    fn from(key: ApiKey) -> Self {
        key.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_normalized() {
        let key = ApiKey::new(" Promise_API ").unwrap();
        assert_eq!(key.as_str(), "promise_api");
        assert_eq!(key.macro_name(), "PROMISE_API");
    }

    #[test]
    fn test_key_validation() {
        assert!(ApiKey::new("_x").is_ok());
        assert!(ApiKey::new("loop2").is_ok());
        assert!(ApiKey::new("x").is_err());
        assert!(ApiKey::new("").is_err());
        assert!(ApiKey::new("2loop").is_err());
        assert!(ApiKey::new("promise-api").is_err());
        assert!(ApiKey::new("promise api").is_err());
    }

    #[test]
    fn test_key_serde() {
        let key: ApiKey = serde_json::from_str("\"LOOP_API\"").unwrap();
        assert_eq!(key.as_str(), "loop_api");
        assert!(serde_json::from_str::<ApiKey>("\"bad key\"").is_err());
    }
}
