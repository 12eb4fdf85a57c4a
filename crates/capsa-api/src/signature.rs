//! Exported function signatures and the digest that versions them.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::key::ApiKey;

/// Argument marker for functions that receive the module state as a leading
/// `void*` instead of being declared with it.
pub const STATE_ARG: &str = "_ctx_var";

/// Bytes of the blake3 hash kept in a digest.
const DIGEST_LEN: usize = 16;

/// Declaration of one exported function.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ApiSignature {
    /// Function name.
    pub name: String,
    /// Return type as written in the declaration.
    pub ret: String,
    /// Argument declarations as written, in order.
    pub args: Vec<String>,
}

impl ApiSignature {
    /// Create a signature. Whitespace around each part is trimmed.
    pub fn new<I, S>(name: impl Into<String>, ret: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into().trim().to_string(),
            ret: ret.into().trim().to_string(),
            args: args
                .into_iter()
                .map(|a| a.into().trim().to_string())
                .collect(),
        }
    }

    /// Whether the function takes the module state.
    #[must_use]
    pub fn takes_state(&self) -> bool {
        self.args.iter().any(|a| a == STATE_ARG)
    }

    /// Arguments a caller passes explicitly (state marker and `void` removed).
    #[must_use]
    pub fn call_args(&self) -> Vec<&str> {
        self.args
            .iter()
            .map(String::as_str)
            .filter(|a| *a != STATE_ARG && *a != "void" && !a.is_empty())
            .collect()
    }

    /// Feed a stable encoding of this signature into `hasher`.
    fn hash_into(&self, hasher: &mut blake3::Hasher) {
        hasher.update(self.name.as_bytes());
        hasher.update(&[0x1f]);
        hasher.update(self.ret.as_bytes());
        for arg in &self.args {
            hasher.update(&[0x1e]);
            hasher.update(arg.as_bytes());
        }
        hasher.update(&[0x1d]);
    }
}

impl fmt::Display for ApiSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}({})", self.ret, self.name, self.args.join(", "))
    }
}

/// Content digest of an ordered signature list.
///
/// Any change to a name, return type, argument or the order of functions
/// changes the digest, and with it the capsule name the table is published
/// under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ApiDigest([u8; DIGEST_LEN]);

impl ApiDigest {
    /// Digest a signature list.
    #[must_use]
    pub fn of(signatures: &[ApiSignature]) -> Self {
        let mut hasher = blake3::Hasher::new();
        for signature in signatures {
            signature.hash_into(&mut hasher);
        }
        let mut bytes = [0_u8; DIGEST_LEN];
        bytes.copy_from_slice(&hasher.finalize().as_bytes()[..DIGEST_LEN]);
        Self(bytes)
    }

    /// Lowercase hex encoding.
    #[must_use]
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for ApiDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Name a table is published under: `<key>_<digest>`.
#[must_use]
pub fn hash_key(key: &ApiKey, signatures: &[ApiSignature]) -> String {
    format!("{key}_{}", ApiDigest::of(signatures))
}
