//! Scans C sources for `CAPSULE_API(key, ret) name(args)` declarations.

use std::sync::LazyLock;

use capsa_api::{ApiKey, ApiSignature};
use regex::Regex;

use crate::error::{GenError, GenResult};

/// `CAPSULE_API(<key>, <ret>)` followed by the declaration up to `{` or `;`.
static DECLARATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"CAPSULE_API\(\s*([^,()]*?)\s*,\s*([^)]*?)\s*\)([^{;]*)").expect("invalid regex")
});

/// `name(args)`, where args may span lines.
static FUNCTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)^([A-Za-z_][A-Za-z0-9_]*)\s*\((.*)\)$").expect("invalid regex"));

/// Declarations found in one or more sources, grouped by key in first-seen order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApiDeclarations {
    groups: Vec<(ApiKey, Vec<ApiSignature>)>,
}

impl ApiDeclarations {
    /// Parse one source file's text.
    ///
    /// # Errors
    ///
    /// Returns [`GenError::InvalidKey`] or [`GenError::InvalidDeclaration`].
    pub fn parse(source: &str) -> GenResult<Self> {
        let mut declarations = Self::default();
        declarations.scan(source)?;
        Ok(declarations)
    }

    /// Parse another source and append its declarations.
    ///
    /// # Errors
    ///
    /// As [`ApiDeclarations::parse`].
    pub fn scan(&mut self, source: &str) -> GenResult<()> {
        for caps in DECLARATION.captures_iter(source) {
            let raw_key = &caps[1];
            let ret = &caps[2];
            let declaration = caps[3].trim();

            let key = ApiKey::new(raw_key).map_err(|_| GenError::InvalidKey {
                key: raw_key.to_string(),
                declaration: declaration.to_string(),
            })?;
            let function =
                FUNCTION
                    .captures(declaration)
                    .ok_or_else(|| GenError::InvalidDeclaration {
                        key: key.to_string(),
                        declaration: declaration.to_string(),
                    })?;
            let args: Vec<&str> = match function[2].trim() {
                "" => Vec::new(),
                args => args.split(',').collect(),
            };
            self.push(key, ApiSignature::new(&function[1], ret, args));
        }
        Ok(())
    }

    fn push(&mut self, key: ApiKey, signature: ApiSignature) {
        match self.groups.iter_mut().find(|(k, _)| *k == key) {
            Some((_, signatures)) => signatures.push(signature),
            None => self.groups.push((key, vec![signature])),
        }
    }

    /// Keys and their signatures, in first-seen order.
    pub fn iter(&self) -> impl Iterator<Item = (&ApiKey, &[ApiSignature])> {
        self.groups.iter().map(|(k, s)| (k, s.as_slice()))
    }

    /// Signatures declared for `key`.
    #[must_use]
    pub fn get(&self, key: &ApiKey) -> Option<&[ApiSignature]> {
        self.groups
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, s)| s.as_slice())
    }

    /// Whether no declarations were found.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}
