//! Per-module collections of exported API capsules.

use std::collections::HashMap;
use std::sync::Arc;

use capsa_core::Capsule;
use parking_lot::RwLock;
use tracing::{debug, info};

use crate::error::{ApiError, ApiResult};
use crate::table::{ApiTable, ExportedApi};

/// Where importers look exported tables up.
///
/// This is the seam the host implements: a module attribute table, a plugin
/// manifest, or simply an [`ApiExports`]. There is no process-wide registry.
/// Sources can only hand out tables that went through [`ApiTable::export`].
pub trait CapsuleSource: Send + Sync {
    /// Find the table published under `hash_key`.
    fn find(&self, hash_key: &str) -> Option<ExportedApi>;
}

/// Capsules exported by one module, keyed by hash key.
#[derive(Debug, Default)]
pub struct ApiExports {
    module: String,
    capsules: RwLock<HashMap<String, ExportedApi>>,
}

impl ApiExports {
    /// Create an empty export set for `module`.
    #[must_use]
    pub fn new(module: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            capsules: RwLock::new(HashMap::new()),
        }
    }

    /// Name of the exporting module.
    #[must_use]
    pub fn module(&self) -> &str {
        &self.module
    }

    /// Publish `table`, returning its hash key.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::AlreadyExported`] if the hash key is taken. The
    /// table is dropped in that case.
    pub fn export(&self, table: ApiTable) -> ApiResult<String> {
        let hash_key = table.hash_key().to_string();
        let mut capsules = self.capsules.write();
        if capsules.contains_key(&hash_key) {
            return Err(ApiError::AlreadyExported { hash_key });
        }
        capsules.insert(hash_key.clone(), table.export()?);
        info!(module = %self.module, hash_key = %hash_key, "Exported API");
        Ok(hash_key)
    }

    /// Withdraw and destroy an exported table.
    ///
    /// Importers that already loaded it get [`capsa_core::CapsuleError::Invalidated`]
    /// on their next access.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::NotExported`] if nothing is published under the key.
    pub fn withdraw(&self, hash_key: &str) -> ApiResult<()> {
        let exported = self
            .capsules
            .write()
            .remove(hash_key)
            .ok_or_else(|| ApiError::NotExported {
                hash_key: hash_key.to_string(),
            })?;
        exported.capsule().destroy();
        debug!(module = %self.module, hash_key = %hash_key, "Withdrew API");
        Ok(())
    }

    /// The capsule published under `hash_key`, for handing to a host.
    #[must_use]
    pub fn capsule(&self, hash_key: &str) -> Option<Arc<Capsule>> {
        self.capsules
            .read()
            .get(hash_key)
            .map(|exported| Arc::clone(exported.capsule()))
    }

    /// Hash keys currently exported, sorted.
    #[must_use]
    pub fn hash_keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.capsules.read().keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Number of exported tables.
    #[must_use]
    pub fn len(&self) -> usize {
        self.capsules.read().len()
    }

    /// Whether nothing is exported.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.capsules.read().is_empty()
    }
}

impl CapsuleSource for ApiExports {
    fn find(&self, hash_key: &str) -> Option<ExportedApi> {
        self.capsules.read().get(hash_key).cloned()
    }
}

impl CapsuleSource for HashMap<String, ExportedApi> {
    fn find(&self, hash_key: &str) -> Option<ExportedApi> {
        self.get(hash_key).cloned()
    }
}
