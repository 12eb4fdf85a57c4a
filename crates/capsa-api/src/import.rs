//! Lazily-resolved API imports.

use once_cell::sync::OnceCell;
use tracing::debug;

use crate::error::{ApiError, ApiResult};
use crate::exports::CapsuleSource;
use crate::key::ApiKey;
use crate::signature::{ApiSignature, hash_key};
use crate::table::{ApiSlot, ApiTable, ExportedApi};

/// An import of one API table, resolved on first load and cached.
///
/// The import is bound to a hash key, so it only ever resolves to a table
/// whose signatures match the ones it was compiled against.
#[derive(Debug)]
pub struct ApiImport {
    hash_key: String,
    exported: OnceCell<ExportedApi>,
}

impl ApiImport {
    /// Import the table published under `hash_key`.
    #[must_use]
    pub fn new(hash_key: impl Into<String>) -> Self {
        Self {
            hash_key: hash_key.into(),
            exported: OnceCell::new(),
        }
    }

    /// Import the table for `key` with exactly these signatures.
    #[must_use]
    pub fn for_signatures(key: &ApiKey, signatures: &[ApiSignature]) -> Self {
        Self::new(hash_key(key, signatures))
    }

    /// The hash key this import resolves.
    #[must_use]
    pub fn hash_key(&self) -> &str {
        &self.hash_key
    }

    /// Whether [`ApiImport::load`] has succeeded.
    #[must_use]
    pub fn is_loaded(&self) -> bool {
        self.exported.get().is_some()
    }

    /// Resolve the import from `source`. Later calls are no-ops.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::NotExported`] if `source` has no such table, or
    /// [`ApiError::Capsule`] if the table's capsule has another name or has
    /// been destroyed.
    pub fn load(&self, source: &dyn CapsuleSource) -> ApiResult<()> {
        self.exported.get_or_try_init(|| {
            let exported = source
                .find(&self.hash_key)
                .ok_or_else(|| ApiError::NotExported {
                    hash_key: self.hash_key.clone(),
                })?;
            exported.with_table(&self.hash_key, |_| ())?;
            debug!(hash_key = %self.hash_key, "Loaded API import");
            Ok::<_, ApiError>(exported)
        })?;
        Ok(())
    }

    fn with_table<R>(&self, f: impl FnOnce(&ApiTable) -> ApiResult<R>) -> ApiResult<R> {
        let exported = self.exported.get().ok_or_else(|| ApiError::NotLoaded {
            hash_key: self.hash_key.clone(),
        })?;
        exported.with_table(&self.hash_key, f)?
    }

    /// The function at `index`.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::NotLoaded`] before a successful load,
    /// [`ApiError::SlotOutOfRange`] for a bad index, or
    /// [`ApiError::Capsule`] if the table was withdrawn.
    pub fn get(&self, index: usize) -> ApiResult<ApiSlot> {
        self.with_table(|table| table.slot(index))
    }

    /// The function called `name`.
    ///
    /// # Errors
    ///
    /// As [`ApiImport::get`], plus [`ApiError::UnknownFunction`].
    pub fn get_by_name(&self, name: &str) -> ApiResult<ApiSlot> {
        self.with_table(|table| table.slot(table.index_of(name)?))
    }

    /// Number of functions in the loaded table.
    ///
    /// # Errors
    ///
    /// As [`ApiImport::get`].
    pub fn len(&self) -> ApiResult<usize> {
        self.with_table(|table| Ok(table.len()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    use crate::exports::ApiExports;
    use capsa_core::CapsuleError;

    extern "C" fn double(x: i32) -> i32 {
        x.wrapping_mul(2)
    }

    fn signatures() -> Vec<ApiSignature> {
        vec![ApiSignature::new("double", "int", ["int x"])]
    }

    fn exports() -> (ApiExports, String) {
        let exports = ApiExports::new("demo");
        let table = ApiTable::builder(ApiKey::new("demo_api").unwrap())
            .function(signatures().remove(0), double as *const ())
            .build()
            .unwrap();
        let hash_key = exports.export(table).unwrap();
        (exports, hash_key)
    }

    #[test]
    fn test_load_and_call() {
        let (exports, hash_key) = exports();
        let import = ApiImport::for_signatures(&ApiKey::new("demo_api").unwrap(), &signatures());
        assert_eq!(import.hash_key(), hash_key);
        assert!(!import.is_loaded());
        assert!(matches!(import.get(0), Err(ApiError::NotLoaded { .. })));

        import.load(&exports).unwrap();
        import.load(&exports).unwrap();
        assert!(import.is_loaded());
        assert_eq!(import.len().unwrap(), 1);

        #[allow(unsafe_code)]
        let double: extern "C" fn(i32) -> i32 = unsafe { import.get_by_name("double").unwrap().cast() };
        assert_eq!(double(21), 42);
        assert!(matches!(
            import.get(1),
            Err(ApiError::SlotOutOfRange { index: 1, len: 1 })
        ));
    }

    #[test]
    fn test_stale_signatures_not_found() {
        let (exports, _) = exports();
        let stale = vec![ApiSignature::new("double", "long", ["long x"])];
        let import = ApiImport::for_signatures(&ApiKey::new("demo_api").unwrap(), &stale);

        assert!(matches!(
            import.load(&exports),
            Err(ApiError::NotExported { .. })
        ));
        assert!(!import.is_loaded());
    }

    #[test]
    fn test_table_filed_under_other_key_rejected() {
        let (exports, hash_key) = exports();
        let mut source = HashMap::new();
        source.insert("demo_api_0000".to_string(), exports.find(&hash_key).unwrap());

        let import = ApiImport::new("demo_api_0000");
        assert!(matches!(
            import.load(&source),
            Err(ApiError::Capsule(CapsuleError::TypeMismatch { .. }))
        ));
        assert!(!import.is_loaded());
    }

    #[test]
    fn test_foreign_capsule_pointer_never_read_as_table() {
        let (exports, hash_key) = exports();
        let capsule = exports.capsule(&hash_key).unwrap();
        let mut junk = [7_usize; 16];
        capsule.set_pointer(junk.as_mut_ptr()).unwrap();

        let import = ApiImport::new(hash_key);
        import.load(&exports).unwrap();
        assert_eq!(import.len().unwrap(), 1);
        assert_eq!(import.get(0).unwrap().as_ptr(), double as *const ());
    }

    #[test]
    fn test_withdrawn_table_invalidates_import() {
        let (exports, hash_key) = exports();
        let import = ApiImport::new(hash_key.clone());
        import.load(&exports).unwrap();

        exports.withdraw(&hash_key).unwrap();
        assert_eq!(
            import.get(0),
            Err(ApiError::Capsule(CapsuleError::Invalidated))
        );
    }
}
