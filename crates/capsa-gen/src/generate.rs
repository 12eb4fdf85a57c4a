//! Drives parsing and rendering for every module in a manifest.

use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::emit::{self, Rendered};
use crate::error::{GenError, GenResult};
use crate::manifest::{Manifest, ResolvedModule};
use crate::parser::ApiDeclarations;

/// What happened to one module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModuleOutcome {
    /// No `CAPSULE_API` declarations were found; nothing was written.
    Skipped {
        /// Module name.
        module: String,
    },
    /// Header and export table were rendered (and written unless dry-run).
    Generated {
        /// Module name.
        module: String,
        /// Header path.
        output: PathBuf,
        /// Export table path.
        export: PathBuf,
        /// Hash keys of the rendered APIs.
        hash_keys: Vec<String>,
    },
}

/// Generates headers and export tables for the modules in a manifest.
#[derive(Debug, Clone)]
pub struct Generator {
    root: PathBuf,
    dry_run: bool,
}

impl Generator {
    /// Create a generator resolving module paths against `root`.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            dry_run: false,
        }
    }

    /// Render without writing any files.
    #[must_use]
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Root directory module paths are resolved against.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Run every module in `manifest`, in path order.
    ///
    /// # Errors
    ///
    /// Stops at the first module that fails to resolve, parse or write.
    pub fn run(&self, manifest: &Manifest) -> GenResult<Vec<ModuleOutcome>> {
        manifest
            .modules
            .iter()
            .map(|(path, spec)| {
                let module = spec.resolve(&self.root, path, &manifest.include)?;
                self.generate(&module)
            })
            .collect()
    }

    /// Render a single resolved module.
    ///
    /// # Errors
    ///
    /// Returns an error if a source cannot be read or parsed, or an
    /// output cannot be written.
    pub fn generate(&self, module: &ResolvedModule) -> GenResult<ModuleOutcome> {
        let mut decls = ApiDeclarations::default();
        for source in &module.sources {
            let text = std::fs::read_to_string(source).map_err(GenError::io(source))?;
            decls.scan(&text)?;
            debug!(module = %module.name, source = %source.display(), "Scanned source");
        }

        if decls.is_empty() {
            warn!(module = %module.name, "No CAPSULE_API declarations, skipping");
            return Ok(ModuleOutcome::Skipped {
                module: module.name.clone(),
            });
        }

        let extend = module
            .extend
            .iter()
            .map(|path| std::fs::read_to_string(path).map_err(GenError::io(path)))
            .collect::<GenResult<Vec<_>>>()?;

        let Rendered {
            apis,
            header,
            export,
        } = emit::render(&module.name, &module.include, &decls, &extend);

        if self.dry_run {
            info!(
                module = %module.name,
                output = %module.output.display(),
                export = %module.export.display(),
                "Dry run, not writing"
            );
        } else {
            write_file(&module.output, &header)?;
            write_file(&module.export, &export)?;
            info!(
                module = %module.name,
                output = %module.output.display(),
                export = %module.export.display(),
                apis = apis.len(),
                "Generated capsule header"
            );
        }

        Ok(ModuleOutcome::Generated {
            module: module.name.clone(),
            output: module.output.clone(),
            export: module.export.clone(),
            hash_keys: apis.into_iter().map(|api| api.hash_key).collect(),
        })
    }
}

fn write_file(path: &Path, contents: &str) -> GenResult<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(GenError::io(parent))?;
    }
    std::fs::write(path, contents).map_err(GenError::io(path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::ModuleSpec;

    const PROMISE_C: &str = "\
#include \"capsule/promise.h\"

CAPSULE_API(PROMISE_API, Promise *)
Promise_New(_ctx_var)
{
    return NULL;
}

CAPSULE_API(PROMISE_API, int)
Promise_Resolve(Promise *self, PyObject *value)
{
    return 0;
}
";

    fn project() -> (tempfile::TempDir, Manifest) {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("src/promise")).unwrap();
        std::fs::create_dir_all(dir.path().join("src/plain")).unwrap();
        std::fs::write(dir.path().join("src/promise/promise.c"), PROMISE_C).unwrap();
        std::fs::write(dir.path().join("src/plain/plain.c"), "int x;\n").unwrap();

        let mut manifest = Manifest {
            include: vec!["capsule.h".to_string()],
            ..Manifest::default()
        };
        manifest
            .modules
            .insert("src/promise".to_string(), ModuleSpec::default());
        manifest
            .modules
            .insert("src/plain".to_string(), ModuleSpec::default());
        (dir, manifest)
    }

    #[test]
    fn test_generates_files() {
        let (dir, manifest) = project();
        let outcomes = Generator::new(dir.path()).run(&manifest).unwrap();

        assert_eq!(
            outcomes[0],
            ModuleOutcome::Skipped {
                module: "plain".to_string()
            }
        );
        let ModuleOutcome::Generated { hash_keys, .. } = &outcomes[1] else {
            panic!("promise module not generated: {:?}", outcomes[1]);
        };
        assert_eq!(hash_keys.len(), 1);

        let header =
            std::fs::read_to_string(dir.path().join("src/promise/capsule/promise.h")).unwrap();
        assert!(header.contains("#include \"capsule.h\""));
        assert!(header.contains(&format!("#define PROMISE_API {}", hash_keys[0])));

        let export =
            std::fs::read_to_string(dir.path().join("src/promise/promise_export.h")).unwrap();
        assert!(export.contains("[1] = Promise_Resolve,"));

        assert!(!dir.path().join("src/plain/capsule").exists());
    }

    #[test]
    fn test_dry_run_writes_nothing() {
        let (dir, manifest) = project();
        let outcomes = Generator::new(dir.path())
            .dry_run(true)
            .run(&manifest)
            .unwrap();
        assert!(matches!(outcomes[1], ModuleOutcome::Generated { .. }));
        assert!(!dir.path().join("src/promise/capsule/promise.h").exists());
        assert!(!dir.path().join("src/promise/promise_export.h").exists());
    }

    #[test]
    fn test_missing_source() {
        let (dir, mut manifest) = project();
        manifest.modules.insert(
            "src/promise".to_string(),
            ModuleSpec {
                sources: Some(vec!["missing.c".to_string()]),
                ..ModuleSpec::default()
            },
        );
        let err = Generator::new(dir.path()).run(&manifest).unwrap_err();
        assert!(matches!(err, GenError::Io { .. }));
    }

    #[test]
    fn test_extend_appended() {
        let (dir, mut manifest) = project();
        std::fs::write(dir.path().join("src/promise/extra.h"), "#define EXTRA 1").unwrap();
        manifest.modules.insert(
            "src/promise".to_string(),
            ModuleSpec {
                extend: vec!["extra.h".to_string()],
                ..ModuleSpec::default()
            },
        );
        Generator::new(dir.path()).run(&manifest).unwrap();
        let header =
            std::fs::read_to_string(dir.path().join("src/promise/capsule/promise.h")).unwrap();
        assert!(header.ends_with("#define EXTRA 1\n#endif\n"));
    }
}
