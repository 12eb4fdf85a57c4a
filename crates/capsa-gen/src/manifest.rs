//! The `capsules.json` / `capsules.toml` manifest.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Deserializer, Serialize};
use tracing::debug;

use crate::error::{GenError, GenResult};

/// Default header path, relative to the module directory.
pub const DEFAULT_OUTPUT: &str = "capsule/{module}.h";
/// Default export table path, relative to the module directory.
pub const DEFAULT_EXPORT: &str = "{module}_export.h";
/// Default source list, relative to the module directory.
pub const DEFAULT_SOURCES: &str = "{module}.c";

/// Top-level manifest.
///
/// ```json
/// {
///   "include": ["capsule.h"],
///   "modules": {
///     "src/promise": { "sources": ["promise.c", "chain.c"] },
///     "src/loop": {}
///   }
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    /// Includes added to every generated header.
    #[serde(default, deserialize_with = "one_or_many")]
    pub include: Vec<String>,
    /// Modules keyed by directory path.
    #[serde(default)]
    pub modules: BTreeMap<String, ModuleSpec>,
}

/// Per-module settings. Every field accepts a string or a list of strings,
/// and `{module}` / `{path}` placeholders are expanded.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModuleSpec {
    /// Extra includes for this module's header.
    #[serde(default, deserialize_with = "one_or_many")]
    pub include: Vec<String>,
    /// Header path; only the first entry is used.
    #[serde(default, deserialize_with = "maybe_one_or_many")]
    pub output: Option<Vec<String>>,
    /// Export table path; only the first entry is used.
    #[serde(default, deserialize_with = "maybe_one_or_many")]
    pub export: Option<Vec<String>>,
    /// C sources scanned for declarations.
    #[serde(default, deserialize_with = "maybe_one_or_many")]
    pub sources: Option<Vec<String>>,
    /// Files appended verbatim to the header.
    #[serde(default, deserialize_with = "one_or_many")]
    pub extend: Vec<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

impl From<OneOrMany> for Vec<String> {
    fn from(value: OneOrMany) -> Self {
        match value {
            OneOrMany::One(s) if s.is_empty() => Vec::new(),
            OneOrMany::One(s) => vec![s],
            OneOrMany::Many(v) => v,
        }
    }
}

fn one_or_many<'de, D: Deserializer<'de>>(de: D) -> Result<Vec<String>, D::Error> {
    Ok(Option::<OneOrMany>::deserialize(de)?
        .map(Vec::from)
        .unwrap_or_default())
}

fn maybe_one_or_many<'de, D: Deserializer<'de>>(de: D) -> Result<Option<Vec<String>>, D::Error> {
    Ok(Option::<OneOrMany>::deserialize(de)?.map(Vec::from))
}

impl Manifest {
    /// Load a manifest; `.toml` files are read as TOML, anything else as JSON.
    ///
    /// # Errors
    ///
    /// Returns [`GenError::Io`] if the file cannot be read, or
    /// [`GenError::ManifestParse`] if it does not parse.
    pub fn load(path: &Path) -> GenResult<Self> {
        let text = std::fs::read_to_string(path).map_err(GenError::io(path))?;
        let is_toml = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));
        let manifest = if is_toml {
            Self::from_toml(&text)
        } else {
            Self::from_json(&text)
        }
        .map_err(|message| GenError::ManifestParse {
            path: path.to_path_buf(),
            message,
        })?;
        debug!(path = %path.display(), modules = manifest.modules.len(), "Loaded manifest");
        Ok(manifest)
    }

    fn from_json(text: &str) -> Result<Self, String> {
        serde_json::from_str(text).map_err(|e| e.to_string())
    }

    fn from_toml(text: &str) -> Result<Self, String> {
        toml::from_str(text).map_err(|e| e.to_string())
    }
}

/// A module with every template expanded and defaults applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedModule {
    /// Module name: the last component of the directory path.
    pub name: String,
    /// Module directory, joined onto the generator root.
    pub dir: PathBuf,
    /// Includes for the header (global first).
    pub include: Vec<String>,
    /// Header path.
    pub output: PathBuf,
    /// Export table path.
    pub export: PathBuf,
    /// Source files.
    pub sources: Vec<PathBuf>,
    /// Files appended to the header.
    pub extend: Vec<PathBuf>,
}

impl ModuleSpec {
    /// Apply defaults and expand templates for the module at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`GenError::ModuleNotFound`] if the directory does not exist,
    /// [`GenError::MissingOption`] if `output`, `export` or `sources` is an
    /// empty list, or a template error.
    pub fn resolve(
        &self,
        root: &Path,
        path: &str,
        global_include: &[String],
    ) -> GenResult<ResolvedModule> {
        let dir = root.join(path);
        if !dir.is_dir() {
            return Err(GenError::ModuleNotFound(dir));
        }
        let name = Path::new(path)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let vars = [("module", name.as_str()), ("path", path)];

        let first = |option: &'static str, values: &Option<Vec<String>>, default: &str| {
            let expanded = expand_all(values.as_deref().unwrap_or(&[default.to_string()]), &vars)?;
            expanded
                .into_iter()
                .next()
                .map(|file| dir.join(file))
                .ok_or_else(|| GenError::MissingOption {
                    option,
                    module: name.clone(),
                })
        };
        let output = first("output", &self.output, DEFAULT_OUTPUT)?;
        let export = first("export", &self.export, DEFAULT_EXPORT)?;

        let sources = expand_all(
            self.sources
                .as_deref()
                .unwrap_or(&[DEFAULT_SOURCES.to_string()]),
            &vars,
        )?;
        if sources.is_empty() {
            return Err(GenError::MissingOption {
                option: "sources",
                module: name,
            });
        }

        let mut include = expand_all(global_include, &vars)?;
        include.extend(expand_all(&self.include, &vars)?);

        Ok(ResolvedModule {
            include,
            output,
            export,
            sources: sources.into_iter().map(|s| dir.join(s)).collect(),
            extend: expand_all(&self.extend, &vars)?
                .into_iter()
                .map(|s| dir.join(s))
                .collect(),
            name,
            dir,
        })
    }
}

fn expand_all(templates: &[String], vars: &[(&str, &str)]) -> GenResult<Vec<String>> {
    templates.iter().map(|t| expand(t, vars)).collect()
}

/// Expand `{name}` placeholders; `{{` and `}}` produce literal braces.
///
/// # Errors
///
/// Returns [`GenError::UnknownPlaceholder`] or [`GenError::UnbalancedBrace`].
pub fn expand(template: &str, vars: &[(&str, &str)]) -> GenResult<String> {
    let mut out = String::with_capacity(template.len());
    let mut chars = template.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '{' if chars.peek() == Some(&'{') => {
                chars.next();
                out.push('{');
            },
            '{' => {
                let mut placeholder = String::new();
                loop {
                    match chars.next() {
                        Some('}') => break,
                        Some(ch) => placeholder.push(ch),
                        None => return Err(GenError::UnbalancedBrace(template.to_string())),
                    }
                }
                let value = vars
                    .iter()
                    .find(|(name, _)| *name == placeholder)
                    .map(|(_, value)| *value)
                    .ok_or_else(|| GenError::UnknownPlaceholder {
                        placeholder: placeholder.clone(),
                        template: template.to_string(),
                    })?;
                out.push_str(value);
            },
            '}' if chars.peek() == Some(&'}') => {
                chars.next();
                out.push('}');
            },
            '}' => return Err(GenError::UnbalancedBrace(template.to_string())),
            c => out.push(c),
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_json_string_or_list() {
        let manifest = Manifest::from_json(
            r#"{
                "include": "common.h",
                "modules": {
                    "src/promise": {"sources": ["promise.c", "chain.c"], "extend": "extra.h"},
                    "src/loop": {}
                }
            }"#,
        )
        .unwrap();

        assert_eq!(manifest.include, vec!["common.h"]);
        let promise = &manifest.modules["src/promise"];
        assert_eq!(
            promise.sources,
            Some(vec!["promise.c".to_string(), "chain.c".to_string()])
        );
        assert_eq!(promise.extend, vec!["extra.h"]);
        assert_eq!(manifest.modules["src/loop"], ModuleSpec::default());
    }

    #[test]
    fn test_unknown_module_key_rejected() {
        let err = Manifest::from_json(r#"{"modules":{"m":{"source":"x.c"}}}"#).unwrap_err();
        assert!(err.contains("unknown field `source`"), "{err}");

        let err = Manifest::from_toml("[modules.m]\nsource = \"x.c\"\n").unwrap_err();
        assert!(err.contains("source"), "{err}");
    }

    #[test]
    fn test_parse_toml() {
        let manifest = Manifest::from_toml(
            r#"
            include = ["common.h"]

            [modules."src/loop"]
            output = "include/{module}_api.h"
            "#,
        )
        .unwrap();

        assert_eq!(
            manifest.modules["src/loop"].output,
            Some(vec!["include/{module}_api.h".to_string()])
        );
    }

    #[test]
    fn test_expand() {
        let vars = [("module", "loop"), ("path", "src/loop")];
        assert_eq!(expand("capsule/{module}.h", &vars).unwrap(), "capsule/loop.h");
        assert_eq!(expand("{path}/x", &vars).unwrap(), "src/loop/x");
        assert_eq!(expand("{{literal}}", &vars).unwrap(), "{literal}");
        assert!(matches!(
            expand("{other}", &vars),
            Err(GenError::UnknownPlaceholder { .. })
        ));
        assert!(matches!(
            expand("{module", &vars),
            Err(GenError::UnbalancedBrace(_))
        ));
        assert!(matches!(
            expand("module}", &vars),
            Err(GenError::UnbalancedBrace(_))
        ));
    }

    #[test]
    fn test_resolve_defaults() {
        let root = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(root.path().join("src/loop")).unwrap();

        let resolved = ModuleSpec::default()
            .resolve(root.path(), "src/loop", &["common.h".to_string()])
            .unwrap();

        let dir = root.path().join("src/loop");
        assert_eq!(resolved.name, "loop");
        assert_eq!(resolved.output, dir.join("capsule/loop.h"));
        assert_eq!(resolved.export, dir.join("loop_export.h"));
        assert_eq!(resolved.sources, vec![dir.join("loop.c")]);
        assert_eq!(resolved.include, vec!["common.h"]);
        assert!(resolved.extend.is_empty());
    }

    #[test]
    fn test_resolve_errors() {
        let root = tempfile::tempdir().unwrap();
        assert!(matches!(
            ModuleSpec::default().resolve(root.path(), "missing", &[]),
            Err(GenError::ModuleNotFound(_))
        ));

        std::fs::create_dir_all(root.path().join("m")).unwrap();
        let spec = ModuleSpec {
            sources: Some(Vec::new()),
            ..ModuleSpec::default()
        };
        assert!(matches!(
            spec.resolve(root.path(), "m", &[]),
            Err(GenError::MissingOption { option: "sources", .. })
        ));

        let spec = ModuleSpec {
            output: Some(Vec::new()),
            ..ModuleSpec::default()
        };
        assert!(matches!(
            spec.resolve(root.path(), "m", &[]),
            Err(GenError::MissingOption { option: "output", .. })
        ));
    }

    #[test]
    fn test_load_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        let json = dir.path().join("capsules.json");
        std::fs::write(&json, r#"{"modules": {"a": {}}}"#).unwrap();
        assert_eq!(Manifest::load(&json).unwrap().modules.len(), 1);

        let toml_path = dir.path().join("capsules.toml");
        std::fs::write(&toml_path, "[modules.a]\n[modules.b]\n").unwrap();
        assert_eq!(Manifest::load(&toml_path).unwrap().modules.len(), 2);

        let broken = dir.path().join("broken.json");
        std::fs::write(&broken, "{").unwrap();
        assert!(matches!(
            Manifest::load(&broken),
            Err(GenError::ManifestParse { .. })
        ));
    }
}
