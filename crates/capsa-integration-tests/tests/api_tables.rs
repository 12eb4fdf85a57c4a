//! API tables exported by one module and imported by another, with the
//! import side's hash key coming from generated headers.

mod common;

use capsa_api::{ApiError, ApiExports, ApiImport, ApiKey, ApiSignature, ApiTable, hash_key};
use capsa_gen::{ApiDeclarations, Generator, Manifest, ModuleOutcome, ModuleSpec};
use common::native;

const MATH_C: &str = "\
#include \"capsule/math.h\"

CAPSULE_API(MATH_API, int)
math_add(int a, int b)
{
    return a + b;
}

CAPSULE_API(MATH_API, int)
math_negate(int a)
{
    return -a;
}
";

fn math_signatures() -> Vec<ApiSignature> {
    vec![
        ApiSignature::new("math_add", "int", ["int a", "int b"]),
        ApiSignature::new("math_negate", "int", ["int a"]),
    ]
}

fn math_exports(signatures: &[ApiSignature]) -> ApiExports {
    let key = ApiKey::new("math_api").unwrap();
    let table = ApiTable::builder(key)
        .function(signatures[0].clone(), native::add as *const ())
        .function(signatures[1].clone(), native::negate as *const ())
        .build()
        .unwrap();
    let exports = ApiExports::new("math");
    exports.export(table).unwrap();
    exports
}

#[test]
fn test_parsed_declarations_match_exported_table() {
    let decls = ApiDeclarations::parse(MATH_C).unwrap();
    let key = ApiKey::new("MATH_API").unwrap();
    let parsed = decls.get(&key).unwrap();
    assert_eq!(parsed, math_signatures().as_slice());

    let exports = math_exports(&math_signatures());
    assert_eq!(exports.hash_keys(), vec![hash_key(&key, parsed)]);
}

#[test]
fn test_generated_hash_key_resolves_exported_table() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(dir.path().join("math")).unwrap();
    std::fs::write(dir.path().join("math/math.c"), MATH_C).unwrap();

    let mut manifest = Manifest::default();
    manifest
        .modules
        .insert("math".to_string(), ModuleSpec::default());
    let outcomes = Generator::new(dir.path()).run(&manifest).unwrap();
    let ModuleOutcome::Generated { hash_keys, .. } = &outcomes[0] else {
        panic!("math module not generated");
    };

    let exports = math_exports(&math_signatures());
    let import = ApiImport::new(hash_keys[0].clone());
    import.load(&exports).unwrap();

    // SAFETY: slots were registered with these exact signatures.
    #[allow(unsafe_code)]
    let (add, negate): (extern "C" fn(i32, i32) -> i32, extern "C" fn(i32) -> i32) = unsafe {
        (
            import.get_by_name("math_add").unwrap().cast(),
            import.get(1).unwrap().cast(),
        )
    };
    assert_eq!(add(40, 2), 42);
    assert_eq!(negate(7), -7);

    let header =
        std::fs::read_to_string(dir.path().join("math/capsule/math.h")).unwrap();
    assert!(header.contains(&format!("#define MATH_API {}", hash_keys[0])));
}

#[test]
fn test_changed_signature_not_found() {
    let key = ApiKey::new("math_api").unwrap();
    let mut stale = math_signatures();
    stale[1] = ApiSignature::new("math_negate", "long", ["long a"]);

    let exports = math_exports(&math_signatures());
    let import = ApiImport::for_signatures(&key, &stale);
    assert!(matches!(
        import.load(&exports),
        Err(ApiError::NotExported { .. })
    ));
    assert!(!import.is_loaded());
}

#[test]
fn test_withdrawn_table_invalidates_import() {
    let key = ApiKey::new("math_api").unwrap();
    let exports = math_exports(&math_signatures());
    let import = ApiImport::for_signatures(&key, &math_signatures());
    import.load(&exports).unwrap();
    assert_eq!(import.len().unwrap(), 2);

    exports.withdraw(import.hash_key()).unwrap();
    assert!(exports.is_empty());
    assert!(matches!(
        import.get(0),
        Err(ApiError::Capsule(capsa_core::CapsuleError::Invalidated))
    ));
}
