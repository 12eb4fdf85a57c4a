//! Renders import headers and export tables.

use std::fmt::Write as _;

use capsa_api::{ApiKey, ApiSignature, STATE_ARG, hash_key};

use crate::parser::ApiDeclarations;

/// First line of every generated file.
pub const BANNER: &str = "// Auto-generated\n\n";

/// One API key as it appears in generated output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedApi {
    /// The API key.
    pub key: ApiKey,
    /// `<key>_<digest>`: the capsule name and C symbol prefix.
    pub hash_key: String,
    /// Signatures in slot order.
    pub signatures: Vec<ApiSignature>,
}

impl RenderedApi {
    fn from_declarations(decls: &ApiDeclarations) -> Vec<Self> {
        decls
            .iter()
            .map(|(key, signatures)| Self {
                key: key.clone(),
                hash_key: hash_key(key, signatures),
                signatures: signatures.to_vec(),
            })
            .collect()
    }
}

/// Generated header and export table text for one module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rendered {
    /// APIs in the order they were declared.
    pub apis: Vec<RenderedApi>,
    /// Text of the import header.
    pub header: String,
    /// Text of the export table file.
    pub export: String,
}

/// Render the header and export table for `module`.
///
/// `extend` holds the contents of files appended to the header.
#[must_use]
pub fn render(
    module: &str,
    include: &[String],
    decls: &ApiDeclarations,
    extend: &[String],
) -> Rendered {
    let apis = RenderedApi::from_declarations(decls);
    let guard = format!("CAPSULE_{}_API", module.to_ascii_uppercase());

    let mut header = String::from(BANNER);
    let _ = writeln!(header, "#ifndef {guard}\n#define {guard}\n");
    if !include.is_empty() {
        for item in include {
            let _ = writeln!(header, "#include \"{item}\"");
        }
        header.push('\n');
    }

    let mut export = String::from(BANNER);

    for api in &apis {
        render_api_header(&mut header, api);
        render_api_export(&mut export, api);
    }

    for text in extend {
        header.push_str(text);
        header.push('\n');
    }
    header.push_str("#endif\n");

    Rendered {
        apis,
        header,
        export,
    }
}

fn render_api_header(out: &mut String, api: &RenderedApi) {
    let hash = &api.hash_key;
    let macro_name = api.key.macro_name();

    let _ = writeln!(out, "static int {hash}__api_loaded = 0;");
    let _ = writeln!(out, "static void *{hash}__api[{}];\n", api.signatures.len());
    let _ = writeln!(out, "#define {macro_name} {hash}\n");

    for (index, signature) in api.signatures.iter().enumerate() {
        let id = format!("{}_ID", signature.name.to_ascii_uppercase());
        let _ = writeln!(out, "#define {id} {index}");

        let takes_state = signature.takes_state();
        let mut cast_args: Vec<&str> = signature
            .args
            .iter()
            .map(String::as_str)
            .filter(|a| *a != STATE_ARG)
            .collect();
        let has_args = !signature.call_args().is_empty();
        if takes_state {
            cast_args.insert(0, "void*");
        }

        let params = if has_args { "..." } else { "" };
        let _ = writeln!(out, "#define {}({params}) \\", signature.name);

        let mut call_args = Vec::new();
        if takes_state {
            call_args.push(format!("_ctx->{hash}__ctx"));
        }
        if has_args {
            call_args.push("__VA_ARGS__".to_string());
        }
        let _ = writeln!(
            out,
            "  (({} (*) ({}))({hash}__api[{id}]))( \\",
            signature.ret,
            cast_args.join(", ")
        );
        let _ = writeln!(out, "    {})\n", call_args.join(", "));
    }
}

fn render_api_export(out: &mut String, api: &RenderedApi) {
    let macro_name = api.key.macro_name();
    let _ = writeln!(out, "#define {macro_name} {}\n", api.hash_key);
    let _ = writeln!(out, "#define {macro_name}_CAPSULE {{\\");
    for (index, signature) in api.signatures.iter().enumerate() {
        let _ = writeln!(out, "  [{index}] = {},\\", signature.name);
    }
    out.push_str("}\n\n");
}
