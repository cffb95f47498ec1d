use std::fmt::Write;

use crate::models::License;

/// Render a Swift source file exposing `licenses` as `{name}.all`.
pub fn render(name: &str, licenses: &[License]) -> String {
    let mut out = String::new();
    out.push_str("// Generated by license-collect. Do not edit.\n\n");
    out.push_str("public struct LicenseEntry: Hashable, Sendable {\n");
    out.push_str("    public let identity: String\n");
    out.push_str("    public let name: String\n");
    out.push_str("    public let license: String\n");
    out.push_str("}\n\n");

    let _ = writeln!(out, "public enum {} {{", name);
    if licenses.is_empty() {
        out.push_str("    public static let all: [LicenseEntry] = []\n");
    } else {
        out.push_str("    public static let all: [LicenseEntry] = [\n");
        for license in licenses {
            out.push_str("        LicenseEntry(\n");
            let _ = writeln!(out, "            identity: {},", raw_string(&license.identity));
            let _ = writeln!(out, "            name: {},", raw_string(&license.name));
            let _ = writeln!(out, "            license: {}", raw_string(&license.text));
            out.push_str("        ),\n");
        }
        out.push_str("    ]\n");
    }
    out.push_str("}\n");
    out
}

/// Swift raw string literal for `text`, delimited by one more `#` than the
/// longest `#` run inside it so the text can never close the literal early.
fn raw_string(text: &str) -> String {
    let hashes = "#".repeat(longest_hash_run(text) + 1);
    if text.contains('\n') || text.contains('\r') {
        // A multi-line literal drops the line breaks after the opening and
        // before the closing delimiter, leaving `text` exactly.
        format!("{hashes}\"\"\"\n{text}\n\"\"\"{hashes}")
    } else {
        format!("{hashes}\"{text}\"{hashes}")
    }
}

fn longest_hash_run(text: &str) -> usize {
    text.split(|c| c != '#').map(str::len).max().unwrap_or(0)
}
