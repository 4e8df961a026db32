//! GRS-1 rendering: one tagged line per xpath hit.

use roxmltree::Document;

use zgate_core::config::FieldSpec;

use crate::xml;

/// Render the record as GRS-1 `"tag data"` lines. Every node matched by a
/// spec's xpath produces one line; newlines inside the data collapse to
/// spaces.
pub fn to_grs1(doc: &Document, specs: &[FieldSpec]) -> String {
    let mut out = String::new();
    for spec in specs {
        for node in xml::select(doc, &spec.xpath) {
            let data = xml::text_value(node)
                .replace(['\n', '\r'], " ")
                .trim()
                .to_string();
            out.push_str(&spec.content);
            out.push(' ');
            out.push_str(&data);
            out.push('\n');
        }
    }
    out
}
