//! SUTRS rendering: a human-readable indented dump of the record XML.

use roxmltree::{Document, Node};

use crate::xml;

/// Render the record document as SUTRS text. Elements with nothing but
/// text become `name = value` lines; elements with children open a braced
/// block one indent level deeper. Attributes are listed as scalars at the
/// top of their element's block.
pub fn to_sutrs(doc: &Document) -> String {
    let mut out = String::new();
    if let Some(root) = doc.root().children().find(|n| n.is_element()) {
        dump_children(root, 0, &mut out);
    }
    out
}

fn is_scalar(node: Node) -> bool {
    !node.children().any(|c| c.is_element()) && node.attributes().next().is_none()
}

fn indent(level: usize, out: &mut String) {
    for _ in 0..level {
        out.push('\t');
    }
}

fn dump_children(node: Node, level: usize, out: &mut String) {
    for attr in node.attributes() {
        indent(level, out);
        out.push_str(attr.name());
        out.push_str(" = ");
        out.push_str(attr.value());
        out.push('\n');
    }
    // Text of a leaf that only opened a block because of its attributes.
    if !node.children().any(|c| c.is_element()) {
        let text = xml::text_value(node);
        let text = text.trim();
        if !text.is_empty() {
            indent(level, out);
            out.push_str(node.tag_name().name());
            out.push_str(" = ");
            out.push_str(text);
            out.push('\n');
        }
    }
    for child in node.children().filter(|n| n.is_element()) {
        let name = child.tag_name().name();
        if is_scalar(child) {
            indent(level, out);
            out.push_str(name);
            out.push_str(" = ");
            out.push_str(xml::text_value(child).trim());
            out.push('\n');
        } else {
            indent(level, out);
            out.push_str(name);
            out.push_str(" {\n");
            dump_children(child, level + 1, out);
            indent(level, out);
            out.push_str("}\n");
        }
    }
}
