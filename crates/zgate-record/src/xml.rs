//! Location-path evaluation over record XML.
//!
//! The field specs use a small XPath subset: absolute child steps
//! (`/doc/str`), descendant steps (`//datafield`), and `[@attr='value']`
//! predicates. Relative paths search from anywhere in the document.
//! Namespaces are ignored; steps match on local names.

use roxmltree::{Document, Node};

#[derive(Debug, Clone, PartialEq, Eq)]
struct Step {
    name: String,
    /// `[@attr='value']`
    predicate: Option<(String, String)>,
    /// Matches any descendant instead of direct children.
    descendant: bool,
}

fn parse_step(text: &str, descendant: bool) -> Step {
    match text.split_once('[') {
        Some((name, pred)) => {
            let pred = pred
                .trim_end_matches(']')
                .trim_start_matches('@')
                .to_string();
            let predicate = pred.split_once('=').map(|(attr, value)| {
                (
                    attr.trim().to_string(),
                    value.trim().trim_matches(['\'', '"']).to_string(),
                )
            });
            Step {
                name: name.to_string(),
                predicate,
                descendant,
            }
        }
        None => Step {
            name: text.to_string(),
            predicate: None,
            descendant,
        },
    }
}

fn parse_path(path: &str) -> Vec<Step> {
    let mut steps = Vec::new();
    let mut rest = path;
    // A relative path searches the whole document for its first step.
    let mut descendant = !rest.starts_with('/');
    while !rest.is_empty() {
        if let Some(stripped) = rest.strip_prefix("//") {
            descendant = true;
            rest = stripped;
        } else if let Some(stripped) = rest.strip_prefix('/') {
            rest = stripped;
        }
        if rest.is_empty() {
            break;
        }
        let (step_text, remainder) = match rest.find('/') {
            Some(pos) => (&rest[..pos], &rest[pos..]),
            None => (rest, ""),
        };
        steps.push(parse_step(step_text, descendant));
        descendant = false;
        rest = remainder;
    }
    steps
}

fn step_matches(node: Node, step: &Step) -> bool {
    if !node.is_element() || node.tag_name().name() != step.name {
        return false;
    }
    match &step.predicate {
        Some((attr, value)) => node.attribute(attr.as_str()) == Some(value.as_str()),
        None => true,
    }
}

/// All nodes matched by `path`, in document order.
pub fn select<'a, 'input>(doc: &'a Document<'input>, path: &str) -> Vec<Node<'a, 'input>> {
    let steps = parse_path(path);
    let mut current = vec![doc.root()];
    for step in &steps {
        let mut next = Vec::new();
        for node in current {
            if step.descendant {
                next.extend(node.descendants().filter(|n| step_matches(*n, step)));
            } else {
                next.extend(node.children().filter(|n| step_matches(*n, step)));
            }
        }
        current = next;
    }
    current
}

/// Concatenated text content of a node's descendants.
pub fn text_value(node: Node) -> String {
    let mut out = String::new();
    for descendant in node.descendants() {
        if let Some(text) = descendant.text() {
            if descendant.is_text() {
                out.push_str(text);
            }
        }
    }
    out
}

/// Concatenated text of every node matched by `path` (the `findvalue`
/// behavior the field specs rely on).
pub fn find_value(doc: &Document, path: &str) -> String {
    select(doc, path)
        .into_iter()
        .map(text_value)
        .collect::<Vec<_>>()
        .concat()
}

/// Locate an SRW surrogate diagnostic embedded in record XML and return its
/// numeric code and message. Old back-ends deliver these inline instead of
/// flagging the record as failed.
pub fn find_srw_diagnostic(record_xml: &str) -> Option<(u16, String)> {
    const SRW_DIAG_NS: &str = "http://www.loc.gov/zing/srw/diagnostic/";
    const SRW_URI_PREFIX: &str = "info:srw/diagnostic/1/";

    if !record_xml.contains(SRW_DIAG_NS) {
        return None;
    }
    let doc = Document::parse(record_xml).ok()?;
    let diagnostic = doc
        .descendants()
        .find(|n| n.is_element() && n.tag_name().namespace() == Some(SRW_DIAG_NS))?;
    let scope = if diagnostic.tag_name().name() == "diagnostic" {
        diagnostic
    } else {
        diagnostic.ancestors().find(|a| {
            a.is_element() && a.tag_name().name() == "diagnostic"
        })?
    };
    let uri = scope
        .descendants()
        .find(|n| n.is_element() && n.tag_name().name() == "uri")
        .map(text_value)?;
    let code = uri.strip_prefix(SRW_URI_PREFIX)?.trim().parse().ok()?;
    let message = scope
        .descendants()
        .find(|n| n.is_element() && n.tag_name().name() == "message")
        .map(text_value)
        .unwrap_or_default();
    Some((code, message))
}
