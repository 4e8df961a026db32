//! PQF passthrough emission.
//!
//! Databases with no configured `querytype` get the client's Type-1 query
//! forwarded as PQF; attributes are not interpreted, the back-end applies
//! its own semantics.

use zgate_core::rpn::{RpnNode, Term};

/// Render a Type-1 tree as PQF.
pub fn compile(node: &RpnNode) -> String {
    match node {
        RpnNode::Term(term) => emit_term(term),
        RpnNode::Rsid(name) => format!("@set {}", name),
        RpnNode::And(l, r) => format!("@and {} {}", compile(l), compile(r)),
        RpnNode::Or(l, r) => format!("@or {} {}", compile(l), compile(r)),
        RpnNode::AndNot(l, r) => format!("@not {} {}", compile(l), compile(r)),
    }
}

fn emit_term(term: &Term) -> String {
    let mut out = String::new();
    for attr in &term.attrs {
        match &attr.set {
            Some(set) => out.push_str(&format!("@attr {} {}={} ", set, attr.kind, attr.value)),
            None => out.push_str(&format!("@attr {}={} ", attr.kind, attr.value)),
        }
    }
    out.push_str(&quote(&term.value));
    out
}

fn quote(term: &str) -> String {
    if term.chars().any(char::is_whitespace) || term.contains('"') {
        format!("\"{}\"", term.replace('"', "\\\""))
    } else {
        term.to_string()
    }
}
