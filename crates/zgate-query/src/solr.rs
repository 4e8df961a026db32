//! Solr query emission.
//!
//! Relations become range expressions; Position and Completeness have no
//! Solr counterpart and are ignored.

use zgate_core::config::{DatabaseConfig, ResultSetIdPolicy};
use zgate_core::diag::{bib1, Diagnostic};
use zgate_core::rpn::{RpnNode, Term};

use crate::attrs::{analyze, Mode, TermProfile};
use crate::SetResolver;

/// Compile a Type-1 tree to a Solr query expression.
pub fn compile(
    node: &RpnNode,
    db: &DatabaseConfig,
    sets: &dyn SetResolver,
) -> Result<String, Diagnostic> {
    match node {
        RpnNode::Term(term) => emit_term(term, db),
        RpnNode::Rsid(name) => emit_rsid(name, db, sets),
        RpnNode::And(l, r) => emit_boolean(l, r, "AND", db, sets),
        RpnNode::Or(l, r) => emit_boolean(l, r, "OR", db, sets),
        RpnNode::AndNot(l, r) => emit_boolean(l, r, "NOT", db, sets),
    }
}

fn emit_boolean(
    left: &RpnNode,
    right: &RpnNode,
    op: &str,
    db: &DatabaseConfig,
    sets: &dyn SetResolver,
) -> Result<String, Diagnostic> {
    Ok(format!(
        "({} {} {})",
        compile(left, db, sets)?,
        op,
        compile(right, db, sets)?
    ))
}

fn truncated(profile: &TermProfile) -> String {
    let mut text = profile.term.clone();
    if profile.left_truncate {
        text.insert(0, '*');
    }
    if profile.right_truncate {
        text.push('*');
    }
    text
}

fn emit_term(term: &Term, db: &DatabaseConfig) -> Result<String, Diagnostic> {
    let profile = analyze(term, db, Mode::Solr)?;
    let text = truncated(&profile);
    let expr = match profile.relation {
        Some(1) => format!("{{* TO {}}}", text),
        Some(2) => format!("[* TO {}]", text),
        Some(4) => format!("[{} TO *]", text),
        Some(5) => format!("{{{} TO *}}", text),
        // Relation 3 (and no relation at all) is plain equality.
        _ => text,
    };
    match &profile.index {
        Some(index) => Ok(format!("{}:{}", index, expr)),
        None => Ok(expr),
    }
}

fn emit_rsid(
    name: &str,
    db: &DatabaseConfig,
    sets: &dyn SetResolver,
) -> Result<String, Diagnostic> {
    let set = sets
        .resolve_set(name)
        .ok_or_else(|| Diagnostic::new(bib1::ILLEGAL_RESULT_SET_NAME, name))?;
    if let Some(rsid) = &set.rsid {
        if db.resultsetid != ResultSetIdPolicy::Search {
            return Ok(format!("solr.resultSetId=\"{}\"", rsid));
        }
    }
    if db.resultsetid != ResultSetIdPolicy::Id {
        return Ok(format!("({})", set.qtext));
    }
    Err(Diagnostic::new(bib1::RESULT_SET_UNSUPPORTED_AS_TERM, name))
}
