//! CQL emission for SRU back-ends.

use zgate_core::config::{DatabaseConfig, ResultSetIdPolicy};
use zgate_core::diag::{bib1, Diagnostic};
use zgate_core::rpn::{RpnNode, Term};

use crate::attrs::{analyze, Mode, TermProfile};
use crate::SetResolver;

/// Compile a Type-1 tree to CQL.
pub fn compile(
    node: &RpnNode,
    db: &DatabaseConfig,
    sets: &dyn SetResolver,
) -> Result<String, Diagnostic> {
    match node {
        RpnNode::Term(term) => emit_term(term, db),
        RpnNode::Rsid(name) => emit_rsid(name, db, sets),
        RpnNode::And(l, r) => emit_boolean(l, r, "and", db, sets),
        RpnNode::Or(l, r) => emit_boolean(l, r, "or", db, sets),
        RpnNode::AndNot(l, r) => emit_boolean(l, r, "not", db, sets),
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

fn relation_text(relation: u64) -> &'static str {
    match relation {
        1 => "<",
        2 => "<=",
        3 => "=",
        4 => ">=",
        5 => ">",
        6 => "<>",
        100 => "=/phonetic",
        101 => "=/stem",
        102 => "=/relevant",
        _ => "=",
    }
}

fn decorate(profile: &TermProfile) -> String {
    let mut text = profile.term.clone();
    if profile.left_truncate {
        text.insert(0, '*');
    }
    if profile.right_truncate {
        text.push('*');
    }
    if profile.left_anchor {
        text.insert(0, '^');
    }
    if profile.right_anchor {
        text.push('^');
    }
    if text.chars().any(char::is_whitespace) || text.contains(['"', '/', '=']) {
        text = format!("\"{}\"", text.replace('"', "\\\""));
    }
    text
}

fn emit_term(term: &Term, db: &DatabaseConfig) -> Result<String, Diagnostic> {
    let profile = analyze(term, db, Mode::Cql)?;
    let text = decorate(&profile);
    let clause = match (&profile.index, profile.relation) {
        (Some(index), Some(rel)) => format!("{} {} {}", index, relation_text(rel), text),
        (Some(index), None) => format!("{} = {}", index, text),
        (None, Some(rel)) => format!("cql.serverChoice {} {}", relation_text(rel), text),
        (None, None) => format!("cql.serverChoice = {}", text),
    };
    Ok(clause)
}

/// Emit a result-set reference, honoring the database's `resultsetid`
/// policy: the back-end id when known (unless the policy forces a
/// re-search), otherwise the original query text re-submitted in
/// parentheses (unless the policy forbids it).
pub(crate) fn emit_rsid(
    name: &str,
    db: &DatabaseConfig,
    sets: &dyn SetResolver,
) -> Result<String, Diagnostic> {
    let set = sets
        .resolve_set(name)
        .ok_or_else(|| Diagnostic::new(bib1::ILLEGAL_RESULT_SET_NAME, name))?;
    if let Some(rsid) = &set.rsid {
        if db.resultsetid != ResultSetIdPolicy::Search {
            return Ok(format!("cql.resultSetId=\"{}\"", rsid));
        }
    }
    if db.resultsetid != ResultSetIdPolicy::Id {
        return Ok(format!("({})", set.qtext));
    }
    Err(Diagnostic::new(bib1::RESULT_SET_UNSUPPORTED_AS_TERM, name))
}
