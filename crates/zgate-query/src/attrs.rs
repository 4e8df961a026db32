//! BIB-1 attribute interpretation shared by the CQL and Solr emitters.

use regex::Regex;
use std::sync::OnceLock;

use zgate_core::config::DatabaseConfig;
use zgate_core::diag::{bib1, Diagnostic};
use zgate_core::rpn::{attr_type, Term};

/// Emission dialect; Solr ignores Position and Completeness.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Mode {
    Cql,
    Solr,
}

/// The digested view of a term's attribute list.
#[derive(Debug, Default)]
pub(crate) struct TermProfile {
    /// Resolved index name; `None` when the term carries no Use attribute.
    pub index: Option<String>,
    /// Validated raw Relation attribute value.
    pub relation: Option<u64>,
    pub left_anchor: bool,
    pub right_anchor: bool,
    pub left_truncate: bool,
    pub right_truncate: bool,
    /// Term text after mask rewriting (truncation 101/104).
    pub term: String,
}

fn z3958_mask() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\?\d?").expect("static regex"))
}

const CQL_RELATIONS: &[u64] = &[1, 2, 3, 4, 5, 6, 100, 101, 102];
const SOLR_RELATIONS: &[u64] = &[1, 2, 3, 4, 5];

/// Interpret every attribute on `term` per BIB-1. Attributes from any other
/// attribute set fail with 121 carrying the foreign OID.
pub(crate) fn analyze(
    term: &Term,
    db: &DatabaseConfig,
    mode: Mode,
) -> Result<TermProfile, Diagnostic> {
    let mut profile = TermProfile {
        term: term.value.clone(),
        ..Default::default()
    };

    for attr in &term.attrs {
        if !attr.is_bib1() {
            let oid = attr.set.as_deref().unwrap_or_default();
            return Err(Diagnostic::new(bib1::UNSUPPORTED_ATTRIBUTE_SET, oid));
        }
        match attr.kind {
            attr_type::USE => {
                profile.index = Some(db.index_for(attr.value).ok_or_else(|| {
                    Diagnostic::new(bib1::UNSUPPORTED_USE_ATTRIBUTE, attr.value.to_string())
                })?);
            }
            attr_type::RELATION => {
                let known = match mode {
                    Mode::Cql => CQL_RELATIONS,
                    Mode::Solr => SOLR_RELATIONS,
                };
                if !known.contains(&attr.value) {
                    return Err(Diagnostic::new(
                        bib1::UNSUPPORTED_RELATION_ATTRIBUTE,
                        attr.value.to_string(),
                    ));
                }
                profile.relation = Some(attr.value);
            }
            attr_type::POSITION => {
                if mode == Mode::Solr {
                    continue;
                }
                match attr.value {
                    1 | 2 => profile.left_anchor = true,
                    3 => {}
                    other => {
                        return Err(Diagnostic::new(
                            bib1::UNSUPPORTED_POSITION_ATTRIBUTE,
                            other.to_string(),
                        ))
                    }
                }
            }
            attr_type::STRUCTURE => {}
            attr_type::TRUNCATION => match attr.value {
                1 => profile.right_truncate = true,
                2 => profile.left_truncate = true,
                3 => {
                    profile.left_truncate = true;
                    profile.right_truncate = true;
                }
                100 => {}
                101 => profile.term = profile.term.replace('#', "?"),
                104 => {
                    // Z39.58 masking: `#` is a single-character mask, `?`
                    // (optionally digit-counted) is open truncation.
                    let masked = profile.term.replace('#', "?");
                    profile.term = z3958_mask().replace_all(&masked, "*").into_owned();
                }
                other => {
                    return Err(Diagnostic::new(
                        bib1::UNSUPPORTED_TRUNCATION_ATTRIBUTE,
                        other.to_string(),
                    ))
                }
            },
            attr_type::COMPLETENESS => {
                if mode == Mode::Solr {
                    continue;
                }
                match attr.value {
                    2 | 3 => {
                        profile.left_anchor = true;
                        profile.right_anchor = true;
                    }
                    1 => {}
                    other => {
                        return Err(Diagnostic::new(
                            bib1::UNSUPPORTED_COMPLETENESS_ATTRIBUTE,
                            other.to_string(),
                        ))
                    }
                }
            }
            other => {
                return Err(Diagnostic::new(
                    bib1::UNSUPPORTED_ATTRIBUTE_TYPE,
                    other.to_string(),
                ))
            }
        }
    }

    Ok(profile)
}
