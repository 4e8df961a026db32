//! RPN-to-target-query compilation.
//!
//! Walks a Type-1 query tree and emits the dialect the configured back-end
//! speaks: CQL for SRU targets, a Solr field/range expression, or PQF
//! passthrough. Attribute interpretation follows BIB-1; anything the
//! compiler cannot honor becomes a typed diagnostic for the session driver
//! to attach to the reply.

mod attrs;
pub mod cql;
pub mod pqf;
pub mod solr;
pub mod sort;

pub use sort::{cql_sortby, extract_sort_key, yaz_sortspec, SortField, SortKey, SortKeyRequest};

use std::collections::BTreeMap;

/// What the compiler needs to know about a named result set when it meets
/// an RSID node: the back-end-assigned id (if any) and the original query
/// text kept for re-submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSet {
    pub rsid: Option<String>,
    pub qtext: String,
}

/// Lookup of session result sets by client-visible name. Implemented by the
/// session's registry; a plain map works for tests.
pub trait SetResolver {
    fn resolve_set(&self, name: &str) -> Option<ResolvedSet>;
}

impl SetResolver for BTreeMap<String, ResolvedSet> {
    fn resolve_set(&self, name: &str) -> Option<ResolvedSet> {
        self.get(name).cloned()
    }
}

/// Resolver for contexts with no result sets (scan, tests).
pub struct NoSets;

impl SetResolver for NoSets {
    fn resolve_set(&self, _name: &str) -> Option<ResolvedSet> {
        None
    }
}
