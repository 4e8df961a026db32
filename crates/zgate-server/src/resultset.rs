//! The session's named result sets.

use std::collections::HashMap;
use std::sync::Arc;

use zgate_core::backend::ResultCursor;
use zgate_core::config::DatabaseConfig;
use zgate_query::{ResolvedSet, SetResolver};

/// One materialized hit list. Rebinding a set name drops the previous
/// cursor; the back-end releases whatever it held for it.
pub struct ResultSet {
    pub db_name: String,
    pub db: Arc<DatabaseConfig>,
    pub setname: String,
    /// Compiled query text, kept for sort-by-re-search and RSID fallback.
    pub qtext: String,
    pub cursor: Box<dyn ResultCursor>,
    /// Back-end-assigned result-set id, when reported.
    pub rsid: Option<String>,
    pub hits: u64,
}

/// Read-only view of the registry for the query compiler.
pub(crate) struct SetRegistry<'a>(pub &'a HashMap<String, ResultSet>);

impl SetResolver for SetRegistry<'_> {
    fn resolve_set(&self, name: &str) -> Option<ResolvedSet> {
        self.0.get(name).map(|rs| ResolvedSet {
            rsid: rs.rsid.clone(),
            qtext: rs.qtext.clone(),
        })
    }
}
