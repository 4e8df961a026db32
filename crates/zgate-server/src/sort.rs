//! Sort handler.
//!
//! The dialect follows the first input set's database. Type-1 targets get
//! an `@or`-combined `@set` query with a YAZ sortspec attached; CQL targets
//! get the sets re-expressed as rsid clauses or re-submitted query text,
//! sorted natively with `sortby` when the back-end speaks SRU 1.2,
//! otherwise with an attached YAZ sortspec.

use std::sync::Arc;

use zgate_core::backend::BackendQuery;
use zgate_core::config::QueryType;
use zgate_core::diag::{bib1, Diagnostic};
use zgate_core::Result;
use zgate_query::{cql_sortby, extract_sort_key, yaz_sortspec};

use crate::proto::{SortRequest, SortResponse};
use crate::resultset::ResultSet;
use crate::session::Session;

fn sru_at_least(version: Option<String>, major: u32, minor: u32) -> bool {
    let Some(version) = version else {
        return false;
    };
    let mut parts = version.split('.');
    let maj: u32 = parts.next().and_then(|p| p.trim().parse().ok()).unwrap_or(0);
    let min: u32 = parts.next().and_then(|p| p.trim().parse().ok()).unwrap_or(0);
    (maj, min) >= (major, minor)
}

impl Session {
    pub(crate) async fn handle_sort(&mut self, req: SortRequest) -> Result<SortResponse> {
        if req.input.is_empty() {
            return Err(Diagnostic::new(bib1::ILLEGAL_RESULT_SET_NAME, "").into());
        }
        for name in &req.input {
            if !self.resultsets.contains_key(name) {
                return Err(Diagnostic::new(bib1::ILLEGAL_RESULT_SET_NAME, name).into());
            }
        }

        let (db_name, db) = {
            let first = &self.resultsets[&req.input[0]];
            (first.db_name.clone(), Arc::clone(&first.db))
        };

        let keys = req
            .sequence
            .iter()
            .map(extract_sort_key)
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let query = match db.querytype() {
            Some(QueryType::Cql) => {
                let clauses: Vec<String> = req
                    .input
                    .iter()
                    .map(|name| {
                        let rs = &self.resultsets[name];
                        match &rs.rsid {
                            Some(rsid) => format!("cql.resultSetId=\"{}\"", rsid),
                            None => format!("({})", rs.qtext),
                        }
                    })
                    .collect();
                let combined = if clauses.len() == 1 {
                    clauses.into_iter().next().unwrap_or_default()
                } else {
                    format!("({})", clauses.join(" or "))
                };

                let connection = self.connection(&db_name, &db).await?;
                if sru_at_least(connection.option("sruVersion"), 1, 2) {
                    BackendQuery::cql(format!(
                        "{} sortby {}",
                        combined,
                        cql_sortby(&keys, &db)?
                    ))
                } else {
                    BackendQuery::cql(combined).with_sort(yaz_sortspec(&keys))
                }
            }
            _ => {
                let mut combined = format!("@set {}", req.input[0]);
                for name in req.input.iter().skip(1) {
                    combined = format!("@or {} @set {}", combined, name);
                }
                BackendQuery::pqf(combined).with_sort(yaz_sortspec(&keys))
            }
        };

        let connection = self.connection(&db_name, &db).await?;
        connection.set_option("presentChunk", "0");
        let cursor = connection.search(&query).await?;

        let hits = cursor.hits();
        let rsid = cursor.result_set_id();
        tracing::debug!(output = %req.output, hits, "sort registered");

        self.resultsets.insert(
            req.output.clone(),
            ResultSet {
                db_name,
                db,
                setname: req.output,
                qtext: query.query,
                cursor,
                rsid,
                hits,
            },
        );

        Ok(SortResponse { diag: None })
    }
}

#[cfg(test)]
mod tests {
    use super::sru_at_least;

    #[test]
    fn sru_version_comparison() {
        assert!(sru_at_least(Some("1.2".to_string()), 1, 2));
        assert!(sru_at_least(Some("2.0".to_string()), 1, 2));
        assert!(!sru_at_least(Some("1.1".to_string()), 1, 2));
        assert!(!sru_at_least(None, 1, 2));
    }
}
