//! Scan handler.

use zgate_core::backend::{BackendQuery, ScanOptions};
use zgate_core::config::QueryType;
use zgate_core::Result;
use zgate_query::{cql, pqf, NoSets};

use crate::proto::{ScanRequest, ScanResponse, ScanStatus};
use crate::session::Session;

impl Session {
    pub(crate) async fn handle_scan(&mut self, req: ScanRequest) -> Result<ScanResponse> {
        let (db_name, db) = self.resolve_database(&req.databases)?;

        // CQL targets scan in CQL; everything else gets the Type-1 term
        // forwarded as PQF.
        let query = match db.querytype() {
            Some(QueryType::Cql) => BackendQuery::cql(cql::compile(&req.query, &db, &NoSets)?),
            _ => BackendQuery::pqf(pqf::compile(&req.query)),
        };
        let opts = ScanOptions {
            number: req.number,
            position: req.position,
            step_size: req.step_size,
        };

        let connection = self.connection(&db_name, &db).await?;
        let entries = connection.scan(&query, &opts).await?;

        let status = if (entries.len() as u64) < req.number {
            ScanStatus::Partial
        } else {
            ScanStatus::Success
        };
        tracing::debug!(database = %db_name, terms = entries.len(), ?status, "scan complete");

        Ok(ScanResponse {
            entries,
            status,
            diag: None,
        })
    }
}
