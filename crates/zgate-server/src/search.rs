//! Search handler.

use zgate_core::diag::{bib1, Diagnostic};
use zgate_core::Result;

use crate::proto::{SearchRequest, SearchResponse};
use crate::resultset::ResultSet;
use crate::session::Session;

impl Session {
    pub(crate) async fn handle_search(&mut self, req: SearchRequest) -> Result<SearchResponse> {
        let (db_name, db) = self.resolve_database(&req.databases)?;
        if db.nonamedresultsets && req.setname != "default" {
            return Err(
                Diagnostic::new(bib1::NAMED_RESULT_SETS_UNSUPPORTED, &req.setname).into(),
            );
        }

        let query = self.compile_query(&req.query, &db)?;

        let connection = self.connection(&db_name, &db).await?;
        connection.set_option("presentChunk", "0");
        let cursor = connection.search(&query).await?;

        let hits = cursor.hits();
        let rsid = cursor.result_set_id();
        tracing::debug!(database = %db_name, setname = %req.setname, hits, "search complete");

        // Rebinding a set name drops the previous cursor.
        self.resultsets.insert(
            req.setname.clone(),
            ResultSet {
                db_name,
                db,
                setname: req.setname,
                qtext: query.query,
                cursor,
                rsid,
                hits,
            },
        );

        Ok(SearchResponse { hits, diag: None })
    }
}
