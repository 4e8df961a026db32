//! Present and Fetch handlers.

use zgate_core::diag::{bib1, BackendError, Diagnostic};
use zgate_core::Result;
use zgate_record::{marc, xml, RecordSyntax};

use crate::proto::{FetchRequest, FetchResponse, PresentRequest, PresentResponse};
use crate::session::Session;

impl Session {
    pub(crate) async fn handle_present(&mut self, req: PresentRequest) -> Result<PresentResponse> {
        let rs = self
            .resultsets
            .get_mut(&req.setname)
            .ok_or_else(|| Diagnostic::new(bib1::ILLEGAL_RESULT_SET_NAME, &req.setname))?;

        if req.start < 1 || req.start - 1 + req.number > rs.hits {
            return Err(
                Diagnostic::new(bib1::PRESENT_OUT_OF_RANGE, req.start.to_string()).into(),
            );
        }

        rs.cursor.present(req.start - 1, req.number).await?;
        Ok(PresentResponse::default())
    }

    pub(crate) async fn handle_fetch(&mut self, req: FetchRequest) -> Result<FetchResponse> {
        let rs = self
            .resultsets
            .get_mut(&req.setname)
            .ok_or_else(|| Diagnostic::new(bib1::ILLEGAL_RESULT_SET_NAME, &req.setname))?;

        if req.offset < 1 || req.offset > rs.hits {
            return Err(
                Diagnostic::new(bib1::PRESENT_OUT_OF_RANGE, req.offset.to_string()).into(),
            );
        }

        let schema = req
            .schema
            .as_ref()
            .and_then(|name| rs.db.schema.get(name))
            .cloned();

        let mut charset = "utf8".to_string();
        if let Some(extra) = &rs.db.charset {
            charset.push(',');
            charset.push_str(extra);
        }

        if let Some(schema) = &schema {
            rs.cursor.set_option("schema", &schema.sru);
        }

        let record_xml = rs.cursor.record(req.offset - 1, &charset).await?;

        // Old back-ends bury SRW surrogate diagnostics in the record body
        // instead of flagging the fetch.
        if let Some((code, message)) = xml::find_srw_diagnostic(&record_xml) {
            return Err(BackendError::Srw {
                code,
                addinfo: message,
            }
            .into());
        }

        if schema.is_some() {
            // Schema-based retrieval always delivers binary MARC21.
            let record = marc::marcxml_to_marc21(&record_xml)?;
            return Ok(FetchResponse {
                record,
                syntax: Some(RecordSyntax::Usmarc),
                schema: req.schema,
                diag: None,
            });
        }

        let syntax = RecordSyntax::parse(&req.syntax)
            .ok_or_else(|| zgate_record::unsupported_syntax(&rs.db))?;
        let record = zgate_record::convert(&record_xml, syntax, &rs.db)?;
        Ok(FetchResponse {
            record,
            syntax: Some(syntax),
            schema: None,
            diag: None,
        })
    }
}
