//! Record-syntax conversion.
//!
//! Takes the XML a back-end hands us and emits whatever the client asked
//! for: binary MARC21 (ISO 2709), GRS-1 tagged lines, a SUTRS text dump, or
//! the XML untouched. Everything except XML is driven by the per-database
//! field-mapping rules from the configuration.

pub mod grs1;
pub mod marc;
pub mod sutrs;
pub mod xml;

use zgate_core::config::DatabaseConfig;
use zgate_core::diag::{bib1, Diagnostic};

/// Output record syntaxes the gateway advertises.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordSyntax {
    Xml,
    Usmarc,
    Grs1,
    Sutrs,
}

impl RecordSyntax {
    /// Accepts both the symbolic names and the record-syntax OIDs the
    /// client may send.
    pub fn parse(requested: &str) -> Option<Self> {
        match requested.to_ascii_lowercase().as_str() {
            "xml" | "1.2.840.10003.5.109.10" => Some(RecordSyntax::Xml),
            "usmarc" | "marc21" | "1.2.840.10003.5.10" => Some(RecordSyntax::Usmarc),
            "grs1" | "grs-1" | "1.2.840.10003.5.105" => Some(RecordSyntax::Grs1),
            "sutrs" | "1.2.840.10003.5.101" => Some(RecordSyntax::Sutrs),
            _ => None,
        }
    }

    /// Key under the database's `record` table.
    pub fn config_key(&self) -> &'static str {
        match self {
            RecordSyntax::Xml => "xml",
            RecordSyntax::Usmarc => "usmarc",
            RecordSyntax::Grs1 => "grs1",
            RecordSyntax::Sutrs => "sutrs",
        }
    }
}

/// Diagnostic 238 carrying the sorted list of syntaxes this database can
/// actually deliver.
pub fn unsupported_syntax(db: &DatabaseConfig) -> Diagnostic {
    Diagnostic::new(bib1::SYNTAX_UNSUPPORTED, db.supported_syntaxes().join(","))
}

/// Convert one back-end XML record into the requested syntax.
pub fn convert(
    record_xml: &str,
    syntax: RecordSyntax,
    db: &DatabaseConfig,
) -> Result<Vec<u8>, Diagnostic> {
    if syntax == RecordSyntax::Xml {
        return Ok(record_xml.as_bytes().to_vec());
    }

    let specs = db
        .record
        .get(syntax.config_key())
        .ok_or_else(|| unsupported_syntax(db))?;

    let doc = roxmltree::Document::parse(record_xml).map_err(|e| {
        Diagnostic::new(bib1::UNSPECIFIED_ERROR, format!("record is not XML: {}", e))
    })?;

    match syntax {
        RecordSyntax::Usmarc => {
            let patch = db
                .option
                .get("explicit_availability")
                .map(|v| !v.is_empty() && v != "0")
                .unwrap_or(false);
            marc::to_marc21(&doc, specs, patch)
        }
        RecordSyntax::Grs1 => Ok(grs1::to_grs1(&doc, specs).into_bytes()),
        RecordSyntax::Sutrs => Ok(sutrs::to_sutrs(&doc).into_bytes()),
        RecordSyntax::Xml => unreachable!("xml handled above"),
    }
}
