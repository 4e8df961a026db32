//! BIB-1 diagnostics and back-end failure translation.
//!
//! The gateway reports every protocol-level problem as a BIB-1 diagnostic
//! attached to the current reply. Failures raised by the back-end arrive
//! tagged with their own diagnostic set and are translated here: Bib-1 codes
//! pass through verbatim, SRW codes go through a fixed mapping table, a
//! failed connect becomes 109, and anything else becomes 100 with the
//! provider's message.

use thiserror::Error;

/// BIB-1 diagnostic codes on the gateway's client-facing surface.
pub mod bib1 {
    pub const PERMANENT_SYSTEM_ERROR: u16 = 1;
    pub const TEMPORARY_SYSTEM_ERROR: u16 = 2;
    pub const PRESENT_OUT_OF_RANGE: u16 = 13;
    pub const SYSTEM_ERROR_PRESENTING_RECORDS: u16 = 14;
    pub const RECORD_EXCEEDS_MESSAGE_SIZE: u16 = 17;
    pub const RESULT_SET_UNSUPPORTED_AS_TERM: u16 = 18;
    pub const NAMED_RESULT_SETS_UNSUPPORTED: u16 = 22;
    pub const UNSPECIFIED_ERROR: u16 = 100;
    pub const MALFORMED_QUERY: u16 = 108;
    pub const DATABASE_UNAVAILABLE: u16 = 109;
    pub const OPERATOR_UNSUPPORTED: u16 = 110;
    pub const TOO_MANY_DATABASES: u16 = 111;
    pub const UNSUPPORTED_ATTRIBUTE_TYPE: u16 = 113;
    pub const UNSUPPORTED_USE_ATTRIBUTE: u16 = 114;
    pub const UNSUPPORTED_RELATION_ATTRIBUTE: u16 = 117;
    pub const UNSUPPORTED_ATTRIBUTE_COMBINATION: u16 = 118;
    pub const UNSUPPORTED_POSITION_ATTRIBUTE: u16 = 119;
    pub const UNSUPPORTED_TRUNCATION_ATTRIBUTE: u16 = 120;
    pub const UNSUPPORTED_ATTRIBUTE_SET: u16 = 121;
    pub const UNSUPPORTED_COMPLETENESS_ATTRIBUTE: u16 = 122;
    pub const ILLEGAL_RESULT_SET_NAME: u16 = 128;
    pub const DATABASE_DOES_NOT_EXIST: u16 = 235;
    pub const UNSUPPORTED_SORT_ATTRIBUTE: u16 = 237;
    pub const SYNTAX_UNSUPPORTED: u16 = 238;
    pub const AUTHENTICATION_FAILED: u16 = 1014;
}

/// A client-facing BIB-1 diagnostic: code plus additional-info string.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("bib-1 diagnostic {code} ({addinfo})")]
pub struct Diagnostic {
    pub code: u16,
    pub addinfo: String,
}

impl Diagnostic {
    pub fn new(code: u16, addinfo: impl Into<String>) -> Self {
        Self {
            code,
            addinfo: addinfo.into(),
        }
    }
}

/// A failure surfaced by the back-end seam, tagged with its diagnostic set.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    #[error("back-end bib-1 diagnostic {code} ({addinfo})")]
    Bib1 { code: u16, addinfo: String },
    #[error("srw diagnostic {code} ({addinfo})")]
    Srw { code: u16, addinfo: String },
    #[error("connect failed: {0}")]
    Connect(String),
    #[error("zoom error: {0}")]
    Zoom(String),
}

impl BackendError {
    /// Translate into the client-facing BIB-1 diagnostic.
    pub fn to_diagnostic(&self) -> Diagnostic {
        match self {
            BackendError::Bib1 { code, addinfo } => Diagnostic::new(*code, addinfo.clone()),
            BackendError::Srw { code, addinfo } => srw_to_bib1(*code, addinfo),
            BackendError::Connect(msg) => Diagnostic::new(bib1::DATABASE_UNAVAILABLE, msg.clone()),
            BackendError::Zoom(msg) => Diagnostic::new(bib1::UNSPECIFIED_ERROR, msg.clone()),
        }
    }
}

/// Fixed SRW-to-BIB-1 mapping. Codes with no entry map to 100 with the
/// provider's message preserved as addinfo.
pub fn srw_to_bib1(code: u16, addinfo: &str) -> Diagnostic {
    let mapped = match code {
        1 => bib1::PERMANENT_SYSTEM_ERROR,
        2 => bib1::TEMPORARY_SYSTEM_ERROR,
        3 => bib1::AUTHENTICATION_FAILED,
        10 | 11 | 12 => bib1::MALFORMED_QUERY,
        16 => bib1::UNSUPPORTED_USE_ATTRIBUTE,
        19 | 20 => bib1::UNSUPPORTED_RELATION_ATTRIBUTE,
        22 => bib1::UNSUPPORTED_ATTRIBUTE_COMBINATION,
        37 => bib1::OPERATOR_UNSUPPORTED,
        50 => bib1::RESULT_SET_UNSUPPORTED_AS_TERM,
        51 => bib1::ILLEGAL_RESULT_SET_NAME,
        61 => bib1::PRESENT_OUT_OF_RANGE,
        64 => bib1::SYSTEM_ERROR_PRESENTING_RECORDS,
        66 | 67 | 68 => bib1::SYNTAX_UNSUPPORTED,
        70 => bib1::RECORD_EXCEEDS_MESSAGE_SIZE,
        235 => bib1::DATABASE_DOES_NOT_EXIST,
        _ => bib1::UNSPECIFIED_ERROR,
    };
    Diagnostic::new(mapped, addinfo)
}
