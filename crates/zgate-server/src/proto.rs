//! Decoded request and reply frames.
//!
//! These mirror the argument structures the wire codec produces from
//! inbound PDUs. Each reply struct carries a `diag` slot; the dispatcher
//! fills it when a handler fails with a protocol-level diagnostic.

use zgate_core::backend::ScanTerm;
use zgate_core::diag::Diagnostic;
use zgate_core::rpn::RpnNode;
use zgate_query::SortKeyRequest;

pub use zgate_record::RecordSyntax;

#[derive(Debug, Clone, Default)]
pub struct InitRequest {
    pub username: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Clone)]
pub struct SearchRequest {
    pub setname: String,
    pub databases: Vec<String>,
    pub query: RpnNode,
}

/// One-based window request over a result set.
#[derive(Debug, Clone)]
pub struct PresentRequest {
    pub setname: String,
    pub start: u64,
    pub number: u64,
}

#[derive(Debug, Clone)]
pub struct FetchRequest {
    pub setname: String,
    /// One-based record position.
    pub offset: u64,
    /// Record syntax as the client sent it: a symbolic name or an OID.
    pub syntax: String,
    pub schema: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ScanRequest {
    pub databases: Vec<String>,
    pub query: RpnNode,
    pub number: u64,
    pub position: u64,
    pub step_size: u64,
}

#[derive(Debug, Clone)]
pub struct SortRequest {
    pub input: Vec<String>,
    pub output: String,
    pub sequence: Vec<SortKeyRequest>,
}

#[derive(Debug, Clone, Default)]
pub struct DeleteRequest {
    pub setnames: Vec<String>,
}

#[derive(Debug, Clone)]
pub enum Request {
    Init(InitRequest),
    Search(SearchRequest),
    Present(PresentRequest),
    Fetch(FetchRequest),
    Scan(ScanRequest),
    Sort(SortRequest),
    Delete(DeleteRequest),
    Close,
}

#[derive(Debug, Clone, Default)]
pub struct InitResponse {
    pub implementation_id: String,
    pub implementation_name: String,
    pub implementation_version: String,
    pub diag: Option<Diagnostic>,
}

#[derive(Debug, Clone, Default)]
pub struct SearchResponse {
    pub hits: u64,
    pub diag: Option<Diagnostic>,
}

#[derive(Debug, Clone, Default)]
pub struct PresentResponse {
    pub diag: Option<Diagnostic>,
}

#[derive(Debug, Clone, Default)]
pub struct FetchResponse {
    pub record: Vec<u8>,
    /// Syntax of the payload actually delivered.
    pub syntax: Option<RecordSyntax>,
    pub schema: Option<String>,
    pub diag: Option<Diagnostic>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScanStatus {
    #[default]
    Success,
    Partial,
}

#[derive(Debug, Clone, Default)]
pub struct ScanResponse {
    pub entries: Vec<ScanTerm>,
    pub status: ScanStatus,
    pub diag: Option<Diagnostic>,
}

#[derive(Debug, Clone, Default)]
pub struct SortResponse {
    pub diag: Option<Diagnostic>,
}

#[derive(Debug, Clone)]
pub struct DeleteResponse {
    pub success: bool,
    pub diag: Option<Diagnostic>,
}

impl Default for DeleteResponse {
    fn default() -> Self {
        Self {
            success: true,
            diag: None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct CloseResponse {}

#[derive(Debug, Clone)]
pub enum Response {
    Init(InitResponse),
    Search(SearchResponse),
    Present(PresentResponse),
    Fetch(FetchResponse),
    Scan(ScanResponse),
    Sort(SortResponse),
    Delete(DeleteResponse),
    Close(CloseResponse),
}

impl Response {
    /// The diagnostic attached to this reply, if any.
    pub fn diagnostic(&self) -> Option<&Diagnostic> {
        match self {
            Response::Init(r) => r.diag.as_ref(),
            Response::Search(r) => r.diag.as_ref(),
            Response::Present(r) => r.diag.as_ref(),
            Response::Fetch(r) => r.diag.as_ref(),
            Response::Scan(r) => r.diag.as_ref(),
            Response::Sort(r) => r.diag.as_ref(),
            Response::Delete(r) => r.diag.as_ref(),
            Response::Close(_) => None,
        }
    }
}
