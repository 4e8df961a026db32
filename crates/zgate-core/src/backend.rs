//! Back-end seam: the ZOOM-style client abstraction.
//!
//! The real client library (Z39.50 or SRU, depending on the configured
//! `zurl`) lives behind these traits. Cursor handles are returned by value
//! and owned by the session's result sets; a dropped cursor releases
//! whatever the client library holds for it.

use async_trait::async_trait;

use crate::diag::BackendError;

pub type BackendResult<T> = std::result::Result<T, BackendError>;

/// Dialect of a query handed to the back-end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryDialect {
    Pqf,
    Cql,
    Solr,
}

/// A compiled query ready for submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendQuery {
    pub dialect: QueryDialect,
    pub query: String,
    /// YAZ sortspec riding alongside the query, for targets that cannot
    /// express the sort in the query text itself.
    pub yaz_sort: Option<String>,
}

impl BackendQuery {
    pub fn pqf(query: impl Into<String>) -> Self {
        Self {
            dialect: QueryDialect::Pqf,
            query: query.into(),
            yaz_sort: None,
        }
    }

    pub fn cql(query: impl Into<String>) -> Self {
        Self {
            dialect: QueryDialect::Cql,
            query: query.into(),
            yaz_sort: None,
        }
    }

    pub fn solr(query: impl Into<String>) -> Self {
        Self {
            dialect: QueryDialect::Solr,
            query: query.into(),
            yaz_sort: None,
        }
    }

    pub fn with_sort(mut self, spec: impl Into<String>) -> Self {
        self.yaz_sort = Some(spec.into());
        self
    }
}

/// Scan window parameters, forwarded as the back-end options `number`,
/// `position` and `stepSize`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanOptions {
    pub number: u64,
    pub position: u64,
    pub step_size: u64,
}

/// One entry of a scan response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanTerm {
    pub term: String,
    pub occurrences: u64,
}

/// A live result cursor for one executed search.
#[async_trait]
pub trait ResultCursor: Send {
    /// Total hit count reported by the back-end.
    fn hits(&self) -> u64;

    /// Back-end-assigned result-set id, when the target reports one.
    fn result_set_id(&self) -> Option<String>;

    fn set_option(&mut self, key: &str, value: &str);

    /// Position the retrieval window over `[start, start + count)`,
    /// zero-based.
    async fn present(&mut self, start: u64, count: u64) -> BackendResult<()>;

    /// Retrieve one record as XML (zero-based offset). A per-record
    /// surrogate diagnostic surfaces as the error case.
    async fn record(&mut self, offset: u64, charset: &str) -> BackendResult<String>;
}

/// An open connection to one back-end.
#[async_trait]
pub trait Connection: Send {
    fn set_option(&mut self, key: &str, value: &str);

    fn option(&self, key: &str) -> Option<String>;

    async fn search(&mut self, query: &BackendQuery) -> BackendResult<Box<dyn ResultCursor>>;

    async fn scan(
        &mut self,
        query: &BackendQuery,
        opts: &ScanOptions,
    ) -> BackendResult<Vec<ScanTerm>>;
}

/// Factory for back-end connections.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Open a connection to `zurl` with the given option set, applied in
    /// order before connecting.
    async fn connect(
        &self,
        zurl: &str,
        options: &[(String, String)],
    ) -> BackendResult<Box<dyn Connection>>;
}
