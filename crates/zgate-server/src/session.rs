//! The gateway and its per-client sessions.
//!
//! `Gateway` owns the current configuration snapshot and the back-end
//! connector; the wire server creates one `Session` per client and calls
//! `dispatch` for every decoded PDU. All session state (connections,
//! result sets, credentials) is private to the session, so no locking is
//! needed inside it.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use zgate_core::backend::{BackendQuery, Connection, Connector};
use zgate_core::config::{DatabaseConfig, GatewayConfig, QueryType};
use zgate_core::diag::{bib1, Diagnostic};
use zgate_core::rpn::RpnNode;
use zgate_core::{GatewayError, Result};
use zgate_query::{cql, pqf, solr};

use crate::auth;
use crate::proto::{
    CloseResponse, DeleteRequest, DeleteResponse, FetchResponse, InitRequest, InitResponse,
    PresentResponse, Request, Response, ScanResponse, SearchResponse, SortResponse,
};
use crate::resultset::{ResultSet, SetRegistry};

const IMPLEMENTATION_ID: &str = "81";
const IMPLEMENTATION_NAME: &str = "zgate";

/// Process-wide gateway state shared by all sessions.
pub struct Gateway {
    config_path: Option<String>,
    config: RwLock<Arc<GatewayConfig>>,
    connector: Arc<dyn Connector>,
}

impl Gateway {
    /// Gateway over an already-built configuration (no reload source).
    pub fn new(config: GatewayConfig, connector: Arc<dyn Connector>) -> Self {
        Self {
            config_path: None,
            config: RwLock::new(Arc::new(config)),
            connector,
        }
    }

    /// Gateway backed by a configuration file, re-read at every Init.
    pub fn from_file(path: impl Into<String>, connector: Arc<dyn Connector>) -> Result<Self> {
        let path = path.into();
        let config = GatewayConfig::load(&path)?;
        Ok(Self {
            config_path: Some(path),
            config: RwLock::new(Arc::new(config)),
            connector,
        })
    }

    /// Re-read the configuration file, replacing the shared snapshot.
    /// Sessions keep the snapshot they captured at Init.
    pub fn reload(&self) -> Result<()> {
        let Some(path) = &self.config_path else {
            return Ok(());
        };
        let fresh = Arc::new(GatewayConfig::load(path)?);
        let mut guard = self
            .config
            .write()
            .map_err(|_| GatewayError::Internal("config lock poisoned".to_string()))?;
        *guard = fresh;
        tracing::info!(path = %path, "configuration reloaded");
        Ok(())
    }

    pub fn current_config(&self) -> Arc<GatewayConfig> {
        match self.config.read() {
            Ok(guard) => Arc::clone(&guard),
            Err(poisoned) => Arc::clone(&poisoned.into_inner()),
        }
    }

    /// Create a session for one client connection.
    pub fn session(self: &Arc<Self>) -> Session {
        Session {
            gateway: Arc::clone(self),
            config: self.current_config(),
            connector: Arc::clone(&self.connector),
            connections: HashMap::new(),
            resultsets: HashMap::new(),
            username: None,
            password: None,
        }
    }
}

/// One client session, alive from Init to Close.
pub struct Session {
    gateway: Arc<Gateway>,
    pub(crate) config: Arc<GatewayConfig>,
    pub(crate) connector: Arc<dyn Connector>,
    pub(crate) connections: HashMap<String, Box<dyn Connection>>,
    pub(crate) resultsets: HashMap<String, ResultSet>,
    pub(crate) username: Option<String>,
    pub(crate) password: Option<String>,
}

/// Failure barrier: protocol-level errors become the reply's diagnostic;
/// anything else propagates and takes the session down.
fn barrier<T>(result: Result<T>, with_diag: impl FnOnce(Diagnostic) -> T) -> Result<T> {
    match result {
        Ok(value) => Ok(value),
        Err(GatewayError::Diag(diag)) => {
            tracing::debug!(code = diag.code, addinfo = %diag.addinfo, "request failed");
            Ok(with_diag(diag))
        }
        Err(GatewayError::Backend(err)) => {
            let diag = err.to_diagnostic();
            tracing::debug!(code = diag.code, addinfo = %diag.addinfo, "back-end failure");
            Ok(with_diag(diag))
        }
        Err(fatal) => Err(fatal),
    }
}

impl Session {
    /// Handle one decoded request, producing the matching reply.
    pub async fn dispatch(&mut self, request: Request) -> Result<Response> {
        match request {
            Request::Init(req) => Ok(Response::Init(barrier(
                self.handle_init(req).await,
                |diag| InitResponse {
                    diag: Some(diag),
                    ..Default::default()
                },
            )?)),
            Request::Search(req) => Ok(Response::Search(barrier(
                self.handle_search(req).await,
                |diag| SearchResponse {
                    diag: Some(diag),
                    ..Default::default()
                },
            )?)),
            Request::Present(req) => Ok(Response::Present(barrier(
                self.handle_present(req).await,
                |diag| PresentResponse { diag: Some(diag) },
            )?)),
            Request::Fetch(req) => Ok(Response::Fetch(barrier(
                self.handle_fetch(req).await,
                |diag| FetchResponse {
                    diag: Some(diag),
                    ..Default::default()
                },
            )?)),
            Request::Scan(req) => Ok(Response::Scan(barrier(
                self.handle_scan(req).await,
                |diag| ScanResponse {
                    diag: Some(diag),
                    ..Default::default()
                },
            )?)),
            Request::Sort(req) => Ok(Response::Sort(barrier(
                self.handle_sort(req).await,
                |diag| SortResponse { diag: Some(diag) },
            )?)),
            Request::Delete(req) => Ok(Response::Delete(self.handle_delete(req))),
            Request::Close => Ok(Response::Close(self.handle_close())),
        }
    }

    async fn handle_init(&mut self, req: InitRequest) -> Result<InitResponse> {
        self.gateway.reload()?;
        self.config = self.gateway.current_config();
        self.username = req.username.clone();
        self.password = req.password.clone();

        if let Some(template) = self.config.authentication.clone() {
            auth::check_credentials(&template, req.username.as_deref(), req.password.as_deref())
                .await?;
        }

        tracing::info!("session initialized");
        Ok(InitResponse {
            implementation_id: IMPLEMENTATION_ID.to_string(),
            implementation_name: IMPLEMENTATION_NAME.to_string(),
            implementation_version: env!("CARGO_PKG_VERSION").to_string(),
            diag: None,
        })
    }

    fn handle_delete(&mut self, req: DeleteRequest) -> DeleteResponse {
        // ZOOM/SRU has no delete-set; report success but keep a trace of the
        // client's intent.
        tracing::debug!(sets = ?req.setnames, "delete-set ignored");
        DeleteResponse::default()
    }

    fn handle_close(&mut self) -> CloseResponse {
        // Cursors hold back-end state tied to the connections; drop them
        // first.
        self.resultsets.clear();
        self.connections.clear();
        tracing::info!("session closed");
        CloseResponse {}
    }

    /// A result set by client-visible name.
    pub fn result_set(&self, name: &str) -> Option<&ResultSet> {
        self.resultsets.get(name)
    }

    /// All result sets currently held by the session.
    pub fn result_sets(&self) -> impl Iterator<Item = &ResultSet> {
        self.resultsets.values()
    }

    /// Databases with an open back-end connection in this session.
    pub fn connected_databases(&self) -> Vec<String> {
        self.connections.keys().cloned().collect()
    }

    /// Resolve a request's database list to exactly one configuration.
    pub(crate) fn resolve_database(
        &self,
        databases: &[String],
    ) -> Result<(String, Arc<DatabaseConfig>)> {
        if databases.len() != 1 {
            return Err(Diagnostic::new(bib1::TOO_MANY_DATABASES, databases.join(",")).into());
        }
        let name = databases[0].clone();
        let db = self.config.resolve(&name)?;
        Ok((name, db))
    }

    /// Compile an RPN tree for the database's configured dialect.
    pub(crate) fn compile_query(
        &self,
        rpn: &RpnNode,
        db: &DatabaseConfig,
    ) -> Result<BackendQuery> {
        let sets = SetRegistry(&self.resultsets);
        let query = match db.querytype() {
            Some(QueryType::Cql) => BackendQuery::cql(cql::compile(rpn, db, &sets)?),
            Some(QueryType::Solr) => BackendQuery::solr(solr::compile(rpn, db, &sets)?),
            None => BackendQuery::pqf(pqf::compile(rpn)),
        };
        Ok(query)
    }
}
