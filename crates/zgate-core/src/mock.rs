//! Scriptable mock back-end for tests.
//!
//! Ships with the crate so every layer can exercise the session machinery
//! without a live target. The script describes what the back-end returns;
//! the log records what the gateway asked of it.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use crate::backend::{
    BackendQuery, BackendResult, Connection, Connector, ResultCursor, ScanOptions, ScanTerm,
};
use crate::diag::BackendError;

/// Canned per-record response.
#[derive(Debug, Clone)]
pub enum MockRecord {
    Xml(String),
    Error(BackendError),
}

/// What the mock back-end answers with.
#[derive(Debug, Clone, Default)]
pub struct MockScript {
    pub hits: u64,
    pub result_set_id: Option<String>,
    /// Zero-based record offset to canned response.
    pub records: BTreeMap<u64, MockRecord>,
    pub scan_terms: Vec<ScanTerm>,
    /// Connection-level options readable through `Connection::option`
    /// (e.g. `sruVersion`).
    pub options: BTreeMap<String, String>,
    /// When set, `connect` fails with this message.
    pub refuse_connect: Option<String>,
}

/// Everything the gateway asked of the mock, for assertions.
#[derive(Debug, Default)]
pub struct MockLog {
    pub connects: Vec<(String, Vec<(String, String)>)>,
    pub searches: Vec<BackendQuery>,
    pub scans: Vec<(BackendQuery, ScanOptions)>,
    pub presents: Vec<(u64, u64)>,
    pub record_fetches: Vec<(u64, String)>,
    pub options_set: Vec<(String, String)>,
}

#[derive(Clone, Default)]
pub struct MockConnector {
    script: MockScript,
    log: Arc<Mutex<MockLog>>,
}

impl MockConnector {
    pub fn new(script: MockScript) -> Self {
        Self {
            script,
            log: Arc::new(Mutex::new(MockLog::default())),
        }
    }

    pub fn with_hits(hits: u64) -> Self {
        Self::new(MockScript {
            hits,
            ..Default::default()
        })
    }

    /// Run a closure over the accumulated log.
    pub fn inspect<R>(&self, f: impl FnOnce(&MockLog) -> R) -> R {
        let log = self.log.lock().expect("mock log poisoned");
        f(&log)
    }

    /// Queries issued so far, in order.
    pub fn searches(&self) -> Vec<BackendQuery> {
        self.inspect(|log| log.searches.clone())
    }

    fn log(&self) -> Arc<Mutex<MockLog>> {
        Arc::clone(&self.log)
    }
}

#[async_trait]
impl Connector for MockConnector {
    async fn connect(
        &self,
        zurl: &str,
        options: &[(String, String)],
    ) -> BackendResult<Box<dyn Connection>> {
        if let Some(msg) = &self.script.refuse_connect {
            return Err(BackendError::Connect(msg.clone()));
        }
        {
            let mut log = self.log.lock().expect("mock log poisoned");
            log.connects.push((zurl.to_string(), options.to_vec()));
        }
        let mut connection_options = self.script.options.clone();
        for (key, value) in options {
            connection_options.insert(key.clone(), value.clone());
        }
        Ok(Box::new(MockConnection {
            script: self.script.clone(),
            options: connection_options,
            log: self.log(),
        }))
    }
}

struct MockConnection {
    script: MockScript,
    options: BTreeMap<String, String>,
    log: Arc<Mutex<MockLog>>,
}

#[async_trait]
impl Connection for MockConnection {
    fn set_option(&mut self, key: &str, value: &str) {
        let mut log = self.log.lock().expect("mock log poisoned");
        log.options_set.push((key.to_string(), value.to_string()));
        drop(log);
        self.options.insert(key.to_string(), value.to_string());
    }

    fn option(&self, key: &str) -> Option<String> {
        self.options.get(key).cloned()
    }

    async fn search(&mut self, query: &BackendQuery) -> BackendResult<Box<dyn ResultCursor>> {
        tracing::debug!(query = %query.query, "mock back-end search");
        let mut log = self.log.lock().expect("mock log poisoned");
        log.searches.push(query.clone());
        drop(log);
        Ok(Box::new(MockCursor {
            script: self.script.clone(),
            log: Arc::clone(&self.log),
        }))
    }

    async fn scan(
        &mut self,
        query: &BackendQuery,
        opts: &ScanOptions,
    ) -> BackendResult<Vec<ScanTerm>> {
        let mut log = self.log.lock().expect("mock log poisoned");
        log.scans.push((query.clone(), *opts));
        Ok(self.script.scan_terms.clone())
    }
}

struct MockCursor {
    script: MockScript,
    log: Arc<Mutex<MockLog>>,
}

#[async_trait]
impl ResultCursor for MockCursor {
    fn hits(&self) -> u64 {
        self.script.hits
    }

    fn result_set_id(&self) -> Option<String> {
        self.script.result_set_id.clone()
    }

    fn set_option(&mut self, key: &str, value: &str) {
        let mut log = self.log.lock().expect("mock log poisoned");
        log.options_set.push((key.to_string(), value.to_string()));
    }

    async fn present(&mut self, start: u64, count: u64) -> BackendResult<()> {
        let mut log = self.log.lock().expect("mock log poisoned");
        log.presents.push((start, count));
        Ok(())
    }

    async fn record(&mut self, offset: u64, charset: &str) -> BackendResult<String> {
        {
            let mut log = self.log.lock().expect("mock log poisoned");
            log.record_fetches.push((offset, charset.to_string()));
        }
        match self.script.records.get(&offset) {
            Some(MockRecord::Xml(xml)) => Ok(xml.clone()),
            Some(MockRecord::Error(err)) => Err(err.clone()),
            None => Err(BackendError::Zoom(format!("no record at offset {}", offset))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::QueryDialect;

    #[tokio::test]
    async fn scripted_search_and_record() {
        let mut script = MockScript {
            hits: 42,
            result_set_id: Some("rs1".to_string()),
            ..Default::default()
        };
        script
            .records
            .insert(0, MockRecord::Xml("<doc/>".to_string()));
        let connector = MockConnector::new(script);

        let mut conn = connector
            .connect("http://backend/sru", &[("user".to_string(), "u".to_string())])
            .await
            .unwrap();
        let mut cursor = conn
            .search(&BackendQuery::cql("title = war"))
            .await
            .unwrap();
        assert_eq!(cursor.hits(), 42);
        assert_eq!(cursor.result_set_id().as_deref(), Some("rs1"));
        assert_eq!(cursor.record(0, "utf8").await.unwrap(), "<doc/>");
        assert!(cursor.record(1, "utf8").await.is_err());

        let searches = connector.searches();
        assert_eq!(searches.len(), 1);
        assert_eq!(searches[0].dialect, QueryDialect::Cql);
    }

    #[tokio::test]
    async fn refused_connect_is_a_connect_error() {
        let connector = MockConnector::new(MockScript {
            refuse_connect: Some("down".to_string()),
            ..Default::default()
        });
        let err = match connector.connect("http://backend", &[]).await {
            Ok(_) => panic!("expected connect to fail"),
            Err(e) => e,
        };
        assert!(matches!(err, BackendError::Connect(_)));
    }
}
