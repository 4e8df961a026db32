//! Gateway configuration model.
//!
//! Loaded from a TOML file at startup and re-read at every Init; sessions
//! keep the snapshot captured at Init-time, so a mid-session reload never
//! corrupts an in-flight request. Database names of the form `cfg:k=v&…`
//! bypass the database table entirely and are parsed into an ad-hoc config.

use serde::Deserialize;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::diag::{bib1, Diagnostic};
use crate::{GatewayError, Result};

/// Prefix marking a virtual (ad-hoc) database name.
pub const VIRTUAL_PREFIX: &str = "cfg:";

/// Process-wide gateway configuration.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct GatewayConfig {
    /// Named back-end databases, keyed by the client-visible name.
    #[serde(rename = "database", default)]
    pub databases: BTreeMap<String, DatabaseConfig>,
    /// URL template with `{user}` and `{pass}` placeholders; when present,
    /// Init requires credentials and validates them with an HTTP GET.
    pub authentication: Option<String>,
    /// Global search block, inherited by virtual databases.
    pub search: Option<SearchConfig>,
}

impl GatewayConfig {
    /// Load and validate a configuration file.
    pub fn load(path: &str) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: GatewayConfig = toml::from_str(&contents)
            .map_err(|e| GatewayError::Config(format!("{}: {}", path, e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Shape checks that should fail deployment, not client requests.
    pub fn validate(&self) -> Result<()> {
        for (name, db) in &self.databases {
            if db.zurl.is_empty() {
                return Err(GatewayError::Config(format!(
                    "database {} has no zurl",
                    name
                )));
            }
        }
        Ok(())
    }

    /// Resolve a client-supplied database name to its configuration.
    ///
    /// `cfg:` names build an ad-hoc config inheriting the global search
    /// block; unknown names fail with 235.
    pub fn resolve(&self, name: &str) -> std::result::Result<Arc<DatabaseConfig>, Diagnostic> {
        if name.starts_with(VIRTUAL_PREFIX) {
            return DatabaseConfig::from_virtual_spec(name, self.search.as_ref()).map(Arc::new);
        }
        match self.databases.get(name) {
            Some(db) => Ok(Arc::new(db.clone())),
            None => Err(Diagnostic::new(bib1::DATABASE_DOES_NOT_EXIST, name)),
        }
    }
}

/// Query dialect spoken to the back-end. Absent means PQF passthrough.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum QueryType {
    Cql,
    Solr,
}

/// Maps a BIB-1 Use attribute to a target index.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct IndexSpec {
    pub index: String,
}

/// Search configuration: target dialect and attribute-to-index map.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct SearchConfig {
    pub querytype: Option<QueryType>,
    /// Keyed by the decimal Use-attribute value (TOML table keys are
    /// strings).
    #[serde(default)]
    pub map: BTreeMap<String, IndexSpec>,
}

impl SearchConfig {
    /// Map a Use attribute to an index name. With no map configured the raw
    /// attribute value is used literally, which assumes the back-end
    /// understands numeric access points. A configured map without the
    /// attribute yields `None` (diagnostic 114 at the call site).
    pub fn index_for(&self, use_attr: u64) -> Option<String> {
        if self.map.is_empty() {
            return Some(use_attr.to_string());
        }
        self.map.get(&use_attr.to_string()).map(|m| m.index.clone())
    }
}

/// Result-set-id re-use policy for RSID query terms.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ResultSetIdPolicy {
    /// Use the back-end id when known, fall back to re-submitting the query.
    #[default]
    Fallback,
    /// Only the back-end id is acceptable.
    Id,
    /// Always re-submit the original query.
    Search,
}

/// Per-schema retrieval parameters.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct SchemaConfig {
    /// Schema name sent to the SRU back-end.
    pub sru: String,
    pub encoding: Option<String>,
    pub format: Option<String>,
}

/// One field-mapping rule: where to read in the record XML, and what MARC
/// tag (or GRS-1 tag) to emit it under.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct FieldSpec {
    #[serde(default)]
    pub xpath: String,
    pub content: String,
}

/// Configuration of one back-end database.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct DatabaseConfig {
    /// Back-end endpoint URL.
    #[serde(default)]
    pub zurl: String,
    pub search: Option<SearchConfig>,
    /// When set, only the set name "default" is accepted.
    #[serde(default)]
    pub nonamedresultsets: bool,
    #[serde(default)]
    pub resultsetid: ResultSetIdPolicy,
    /// Requested-schema name to retrieval parameters.
    #[serde(default)]
    pub schema: BTreeMap<String, SchemaConfig>,
    /// Extra charset parameters appended to record retrieval.
    pub charset: Option<String>,
    /// Arbitrary options passed through to the back-end connection.
    #[serde(default)]
    pub option: BTreeMap<String, String>,
    /// Per-output-syntax field lists, keyed by syntax name ("usmarc",
    /// "grs1", "sutrs").
    #[serde(default)]
    pub record: BTreeMap<String, Vec<FieldSpec>>,
}

impl DatabaseConfig {
    /// Parse a `cfg:k=v&k=v&…` virtual-database name. `address` is
    /// mandatory; all other keys become pass-through options on top of the
    /// defaults `timeout=120` and `sru=get`.
    pub fn from_virtual_spec(
        name: &str,
        inherited_search: Option<&SearchConfig>,
    ) -> std::result::Result<Self, Diagnostic> {
        let spec = name.strip_prefix(VIRTUAL_PREFIX).unwrap_or(name);
        let mut option: BTreeMap<String, String> = BTreeMap::new();
        option.insert("timeout".to_string(), "120".to_string());
        option.insert("sru".to_string(), "get".to_string());

        let mut zurl = None;
        for pair in spec.split('&').filter(|p| !p.is_empty()) {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            if key == "address" {
                zurl = Some(value.to_string());
            } else {
                option.insert(key.to_string(), value.to_string());
            }
        }

        let zurl = match zurl {
            Some(z) if !z.is_empty() => z,
            _ => return Err(Diagnostic::new(bib1::PERMANENT_SYSTEM_ERROR, name)),
        };

        Ok(Self {
            zurl,
            search: inherited_search.cloned(),
            option,
            ..Default::default()
        })
    }

    pub fn querytype(&self) -> Option<QueryType> {
        self.search.as_ref().and_then(|s| s.querytype)
    }

    /// Map a Use attribute through this database's search map.
    pub fn index_for(&self, use_attr: u64) -> Option<String> {
        match &self.search {
            Some(search) => search.index_for(use_attr),
            None => Some(use_attr.to_string()),
        }
    }

    /// Syntaxes this database can deliver: everything with a configured
    /// field list, plus raw XML which is always available.
    pub fn supported_syntaxes(&self) -> Vec<String> {
        let mut names: Vec<String> = self.record.keys().cloned().collect();
        names.push("xml".to_string());
        names.sort();
        names.dedup();
        names
    }
}
