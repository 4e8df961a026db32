//! Lazy per-session connection pool.
//!
//! The first request touching a database opens the connection; later
//! requests in the same session reuse it. Connections die with the
//! session.

use zgate_core::backend::Connection;
use zgate_core::config::DatabaseConfig;
use zgate_core::Result;

use crate::session::Session;

impl Session {
    /// Connection for `db_name`, opening it on first use. The option set is
    /// applied in order: chunking and syntax defaults, session credentials,
    /// then the database's pass-through options.
    pub(crate) async fn connection(
        &mut self,
        db_name: &str,
        db: &DatabaseConfig,
    ) -> Result<&mut Box<dyn Connection>> {
        if !self.connections.contains_key(db_name) {
            let mut options: Vec<(String, String)> = vec![
                ("presentChunk".to_string(), "10".to_string()),
                ("preferredRecordSyntax".to_string(), "xml".to_string()),
            ];
            if let Some(username) = &self.username {
                options.push(("user".to_string(), username.clone()));
            }
            if let Some(password) = &self.password {
                options.push(("password".to_string(), password.clone()));
            }
            for (key, value) in &db.option {
                options.push((key.clone(), value.clone()));
            }

            tracing::debug!(database = db_name, zurl = %db.zurl, "opening back-end connection");
            let connection = self.connector.connect(&db.zurl, &options).await?;
            self.connections.insert(db_name.to_string(), connection);
        }
        Ok(self
            .connections
            .get_mut(db_name)
            .expect("connection inserted above"))
    }
}
