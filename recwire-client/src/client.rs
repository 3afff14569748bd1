//! High-level client API.

use crate::config::ClientConfig;
use crate::connection::Connection;
use crate::error::ClientError;
use crate::record::Record;
use crate::request::RecordRequest;
use recwire_expr::Value;
use recwire_protocol::{Key, KeyValue, ResultCode};
use tokio::sync::Mutex;

/// High-level client for one server node.
///
/// The connection is opened lazily and dropped after a connection-level
/// failure; the next call reconnects. Failed requests are not retried.
pub struct Client {
    config: ClientConfig,
    conn: Mutex<Option<Connection>>,
}

impl Client {
    /// Creates a client. No connection is made yet.
    pub fn new(config: ClientConfig) -> Self {
        Self {
            config,
            conn: Mutex::new(None),
        }
    }

    /// Creates a client and connects it.
    pub async fn connect(config: ClientConfig) -> Result<Self, ClientError> {
        let client = Self::new(config);
        *client.conn.lock().await = Some(Connection::connect(&client.config).await?);
        Ok(client)
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Returns whether a connection is currently open.
    pub fn is_connected(&self) -> bool {
        self.conn.try_lock().map(|c| c.is_some()).unwrap_or(true)
    }

    /// Closes the connection, if any.
    pub async fn close(&self) -> Result<(), ClientError> {
        if let Some(conn) = self.conn.lock().await.take() {
            conn.close().await?;
        }
        Ok(())
    }

    /// Key in the configured namespace.
    pub fn key(&self, set: &str, value: impl Into<KeyValue>) -> Result<Key, ClientError> {
        Ok(Key::new(&self.config.namespace, set, value)?)
    }

    /// Runs a request with the configured timeout as its server deadline.
    pub async fn execute(&self, request: RecordRequest) -> Result<Record, ClientError> {
        let body = request
            .default_timeout(self.config.request_timeout())
            .build()?;
        let mut guard = self.conn.lock().await;
        let conn = match guard.as_mut() {
            Some(conn) => conn,
            None => guard.insert(Connection::connect(&self.config).await?),
        };

        let result = conn.execute(&body).await;
        if let Err(ref e) = result {
            if e.breaks_connection() {
                tracing::debug!("Dropping connection after error: {}", e);
                *guard = None;
            }
        }
        result
    }

    // =========================================================================
    // Record operations
    // =========================================================================

    /// Reads a record. Empty `bins` reads all bins. A missing record is `None`.
    pub async fn get(&self, key: Key, bins: &[&str]) -> Result<Option<Record>, ClientError> {
        let request = bins
            .iter()
            .fold(RecordRequest::read(key), |req, bin| req.bin(*bin));
        match self.execute(request).await {
            Ok(record) => Ok(Some(record)),
            Err(ClientError::Server {
                code: ResultCode::KeyNotFound,
            }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Writes bins, creating the record when needed.
    pub async fn put<N, V>(
        &self,
        key: Key,
        bins: impl IntoIterator<Item = (N, V)>,
    ) -> Result<(), ClientError>
    where
        N: Into<String>,
        V: Into<Value>,
    {
        let request = bins
            .into_iter()
            .fold(RecordRequest::write(key), |req, (name, value)| req.put(name, value));
        self.execute(request).await?;
        Ok(())
    }

    /// Deletes a record. Returns whether it existed.
    pub async fn delete(&self, key: Key) -> Result<bool, ClientError> {
        match self.execute(RecordRequest::delete(key)).await {
            Ok(_) => Ok(true),
            Err(ClientError::Server {
                code: ResultCode::KeyNotFound,
            }) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Checks whether a record exists.
    pub async fn exists(&self, key: Key) -> Result<bool, ClientError> {
        match self.execute(RecordRequest::exists(key)).await {
            Ok(_) => Ok(true),
            Err(ClientError::Server {
                code: ResultCode::KeyNotFound,
            }) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Runs a multi-operation request.
    pub async fn operate(&self, request: RecordRequest) -> Result<Record, ClientError> {
        self.execute(request).await
    }

    // =========================================================================
    // System operations
    // =========================================================================

    /// Runs info commands.
    pub async fn info(&self, commands: &[&str]) -> Result<Vec<(String, String)>, ClientError> {
        let mut guard = self.conn.lock().await;
        let conn = match guard.as_mut() {
            Some(conn) => conn,
            None => guard.insert(Connection::connect(&self.config).await?),
        };
        let result = conn.info(commands).await;
        if result.is_err() {
            *guard = None;
        }
        result
    }
}
