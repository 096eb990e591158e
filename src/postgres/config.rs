use std::future::Future;
use std::str::FromStr;

use bb8::{ManageConnection, Pool};
use serde::Deserialize;
use tokio_postgres::{Client, NoTls};
use tracing::debug;

use crate::dialect::Dialect;
use crate::error::SqlMutationError;
use crate::pool::{ConfigAndPool, MiddlewarePool};

/// bb8 manager for Postgres clients.
pub struct PgManager {
    pub(crate) config: tokio_postgres::Config,
}

impl PgManager {
    #[must_use]
    pub fn new(config: tokio_postgres::Config) -> Self {
        Self { config }
    }

    /// Build a pool from this manager.
    ///
    /// # Errors
    /// Returns `SqlMutationError` if pool creation fails.
    pub async fn build_pool(
        self,
        max_size: Option<u32>,
    ) -> Result<Pool<PgManager>, SqlMutationError> {
        let mut builder = Pool::builder();
        if let Some(max_size) = max_size {
            builder = builder.max_size(max_size);
        }
        builder
            .build(self)
            .await
            .map_err(|e| SqlMutationError::ConnectionError(format!("postgres pool error: {e}")))
    }
}

impl ManageConnection for PgManager {
    type Connection = Client;
    type Error = tokio_postgres::Error;

    #[allow(clippy::manual_async_fn)]
    fn connect(&self) -> impl Future<Output = Result<Self::Connection, Self::Error>> + Send {
        let cfg = self.config.clone();
        async move {
            debug!(
                hosts = ?cfg.get_hosts(),
                db = ?cfg.get_dbname(),
                user = ?cfg.get_user(),
                "postgres connect start"
            );
            let (client, connection) = cfg.connect(NoTls).await?;
            tokio::spawn(async move {
                if let Err(e) = connection.await {
                    debug!(error = %e, "postgres connection closed with error");
                }
            });
            Ok(client)
        }
    }

    #[allow(clippy::manual_async_fn)]
    fn is_valid(
        &self,
        conn: &mut Self::Connection,
    ) -> impl Future<Output = Result<(), Self::Error>> + Send {
        async move { conn.simple_query("SELECT 1").await.map(|_| ()) }
    }

    fn has_broken(&self, conn: &mut Self::Connection) -> bool {
        conn.is_closed()
    }
}

/// Options for configuring a Postgres pool.
///
/// Either `url` or the discrete `host`/`dbname`/`user` fields must be given; discrete fields
/// override what the URL says.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PostgresOptions {
    pub url: Option<String>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub dbname: Option<String>,
    pub user: Option<String>,
    pub password: Option<String>,
    pub max_size: Option<u32>,
}

impl PostgresOptions {
    /// Options from a `postgres://` URL or a key/value connection string.
    #[must_use]
    pub fn from_url(url: impl Into<String>) -> Self {
        Self {
            url: Some(url.into()),
            ..Self::default()
        }
    }

    /// Resolve into a driver config.
    ///
    /// # Errors
    /// `ConfigError` when the URL does not parse or a required field is missing.
    pub fn to_config(&self) -> Result<tokio_postgres::Config, SqlMutationError> {
        let mut cfg = match &self.url {
            Some(url) => tokio_postgres::Config::from_str(url)
                .map_err(|e| SqlMutationError::ConfigError(format!("invalid postgres url: {e}")))?,
            None => tokio_postgres::Config::new(),
        };
        if let Some(host) = &self.host {
            cfg.host(host);
        }
        if let Some(port) = self.port {
            cfg.port(port);
        }
        if let Some(dbname) = &self.dbname {
            cfg.dbname(dbname);
        }
        if let Some(user) = &self.user {
            cfg.user(user);
        }
        if let Some(password) = &self.password {
            cfg.password(password);
        }

        if cfg.get_hosts().is_empty() {
            return Err(SqlMutationError::ConfigError("host is required".to_string()));
        }
        if cfg.get_dbname().is_none() {
            return Err(SqlMutationError::ConfigError(
                "dbname is required".to_string(),
            ));
        }
        if cfg.get_user().is_none() {
            return Err(SqlMutationError::ConfigError("user is required".to_string()));
        }
        Ok(cfg)
    }
}

/// Fluent builder for Postgres options.
#[derive(Debug, Clone, Default)]
pub struct PostgresOptionsBuilder {
    opts: PostgresOptions,
}

impl PostgresOptionsBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.opts.url = Some(url.into());
        self
    }

    #[must_use]
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.opts.host = Some(host.into());
        self
    }

    #[must_use]
    pub fn port(mut self, port: u16) -> Self {
        self.opts.port = Some(port);
        self
    }

    #[must_use]
    pub fn dbname(mut self, dbname: impl Into<String>) -> Self {
        self.opts.dbname = Some(dbname.into());
        self
    }

    #[must_use]
    pub fn user(mut self, user: impl Into<String>) -> Self {
        self.opts.user = Some(user.into());
        self
    }

    #[must_use]
    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.opts.password = Some(password.into());
        self
    }

    #[must_use]
    pub fn max_size(mut self, max_size: u32) -> Self {
        self.opts.max_size = Some(max_size);
        self
    }

    #[must_use]
    pub fn finish(self) -> PostgresOptions {
        self.opts
    }

    /// Build a `ConfigAndPool` for Postgres.
    ///
    /// # Errors
    /// Returns `SqlMutationError` if the options are incomplete or the pool cannot be built.
    pub async fn build(self) -> Result<ConfigAndPool, SqlMutationError> {
        ConfigAndPool::new_postgres(self.finish()).await
    }
}

impl ConfigAndPool {
    #[must_use]
    pub fn postgres_builder() -> PostgresOptionsBuilder {
        PostgresOptionsBuilder::new()
    }

    /// Open a Postgres pool.
    ///
    /// The server version is not probed here; it is read once, on the first mutation that needs
    /// it.
    ///
    /// # Errors
    /// Returns `SqlMutationError::ConfigError` if required config fields are missing or
    /// `SqlMutationError::ConnectionError` if pool creation fails.
    pub async fn new_postgres(opts: PostgresOptions) -> Result<Self, SqlMutationError> {
        let config = opts.to_config()?;
        let pool = PgManager::new(config).build_pool(opts.max_size).await?;
        Ok(ConfigAndPool::from_pool(
            MiddlewarePool::Postgres(pool),
            Dialect::Postgres,
        ))
    }
}
