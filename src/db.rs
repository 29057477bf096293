//! Lazily-established, process-shared database handle.
//!
//! [`ConnectionCache`] owns the only path to a live store handle. The first
//! caller starts a connection attempt; callers arriving while it is in flight
//! await the same attempt, and once it succeeds every later call gets the
//! cached handle back without touching the network. A failed attempt is
//! forgotten so the next call starts over.

use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use serde::Serialize;
use schemars::JsonSchema;
use sqlx::PgPool;
use sqlx::migrate::Migrator;
use sqlx::postgres::PgPoolOptions;
use std::fmt;

use crate::config::DatabaseConfig;

pub static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// The store could not be reached or refused the session.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("could not connect to {target}: {reason}")]
pub struct ConnectionError {
    pub target: String,
    pub reason: String,
}

impl ConnectionError {
    pub fn new(target: impl Into<String>, reason: impl fmt::Display) -> Self {
        Self {
            target: target.into(),
            reason: reason.to_string(),
        }
    }
}

/// Observable lifecycle of a [`ConnectionCache`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    Unconnected,
    Connecting,
    Connected,
    Failed,
}

/// Something that can open a handle to the backing store.
pub trait Connector: Send + Sync + 'static {
    type Handle: Clone + Send + Sync + 'static;

    /// Credential-free label used in logs and errors.
    fn target(&self) -> String;

    fn connect(&self) -> BoxFuture<'static, Result<Self::Handle, ConnectionError>>;
}

type PendingConnect<H> = Shared<BoxFuture<'static, Result<H, ConnectionError>>>;

enum Slot<H> {
    Unconnected,
    Connecting(PendingConnect<H>),
    Connected(H),
    Failed,
}

/// Single-flight cache around a [`Connector`].
pub struct ConnectionCache<C: Connector> {
    connector: C,
    slot: Mutex<Slot<C::Handle>>,
}

impl<C: Connector> ConnectionCache<C> {
    pub fn new(connector: C) -> Self {
        Self {
            connector,
            slot: Mutex::new(Slot::Unconnected),
        }
    }

    pub fn state(&self) -> ConnectionState {
        match &*self.slot.lock() {
            Slot::Unconnected => ConnectionState::Unconnected,
            Slot::Connecting(_) => ConnectionState::Connecting,
            Slot::Connected(_) => ConnectionState::Connected,
            Slot::Failed => ConnectionState::Failed,
        }
    }

    /// The cached handle, if a connection has been established.
    pub fn connected(&self) -> Option<C::Handle> {
        match &*self.slot.lock() {
            Slot::Connected(handle) => Some(handle.clone()),
            _ => None,
        }
    }

    pub fn target(&self) -> String {
        self.connector.target()
    }

    /// Return the shared handle, connecting first if nobody has yet.
    pub async fn acquire(&self) -> Result<C::Handle, ConnectionError> {
        let pending = {
            let mut slot = self.slot.lock();
            match &*slot {
                Slot::Connected(handle) => return Ok(handle.clone()),
                Slot::Connecting(pending) => pending.clone(),
                Slot::Unconnected | Slot::Failed => {
                    log::info!("connecting to database at {}", self.connector.target());
                    let pending = self.connector.connect().shared();
                    *slot = Slot::Connecting(pending.clone());
                    pending
                }
            }
        };

        let outcome = pending.clone().await;

        let mut slot = self.slot.lock();
        // Only the attempt that is still current may settle the slot.
        if let Slot::Connecting(current) = &*slot {
            if current.ptr_eq(&pending) {
                *slot = match &outcome {
                    Ok(handle) => {
                        log::info!("database connection established");
                        Slot::Connected(handle.clone())
                    }
                    Err(err) => {
                        log::error!("database connection failed: {}", err);
                        Slot::Failed
                    }
                };
            }
        }

        outcome
    }
}

/// Opens a Postgres pool and brings its schema up to date.
pub struct PgConnector {
    config: DatabaseConfig,
}

impl PgConnector {
    pub fn new(config: DatabaseConfig) -> Self {
        Self { config }
    }
}

impl Connector for PgConnector {
    type Handle = PgPool;

    fn target(&self) -> String {
        self.config.target()
    }

    fn connect(&self) -> BoxFuture<'static, Result<PgPool, ConnectionError>> {
        let target = self.config.target();
        let options = self.config.connect_options.clone();
        let mut pool_options = PgPoolOptions::new().max_connections(self.config.max_connections);
        if let Some(timeout) = self.config.acquire_timeout {
            pool_options = pool_options.acquire_timeout(timeout);
        }

        async move {
            let pool = pool_options
                .connect_with(options)
                .await
                .map_err(|err| ConnectionError::new(&target, err))?;

            if let Err(err) = run_migrations(&pool).await {
                pool.close().await;
                return Err(ConnectionError::new(&target, err));
            }

            Ok(pool)
        }
        .boxed()
    }
}

/// Apply pending migrations; already-applied ones are skipped.
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    log::info!("checking database migration state");
    MIGRATOR.run(pool).await?;
    log::info!("database migrations up to date");
    Ok(())
}
