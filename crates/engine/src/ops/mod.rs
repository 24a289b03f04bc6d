use std::{collections::HashMap, sync::Arc, time::Duration};

use sea_orm::DatabaseConnection;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use crate::{EngineError, ResultEngine};

mod categories;
mod closures;
mod templates;
mod transactions;
mod workspaces;

pub use closures::{ClosureDetails, PeriodSummary};

/// Run a block inside a DB transaction, committing on success and rolling back on error.
macro_rules! with_tx {
    ($self:expr, |$tx:ident| $body:expr) => {{
        let $tx = $self.database.begin().await?;
        let result = $body;
        match result {
            Ok(value) => {
                $tx.commit().await?;
                Ok(value)
            }
            Err(err) => Err(err),
        }
    }};
}

pub(crate) use with_tx;

const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EngineConfig {
    /// How long a period-scoped write waits for its workspace before giving
    /// up with `ConcurrencyConflict`.
    pub lock_timeout: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            lock_timeout: DEFAULT_LOCK_TIMEOUT,
        }
    }
}

#[derive(Debug)]
pub struct Engine {
    database: DatabaseConnection,
    config: EngineConfig,
    locks: Mutex<HashMap<Uuid, Arc<Mutex<()>>>>,
}

impl Engine {
    /// Return a builder for `Engine`. Help to build the struct.
    pub fn builder() -> EngineBuilder {
        EngineBuilder::default()
    }

    #[must_use]
    pub fn config(&self) -> EngineConfig {
        self.config
    }

    /// Serialize period-scoped writes of one workspace.
    async fn lock_workspace(&self, workspace_id: Uuid) -> ResultEngine<OwnedMutexGuard<()>> {
        let lock = {
            let mut locks = self.locks.lock().await;
            Arc::clone(locks.entry(workspace_id).or_default())
        };
        tokio::time::timeout(self.config.lock_timeout, lock.lock_owned())
            .await
            .map_err(|_| {
                EngineError::ConcurrencyConflict(format!(
                    "workspace {workspace_id} is busy, gave up after {:?}",
                    self.config.lock_timeout
                ))
            })
    }
}

/// The builder for `Engine`
#[derive(Default)]
pub struct EngineBuilder {
    database: DatabaseConnection,
    config: EngineConfig,
}

impl EngineBuilder {
    /// Pass the required database
    pub fn database(mut self, db: DatabaseConnection) -> EngineBuilder {
        self.database = db;
        self
    }

    pub fn config(mut self, config: EngineConfig) -> EngineBuilder {
        self.config = config;
        self
    }

    pub fn lock_timeout(mut self, lock_timeout: Duration) -> EngineBuilder {
        self.config.lock_timeout = lock_timeout;
        self
    }

    /// Construct `Engine`
    pub async fn build(self) -> ResultEngine<Engine> {
        Ok(Engine {
            database: self.database,
            config: self.config,
            locks: Mutex::new(HashMap::new()),
        })
    }
}
