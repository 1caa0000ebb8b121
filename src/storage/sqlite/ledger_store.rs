//! SQLite LedgerStore implementation.

use async_trait::async_trait;
use sea_query::{Expr, OnConflict, Query, SqliteQueryBuilder};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{Row, Sqlite, SqliteConnection, SqlitePool};
use tracing::info;

use crate::config::SqliteConfig;
use crate::storage::schema::{Lmids, CREATE_LMIDS_TABLE_SQLITE};
use crate::storage::{LedgerStore, LedgerTransaction, Result};

/// In-memory SQLite path. Every pooled connection would get its own
/// database, so the pool is pinned to a single connection.
const MEMORY_PATH: &str = ":memory:";

/// SQLite implementation of LedgerStore.
#[derive(Debug, Clone)]
pub struct SqliteLedgerStore {
    pool: SqlitePool,
}

impl SqliteLedgerStore {
    /// Create a new SQLite ledger store over an existing pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Connect using configuration and create the ledger table.
    pub async fn connect(config: &SqliteConfig) -> Result<Self> {
        info!(path = %config.path, "Ledger storage: sqlite");

        let pool = if config.path == MEMORY_PATH {
            SqlitePoolOptions::new()
                .max_connections(1)
                .connect("sqlite::memory:")
                .await?
        } else {
            if let Some(parent) = std::path::Path::new(&config.path).parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent)?;
                }
            }
            SqlitePoolOptions::new()
                .max_connections(config.max_connections)
                .connect(&format!("sqlite:{}?mode=rwc", config.path))
                .await?
        };

        let store = Self::new(pool);
        store.init().await?;
        Ok(store)
    }

    /// Create the ledger table if it does not exist.
    pub async fn init(&self) -> Result<()> {
        sqlx::query(CREATE_LMIDS_TABLE_SQLITE)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// The underlying pool, for handler-owned tables and migrations.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl LedgerStore for SqliteLedgerStore {
    type Tx = SqliteLedgerTransaction;

    async fn begin(&self) -> Result<SqliteLedgerTransaction> {
        let tx = self.pool.begin().await?;
        Ok(SqliteLedgerTransaction { tx })
    }

    async fn last_mutation_id(&self, client_group_id: &str, client_id: &str) -> Result<i64> {
        let query = Query::select()
            .column(Lmids::LastMutationId)
            .from(Lmids::Table)
            .and_where(Expr::col(Lmids::ClientGroupId).eq(client_group_id))
            .and_where(Expr::col(Lmids::ClientId).eq(client_id))
            .to_string(SqliteQueryBuilder);

        let row = sqlx::query(&query).fetch_optional(&self.pool).await?;

        match row {
            Some(row) => Ok(row.try_get::<i64, _>("last_mutation_id")?),
            None => Ok(0),
        }
    }
}

/// Transaction over a [`SqliteLedgerStore`].
///
/// Wraps a `sqlx` transaction; dropping it without commit rolls back.
pub struct SqliteLedgerTransaction {
    tx: sqlx::Transaction<'static, Sqlite>,
}

impl std::fmt::Debug for SqliteLedgerTransaction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteLedgerTransaction").finish_non_exhaustive()
    }
}

impl SqliteLedgerTransaction {
    /// Connection bound to this transaction, for handler writes.
    pub fn conn(&mut self) -> &mut SqliteConnection {
        &mut self.tx
    }
}

#[async_trait]
impl LedgerTransaction for SqliteLedgerTransaction {
    async fn fetch_and_increment(&mut self, client_group_id: &str, client_id: &str) -> Result<i64> {
        let updated_at = chrono::Utc::now().to_rfc3339();

        // The upsert is the first write of the transaction, so SQLite takes
        // the write lock here and competing pushes queue behind it.
        let query = Query::insert()
            .into_table(Lmids::Table)
            .columns([
                Lmids::ClientGroupId,
                Lmids::ClientId,
                Lmids::LastMutationId,
                Lmids::UpdatedAt,
            ])
            .values_panic([
                client_group_id.into(),
                client_id.into(),
                1i64.into(),
                updated_at.clone().into(),
            ])
            .on_conflict(
                OnConflict::columns([Lmids::ClientGroupId, Lmids::ClientId])
                    .value(
                        Lmids::LastMutationId,
                        Expr::col((Lmids::Table, Lmids::LastMutationId)).add(1),
                    )
                    .value(Lmids::UpdatedAt, updated_at)
                    .to_owned(),
            )
            .returning_col(Lmids::LastMutationId)
            .to_string(SqliteQueryBuilder);

        let row = sqlx::query(&query).fetch_one(&mut *self.tx).await?;
        Ok(row.try_get::<i64, _>("last_mutation_id")?)
    }

    async fn commit(self) -> Result<()> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self) -> Result<()> {
        self.tx.rollback().await?;
        Ok(())
    }
}
