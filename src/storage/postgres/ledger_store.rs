//! PostgreSQL LedgerStore implementation.

use async_trait::async_trait;
use sea_query::{Expr, OnConflict, PostgresQueryBuilder, Query};
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgConnection, PgPool, Postgres, Row};
use tracing::info;

use crate::config::PostgresConfig;
use crate::storage::schema::{Lmids, CREATE_LMIDS_TABLE_POSTGRES};
use crate::storage::{LedgerStore, LedgerTransaction, Result};

/// PostgreSQL implementation of LedgerStore.
#[derive(Debug, Clone)]
pub struct PostgresLedgerStore {
    pool: PgPool,
}

impl PostgresLedgerStore {
    /// Create a new PostgreSQL ledger store over an existing pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect using configuration and create the ledger table.
    pub async fn connect(config: &PostgresConfig) -> Result<Self> {
        info!("Ledger storage: postgres");

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .connect(&config.uri)
            .await?;

        let store = Self::new(pool);
        store.init().await?;
        Ok(store)
    }

    /// Create the ledger table if it does not exist.
    pub async fn init(&self) -> Result<()> {
        sqlx::query(CREATE_LMIDS_TABLE_POSTGRES)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// The underlying pool, for handler-owned tables and migrations.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl LedgerStore for PostgresLedgerStore {
    type Tx = PostgresLedgerTransaction;

    async fn begin(&self) -> Result<PostgresLedgerTransaction> {
        let tx = self.pool.begin().await?;
        Ok(PostgresLedgerTransaction { tx })
    }

    async fn last_mutation_id(&self, client_group_id: &str, client_id: &str) -> Result<i64> {
        let query = Query::select()
            .column(Lmids::LastMutationId)
            .from(Lmids::Table)
            .and_where(Expr::col(Lmids::ClientGroupId).eq(client_group_id))
            .and_where(Expr::col(Lmids::ClientId).eq(client_id))
            .to_string(PostgresQueryBuilder);

        let row = sqlx::query(&query).fetch_optional(&self.pool).await?;

        match row {
            Some(row) => Ok(row.try_get::<i64, _>("last_mutation_id")?),
            None => Ok(0),
        }
    }
}

/// Transaction over a [`PostgresLedgerStore`].
///
/// Wraps a `sqlx` transaction; dropping it without commit rolls back.
pub struct PostgresLedgerTransaction {
    tx: sqlx::Transaction<'static, Postgres>,
}

impl std::fmt::Debug for PostgresLedgerTransaction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PostgresLedgerTransaction").finish_non_exhaustive()
    }
}

impl PostgresLedgerTransaction {
    /// Connection bound to this transaction, for handler writes.
    pub fn conn(&mut self) -> &mut PgConnection {
        &mut self.tx
    }
}

#[async_trait]
impl LedgerTransaction for PostgresLedgerTransaction {
    async fn fetch_and_increment(&mut self, client_group_id: &str, client_id: &str) -> Result<i64> {
        let updated_at = chrono::Utc::now().to_rfc3339();

        // ON CONFLICT DO UPDATE locks the row until this transaction ends;
        // a competing push for the same client blocks here.
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
            .to_string(PostgresQueryBuilder);

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
