//! Database schema definitions using sea-query.
//!
//! These define the table and column identifiers for type-safe query building.

use sea_query::Iden;

/// Last-mutation-id ledger table schema.
#[derive(Iden)]
pub enum Lmids {
    Table,
    #[iden = "client_group_id"]
    ClientGroupId,
    #[iden = "client_id"]
    ClientId,
    #[iden = "last_mutation_id"]
    LastMutationId,
    #[iden = "updated_at"]
    UpdatedAt,
}

/// SQL for creating the ledger table (SQLite).
pub const CREATE_LMIDS_TABLE_SQLITE: &str = r#"
CREATE TABLE IF NOT EXISTS lmids (
    client_group_id TEXT NOT NULL,
    client_id TEXT NOT NULL,
    last_mutation_id INTEGER NOT NULL,
    updated_at TEXT NOT NULL,
    PRIMARY KEY (client_group_id, client_id)
);
"#;

/// SQL for creating the ledger table (PostgreSQL).
pub const CREATE_LMIDS_TABLE_POSTGRES: &str = r#"
CREATE TABLE IF NOT EXISTS lmids (
    client_group_id TEXT NOT NULL,
    client_id TEXT NOT NULL,
    last_mutation_id BIGINT NOT NULL,
    updated_at TEXT NOT NULL,
    PRIMARY KEY (client_group_id, client_id)
);
"#;
