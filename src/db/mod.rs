use anyhow::Result;
use sqlx::postgres::PgPoolOptions;
use sqlx::{Pool, Postgres};
use std::time::Duration;

pub mod queries;

pub type DbPool = Pool<Postgres>;

pub async fn init_pool(database_url: &str, max_connections: u32) -> Result<DbPool> {
    let pool = pool_options(max_connections).connect(database_url).await?;
    Ok(pool)
}

/// A pool that only dials the database on first use, for running without a
/// reachable database at boot.
pub fn lazy_pool(database_url: &str, max_connections: u32) -> Result<DbPool> {
    let pool = pool_options(max_connections).connect_lazy(database_url)?;
    Ok(pool)
}

pub async fn init_schema(pool: &DbPool) -> Result<()> {
    let mut tx = pool.begin().await?;
    for statement in queries::SCHEMA {
        sqlx::query(statement).execute(&mut *tx).await?;
    }
    tx.commit().await?;
    Ok(())
}

fn pool_options(max_connections: u32) -> PgPoolOptions {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(Duration::from_secs(5))
}
