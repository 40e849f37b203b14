use redis::aio::MultiplexedConnection;
use sqlx::{postgres::PgPoolOptions, Pool, Postgres};

use crate::{
    config::Config,
    error::{CacheError, Error, QueryError},
};

/// Opens the connection pool and brings the schema up to date.
pub async fn connect_database(config: &Config) -> Result<Pool<Postgres>, Error> {
    log::info!(
        "Connecting to database ({} connections)",
        config.database_max_connections
    );

    let pool = PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .connect(&config.database_url)
        .await
        .map_err(QueryError::from)?;

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .map_err(|e| QueryError::from(sqlx::Error::from(e)))?;

    log::info!("Database migrations applied");
    Ok(pool)
}

pub async fn connect_cache(config: &Config) -> Result<MultiplexedConnection, Error> {
    let client = redis::Client::open(config.redis_url.as_str()).map_err(CacheError::from)?;
    let connection = client
        .get_multiplexed_async_connection()
        .await
        .map_err(CacheError::from)?;

    log::info!("Connected to cache");
    Ok(connection)
}
