use crate::config::DatabaseConfig;
use rocket::fairing::AdHoc;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use std::time::Duration;

fn pool_options(db_config: &DatabaseConfig) -> PgPoolOptions {
    PgPoolOptions::new()
        .max_connections(db_config.max_connections)
        .min_connections(db_config.min_connections)
        .acquire_timeout(Duration::from_secs(db_config.acquire_timeout))
        .idle_timeout(Duration::from_secs(30))
        .max_lifetime(Duration::from_secs(1800))
}

async fn init_pool(db_config: &DatabaseConfig) -> Result<PgPool, sqlx::Error> {
    let connect = pool_options(db_config).connect(&db_config.url);
    match tokio::time::timeout(Duration::from_secs(db_config.connection_timeout), connect).await {
        Ok(result) => result,
        Err(_) => Err(sqlx::Error::PoolTimedOut),
    }
}

/// Connects the pool and applies migrations. When the database is unreachable at startup the
/// service still launches on a lazily connecting pool; `/health` then reports `degraded`.
pub fn stage_db(db_config: DatabaseConfig) -> AdHoc {
    AdHoc::try_on_ignite("Postgres (sqlx)", |rocket| async move {
        match init_pool(&db_config).await {
            Ok(pool) => {
                tracing::info!("Database pool initialized successfully");
                if let Err(e) = sqlx::migrate!("./migrations").run(&pool).await {
                    tracing::error!("Failed to apply database migrations: {}", e);
                }
                Ok(rocket.manage(pool))
            }
            Err(e) => {
                tracing::error!("Failed to initialize database pool: {}", e);
                match pool_options(&db_config).min_connections(0).connect_lazy(&db_config.url) {
                    Ok(pool) => {
                        tracing::warn!("Starting in degraded mode; database calls will fail until it becomes reachable");
                        Ok(rocket.manage(pool))
                    }
                    Err(e) => {
                        tracing::error!("Invalid database configuration: {}", e);
                        Err(rocket)
                    }
                }
            }
        }
    })
}
