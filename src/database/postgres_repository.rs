use sqlx::PgPool;
use std::time::Duration;

const PING_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Clone)]
pub struct PostgresRepository {
    pub pool: PgPool,
}

impl PostgresRepository {
    /// Round trip used by the health endpoint; a slow database counts as unreachable.
    pub async fn ping(&self) -> bool {
        let query = sqlx::query_scalar::<_, i32>("SELECT 1").fetch_one(&self.pool);
        matches!(tokio::time::timeout(PING_TIMEOUT, query).await, Ok(Ok(_)))
    }
}
