use rocket::serde::Serialize;
use schemars::JsonSchema;

#[derive(Serialize, Debug, JsonSchema)]
pub struct HealthResponse {
    /// `ok`, or `degraded` while the database is unreachable.
    pub status: &'static str,
    pub database: bool,
}

impl HealthResponse {
    pub fn from_database(reachable: bool) -> Self {
        Self {
            status: if reachable { "ok" } else { "degraded" },
            database: reachable,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::HealthResponse;

    #[test]
    fn unreachable_database_is_degraded() {
        let response = HealthResponse::from_database(false);
        assert_eq!(response.status, "degraded");
        assert!(!response.database);
    }

    #[test]
    fn reachable_database_is_ok() {
        assert_eq!(HealthResponse::from_database(true).status, "ok");
    }
}
