use uuid::Uuid;

/// User resolved from an unexpired `user_session` row.
#[derive(Debug, sqlx::FromRow)]
pub struct SessionUser {
    pub id: Uuid,
    pub email: String,
}
