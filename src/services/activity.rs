use serde_json::Value;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::activity::{ActivityKind, RegistrationActivity};

/// Append one activity entry to a registration's audit trail.
pub async fn record(
    pool: &PgPool,
    registration_id: Uuid,
    kind: ActivityKind,
    description: &str,
    metadata: Value,
) -> Result<RegistrationActivity, sqlx::Error> {
    sqlx::query_as::<_, RegistrationActivity>(
        "INSERT INTO registration_activities
            (id, registration_id, activity_type, description, metadata)
         VALUES ($1, $2, $3, $4, $5)
         RETURNING id, registration_id, activity_type, description, timestamp, metadata",
    )
    .bind(Uuid::new_v4())
    .bind(registration_id)
    .bind(kind.as_str())
    .bind(description)
    .bind(metadata)
    .fetch_one(pool)
    .await
}

/// Newest-first audit trail for one registration.
pub async fn list_for_registration(
    pool: &PgPool,
    registration_id: Uuid,
) -> Result<Vec<RegistrationActivity>, sqlx::Error> {
    sqlx::query_as::<_, RegistrationActivity>(
        "SELECT id, registration_id, activity_type, description, timestamp, metadata
         FROM registration_activities
         WHERE registration_id = $1
         ORDER BY timestamp DESC",
    )
    .bind(registration_id)
    .fetch_all(pool)
    .await
}
