use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

pub async fn create_pool(database_url: &str) -> anyhow::Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(20)
        .connect(database_url)
        .await?;
    Ok(pool)
}

/// Provision the registration schema (idempotent — safe to call on every startup).
pub async fn init_schema(pool: &PgPool) -> anyhow::Result<()> {
    // --- Registrations ---
    sqlx::raw_sql(
        r#"CREATE TABLE IF NOT EXISTS registrations (
            id                 UUID PRIMARY KEY,
            serial_number      INTEGER UNIQUE,
            full_name          VARCHAR(200) NOT NULL,
            gender             VARCHAR(10) NOT NULL,
            date_of_birth      VARCHAR(10) NOT NULL,
            age_group          VARCHAR(20) NOT NULL,
            event              VARCHAR(30) NOT NULL,
            city               VARCHAR(100) NOT NULL,
            whatsapp_number    VARCHAR(15) NOT NULL,
            photo_path         TEXT,
            photo_size         BIGINT NOT NULL DEFAULT 0,
            photo_content_type TEXT,
            terms              VARCHAR(5) NOT NULL,
            created_at         TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            updated_at         TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            is_active          BOOLEAN NOT NULL DEFAULT TRUE,
            ip_address         TEXT,
            user_agent         TEXT
        )"#,
    )
    .execute(pool)
    .await?;

    sqlx::raw_sql(
        "CREATE INDEX IF NOT EXISTS idx_registrations_serial ON registrations (serial_number);
         CREATE INDEX IF NOT EXISTS idx_registrations_created ON registrations (created_at);
         CREATE INDEX IF NOT EXISTS idx_registrations_event ON registrations (event);
         CREATE INDEX IF NOT EXISTS idx_registrations_age_group ON registrations (age_group);
         CREATE INDEX IF NOT EXISTS idx_registrations_city ON registrations (city)",
    )
    .execute(pool)
    .await?;

    // --- Registration activities (append-only audit trail) ---
    sqlx::raw_sql(
        r#"CREATE TABLE IF NOT EXISTS registration_activities (
            id              UUID PRIMARY KEY,
            registration_id UUID NOT NULL REFERENCES registrations(id) ON DELETE CASCADE,
            activity_type   VARCHAR(20) NOT NULL,
            description     TEXT NOT NULL,
            timestamp       TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            metadata        JSONB NOT NULL DEFAULT '{}'::jsonb
        )"#,
    )
    .execute(pool)
    .await?;

    sqlx::raw_sql(
        "CREATE INDEX IF NOT EXISTS idx_activities_registration
           ON registration_activities (registration_id, timestamp DESC)",
    )
    .execute(pool)
    .await?;

    // --- Daily event statistics (one row per calendar day) ---
    sqlx::raw_sql(
        r#"CREATE TABLE IF NOT EXISTS event_statistics (
            date                       DATE PRIMARY KEY,
            total_registrations        INTEGER NOT NULL DEFAULT 0,
            registrations_by_event     JSONB NOT NULL DEFAULT '{}'::jsonb,
            registrations_by_age_group JSONB NOT NULL DEFAULT '{}'::jsonb,
            registrations_by_city      JSONB NOT NULL DEFAULT '{}'::jsonb
        )"#,
    )
    .execute(pool)
    .await?;

    Ok(())
}
