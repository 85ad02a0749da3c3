use chrono::NaiveDate;
use sqlx::PgPool;

use crate::models::{
    registration::RegistrationSummary,
    stats::{bump, EventStatistics},
};

const STATS_COLUMNS: &str = "date, total_registrations, registrations_by_event,
     registrations_by_age_group, registrations_by_city";

pub struct StatisticsService;

impl StatisticsService {
    /// Fold one registration into the day's counters.
    ///
    /// Get-or-create the day's row, then read-modify-write: not transactional
    /// with the registration insert, and concurrent submissions can lose an
    /// update. Deactivations never decrement.
    pub async fn record_registration(
        pool: &PgPool,
        date: NaiveDate,
        event: &str,
        age_group: &str,
        city: &str,
    ) -> Result<(), sqlx::Error> {
        let mut stats = Self::for_date(pool, date).await?;

        stats.total_registrations += 1;
        bump(&mut stats.registrations_by_event, event);
        bump(&mut stats.registrations_by_age_group, age_group);
        bump(&mut stats.registrations_by_city, city);

        sqlx::query(
            "UPDATE event_statistics
             SET total_registrations = $2,
                 registrations_by_event = $3,
                 registrations_by_age_group = $4,
                 registrations_by_city = $5
             WHERE date = $1",
        )
        .bind(date)
        .bind(stats.total_registrations)
        .bind(&stats.registrations_by_event)
        .bind(&stats.registrations_by_age_group)
        .bind(&stats.registrations_by_city)
        .execute(pool)
        .await?;

        Ok(())
    }

    /// The aggregate row for `date`, created empty if absent.
    pub async fn for_date(pool: &PgPool, date: NaiveDate) -> Result<EventStatistics, sqlx::Error> {
        sqlx::query("INSERT INTO event_statistics (date) VALUES ($1) ON CONFLICT (date) DO NOTHING")
            .bind(date)
            .execute(pool)
            .await?;

        sqlx::query_as::<_, EventStatistics>(&format!(
            "SELECT {STATS_COLUMNS} FROM event_statistics WHERE date = $1"
        ))
        .bind(date)
        .fetch_one(pool)
        .await
    }

    /// Every day's aggregate, newest first.
    pub async fn all(pool: &PgPool) -> Result<Vec<EventStatistics>, sqlx::Error> {
        sqlx::query_as::<_, EventStatistics>(&format!(
            "SELECT {STATS_COLUMNS} FROM event_statistics ORDER BY date DESC"
        ))
        .fetch_all(pool)
        .await
    }

    /// The most recent registrations by creation time.
    pub async fn recent_registrations(
        pool: &PgPool,
        limit: i64,
    ) -> Result<Vec<RegistrationSummary>, sqlx::Error> {
        sqlx::query_as::<_, RegistrationSummary>(
            "SELECT id, full_name, event, age_group, city, created_at
             FROM registrations
             ORDER BY created_at DESC
             LIMIT $1",
        )
        .bind(limit)
        .fetch_all(pool)
        .await
    }
}
