use anyhow::Result;
use sqlx::{PgPool, Postgres, QueryBuilder};
use time::OffsetDateTime;

use crate::domain::{ConsumptionRecord, MeterReading};

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ConsumptionRow {
    pub meter_id: String,
    pub timestamp: OffsetDateTime,
    pub consumption_kwh: f64,
    pub temperature_c: Option<f64>,
    pub is_weekend: Option<bool>,
}

impl TryFrom<ConsumptionRow> for ConsumptionRecord {
    type Error = crate::domain::DomainError;

    fn try_from(row: ConsumptionRow) -> Result<Self, Self::Error> {
        // A NULL weekend flag reads as a weekday.
        ConsumptionRecord::new(
            row.timestamp,
            row.consumption_kwh,
            row.temperature_c,
            row.is_weekend.unwrap_or(false),
        )
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct HourlyTotalRow {
    pub hour: OffsetDateTime,
    pub total_consumption: f64,
}

/// Create `consumption_records` and its timestamp index if they do not exist yet.
pub async fn ensure_schema(pool: &PgPool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS consumption_records (
            id              BIGSERIAL PRIMARY KEY,
            meter_id        TEXT NOT NULL,
            "timestamp"     TIMESTAMPTZ NOT NULL,
            consumption_kwh DOUBLE PRECISION NOT NULL,
            temperature_c   DOUBLE PRECISION,
            is_weekend      BOOLEAN
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS consumption_records_timestamp_idx
            ON consumption_records ("timestamp")
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Postgres caps a statement at 65535 bind parameters; five per row.
const MAX_ROWS_PER_INSERT: usize = 10_000;

pub async fn insert_readings(pool: &PgPool, readings: &[MeterReading]) -> Result<u64> {
    let mut inserted = 0;

    for chunk in readings.chunks(MAX_ROWS_PER_INSERT) {
        let mut builder = QueryBuilder::<Postgres>::new(
            r#"INSERT INTO consumption_records (meter_id, "timestamp", consumption_kwh, temperature_c, is_weekend) "#,
        );

        builder.push_values(chunk, |mut b, reading| {
            let r = &reading.record;
            b.push_bind(&reading.meter_id)
                .push_bind(r.timestamp())
                .push_bind(r.consumption_kwh())
                .push_bind(r.temperature_c())
                .push_bind(r.is_weekend());
        });

        let result = builder.build().execute(pool).await?;
        inserted += result.rows_affected();
    }

    Ok(inserted)
}

pub async fn distinct_meter_ids(pool: &PgPool) -> Result<Vec<String>> {
    let ids = sqlx::query_scalar::<_, String>(
        "SELECT DISTINCT meter_id FROM consumption_records ORDER BY meter_id",
    )
    .fetch_all(pool)
    .await?;

    Ok(ids)
}

/// Records with `start <= timestamp <= end`, optionally restricted to one meter.
pub async fn consumption_range(
    pool: &PgPool,
    start: OffsetDateTime,
    end: OffsetDateTime,
    meter_id: Option<&str>,
) -> Result<Vec<ConsumptionRow>> {
    let rows = sqlx::query_as::<_, ConsumptionRow>(
        r#"
        SELECT
            meter_id,
            "timestamp",
            consumption_kwh,
            temperature_c,
            is_weekend
        FROM consumption_records
        WHERE "timestamp" >= $1
          AND "timestamp" <= $2
          AND ($3::TEXT IS NULL OR meter_id = $3)
        ORDER BY "timestamp", id
        "#,
    )
    .bind(start)
    .bind(end)
    .bind(meter_id)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Raw (unrounded) kWh per UTC hour across all meters, ascending.
pub async fn hourly_totals(
    pool: &PgPool,
    start: OffsetDateTime,
    end: OffsetDateTime,
) -> Result<Vec<HourlyTotalRow>> {
    let rows = sqlx::query_as::<_, HourlyTotalRow>(
        r#"
        SELECT
            date_trunc('hour', "timestamp" AT TIME ZONE 'UTC') AT TIME ZONE 'UTC' AS hour,
            SUM(consumption_kwh)                                                AS total_consumption
        FROM consumption_records
        WHERE "timestamp" >= $1
          AND "timestamp" <= $2
        GROUP BY 1
        ORDER BY 1
        "#,
    )
    .bind(start)
    .bind(end)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
