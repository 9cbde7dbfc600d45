//! PostgreSQL reading store using `sqlx`.
//!
//! Owns the `sensor_data` schema, batch inserts, and the two queries behind
//! `ReadingStore`. Every variable input is bound; the only fragments spliced into SQL
//! come from closed enums (metric column, group expression).
//! Integration tests require the `integration-tests` feature and a `DATABASE_URL`.

use super::{BucketQuery, RankQuery, ReadingStore};
use crate::analytics::BucketMode;
use crate::error::{AppError, Result};
use crate::models::{BucketedReading, GroupAverage, GroupDimension, SensorReading};
use async_trait::async_trait;
use sqlx::{postgres::PgPoolOptions, Pool, Postgres, Row};
use tracing::{debug, error, info};

/// Local wall-clock bucket start: the UTC instant shifted by `$2` seconds, truncated
/// to the unit bound as `$1`.
const BUCKET_EXPR: &str = r#"date_trunc($1, (to_timestamp("timestamp" / 1000.0) AT TIME ZONE 'UTC') + make_interval(secs => $2))"#;

/// Last whitespace-delimited word of the trimmed address.
const PROVINCE_EXPR: &str = r#"regexp_replace(regexp_replace(address, '^\s+|\s+$', '', 'g'), '^.*\s+', '')"#;

fn group_expr(group: GroupDimension) -> &'static str {
    match group {
        GroupDimension::Address => "address",
        GroupDimension::Place => "place",
        GroupDimension::Province => PROVINCE_EXPR,
    }
}

/// Builds the bucketed query for a mode. Placeholders: `$1` unit, `$2` offset seconds,
/// `$3`/`$4` window, `$5` address patterns when present.
fn bucketed_sql(query: &BucketQuery) -> String {
    let column = query.metric.column();
    let address_clause = if query.address_patterns.is_empty() {
        ""
    } else {
        "AND address ILIKE ANY($5)"
    };
    let filtered = format!(
        r#"FROM sensor_data
            WHERE "timestamp" >= $3 AND "timestamp" < $4
              AND {column} IS NOT NULL
              {address_clause}"#
    );
    match query.mode {
        BucketMode::Average => format!(
            r#"SELECT address, {BUCKET_EXPR} AS bucket, AVG({column})::DOUBLE PRECISION AS value
            {filtered}
            GROUP BY address, bucket"#
        ),
        BucketMode::Latest => format!(
            r#"SELECT address, bucket, value FROM (
                SELECT address,
                       {BUCKET_EXPR} AS bucket,
                       {column}::DOUBLE PRECISION AS value,
                       ROW_NUMBER() OVER (
                           PARTITION BY address, {BUCKET_EXPR}
                           ORDER BY "timestamp" DESC
                       ) AS rn
                {filtered}
            ) latest
            WHERE rn = 1"#
        ),
    }
}

/// Builds the per-group daily average query. Placeholders: `$1`/`$2` window.
fn rank_sql(query: &RankQuery) -> String {
    let column = query.metric.column();
    let key = group_expr(query.group);
    format!(
        r#"SELECT key, AVG(value)::DOUBLE PRECISION AS average, COUNT(value) AS count
        FROM (
            SELECT {key} AS key, NULLIF({column}, 0) AS value
            FROM sensor_data
            WHERE "timestamp" >= $1 AND "timestamp" < $2
        ) daily_values
        WHERE key IS NOT NULL AND key <> '' AND value IS NOT NULL
        GROUP BY key"#
    )
}

/// Represents the database connection pool and provides methods for database operations.
pub struct Database {
    pool: Pool<Postgres>,
}

impl Database {
    /// Creates a new `Database` instance by establishing a connection pool.
    ///
    /// # Arguments
    ///
    /// * `database_url` - The connection string for the PostgreSQL database.
    /// * `max_connections` - Upper bound on pooled connections.
    ///
    /// # Errors
    ///
    /// Returns `AppError::StoreUnavailable` if the connection pool cannot be established.
    pub async fn new(database_url: &str, max_connections: u32) -> Result<Self> {
        info!("Connecting to database...");

        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .map_err(|e| {
                error!("Failed to connect to database: {}", e);
                AppError::from(e)
            })?;

        info!("Connected to database successfully");
        Ok(Self { pool })
    }

    /// Creates the `sensor_data` table and its indexes if they do not exist yet.
    ///
    /// # Errors
    ///
    /// Returns `AppError::StoreUnavailable` if any SQL statement fails.
    pub async fn init_schema(&self) -> Result<()> {
        info!("Initializing database schema (if necessary)...");

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS sensor_data (
                id BIGSERIAL PRIMARY KEY,
                "timestamp" BIGINT NOT NULL, -- Unix millis
                address TEXT NOT NULL,
                place TEXT,
                pm25 DOUBLE PRECISION,
                pm10 DOUBLE PRECISION,
                pm100 DOUBLE PRECISION,
                aqi DOUBLE PRECISION,
                temperature DOUBLE PRECISION,
                humidity DOUBLE PRECISION,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| {
            error!("Failed to create sensor_data table: {}", e);
            AppError::from(e)
        })?;

        for (name, column) in [
            ("idx_sensor_data_timestamp", "\"timestamp\""),
            ("idx_sensor_data_address", "address"),
        ] {
            sqlx::query(&format!(
                "CREATE INDEX IF NOT EXISTS {} ON sensor_data({})",
                name, column
            ))
            .execute(&self.pool)
            .await
            .map_err(|e| {
                error!("Failed to create index {}: {}", name, e);
                AppError::from(e)
            })?;
        }

        info!("Database schema initialized successfully");
        Ok(())
    }

    /// Inserts a batch of readings in a single transaction.
    ///
    /// # Errors
    ///
    /// Returns `AppError::StoreUnavailable` if the transaction cannot begin or commit, or
    /// if any insert fails (nothing is kept in that case).
    pub async fn insert_readings(&self, readings: &[SensorReading]) -> Result<()> {
        if readings.is_empty() {
            debug!("No readings provided for insertion.");
            return Ok(());
        }
        info!("Preparing to insert {} readings into database...", readings.len());

        let mut tx = self.pool.begin().await.map_err(|e| {
            error!("Failed to begin database transaction: {}", e);
            AppError::from(e)
        })?;

        for r in readings {
            sqlx::query(
                r#"
                INSERT INTO sensor_data
                ("timestamp", address, place, pm25, pm10, pm100, aqi, temperature, humidity)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
                "#,
            )
            .bind(r.timestamp)
            .bind(&r.address)
            .bind(&r.place)
            .bind(r.pm25)
            .bind(r.pm10)
            .bind(r.pm100)
            .bind(r.aqi)
            .bind(r.temperature)
            .bind(r.humidity)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                error!("Failed to insert reading: {}", e);
                AppError::from(e)
            })?;
        }

        tx.commit().await.map_err(|e| {
            error!("Failed to commit database transaction: {}", e);
            AppError::from(e)
        })?;

        info!("Successfully inserted {} readings", readings.len());
        Ok(())
    }

    /// Checks whether the `sensor_data` table exists.
    ///
    /// # Errors
    ///
    /// Returns `AppError::StoreUnavailable` if the `information_schema` query fails.
    pub async fn is_schema_initialized(&self) -> Result<bool> {
        debug!("Checking if database schema is initialized...");
        let query = "SELECT EXISTS (SELECT FROM information_schema.tables WHERE table_schema = 'public' AND table_name = 'sensor_data')";
        let result = sqlx::query(query)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                error!("Failed to check schema existence: {}", e);
                AppError::from(e)
            })?;
        let initialized = result.try_get::<bool, _>(0).unwrap_or(false);
        debug!("Schema initialized status: {}", initialized);
        Ok(initialized)
    }

    /// Checks whether at least one reading has been stored. `false` without a schema.
    ///
    /// # Errors
    ///
    /// Returns `AppError::StoreUnavailable` if any underlying query fails.
    pub async fn has_data_imported(&self) -> Result<bool> {
        debug!("Checking if data has been imported...");
        if !self.is_schema_initialized().await? {
            debug!("Schema not initialized, therefore no data imported.");
            return Ok(false);
        }
        let result = sqlx::query("SELECT EXISTS (SELECT 1 FROM sensor_data LIMIT 1)")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                error!("Failed to check for imported data: {}", e);
                AppError::from(e)
            })?;
        let has_data = result.try_get::<bool, _>(0).unwrap_or(false);
        debug!("Data imported status: {}", has_data);
        Ok(has_data)
    }
}

#[async_trait]
impl ReadingStore for Database {
    async fn bucketed_readings(&self, query: &BucketQuery) -> Result<Vec<BucketedReading>> {
        debug!(
            "Querying {} buckets of {} ({:?}) in [{}, {}), {} address patterns",
            query.grain.trunc_unit(),
            query.metric,
            query.mode,
            query.start_millis,
            query.end_millis,
            query.address_patterns.len()
        );
        let sql = bucketed_sql(query);
        let mut q = sqlx::query_as::<_, BucketedReading>(&sql)
            .bind(query.grain.trunc_unit())
            .bind(f64::from(query.utc_offset_seconds))
            .bind(query.start_millis)
            .bind(query.end_millis);
        if !query.address_patterns.is_empty() {
            q = q.bind(&query.address_patterns);
        }
        let rows = q.fetch_all(&self.pool).await.map_err(|e| {
            error!("Failed to fetch bucketed readings: {}", e);
            AppError::from(e)
        })?;
        info!("Fetched {} bucketed rows", rows.len());
        Ok(rows)
    }

    async fn daily_group_averages(&self, query: &RankQuery) -> Result<Vec<GroupAverage>> {
        debug!(
            "Querying daily {} averages by {} in [{}, {})",
            query.metric, query.group, query.start_millis, query.end_millis
        );
        let sql = rank_sql(query);
        let rows = sqlx::query_as::<_, GroupAverage>(&sql)
            .bind(query.start_millis)
            .bind(query.end_millis)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                error!("Failed to fetch daily group averages: {}", e);
                AppError::from(e)
            })?;
        info!("Fetched averages for {} groups", rows.len());
        Ok(rows)
    }
}
