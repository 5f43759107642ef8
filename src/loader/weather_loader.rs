use crate::loader::error::PersistenceError;
use crate::types::daily_variable::{DailyVariable, ValueKind};
use crate::types::weather_record::WeatherRecord;
use chrono::NaiveDate;
use duckdb::{params, Connection};
use log::info;
use std::path::{Path, PathBuf};

pub const TABLE_NAME: &str = "WEATHER_DATA";

/// Appends [`WeatherRecord`]s to the `WEATHER_DATA` table of a DuckDB file.
///
/// Every call opens its own connection; nothing is held between runs.
#[derive(Debug, Clone)]
pub struct WeatherLoader {
    duckdb_path: PathBuf,
}

impl WeatherLoader {
    pub fn new(duckdb_path: impl Into<PathBuf>) -> Self {
        Self {
            duckdb_path: duckdb_path.into(),
        }
    }

    pub fn duckdb_path(&self) -> &Path {
        &self.duckdb_path
    }

    /// Creates `WEATHER_DATA` if it does not exist yet. There is no primary
    /// key: a day loaded twice is stored twice.
    pub async fn ensure_table(&self) -> Result<(), PersistenceError> {
        let path = self.duckdb_path.clone();
        tokio::task::spawn_blocking(move || {
            let conn = open(&path)?;
            conn.execute_batch(&create_table_sql())
                .map_err(|source| PersistenceError::CreateTable {
                    table: TABLE_NAME,
                    source,
                })
        })
        .await?
    }

    /// Inserts `record` as one row. A single statement, not retried.
    pub async fn load(&self, record: &WeatherRecord) -> Result<(), PersistenceError> {
        let path = self.duckdb_path.clone();
        let record = record.clone();
        tokio::task::spawn_blocking(move || {
            let conn = open(&path)?;
            let date = record.date.format("%Y-%m-%d").to_string();
            let inserted = conn
                .execute(
                    &insert_sql(),
                    params![
                        date,
                        record.weather_code,
                        record.temperature_2m_max,
                        record.temperature_2m_min,
                        record.apparent_temperature_max,
                        record.apparent_temperature_min,
                        record.sunrise,
                        record.sunset,
                        record.daylight_duration,
                        record.sunshine_duration,
                        record.uv_index_max,
                    ],
                )
                .map_err(|source| PersistenceError::Insert {
                    table: TABLE_NAME,
                    date: record.date,
                    source,
                })?;
            info!(
                "Inserted {} row into {} for {} ({})",
                inserted,
                TABLE_NAME,
                record.date,
                path.display()
            );
            Ok(())
        })
        .await?
    }

    pub async fn row_count(&self) -> Result<u64, PersistenceError> {
        let path = self.duckdb_path.clone();
        tokio::task::spawn_blocking(move || {
            let conn = open(&path)?;
            conn.query_row(&format!("SELECT COUNT(*) FROM {}", TABLE_NAME), [], |row| {
                row.get::<_, i64>(0)
            })
            .map(|count| count.max(0) as u64)
            .map_err(|source| PersistenceError::Query {
                table: TABLE_NAME,
                source,
            })
        })
        .await?
    }

    /// All stored rows, oldest date first.
    pub async fn records(&self) -> Result<Vec<WeatherRecord>, PersistenceError> {
        let path = self.duckdb_path.clone();
        tokio::task::spawn_blocking(move || {
            let conn = open(&path)?;
            read_records(&conn).map_err(|source| PersistenceError::Query {
                table: TABLE_NAME,
                source,
            })
        })
        .await?
    }
}

fn open(path: &Path) -> Result<Connection, PersistenceError> {
    Connection::open(path).map_err(|e| PersistenceError::Open(path.to_path_buf(), e))
}

fn sql_type(kind: ValueKind) -> &'static str {
    match kind {
        ValueKind::Integer => "BIGINT",
        ValueKind::Float => "DOUBLE",
        ValueKind::TimeOfDay => "TIME",
    }
}

fn create_table_sql() -> String {
    let columns = DailyVariable::ALL
        .iter()
        .map(|v| format!("    {} {} NOT NULL", v.column(), sql_type(v.kind())))
        .collect::<Vec<_>>()
        .join(",\n");
    format!(
        "CREATE TABLE IF NOT EXISTS {} (\n    DATE DATE NOT NULL,\n{}\n);",
        TABLE_NAME, columns
    )
}

/// `INSERT` with one positional placeholder per column, in table order.
/// Date and times are bound as text and cast by DuckDB.
fn insert_sql() -> String {
    let columns = DailyVariable::ALL
        .iter()
        .map(|v| v.column())
        .collect::<Vec<_>>()
        .join(", ");
    let placeholders = DailyVariable::ALL
        .iter()
        .map(|v| match v.kind() {
            ValueKind::TimeOfDay => "CAST(? AS TIME)",
            _ => "?",
        })
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "INSERT INTO {} (DATE, {}) VALUES (CAST(? AS DATE), {})",
        TABLE_NAME, columns, placeholders
    )
}

fn read_records(conn: &Connection) -> Result<Vec<WeatherRecord>, duckdb::Error> {
    let sql = format!(
        "SELECT CAST(DATE AS VARCHAR), WEATHER_CODE, TEMPERATURE_2M_MAX, TEMPERATURE_2M_MIN, \
         APPARENT_TEMPERATURE_MAX, APPARENT_TEMPERATURE_MIN, CAST(SUNRISE AS VARCHAR), \
         CAST(SUNSET AS VARCHAR), DAYLIGHT_DURATION, SUNSHINE_DURATION, UV_INDEX_MAX \
         FROM {} ORDER BY DATE",
        TABLE_NAME
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map([], |row| {
        let date: String = row.get(0)?;
        let date = NaiveDate::parse_from_str(&date, "%Y-%m-%d").map_err(|e| {
            duckdb::Error::FromSqlConversionFailure(0, duckdb::types::Type::Text, Box::new(e))
        })?;
        Ok(WeatherRecord {
            date,
            weather_code: row.get(1)?,
            temperature_2m_max: row.get(2)?,
            temperature_2m_min: row.get(3)?,
            apparent_temperature_max: row.get(4)?,
            apparent_temperature_min: row.get(5)?,
            sunrise: row.get(6)?,
            sunset: row.get(7)?,
            daylight_duration: row.get(8)?,
            sunshine_duration: row.get(9)?,
            uv_index_max: row.get(10)?,
        })
    })?;
    rows.collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(date: NaiveDate) -> WeatherRecord {
        WeatherRecord {
            date,
            weather_code: 2,
            temperature_2m_max: 15.2,
            temperature_2m_min: 8.1,
            apparent_temperature_max: 14.0,
            apparent_temperature_min: 7.5,
            sunrise: "06:12:00".to_string(),
            sunset: "19:45:00".to_string(),
            daylight_duration: 45000.0,
            sunshine_duration: 30000.0,
            uv_index_max: 5,
        }
    }

    #[test]
    fn test_insert_lists_eleven_columns_in_order() {
        let sql = insert_sql();
        assert_eq!(
            sql,
            "INSERT INTO WEATHER_DATA (DATE, WEATHER_CODE, TEMPERATURE_2M_MAX, \
             TEMPERATURE_2M_MIN, APPARENT_TEMPERATURE_MAX, APPARENT_TEMPERATURE_MIN, SUNRISE, \
             SUNSET, DAYLIGHT_DURATION, SUNSHINE_DURATION, UV_INDEX_MAX) VALUES (CAST(? AS DATE), \
             ?, ?, ?, ?, ?, CAST(? AS TIME), CAST(? AS TIME), ?, ?, ?)"
        );
        assert_eq!(sql.matches('?').count(), 11);
    }

    #[tokio::test]
    async fn test_load_appends_one_row() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let loader = WeatherLoader::new(dir.path().join("weather.duckdb"));
        loader.ensure_table().await?;
        assert_eq!(loader.row_count().await?, 0);

        let date = NaiveDate::from_ymd_opt(2024, 7, 14).ok_or("bad date")?;
        loader.load(&record(date)).await?;

        assert_eq!(loader.row_count().await?, 1);
        assert_eq!(loader.records().await?, vec![record(date)]);
        Ok(())
    }

    #[tokio::test]
    async fn test_same_day_twice_is_stored_twice() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let loader = WeatherLoader::new(dir.path().join("weather.duckdb"));
        loader.ensure_table().await?;
        loader.ensure_table().await?;

        let date = NaiveDate::from_ymd_opt(2024, 7, 14).ok_or("bad date")?;
        loader.load(&record(date)).await?;
        loader.load(&WeatherRecord::with_defaults(date)).await?;

        let rows = loader.records().await?;
        assert_eq!(rows.len(), 2);
        assert!(rows.contains(&WeatherRecord::with_defaults(date)));
        Ok(())
    }

    #[tokio::test]
    async fn test_quotes_in_values_are_bound_not_spliced() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let loader = WeatherLoader::new(dir.path().join("weather.duckdb"));
        loader.ensure_table().await?;

        let date = NaiveDate::from_ymd_opt(2024, 7, 14).ok_or("bad date")?;
        let mut bad = record(date);
        bad.sunset = "19:45'); DROP TABLE WEATHER_DATA; --".to_string();

        assert!(matches!(
            loader.load(&bad).await,
            Err(PersistenceError::Insert { .. })
        ));
        assert_eq!(loader.row_count().await?, 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_missing_table_fails_the_load() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let loader = WeatherLoader::new(dir.path().join("weather.duckdb"));
        let date = NaiveDate::from_ymd_opt(2024, 7, 14).ok_or("bad date")?;
        assert!(matches!(
            loader.load(&record(date)).await,
            Err(PersistenceError::Insert { .. })
        ));
        Ok(())
    }
}
