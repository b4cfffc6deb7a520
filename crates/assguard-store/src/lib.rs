use std::collections::BTreeSet;
use std::path::Path;

use assguard_core::{NormalizedRecord, Warehouse, WarehouseError};
use chrono::NaiveDateTime;
use rusqlite::{params, Connection, OpenFlags};
use thiserror::Error;

pub const FACT_TABLE: &str = "assertion_data";
pub const SYNTHESIS_VIEW: &str = "assertion_data_synthesis_by_assertion";
pub const RECAP_VIEW: &str = "assertion_data_recap_by_day_view";

// SQLite date functions consume this layout directly.
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("dataset {0} does not exist")]
    DatasetMissing(String),
}

/// SQLite warehouse for assertion facts. The database file is the
/// enclosing dataset: it must pre-exist and is never created here, while
/// the fact table inside it is provisioned on demand.
#[derive(Debug)]
pub struct AssertionStore {
    conn: Connection,
}

impl AssertionStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_URI
            | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        let conn = match Connection::open_with_flags(path, flags) {
            Ok(conn) => conn,
            Err(rusqlite::Error::SqliteFailure(err, _))
                if err.code == rusqlite::ErrorCode::CannotOpen =>
            {
                return Err(StoreError::DatasetMissing(path.display().to_string()));
            }
            Err(err) => return Err(err.into()),
        };
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        Ok(Self { conn })
    }

    /// Provisions the fact table with its canonical column order. The
    /// 8-column order is significant for positional tooling downstream.
    pub fn ensure_fact_table(&self) -> Result<(), StoreError> {
        self.conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS assertion_data (
                Start_Time TEXT,
                End_Time TEXT,
                Invocation_Name TEXT,
                Action_Name TEXT,
                \"Database\" TEXT,
                \"Schema\" TEXT,
                State TEXT,
                Failure_Reason TEXT
            )
            ",
        )?;
        Ok(())
    }

    /// Distinct invocation names already persisted. Null and empty names
    /// are ignored, matching the dedup key contract.
    pub fn distinct_invocation_names(&self) -> Result<BTreeSet<String>, StoreError> {
        let mut statement = self.conn.prepare(
            "
            SELECT DISTINCT Invocation_Name
            FROM assertion_data
            WHERE Invocation_Name IS NOT NULL AND Invocation_Name != ''
            ",
        )?;

        let rows = statement.query_map([], |row| row.get::<_, String>(0))?;
        let mut names = BTreeSet::new();
        for row in rows {
            names.insert(row?);
        }
        Ok(names)
    }

    /// Appends the batch inside one transaction: the whole batch lands or
    /// none of it. Existing rows are never touched.
    pub fn append_batch(&mut self, batch: &[NormalizedRecord]) -> Result<(), StoreError> {
        let tx = self.conn.transaction()?;
        {
            let mut statement = tx.prepare(
                "
                INSERT INTO assertion_data (
                    Start_Time,
                    End_Time,
                    Invocation_Name,
                    Action_Name,
                    \"Database\",
                    \"Schema\",
                    State,
                    Failure_Reason
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                ",
            )?;
            for record in batch {
                statement.execute(params![
                    format_timestamp(record.start_time.as_ref()),
                    format_timestamp(record.end_time.as_ref()),
                    record.invocation_name,
                    record.action_name,
                    record.database,
                    record.schema,
                    record.state,
                    record.failure_reason,
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    /// Redefines both aggregate views. Logical views, recomputed from the
    /// full fact table on every read; dropping first gives the
    /// CREATE OR REPLACE semantics SQLite lacks.
    pub fn create_views(&self) -> Result<(), StoreError> {
        self.conn.execute_batch(
            "
            DROP VIEW IF EXISTS assertion_data_synthesis_by_assertion;
            CREATE VIEW assertion_data_synthesis_by_assertion AS
            WITH processed_data AS (
                SELECT
                    Action_Name,
                    State,
                    CAST(strftime('%s', End_Time) AS INTEGER)
                        - CAST(strftime('%s', Start_Time) AS INTEGER) AS duration_seconds
                FROM assertion_data
            )
            SELECT
                Action_Name,
                COUNT(*) AS total_executions,
                SUM(State = 'SUCCEEDED') AS passed_executions,
                SUM(State = 'FAILED') AS failed_executions,
                ROUND(SUM(State = 'FAILED') * 100.0 / COUNT(*), 2) AS failure_percentage,
                ROUND(AVG(duration_seconds), 2) AS avg_duration_seconds,
                ROUND(MIN(duration_seconds), 2) AS min_duration_seconds,
                ROUND(MAX(duration_seconds), 2) AS max_duration_seconds
            FROM processed_data
            GROUP BY Action_Name
            ORDER BY failure_percentage DESC, total_executions DESC;

            DROP VIEW IF EXISTS assertion_data_recap_by_day_view;
            CREATE VIEW assertion_data_recap_by_day_view AS
            WITH processed_data AS (
                SELECT
                    DATE(Start_Time) AS assertion_date,
                    State,
                    CAST(strftime('%s', End_Time) AS INTEGER)
                        - CAST(strftime('%s', Start_Time) AS INTEGER) AS duration_seconds
                FROM assertion_data
            )
            SELECT
                assertion_date,
                COUNT(*) AS total_assertions,
                SUM(State = 'SUCCEEDED') AS passed_assertions,
                SUM(State = 'FAILED') AS failed_assertions,
                ROUND(SUM(State = 'FAILED') * 100.0 / COUNT(*), 2) AS failure_percentage,
                ROUND(AVG(duration_seconds), 2) AS avg_duration_seconds,
                ROUND(MIN(duration_seconds), 2) AS min_duration_seconds,
                ROUND(MAX(duration_seconds), 2) AS max_duration_seconds
            FROM processed_data
            GROUP BY assertion_date
            ORDER BY assertion_date DESC;
            ",
        )?;
        Ok(())
    }

    pub fn fact_row_count(&self) -> Result<i64, StoreError> {
        let count =
            self.conn
                .query_row("SELECT COUNT(*) FROM assertion_data", [], |row| row.get(0))?;
        Ok(count)
    }

    pub fn table_exists(&self, table_name: &str) -> Result<bool, StoreError> {
        self.object_exists("table", table_name)
    }

    pub fn view_exists(&self, view_name: &str) -> Result<bool, StoreError> {
        self.object_exists("view", view_name)
    }

    fn object_exists(&self, kind: &str, name: &str) -> Result<bool, StoreError> {
        use rusqlite::OptionalExtension;
        let found = self
            .conn
            .query_row(
                "
                SELECT 1
                FROM sqlite_master
                WHERE type = ?1 AND name = ?2
                LIMIT 1
                ",
                [kind, name],
                |_| Ok(()),
            )
            .optional()?;
        Ok(found.is_some())
    }
}

fn format_timestamp(value: Option<&NaiveDateTime>) -> Option<String> {
    value.map(|ts| ts.format(TIMESTAMP_FORMAT).to_string())
}

impl Warehouse for AssertionStore {
    fn processed_invocations(&mut self) -> Result<BTreeSet<String>, WarehouseError> {
        self.ensure_fact_table().map_err(query_error)?;
        self.distinct_invocation_names().map_err(query_error)
    }

    fn append_records(&mut self, batch: &[NormalizedRecord]) -> Result<(), WarehouseError> {
        self.append_batch(batch)
            .map_err(|err| WarehouseError::Load(err.to_string()))
    }

    fn materialize_views(&mut self) -> Result<(), WarehouseError> {
        self.create_views()
            .map_err(|err| WarehouseError::View(err.to_string()))
    }
}

fn query_error(err: StoreError) -> WarehouseError {
    match err {
        StoreError::DatasetMissing(dataset) => WarehouseError::DatasetMissing(dataset),
        other => WarehouseError::Query(other.to_string()),
    }
}
