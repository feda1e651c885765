//src/db.rs
use chrono::NaiveDate;
use rust_decimal::Decimal;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

use crate::config::WeightUnit;

const DB_FILE_NAME: &str = "weights.sqlite";
const APP_DATA_DIR: &str = "weight-goal-tracker"; // Same dir name as config
// Extended result code for a duplicate primary key; CHECK and NOT NULL failures differ
const SQLITE_CONSTRAINT_PRIMARYKEY: i32 = 1555;

/// A single logged weight, keyed by its date.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeightEntry {
    pub date: NaiveDate,
    pub weight: Decimal,
    pub unit: WeightUnit,
}

impl WeightEntry {
    pub const fn new(date: NaiveDate, weight: Decimal, unit: WeightUnit) -> Self {
        Self { date, weight, unit }
    }
}

/// The start/goal pair that drives the progress line. Only one is stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeightLossGoal {
    pub start_date: NaiveDate,
    pub start_weight: Decimal,
    pub goal_date: NaiveDate,
    pub goal_weight: Decimal,
    pub unit: WeightUnit,
}

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Database connection failed")]
    Connection(#[from] rusqlite::Error),
    #[error("Failed to get application data directory")]
    DataDir,
    #[error("I/O error accessing database file")]
    Io(#[from] std::io::Error),
    #[error("Weight entry already exists for this date: {0}")]
    WeightEntryExists(NaiveDate),
    #[error("Database query failed: {0}")]
    QueryFailed(rusqlite::Error),
    #[error("Database insert failed: {0}")]
    InsertFailed(rusqlite::Error),
    #[error("Database delete failed: {0}")]
    DeleteFailed(rusqlite::Error),
}

/// Gets the path to the SQLite database file within the app's data directory.
/// Exposed at crate root as `get_db_path_util`
pub fn get_db_path() -> Result<PathBuf, DbError> {
    let data_dir = dirs::data_dir().ok_or(DbError::DataDir)?;
    let app_dir = data_dir.join(APP_DATA_DIR);
    if !app_dir.exists() {
        std::fs::create_dir_all(&app_dir)?;
    }
    Ok(app_dir.join(DB_FILE_NAME))
}

/// Opens a connection to the SQLite database.
pub fn open_db<P: AsRef<Path>>(path: P) -> Result<Connection, DbError> {
    let conn = Connection::open(path).map_err(DbError::Connection)?;
    Ok(conn)
}

/// Initializes the database tables if they don't exist.
pub fn init_db(conn: &Connection) -> Result<(), DbError> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS weight_entries (
            date TEXT PRIMARY KEY NOT NULL, -- YYYY-MM-DD, one entry per day
            weight TEXT NOT NULL,           -- Decimal kept as text so it stays exact
            unit TEXT NOT NULL CHECK(unit IN ('pounds', 'kilograms', 'stones-and-pounds'))
        )",
        [],
    )
    .map_err(DbError::Connection)?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS goal (
            id INTEGER PRIMARY KEY CHECK(id = 1), -- Singleton row
            start_date TEXT NOT NULL,
            start_weight TEXT NOT NULL,
            goal_date TEXT NOT NULL,
            goal_weight TEXT NOT NULL,
            unit TEXT NOT NULL
        )",
        [],
    )
    .map_err(DbError::Connection)?;

    Ok(())
}

fn conversion_error<E>(column: usize, err: E) -> rusqlite::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    rusqlite::Error::FromSqlConversionFailure(column, rusqlite::types::Type::Text, Box::new(err))
}

fn decimal_column(row: &Row, idx: usize) -> rusqlite::Result<Decimal> {
    let raw: String = row.get(idx)?;
    Decimal::from_str(&raw).map_err(|e| conversion_error(idx, e))
}

fn unit_column(row: &Row, idx: usize) -> rusqlite::Result<WeightUnit> {
    let raw: String = row.get(idx)?;
    WeightUnit::try_from(raw.as_str()).map_err(|e| conversion_error(idx, e))
}

fn map_row_to_entry(row: &Row) -> rusqlite::Result<WeightEntry> {
    Ok(WeightEntry {
        date: row.get(0)?,
        weight: decimal_column(row, 1)?,
        unit: unit_column(row, 2)?,
    })
}

// --- Weight Entry Functions ---

/// Retrieves the entry logged for `date`, if any.
pub fn get_weight_entry_for_date(
    conn: &Connection,
    date: NaiveDate,
) -> Result<Option<WeightEntry>, DbError> {
    conn.query_row(
        "SELECT date, weight, unit FROM weight_entries WHERE date = ?1",
        params![date],
        map_row_to_entry,
    )
    .optional()
    .map_err(DbError::QueryFailed)
}

/// Adds a new weight entry. A second entry for the same date is rejected.
pub fn add_weight_entry(conn: &Connection, entry: &WeightEntry) -> Result<(), DbError> {
    conn.execute(
        "INSERT INTO weight_entries (date, weight, unit) VALUES (?1, ?2, ?3)",
        params![entry.date, entry.weight.to_string(), entry.unit.to_string()],
    )
    .map_err(|e| {
        if let rusqlite::Error::SqliteFailure(ref err, _) = e {
            if err.code == rusqlite::ErrorCode::ConstraintViolation
                && err.extended_code == SQLITE_CONSTRAINT_PRIMARYKEY
            {
                return DbError::WeightEntryExists(entry.date);
            }
        }
        DbError::InsertFailed(e)
    })?;
    Ok(())
}

/// Removes the entry for `date`. Returns the number of rows deleted (0 or 1).
pub fn remove_weight_entry_for_date(conn: &Connection, date: NaiveDate) -> Result<usize, DbError> {
    conn.execute("DELETE FROM weight_entries WHERE date = ?1", params![date])
        .map_err(DbError::DeleteFailed)
}

/// Retrieves the most recent entries, newest first.
pub fn list_weight_entries(conn: &Connection, limit: u32) -> Result<Vec<WeightEntry>, DbError> {
    let mut stmt = conn
        .prepare("SELECT date, weight, unit FROM weight_entries ORDER BY date DESC LIMIT ?1")
        .map_err(DbError::QueryFailed)?;
    let iter = stmt
        .query_map(params![limit], map_row_to_entry)
        .map_err(DbError::QueryFailed)?;
    iter.collect::<Result<Vec<_>, _>>()
        .map_err(DbError::QueryFailed)
}

// --- Goal Functions ---

pub fn get_goal(conn: &Connection) -> Result<Option<WeightLossGoal>, DbError> {
    conn.query_row(
        "SELECT start_date, start_weight, goal_date, goal_weight, unit FROM goal WHERE id = 1",
        [],
        |row| {
            Ok(WeightLossGoal {
                start_date: row.get(0)?,
                start_weight: decimal_column(row, 1)?,
                goal_date: row.get(2)?,
                goal_weight: decimal_column(row, 3)?,
                unit: unit_column(row, 4)?,
            })
        },
    )
    .optional()
    .map_err(DbError::QueryFailed)
}

/// Inserts the goal or replaces the existing one.
pub fn set_goal(conn: &Connection, goal: &WeightLossGoal) -> Result<(), DbError> {
    conn.execute(
        "INSERT INTO goal (id, start_date, start_weight, goal_date, goal_weight, unit)
         VALUES (1, ?1, ?2, ?3, ?4, ?5)
         ON CONFLICT(id) DO UPDATE SET
            start_date = excluded.start_date,
            start_weight = excluded.start_weight,
            goal_date = excluded.goal_date,
            goal_weight = excluded.goal_weight,
            unit = excluded.unit",
        params![
            goal.start_date,
            goal.start_weight.to_string(),
            goal.goal_date,
            goal.goal_weight.to_string(),
            goal.unit.to_string(),
        ],
    )
    .map_err(DbError::InsertFailed)?;
    Ok(())
}
