// src/services.rs
//! Capabilities the Set Goal screen is handed at construction time, plus the
//! implementations the CLI wires in.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use rusqlite::Connection;
use std::sync::{Arc, Mutex};
use tokio::task;
use tracing::{error, info, warn};

use crate::config::{Config, WeightUnit};
use crate::db::{self, DbError, WeightEntry, WeightLossGoal};

/// Durable storage for the goal and the weight log.
///
/// `Ok(false)` means the store refused the change; `Err` means the call itself
/// failed.
#[async_trait]
pub trait DataService: Send + Sync {
    async fn get_goal(&self) -> Result<Option<WeightLossGoal>>;
    async fn set_goal(&self, goal: &WeightLossGoal) -> Result<bool>;
    async fn get_weight_entry_for_date(&self, date: NaiveDate) -> Result<Option<WeightEntry>>;
    async fn add_weight_entry(&self, entry: &WeightEntry) -> Result<bool>;
    async fn remove_weight_entry_for_date(&self, date: NaiveDate) -> Result<bool>;
}

pub trait SettingsService: Send + Sync {
    fn weight_unit(&self) -> WeightUnit;
}

impl SettingsService for Config {
    fn weight_unit(&self) -> WeightUnit {
        self.units
    }
}

/// Modal alerts. Without a cancel label the alert is informational and
/// resolves to `true` once dismissed.
#[async_trait]
pub trait DialogService: Send + Sync {
    async fn display_alert(
        &self,
        title: &str,
        message: &str,
        accept: &str,
        cancel: Option<&str>,
    ) -> bool;
}

/// Fire-and-forget telemetry.
pub trait AnalyticsService: Send + Sync {
    fn track_page_view(&self, page: &str);
    fn track_event(&self, category: &str, name: &str, count: u32);
    fn track_error(&self, message: &str);
    fn track_fatal_error(&self, message: &str, err: &anyhow::Error);
}

#[async_trait]
pub trait NavigationService: Send + Sync {
    async fn go_back(&self, use_modal_navigation: bool) -> Result<()>;
}

// --- SQLite-backed data access ---

#[derive(Clone)]
pub struct SqliteDataService {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteDataService {
    /// Wraps an already initialized connection (see `db::init_db`).
    pub fn new(conn: Connection) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
        }
    }

    /// Runs a synchronous query off the async executor.
    async fn with_conn<T, F>(&self, op: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T, DbError> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        task::spawn_blocking(move || {
            let guard = conn
                .lock()
                .map_err(|_| anyhow!("database connection lock poisoned"))?;
            op(&guard).map_err(anyhow::Error::from)
        })
        .await?
    }

    /// Newest entries first, for listings outside the screen.
    pub async fn list_weight_entries(&self, limit: u32) -> Result<Vec<WeightEntry>> {
        self.with_conn(move |conn| db::list_weight_entries(conn, limit))
            .await
    }
}

#[async_trait]
impl DataService for SqliteDataService {
    async fn get_goal(&self) -> Result<Option<WeightLossGoal>> {
        self.with_conn(db::get_goal).await
    }

    async fn set_goal(&self, goal: &WeightLossGoal) -> Result<bool> {
        let goal = goal.clone();
        self.with_conn(move |conn| db::set_goal(conn, &goal)).await?;
        Ok(true)
    }

    async fn get_weight_entry_for_date(&self, date: NaiveDate) -> Result<Option<WeightEntry>> {
        self.with_conn(move |conn| db::get_weight_entry_for_date(conn, date))
            .await
    }

    async fn add_weight_entry(&self, entry: &WeightEntry) -> Result<bool> {
        let entry = entry.clone();
        let added = self
            .with_conn(move |conn| match db::add_weight_entry(conn, &entry) {
                Ok(()) => Ok(true),
                Err(DbError::WeightEntryExists(date)) => {
                    warn!(%date, "weight entry already exists, not adding");
                    Ok(false)
                }
                Err(e) => Err(e),
            })
            .await?;
        Ok(added)
    }

    async fn remove_weight_entry_for_date(&self, date: NaiveDate) -> Result<bool> {
        let removed = self
            .with_conn(move |conn| db::remove_weight_entry_for_date(conn, date))
            .await?;
        Ok(removed > 0)
    }
}

// --- Analytics written to the tracing pipeline ---

#[derive(Debug, Default, Clone, Copy)]
pub struct TracingAnalytics;

impl AnalyticsService for TracingAnalytics {
    fn track_page_view(&self, page: &str) {
        info!(target: "analytics", page, "page view");
    }

    fn track_event(&self, category: &str, name: &str, count: u32) {
        info!(target: "analytics", category, name, count, "event");
    }

    fn track_error(&self, message: &str) {
        warn!(target: "analytics", message, "error");
    }

    fn track_fatal_error(&self, message: &str, err: &anyhow::Error) {
        error!(target: "analytics", message, error = ?err, "fatal error");
    }
}
