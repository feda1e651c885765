// src/lib.rs
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;

// --- Declare modules ---
mod config;
pub mod db;
pub mod services;
pub mod set_goal;
pub mod weight;

// --- Expose public types ---
pub use config::{
    get_config_path as get_config_path_util, load as load_config_util, parse_color,
    save as save_config_util, Config, ConfigError, StandardColor, Theme, WeightUnit,
};
pub use db::{get_db_path as get_db_path_util, DbError, WeightEntry, WeightLossGoal};
pub use services::{
    AnalyticsService, DataService, DialogService, NavigationService, SettingsService,
    SqliteDataService, TracingAnalytics,
};
pub use set_goal::{
    FormDefaults, FormState, SaveOutcome, SaveStep, Services, SetGoalScreen, WeightField,
};
pub use weight::{format_weight, StonesAndPounds};

/// Loaded configuration plus the store behind it.
pub struct AppService {
    pub config: Config,
    pub data: Arc<SqliteDataService>,
    pub db_path: PathBuf,
    pub config_path: PathBuf,
}

impl AppService {
    /// Initializes the application service.
    /// # Errors
    /// Returns `anyhow::Error` if config/db path determination, loading, or initialization fails.
    pub fn initialize() -> Result<Self> {
        let config_path =
            config::get_config_path().context("Failed to determine configuration file path")?;
        let config = config::load(&config_path)
            .with_context(|| format!("Failed to load config from {config_path:?}"))?;

        let db_path = db::get_db_path().context("Failed to determine database path")?;
        let conn = db::open_db(&db_path)
            .with_context(|| format!("Failed to open database at {db_path:?}"))?;
        db::init_db(&conn).context("Failed to initialize database schema")?;

        Ok(Self {
            config,
            data: Arc::new(SqliteDataService::new(conn)),
            db_path,
            config_path,
        })
    }

    pub fn get_config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn get_db_path(&self) -> &Path {
        &self.db_path
    }

    /// Saves the current configuration state.
    /// # Errors
    /// Returns `ConfigError` if saving fails.
    pub fn save_config(&self) -> Result<(), ConfigError> {
        config::save(&self.config_path, &self.config)
    }

    /// Sets the preferred weight unit.
    /// # Errors
    /// Returns `ConfigError` variants if saving fails.
    pub fn set_units(&mut self, units: WeightUnit) -> Result<(), ConfigError> {
        self.config.units = units;
        self.save_config()
    }

    /// Sets how far ahead a fresh goal date starts.
    /// # Errors
    /// - `ConfigError::InvalidGoalOffset` if `months` is 0.
    /// - `ConfigError` variants if saving fails.
    pub fn set_goal_offset_months(&mut self, months: u32) -> Result<(), ConfigError> {
        if months == 0 {
            return Err(ConfigError::InvalidGoalOffset(months));
        }
        self.config.goal_offset_months = months;
        self.save_config()
    }

    pub fn form_defaults(&self) -> FormDefaults {
        FormDefaults::from_config(&self.config)
    }
}
