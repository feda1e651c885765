// src/set_goal/mod.rs
//! The Set Goal screen.
//!
//! Holds the form, keeps the save command's eligibility in step with every edit,
//! pre-populates fields from stored data and runs the save workflow. The host
//! drives it through three lifecycle hooks (`on_navigating_to`,
//! `on_navigated_to`, `on_navigated_from`) and two commands (`save`, `close`).
//!
//! Background loads run as tasks owned by the screen. They must be started from
//! inside a Tokio runtime.

mod busy;
mod state;
pub mod strings;

pub use busy::{BusyGuard, PendingRequests};
pub use state::{FormState, ParsedWeights, WeightField};

use anyhow::Result;
use chrono::{Local, NaiveDate};
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::watch;
use tokio::task::{JoinError, JoinSet};
use tracing::{debug, error, info, warn};

use crate::config::{Config, WeightUnit};
use crate::db::{WeightEntry, WeightLossGoal};
use crate::services::{
    AnalyticsService, DataService, DialogService, NavigationService, SettingsService,
};

/// Collaborators handed to the screen.
#[derive(Clone)]
pub struct Services {
    pub data: Arc<dyn DataService>,
    pub settings: Arc<dyn SettingsService>,
    pub dialogs: Arc<dyn DialogService>,
    pub analytics: Arc<dyn AnalyticsService>,
    pub navigation: Arc<dyn NavigationService>,
}

/// Starting values for a fresh form.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FormDefaults {
    pub today: NaiveDate,
    pub goal_offset_months: u32,
}

impl FormDefaults {
    pub fn from_config(config: &Config) -> Self {
        Self {
            today: Local::now().date_naive(),
            goal_offset_months: config.goal_offset_months,
        }
    }
}

/// Persistence call that reported failure during a save.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SaveStep {
    RemoveExistingWeight,
    AddWeight,
    SetGoal,
}

/// How a save attempt ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SaveOutcome {
    /// The command was not eligible to run; nothing happened.
    NotExecuted,
    /// Everything was stored and the screen navigated back.
    Saved,
    InvalidWeight,
    /// The user declined to overwrite the weight already logged for the start date.
    Cancelled,
    PersistenceFailed(SaveStep),
    /// A collaborator raised an error; it was reported and shown as a save error.
    Faulted,
}

struct Inner {
    services: Services,
    form: Mutex<FormState>,
    can_save: watch::Sender<bool>,
    pending: PendingRequests,
    tasks: Mutex<JoinSet<()>>,
    // Bumped on every departure so a running `settle` aborts what it holds
    departures: watch::Sender<u64>,
}

// Poisoning only means a panic elsewhere; the form data itself is still usable.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn log_task_result(result: Result<(), JoinError>) {
    match result {
        Ok(()) => {}
        Err(e) if e.is_cancelled() => debug!("background load cancelled"),
        Err(e) => error!(error = %e, "background load panicked"),
    }
}

pub struct SetGoalScreen {
    inner: Arc<Inner>,
}

impl SetGoalScreen {
    /// Builds the screen with default dates and starts the lookup of the weight
    /// logged for today.
    pub fn new(services: Services, defaults: FormDefaults) -> Self {
        let form = FormState::new(defaults.today, defaults.goal_offset_months);
        let (can_save, _) = watch::channel(form.can_save());
        let (departures, _) = watch::channel(0);
        let inner = Arc::new(Inner {
            services,
            form: Mutex::new(form),
            can_save,
            pending: PendingRequests::default(),
            tasks: Mutex::new(JoinSet::new()),
            departures,
        });
        inner.spawn_start_weight_lookup();
        Self { inner }
    }

    // --- Lifecycle ---

    /// Screen is about to appear: pick the entry fields for the unit preference.
    pub fn on_navigating_to(&self) {
        let stones = self.inner.services.settings.weight_unit() == WeightUnit::StonesAndPounds;
        debug!(stones, "resolved weight entry mode");
        self.inner
            .edit(|form| form.show_stones_entry_fields = stones);
        self.inner.spawn_start_weight_lookup();
    }

    /// Screen is visible: record the page view and load any existing goal.
    pub fn on_navigated_to(&self) {
        self.inner
            .services
            .analytics
            .track_page_view(strings::PAGE_SET_GOAL);
        let inner = Arc::clone(&self.inner);
        self.inner
            .spawn(async move { inner.load_existing_goal().await });
    }

    /// Screen is going away; background loads still running are dropped.
    pub fn on_navigated_from(&self) {
        lock(&self.inner.tasks).abort_all();
        self.inner.departures.send_modify(|count| *count += 1);
    }

    /// Waits for every background load, including lookups they trigger.
    ///
    /// Loads being awaited here are still aborted by `on_navigated_from`.
    pub async fn settle(&self) {
        let mut departures = self.inner.departures.subscribe();
        loop {
            let mut running = std::mem::replace(&mut *lock(&self.inner.tasks), JoinSet::new());
            if running.is_empty() {
                break;
            }
            loop {
                tokio::select! {
                    next = running.join_next() => match next {
                        Some(result) => log_task_result(result),
                        None => break,
                    },
                    Ok(()) = departures.changed() => running.abort_all(),
                }
            }
        }
    }

    // --- Form fields ---

    pub fn form(&self) -> FormState {
        lock(&self.inner.form).clone()
    }

    pub fn shows_stones_entry_fields(&self) -> bool {
        lock(&self.inner.form).show_stones_entry_fields
    }

    /// Changes the start date and looks up the weight logged on it.
    pub fn set_start_date(&self, date: NaiveDate) {
        self.inner.set_start_date(date);
    }

    pub fn set_goal_date(&self, date: NaiveDate) {
        self.inner.edit(|form| form.goal_date = date);
    }

    pub fn set_weight_text(&self, field: WeightField, value: impl Into<String>) {
        let value = value.into();
        self.inner.edit(|form| *form.field_mut(field) = value);
    }

    // --- Observable state ---

    pub fn can_save(&self) -> bool {
        *self.inner.can_save.borrow()
    }

    pub fn subscribe_can_save(&self) -> watch::Receiver<bool> {
        self.inner.can_save.subscribe()
    }

    pub fn is_busy(&self) -> bool {
        self.inner.pending.is_busy()
    }

    pub fn pending_requests(&self) -> usize {
        self.inner.pending.count()
    }

    pub fn subscribe_pending_requests(&self) -> watch::Receiver<usize> {
        self.inner.pending.subscribe()
    }

    // --- Commands ---

    /// Runs the save workflow if the form is eligible.
    pub async fn save(&self) -> SaveOutcome {
        if !self.can_save() {
            debug!("save requested while not eligible");
            return SaveOutcome::NotExecuted;
        }
        self.inner.save().await
    }

    /// Dismisses the screen without saving.
    pub async fn close(&self) {
        if let Err(e) = self.inner.services.navigation.go_back(true).await {
            self.inner
                .services
                .analytics
                .track_error(&format!("close - navigation failed: {e}"));
        }
    }
}

impl Drop for SetGoalScreen {
    fn drop(&mut self) {
        lock(&self.inner.tasks).abort_all();
    }
}

impl Inner {
    /// Every field change goes through here so eligibility is never stale.
    fn edit(&self, change: impl FnOnce(&mut FormState)) {
        let eligible = {
            let mut form = lock(&self.form);
            change(&mut form);
            form.can_save()
        };
        self.can_save.send_if_modified(|current| {
            let changed = *current != eligible;
            *current = eligible;
            changed
        });
    }

    fn spawn<F>(&self, work: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let mut tasks = lock(&self.tasks);
        while let Some(finished) = tasks.try_join_next() {
            log_task_result(finished);
        }
        tasks.spawn(work);
    }

    fn set_start_date(self: &Arc<Self>, date: NaiveDate) {
        self.edit(|form| form.start_date = date);
        self.spawn_start_weight_lookup();
    }

    fn spawn_start_weight_lookup(self: &Arc<Self>) {
        let date = lock(&self.form).start_date;
        let inner = Arc::clone(self);
        self.spawn(async move { inner.update_start_weight_from_start_date(date).await });
    }

    async fn update_start_weight_from_start_date(&self, date: NaiveDate) {
        let _busy = self.pending.acquire();

        match self.services.data.get_weight_entry_for_date(date).await {
            Ok(Some(entry)) => self.edit(|form| {
                // A newer start date has its own lookup in flight
                if form.start_date != date {
                    debug!(%date, "discarding weight for superseded start date");
                    return;
                }
                form.show_start_weight(entry.weight);
            }),
            Ok(None) => debug!(%date, "no weight logged for start date"),
            Err(e) => self.services.analytics.track_fatal_error(
                "update_start_weight_from_start_date - an exception occurred.",
                &e,
            ),
        }
    }

    async fn load_existing_goal(self: &Arc<Self>) {
        let existing = {
            let _busy = self.pending.acquire();
            match self.services.data.get_goal().await {
                Ok(goal) => goal,
                Err(e) => {
                    self.services
                        .analytics
                        .track_fatal_error("load_existing_goal - an exception occurred.", &e);
                    return;
                }
            }
        };

        let Some(goal) = existing else {
            debug!("no existing goal, keeping defaults");
            return;
        };

        // Past goals are still loaded so the user can move them forward
        self.set_start_date(goal.start_date);
        self.edit(|form| {
            form.goal_date = goal.goal_date;
            form.show_start_weight(goal.start_weight);
            form.show_goal_weight(goal.goal_weight);
        });
    }

    async fn alert(&self, title: &str, message: &str) {
        self.services
            .dialogs
            .display_alert(title, message, strings::GENERIC_OK, None)
            .await;
    }

    async fn save(&self) -> SaveOutcome {
        // Counted before validation
        self.services.analytics.track_event(
            strings::SET_GOAL_CATEGORY,
            strings::SET_GOAL_SAVED_GOAL,
            1,
        );

        let form = lock(&self.form).clone();
        let Some(weights) = form.parsed_weights() else {
            self.alert(strings::INVALID_WEIGHT_TITLE, strings::INVALID_WEIGHT_MESSAGE)
                .await;
            return SaveOutcome::InvalidWeight;
        };

        // Warn only, the save still goes ahead
        if weights.goal > weights.start {
            self.alert(
                strings::GOAL_WEIGHT_GREATER_TITLE,
                strings::GOAL_WEIGHT_GREATER_MESSAGE,
            )
            .await;
        }

        let _busy = self.pending.acquire();
        match self.persist(&form, weights).await {
            Ok(outcome) => outcome,
            Err(e) => {
                self.services
                    .analytics
                    .track_fatal_error("save - an exception occurred.", &e);
                self.alert(strings::SAVE_ERROR_TITLE, strings::SAVE_EXCEPTION_MESSAGE)
                    .await;
                SaveOutcome::Faulted
            }
        }
    }

    async fn persist(&self, form: &FormState, weights: ParsedWeights) -> Result<SaveOutcome> {
        let data = &self.services.data;
        let unit = self.services.settings.weight_unit();
        let start_date = form.start_date;

        if let Some(existing) = data.get_weight_entry_for_date(start_date).await? {
            if existing.weight != weights.start {
                let message = strings::update_existing_weight_message(
                    &form.describe_weight(existing.weight),
                    start_date,
                    &form.describe_weight(weights.start),
                );
                let confirmed = self
                    .services
                    .dialogs
                    .display_alert(
                        strings::UPDATE_EXISTING_WEIGHT_TITLE,
                        &message,
                        strings::GENERIC_OK,
                        Some(strings::GENERIC_CANCEL),
                    )
                    .await;
                if !confirmed {
                    info!(%start_date, "kept existing weight entry, save cancelled");
                    return Ok(SaveOutcome::Cancelled);
                }
            }

            // Replaced even when unchanged so the unit follows the current setting
            if !data.remove_weight_entry_for_date(start_date).await? {
                return Ok(self
                    .persistence_failed(
                        SaveStep::RemoveExistingWeight,
                        "save - Error when trying to remove existing weight entry for start date",
                        strings::REMOVE_EXISTING_WEIGHT_FAILED_MESSAGE,
                    )
                    .await);
            }
        }

        let entry = WeightEntry::new(start_date, weights.start, unit);
        if !data.add_weight_entry(&entry).await? {
            return Ok(self
                .persistence_failed(
                    SaveStep::AddWeight,
                    "save - Error when trying to add weight entry for start date",
                    strings::ADDING_WEIGHT_FAILED_MESSAGE,
                )
                .await);
        }

        // TODO: roll the weight entry back when the goal cannot be stored
        let goal = WeightLossGoal {
            start_date,
            start_weight: weights.start,
            goal_date: form.goal_date,
            goal_weight: weights.goal,
            unit,
        };
        if !data.set_goal(&goal).await? {
            return Ok(self
                .persistence_failed(
                    SaveStep::SetGoal,
                    "save - Error when trying to save new weight loss goal",
                    strings::ADDING_GOAL_FAILED_MESSAGE,
                )
                .await);
        }

        self.services.navigation.go_back(true).await?;
        info!(%start_date, goal_date = %goal.goal_date, "goal saved");
        Ok(SaveOutcome::Saved)
    }

    async fn persistence_failed(
        &self,
        step: SaveStep,
        report: &str,
        user_message: &str,
    ) -> SaveOutcome {
        warn!(?step, "save aborted");
        self.services.analytics.track_error(report);
        self.alert(strings::SAVE_ERROR_TITLE, user_message).await;
        SaveOutcome::PersistenceFailed(step)
    }
}
