use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::collections::VecDeque;
use std::str::FromStr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use weight_goal_lib::set_goal::strings;
use weight_goal_lib::{
    db, AnalyticsService, DataService, DialogService, FormDefaults, NavigationService, SaveOutcome,
    SaveStep, Services, SetGoalScreen, SettingsService, SqliteDataService, WeightEntry,
    WeightField, WeightLossGoal, WeightUnit,
};

// --- Fakes ---

#[derive(Debug, Clone)]
struct Alert {
    title: String,
    message: String,
    cancel: Option<String>,
}

/// Answers confirmations from a script; informational alerts are just recorded.
#[derive(Default)]
struct ScriptedDialog {
    answers: Mutex<VecDeque<bool>>,
    alerts: Mutex<Vec<Alert>>,
}

impl ScriptedDialog {
    fn answering(answers: &[bool]) -> Self {
        Self {
            answers: Mutex::new(answers.iter().copied().collect()),
            alerts: Mutex::default(),
        }
    }

    fn alerts(&self) -> Vec<Alert> {
        self.alerts.lock().unwrap().clone()
    }
}

#[async_trait]
impl DialogService for ScriptedDialog {
    async fn display_alert(
        &self,
        title: &str,
        message: &str,
        _accept: &str,
        cancel: Option<&str>,
    ) -> bool {
        self.alerts.lock().unwrap().push(Alert {
            title: title.to_string(),
            message: message.to_string(),
            cancel: cancel.map(str::to_string),
        });
        if cancel.is_none() {
            return true;
        }
        self.answers.lock().unwrap().pop_front().unwrap_or(true)
    }
}

#[derive(Default)]
struct RecordingAnalytics {
    page_views: Mutex<Vec<String>>,
    events: Mutex<Vec<(String, String, u32)>>,
    errors: Mutex<Vec<String>>,
    fatal_errors: Mutex<Vec<String>>,
}

impl AnalyticsService for RecordingAnalytics {
    fn track_page_view(&self, page: &str) {
        self.page_views.lock().unwrap().push(page.to_string());
    }

    fn track_event(&self, category: &str, name: &str, count: u32) {
        self.events
            .lock()
            .unwrap()
            .push((category.to_string(), name.to_string(), count));
    }

    fn track_error(&self, message: &str) {
        self.errors.lock().unwrap().push(message.to_string());
    }

    fn track_fatal_error(&self, message: &str, _err: &anyhow::Error) {
        self.fatal_errors.lock().unwrap().push(message.to_string());
    }
}

#[derive(Default)]
struct RecordingNavigation {
    modal_backs: AtomicUsize,
}

impl RecordingNavigation {
    fn count(&self) -> usize {
        self.modal_backs.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl NavigationService for RecordingNavigation {
    async fn go_back(&self, use_modal_navigation: bool) -> Result<()> {
        assert!(use_modal_navigation);
        self.modal_backs.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

struct FixedUnit(WeightUnit);

impl SettingsService for FixedUnit {
    fn weight_unit(&self) -> WeightUnit {
        self.0
    }
}

/// Ways the store can misbehave.
#[derive(Default, Clone, Copy)]
struct Faults {
    refuse_remove: bool,
    refuse_add: bool,
    refuse_set_goal: bool,
    raise_on_add: bool,
    raise_on_get_goal: bool,
    raise_on_lookup: bool,
}

/// Real in-memory store with injectable failures.
struct FlakyData {
    store: SqliteDataService,
    faults: Faults,
}

#[async_trait]
impl DataService for FlakyData {
    async fn get_goal(&self) -> Result<Option<WeightLossGoal>> {
        if self.faults.raise_on_get_goal {
            return Err(anyhow!("goal table unreadable"));
        }
        self.store.get_goal().await
    }

    async fn set_goal(&self, goal: &WeightLossGoal) -> Result<bool> {
        if self.faults.refuse_set_goal {
            return Ok(false);
        }
        self.store.set_goal(goal).await
    }

    async fn get_weight_entry_for_date(&self, date: NaiveDate) -> Result<Option<WeightEntry>> {
        if self.faults.raise_on_lookup {
            return Err(anyhow!("weight table unreadable"));
        }
        self.store.get_weight_entry_for_date(date).await
    }

    async fn add_weight_entry(&self, entry: &WeightEntry) -> Result<bool> {
        if self.faults.raise_on_add {
            return Err(anyhow!("disk full"));
        }
        if self.faults.refuse_add {
            return Ok(false);
        }
        self.store.add_weight_entry(entry).await
    }

    async fn remove_weight_entry_for_date(&self, date: NaiveDate) -> Result<bool> {
        if self.faults.refuse_remove {
            return Ok(false);
        }
        self.store.remove_weight_entry_for_date(date).await
    }
}

// --- Harness ---

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

fn empty_store() -> SqliteDataService {
    let conn = rusqlite::Connection::open_in_memory().unwrap();
    db::init_db(&conn).unwrap();
    SqliteDataService::new(conn)
}

fn defaults() -> FormDefaults {
    FormDefaults {
        today: date(2024, 1, 1),
        goal_offset_months: 5,
    }
}

struct Harness {
    screen: SetGoalScreen,
    data: Arc<FlakyData>,
    dialog: Arc<ScriptedDialog>,
    analytics: Arc<RecordingAnalytics>,
    navigation: Arc<RecordingNavigation>,
}

impl Harness {
    fn new(store: SqliteDataService, faults: Faults, unit: WeightUnit, answers: &[bool]) -> Self {
        let data = Arc::new(FlakyData { store, faults });
        let dialog = Arc::new(ScriptedDialog::answering(answers));
        let analytics = Arc::new(RecordingAnalytics::default());
        let navigation = Arc::new(RecordingNavigation::default());
        let screen = SetGoalScreen::new(
            Services {
                data: data.clone(),
                settings: Arc::new(FixedUnit(unit)),
                dialogs: dialog.clone(),
                analytics: analytics.clone(),
                navigation: navigation.clone(),
            },
            defaults(),
        );
        Self {
            screen,
            data,
            dialog,
            analytics,
            navigation,
        }
    }

    /// Shows the screen and waits for the initial loads.
    async fn open(self) -> Self {
        self.screen.on_navigating_to();
        self.screen.on_navigated_to();
        self.screen.settle().await;
        self
    }

    fn enter(&self, start: &str, goal: &str) {
        self.screen.set_weight_text(WeightField::StartWeight, start);
        self.screen.set_weight_text(WeightField::GoalWeight, goal);
    }

    fn alert_titles(&self) -> Vec<String> {
        self.dialog.alerts().into_iter().map(|a| a.title).collect()
    }
}

async fn opened(store: SqliteDataService) -> Harness {
    Harness::new(store, Faults::default(), WeightUnit::Pounds, &[])
        .open()
        .await
}

async fn seed_entry(store: &SqliteDataService, day: NaiveDate, weight: &str, unit: WeightUnit) {
    store
        .add_weight_entry(&WeightEntry::new(day, dec(weight), unit))
        .await
        .unwrap();
}

// --- Tests ---

#[tokio::test]
async fn test_save_new_goal_without_prompts() {
    let h = opened(empty_store()).await;
    let form = h.screen.form();
    assert_eq!(form.start_date, date(2024, 1, 1));
    assert_eq!(form.goal_date, date(2024, 6, 1));
    assert!(!h.screen.can_save());

    h.enter("200", "180");
    assert!(h.screen.can_save());

    assert_eq!(h.screen.save().await, SaveOutcome::Saved);
    assert!(h.dialog.alerts().is_empty());
    assert_eq!(h.navigation.count(), 1);

    let goal = h.data.store.get_goal().await.unwrap().unwrap();
    assert_eq!(goal.start_date, date(2024, 1, 1));
    assert_eq!(goal.start_weight, dec("200"));
    assert_eq!(goal.goal_date, date(2024, 6, 1));
    assert_eq!(goal.goal_weight, dec("180"));
    assert_eq!(goal.unit, WeightUnit::Pounds);

    let entry = h
        .data
        .store
        .get_weight_entry_for_date(date(2024, 1, 1))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(entry.weight, dec("200"));

    assert_eq!(
        *h.analytics.page_views.lock().unwrap(),
        vec![strings::PAGE_SET_GOAL.to_string()]
    );
    assert_eq!(
        *h.analytics.events.lock().unwrap(),
        vec![(
            strings::SET_GOAL_CATEGORY.to_string(),
            strings::SET_GOAL_SAVED_GOAL.to_string(),
            1
        )]
    );
    assert_eq!(h.screen.pending_requests(), 0);
}

#[tokio::test]
async fn test_declining_overwrite_keeps_existing_weight() {
    let store = empty_store();
    seed_entry(&store, date(2024, 1, 1), "205", WeightUnit::Pounds).await;
    let h = Harness::new(store, Faults::default(), WeightUnit::Pounds, &[false])
        .open()
        .await;

    // Lookup filled the start weight from the log
    assert_eq!(h.screen.form().start_weight, "205.0");

    h.enter("200", "180");
    assert_eq!(h.screen.save().await, SaveOutcome::Cancelled);

    let alerts = h.dialog.alerts();
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].title, strings::UPDATE_EXISTING_WEIGHT_TITLE);
    assert!(alerts[0].message.contains("205.0"));
    assert!(alerts[0].message.contains("200.0"));
    assert!(alerts[0].message.contains("2024-01-01"));
    assert_eq!(alerts[0].cancel.as_deref(), Some(strings::GENERIC_CANCEL));

    let entry = h
        .data
        .store
        .get_weight_entry_for_date(date(2024, 1, 1))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(entry.weight, dec("205"));
    assert_eq!(h.data.store.get_goal().await.unwrap(), None);
    assert_eq!(h.navigation.count(), 0);
}

#[tokio::test]
async fn test_overwrite_message_uses_stones_in_stones_mode() {
    let store = empty_store();
    seed_entry(&store, date(2024, 1, 1), "205", WeightUnit::Pounds).await;
    let h = Harness::new(store, Faults::default(), WeightUnit::StonesAndPounds, &[false])
        .open()
        .await;

    let form = h.screen.form();
    assert_eq!(form.start_weight_stones, "14");
    assert_eq!(form.start_weight_stone_pounds, "9.0");

    h.screen
        .set_weight_text(WeightField::StartWeightStonePounds, "4");
    h.screen.set_weight_text(WeightField::GoalWeightStones, "12");
    h.screen
        .set_weight_text(WeightField::GoalWeightStonePounds, "0");
    assert_eq!(h.screen.save().await, SaveOutcome::Cancelled);

    let alerts = h.dialog.alerts();
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].title, strings::UPDATE_EXISTING_WEIGHT_TITLE);
    assert!(alerts[0].message.contains("14 st 9.0 lb"));
    assert!(alerts[0].message.contains("14 st 4.0 lb"));
}

#[tokio::test]
async fn test_accepting_overwrite_replaces_weight() {
    let store = empty_store();
    seed_entry(&store, date(2024, 1, 1), "205", WeightUnit::Pounds).await;
    let h = Harness::new(store, Faults::default(), WeightUnit::Pounds, &[true])
        .open()
        .await;

    h.enter("200", "180");
    assert_eq!(h.screen.save().await, SaveOutcome::Saved);

    let entry = h
        .data
        .store
        .get_weight_entry_for_date(date(2024, 1, 1))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(entry.weight, dec("200"));
    assert!(h.data.store.get_goal().await.unwrap().is_some());
}

#[tokio::test]
async fn test_same_weight_is_replaced_without_asking() {
    let store = empty_store();
    seed_entry(&store, date(2024, 1, 1), "90", WeightUnit::Pounds).await;
    let h = Harness::new(store, Faults::default(), WeightUnit::Kilograms, &[])
        .open()
        .await;

    h.enter("90", "80");
    assert_eq!(h.screen.save().await, SaveOutcome::Saved);
    assert!(h.dialog.alerts().is_empty());

    // Re-added under the current unit
    let entry = h
        .data
        .store
        .get_weight_entry_for_date(date(2024, 1, 1))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(entry.unit, WeightUnit::Kilograms);
}

#[tokio::test]
async fn test_save_not_executed_when_dates_invalid() {
    let h = opened(empty_store()).await;
    h.enter("200", "180");
    h.screen.set_goal_date(date(2024, 1, 1));
    assert!(!h.screen.can_save());

    assert_eq!(h.screen.save().await, SaveOutcome::NotExecuted);
    assert!(h.analytics.events.lock().unwrap().is_empty());
    assert!(h.dialog.alerts().is_empty());
    assert_eq!(h.data.store.get_goal().await.unwrap(), None);
}

#[tokio::test]
async fn test_can_save_follows_edits() {
    let h = opened(empty_store()).await;
    let mut can_save = h.screen.subscribe_can_save();
    assert!(!*can_save.borrow_and_update());

    h.enter("abc", "180");
    assert!(!h.screen.can_save());
    assert!(!can_save.has_changed().unwrap());

    h.screen.set_weight_text(WeightField::StartWeight, "200");
    assert!(h.screen.can_save());
    assert!(can_save.has_changed().unwrap());
    assert!(*can_save.borrow_and_update());

    h.screen.set_goal_date(date(2023, 12, 1));
    assert!(!h.screen.can_save());
}

#[tokio::test]
async fn test_saved_goal_reloads_in_pounds_mode() {
    let store = empty_store();
    let h = opened(store.clone()).await;
    h.enter("150", "140");
    assert_eq!(h.screen.save().await, SaveOutcome::Saved);
    drop(h);

    let h = opened(store).await;
    let form = h.screen.form();
    assert_eq!(form.start_date, date(2024, 1, 1));
    assert_eq!(form.goal_date, date(2024, 6, 1));
    assert_eq!(form.start_weight, "150.0");
    assert_eq!(form.goal_weight, "140.0");
    assert!(h.screen.can_save());
}

#[tokio::test]
async fn test_saved_goal_reloads_in_stones_mode() {
    let store = empty_store();
    let h = Harness::new(store.clone(), Faults::default(), WeightUnit::StonesAndPounds, &[])
        .open()
        .await;
    assert!(h.screen.shows_stones_entry_fields());

    h.screen.set_weight_text(WeightField::StartWeightStones, "10");
    h.screen
        .set_weight_text(WeightField::StartWeightStonePounds, "10");
    h.screen.set_weight_text(WeightField::GoalWeightStones, "10");
    h.screen
        .set_weight_text(WeightField::GoalWeightStonePounds, "0");
    assert_eq!(h.screen.save().await, SaveOutcome::Saved);

    let goal = store.get_goal().await.unwrap().unwrap();
    assert_eq!(goal.start_weight, dec("150"));
    assert_eq!(goal.goal_weight, dec("140"));
    drop(h);

    let h = Harness::new(store, Faults::default(), WeightUnit::StonesAndPounds, &[])
        .open()
        .await;
    let form = h.screen.form();
    assert_eq!(form.start_weight_stones, "10");
    assert_eq!(form.start_weight_stone_pounds, "10.0");
    assert_eq!(form.goal_weight_stones, "10");
    assert_eq!(form.goal_weight_stone_pounds, "0.0");
}

#[tokio::test]
async fn test_higher_goal_warns_then_saves() {
    let h = opened(empty_store()).await;
    h.enter("180", "200");
    assert_eq!(h.screen.save().await, SaveOutcome::Saved);
    assert_eq!(h.alert_titles(), vec![strings::GOAL_WEIGHT_GREATER_TITLE]);
    assert_eq!(h.navigation.count(), 1);
}

#[tokio::test]
async fn test_refused_add_stops_the_save() {
    let faults = Faults {
        refuse_add: true,
        ..Faults::default()
    };
    let h = Harness::new(empty_store(), faults, WeightUnit::Pounds, &[])
        .open()
        .await;
    h.enter("200", "180");

    assert_eq!(
        h.screen.save().await,
        SaveOutcome::PersistenceFailed(SaveStep::AddWeight)
    );
    assert_eq!(h.analytics.errors.lock().unwrap().len(), 1);
    let alerts = h.dialog.alerts();
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].title, strings::SAVE_ERROR_TITLE);
    assert_eq!(alerts[0].message, strings::ADDING_WEIGHT_FAILED_MESSAGE);
    assert_eq!(h.data.store.get_goal().await.unwrap(), None);
    assert_eq!(h.navigation.count(), 0);
}

#[tokio::test]
async fn test_refused_remove_stops_the_save() {
    let store = empty_store();
    seed_entry(&store, date(2024, 1, 1), "205", WeightUnit::Pounds).await;
    let faults = Faults {
        refuse_remove: true,
        ..Faults::default()
    };
    let h = Harness::new(store, faults, WeightUnit::Pounds, &[true])
        .open()
        .await;
    h.enter("200", "180");

    assert_eq!(
        h.screen.save().await,
        SaveOutcome::PersistenceFailed(SaveStep::RemoveExistingWeight)
    );
    assert_eq!(
        h.alert_titles(),
        vec![strings::UPDATE_EXISTING_WEIGHT_TITLE, strings::SAVE_ERROR_TITLE]
    );
    assert_eq!(h.analytics.errors.lock().unwrap().len(), 1);
    assert_eq!(h.data.store.get_goal().await.unwrap(), None);
}

#[tokio::test]
async fn test_refused_goal_keeps_the_new_weight() {
    let faults = Faults {
        refuse_set_goal: true,
        ..Faults::default()
    };
    let h = Harness::new(empty_store(), faults, WeightUnit::Pounds, &[])
        .open()
        .await;
    h.enter("200", "180");

    assert_eq!(
        h.screen.save().await,
        SaveOutcome::PersistenceFailed(SaveStep::SetGoal)
    );
    let alerts = h.dialog.alerts();
    assert_eq!(alerts[0].message, strings::ADDING_GOAL_FAILED_MESSAGE);
    // Weight entry written in the previous step stays
    assert!(h
        .data
        .store
        .get_weight_entry_for_date(date(2024, 1, 1))
        .await
        .unwrap()
        .is_some());
    assert_eq!(h.navigation.count(), 0);
}

#[tokio::test]
async fn test_raising_store_faults_the_save() {
    let faults = Faults {
        raise_on_add: true,
        ..Faults::default()
    };
    let h = Harness::new(empty_store(), faults, WeightUnit::Pounds, &[])
        .open()
        .await;
    h.enter("200", "180");

    assert_eq!(h.screen.save().await, SaveOutcome::Faulted);
    assert_eq!(
        *h.analytics.fatal_errors.lock().unwrap(),
        vec!["save - an exception occurred.".to_string()]
    );
    let alerts = h.dialog.alerts();
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].message, strings::SAVE_EXCEPTION_MESSAGE);
    assert_eq!(h.screen.pending_requests(), 0);
    assert!(!h.screen.is_busy());
}

#[tokio::test]
async fn test_goal_load_failure_is_reported_quietly() {
    let faults = Faults {
        raise_on_get_goal: true,
        ..Faults::default()
    };
    let h = Harness::new(empty_store(), faults, WeightUnit::Pounds, &[])
        .open()
        .await;

    assert_eq!(
        *h.analytics.fatal_errors.lock().unwrap(),
        vec!["load_existing_goal - an exception occurred.".to_string()]
    );
    assert!(h.dialog.alerts().is_empty());
    let form = h.screen.form();
    assert_eq!(form.goal_date, date(2024, 6, 1));
    assert!(form.start_weight.is_empty());
    assert_eq!(h.screen.pending_requests(), 0);
}

#[tokio::test]
async fn test_lookup_failure_is_reported() {
    let faults = Faults {
        raise_on_lookup: true,
        ..Faults::default()
    };
    let h = Harness::new(empty_store(), faults, WeightUnit::Pounds, &[])
        .open()
        .await;

    let fatal = h.analytics.fatal_errors.lock().unwrap().clone();
    assert!(!fatal.is_empty());
    assert!(fatal
        .iter()
        .all(|m| m == "update_start_weight_from_start_date - an exception occurred."));
    assert!(h.dialog.alerts().is_empty());
}

#[tokio::test]
async fn test_changing_start_date_looks_up_weight() {
    let store = empty_store();
    seed_entry(&store, date(2024, 2, 1), "180", WeightUnit::Pounds).await;
    let h = opened(store).await;
    assert!(h.screen.form().start_weight.is_empty());

    h.screen.set_start_date(date(2024, 2, 1));
    h.screen.settle().await;
    assert_eq!(h.screen.form().start_weight, "180.0");
    assert_eq!(h.screen.pending_requests(), 0);
}

#[tokio::test]
async fn test_superseded_lookup_is_discarded() {
    let store = empty_store();
    seed_entry(&store, date(2024, 2, 1), "180", WeightUnit::Pounds).await;
    let h = opened(store).await;

    h.screen.set_start_date(date(2024, 2, 1));
    h.screen.set_start_date(date(2024, 2, 2));
    h.screen.settle().await;

    let form = h.screen.form();
    assert_eq!(form.start_date, date(2024, 2, 2));
    assert_ne!(form.start_weight, "180.0");
}

#[tokio::test]
async fn test_leaving_the_screen_cancels_loads() {
    let store = empty_store();
    seed_entry(&store, date(2024, 2, 1), "180", WeightUnit::Pounds).await;
    let h = opened(store).await;

    h.screen.set_start_date(date(2024, 2, 1));
    h.screen.on_navigated_from();
    h.screen.settle().await;

    assert!(h.screen.form().start_weight.is_empty());
    assert_eq!(h.screen.pending_requests(), 0);
}

#[tokio::test]
async fn test_close_navigates_back() {
    let h = opened(empty_store()).await;
    h.screen.close().await;
    assert_eq!(h.navigation.count(), 1);
    assert!(h.data.store.get_goal().await.unwrap().is_none());
}
