// src/set_goal/strings.rs
// User-facing copy and analytics names for the Set Goal screen.

use chrono::NaiveDate;

pub const GENERIC_OK: &str = "OK";
pub const GENERIC_CANCEL: &str = "Cancel";

pub const INVALID_WEIGHT_TITLE: &str = "Invalid Weight";
pub const INVALID_WEIGHT_MESSAGE: &str =
    "Please enter a valid start weight and goal weight before saving.";

pub const GOAL_WEIGHT_GREATER_TITLE: &str = "Goal Weight Is Higher";
pub const GOAL_WEIGHT_GREATER_MESSAGE: &str =
    "Your goal weight is greater than your start weight. Your goal will be saved, but the progress line will go up instead of down.";

pub const UPDATE_EXISTING_WEIGHT_TITLE: &str = "Update Existing Weight";

pub const SAVE_ERROR_TITLE: &str = "Save Error";
pub const REMOVE_EXISTING_WEIGHT_FAILED_MESSAGE: &str =
    "The existing weight for your start date could not be replaced. Please try again.";
pub const ADDING_WEIGHT_FAILED_MESSAGE: &str =
    "Your start weight could not be saved. Please try again.";
pub const ADDING_GOAL_FAILED_MESSAGE: &str = "Your goal could not be saved. Please try again.";
pub const SAVE_EXCEPTION_MESSAGE: &str =
    "An unexpected error occurred while saving your goal. Please try again.";

// Analytics
pub const PAGE_SET_GOAL: &str = "SetGoal";
pub const SET_GOAL_CATEGORY: &str = "SetGoal";
pub const SET_GOAL_SAVED_GOAL: &str = "SavedGoal";

pub fn update_existing_weight_message(existing: &str, date: NaiveDate, new: &str) -> String {
    format!(
        "You already logged {existing} for {}. Do you want to replace it with {new}?",
        date.format("%Y-%m-%d")
    )
}
