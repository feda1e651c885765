// src/set_goal/state.rs
use chrono::{Months, NaiveDate};
use rust_decimal::Decimal;

use crate::weight::{format_weight, parse_stones_and_pounds, parse_weight, StonesAndPounds};

/// The editable text fields on the form.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WeightField {
    StartWeight,
    GoalWeight,
    StartWeightStones,
    StartWeightStonePounds,
    GoalWeightStones,
    GoalWeightStonePounds,
}

/// Start and goal weights after parsing. In stones mode these are pounds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ParsedWeights {
    pub start: Decimal,
    pub goal: Decimal,
}

/// Everything the user can see and edit on the Set Goal screen.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FormState {
    pub start_date: NaiveDate,
    pub goal_date: NaiveDate,
    // Single-field entry (pounds or kilograms)
    pub start_weight: String,
    pub goal_weight: String,
    // Two-field entry (stones mode)
    pub start_weight_stones: String,
    pub start_weight_stone_pounds: String,
    pub goal_weight_stones: String,
    pub goal_weight_stone_pounds: String,
    pub show_stones_entry_fields: bool,
}

impl FormState {
    /// Empty form starting today with the goal `goal_offset_months` ahead.
    pub fn new(today: NaiveDate, goal_offset_months: u32) -> Self {
        let goal_date = today
            .checked_add_months(Months::new(goal_offset_months))
            .unwrap_or(today);
        Self {
            start_date: today,
            goal_date,
            start_weight: String::new(),
            goal_weight: String::new(),
            start_weight_stones: String::new(),
            start_weight_stone_pounds: String::new(),
            goal_weight_stones: String::new(),
            goal_weight_stone_pounds: String::new(),
            show_stones_entry_fields: false,
        }
    }

    pub fn field(&self, field: WeightField) -> &str {
        match field {
            WeightField::StartWeight => &self.start_weight,
            WeightField::GoalWeight => &self.goal_weight,
            WeightField::StartWeightStones => &self.start_weight_stones,
            WeightField::StartWeightStonePounds => &self.start_weight_stone_pounds,
            WeightField::GoalWeightStones => &self.goal_weight_stones,
            WeightField::GoalWeightStonePounds => &self.goal_weight_stone_pounds,
        }
    }

    pub fn field_mut(&mut self, field: WeightField) -> &mut String {
        match field {
            WeightField::StartWeight => &mut self.start_weight,
            WeightField::GoalWeight => &mut self.goal_weight,
            WeightField::StartWeightStones => &mut self.start_weight_stones,
            WeightField::StartWeightStonePounds => &mut self.start_weight_stone_pounds,
            WeightField::GoalWeightStones => &mut self.goal_weight_stones,
            WeightField::GoalWeightStonePounds => &mut self.goal_weight_stone_pounds,
        }
    }

    pub fn start_weight_in_stones(&self) -> Option<StonesAndPounds> {
        parse_stones_and_pounds(&self.start_weight_stones, &self.start_weight_stone_pounds)
    }

    pub fn goal_weight_in_stones(&self) -> Option<StonesAndPounds> {
        parse_stones_and_pounds(&self.goal_weight_stones, &self.goal_weight_stone_pounds)
    }

    /// Whether the save command may run.
    pub fn can_save(&self) -> bool {
        // goal date has to come after the start date
        if self.goal_date <= self.start_date {
            return false;
        }

        let blank = |value: &str| value.trim().is_empty();
        let any_blank = if self.show_stones_entry_fields {
            blank(&self.start_weight_stones)
                || blank(&self.start_weight_stone_pounds)
                || blank(&self.goal_weight_stones)
                || blank(&self.goal_weight_stone_pounds)
        } else {
            blank(&self.start_weight) || blank(&self.goal_weight)
        };
        if any_blank {
            return false;
        }

        self.parsed_weights().is_some()
    }

    /// Parses both weights for the active display mode.
    pub fn parsed_weights(&self) -> Option<ParsedWeights> {
        if self.show_stones_entry_fields {
            // Out-of-range totals make the form unsaveable
            Some(ParsedWeights {
                start: self.start_weight_in_stones()?.checked_to_pounds()?,
                goal: self.goal_weight_in_stones()?.checked_to_pounds()?,
            })
        } else {
            Some(ParsedWeights {
                start: parse_weight(&self.start_weight)?,
                goal: parse_weight(&self.goal_weight)?,
            })
        }
    }

    /// Writes a stored weight into the start field(s) for the active mode.
    pub fn show_start_weight(&mut self, weight: Decimal) {
        if self.show_stones_entry_fields {
            let split = StonesAndPounds::from_pounds(weight);
            self.start_weight_stones = split.whole.to_string();
            self.start_weight_stone_pounds = format_weight(split.remainder);
        } else {
            self.start_weight = format_weight(weight);
        }
    }

    pub fn show_goal_weight(&mut self, weight: Decimal) {
        if self.show_stones_entry_fields {
            let split = StonesAndPounds::from_pounds(weight);
            self.goal_weight_stones = split.whole.to_string();
            self.goal_weight_stone_pounds = format_weight(split.remainder);
        } else {
            self.goal_weight = format_weight(weight);
        }
    }

    /// Formats a weight the way the overwrite warning shows it.
    pub fn describe_weight(&self, weight: Decimal) -> String {
        if self.show_stones_entry_fields {
            StonesAndPounds::from_pounds(weight).to_string()
        } else {
            format_weight(weight)
        }
    }
}
