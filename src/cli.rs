// src/cli.rs
use chrono::{Duration, Local, NaiveDate};
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use weight_goal_lib::WeightUnit;

#[derive(Parser, Debug)]
#[command(author, version, about = "Set a weight-loss goal and log its starting weigh-in", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum UnitsCli {
    Pounds,
    Kilograms,
    StonesAndPounds,
}

impl From<UnitsCli> for WeightUnit {
    fn from(value: UnitsCli) -> Self {
        match value {
            UnitsCli::Pounds => WeightUnit::Pounds,
            UnitsCli::Kilograms => WeightUnit::Kilograms,
            UnitsCli::StonesAndPounds => WeightUnit::StonesAndPounds,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Set (or replace) your goal and log the start weight
    SetGoal {
        /// Start date (YYYY-MM-DD, 'today', 'yesterday'). Defaults to the stored goal or today
        #[arg(long, value_parser = parse_date_arg)]
        start_date: Option<NaiveDate>,
        /// Goal date (YYYY-MM-DD). Defaults to the stored goal or the configured offset
        #[arg(long, value_parser = parse_date_arg)]
        goal_date: Option<NaiveDate>,
        /// Start weight (pounds or kilograms mode)
        #[arg(long, allow_hyphen_values = true)]
        start_weight: Option<String>,
        /// Goal weight (pounds or kilograms mode)
        #[arg(long, allow_hyphen_values = true)]
        goal_weight: Option<String>,
        /// Whole stones of the start weight (stones mode)
        #[arg(long)]
        start_stones: Option<String>,
        /// Remaining pounds of the start weight (stones mode)
        #[arg(long)]
        start_stone_pounds: Option<String>,
        /// Whole stones of the goal weight (stones mode)
        #[arg(long)]
        goal_stones: Option<String>,
        /// Remaining pounds of the goal weight (stones mode)
        #[arg(long)]
        goal_stone_pounds: Option<String>,
        /// Answer OK to every confirmation
        #[arg(short, long)]
        yes: bool,
    },
    /// Show the stored goal
    ShowGoal,
    /// List logged weights, newest first
    ListWeights {
        #[arg(short, long, default_value_t = 20)]
        limit: u32,
        /// Print CSV instead of a table
        #[arg(long)]
        export_csv: bool,
    },
    /// Set the preferred weight unit
    SetUnits {
        #[arg(value_enum)]
        units: UnitsCli,
    },
    /// Set how many months ahead a new goal date starts
    SetGoalOffset { months: u32 },
    /// Show the path to the config file
    ConfigPath,
    /// Show the path to the database file
    DbPath,
    /// Generate shell completion script
    GenerateCompletion {
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

fn parse_date_arg(input: &str) -> Result<NaiveDate, String> {
    let trimmed = input.trim().to_lowercase();
    let today = Local::now().date_naive();
    match trimmed.as_str() {
        "today" => Ok(today),
        "yesterday" => Ok(today - Duration::days(1)),
        _ => NaiveDate::parse_from_str(&trimmed, "%Y-%m-%d")
            .map_err(|_| format!("'{input}' is not a date (use YYYY-MM-DD, 'today' or 'yesterday')")),
    }
}

// Function to parse CLI arguments
pub fn parse_args() -> Cli {
    Cli::parse()
}

pub fn build_cli_command() -> clap::Command {
    Cli::command()
}
