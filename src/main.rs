//src/main.rs
mod cli;
mod prompt;

use anyhow::{bail, Context, Result};
use comfy_table::{presets::UTF8_FULL, Cell, Color, ContentArrangement, Table};
use rust_decimal::Decimal;
use std::io::{stdout, Write};
use std::sync::Arc;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use weight_goal_lib::{
    format_weight, parse_color, AppService, DataService, FormState, SaveOutcome, Services,
    SetGoalScreen, StonesAndPounds, TracingAnalytics, WeightEntry, WeightField, WeightUnit,
};

use crate::prompt::{CliNavigation, TerminalDialog};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli_args = cli::parse_args();

    if let cli::Commands::GenerateCompletion { shell } = cli_args.command {
        let mut cmd = cli::build_cli_command();
        let bin_name = cmd.get_name().to_string();

        eprintln!("Generating completion script for {shell}...");
        clap_complete::generate(shell, &mut cmd, bin_name, &mut stdout());
        return Ok(());
    }

    // Initialize the application service (loads config, connects to DB)
    let mut service =
        AppService::initialize().context("Failed to initialize application service")?;
    init_tracing(&service.config.log_level);

    match cli_args.command {
        cli::Commands::GenerateCompletion { .. } => {
            unreachable!("Completion generation should have exited already");
        }
        cli::Commands::SetGoal {
            start_date,
            goal_date,
            start_weight,
            goal_weight,
            start_stones,
            start_stone_pounds,
            goal_stones,
            goal_stone_pounds,
            yes,
        } => {
            let inputs = GoalInputs {
                start_date,
                goal_date,
                fields: vec![
                    (WeightField::StartWeight, start_weight),
                    (WeightField::GoalWeight, goal_weight),
                    (WeightField::StartWeightStones, start_stones),
                    (WeightField::StartWeightStonePounds, start_stone_pounds),
                    (WeightField::GoalWeightStones, goal_stones),
                    (WeightField::GoalWeightStonePounds, goal_stone_pounds),
                ],
            };
            run_set_goal(&service, inputs, yes).await?;
        }
        cli::Commands::ShowGoal => {
            let header_color = header_color(&service);
            match service.data.get_goal().await? {
                Some(goal) => {
                    let mut table = Table::new();
                    table
                        .load_preset(UTF8_FULL)
                        .set_content_arrangement(ContentArrangement::Dynamic)
                        .set_header(vec![
                            Cell::new("").fg(header_color),
                            Cell::new("Date").fg(header_color),
                            Cell::new("Weight").fg(header_color),
                        ]);
                    table.add_row(vec![
                        Cell::new("Start"),
                        Cell::new(goal.start_date.format("%Y-%m-%d").to_string()),
                        Cell::new(display_weight(goal.start_weight, goal.unit)),
                    ]);
                    table.add_row(vec![
                        Cell::new("Goal"),
                        Cell::new(goal.goal_date.format("%Y-%m-%d").to_string()),
                        Cell::new(display_weight(goal.goal_weight, goal.unit)),
                    ]);
                    println!("{table}");
                }
                None => println!("No goal set. Use 'set-goal' to create one."),
            }
        }
        cli::Commands::ListWeights { limit, export_csv } => {
            let entries = service.data.list_weight_entries(limit).await?;
            if entries.is_empty() {
                println!("No weights logged yet.");
            } else if export_csv {
                write_weights_csv(&entries)?;
            } else {
                print_weight_table(&entries, header_color(&service));
            }
        }
        cli::Commands::SetUnits { units } => {
            let units = WeightUnit::from(units);
            service.set_units(units)?;
            println!("Weight unit set to {units}.");
        }
        cli::Commands::SetGoalOffset { months } => {
            service.set_goal_offset_months(months)?;
            println!("New goals will default to {months} month(s) ahead.");
        }
        cli::Commands::ConfigPath => {
            println!("Config file is located at: {:?}", service.get_config_path());
        }
        cli::Commands::DbPath => {
            println!("Database file is located at: {:?}", service.get_db_path());
        }
    }

    Ok(())
}

fn init_tracing(default_filter: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_filter))
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

struct GoalInputs {
    start_date: Option<chrono::NaiveDate>,
    goal_date: Option<chrono::NaiveDate>,
    fields: Vec<(WeightField, Option<String>)>,
}

const fn is_stones_field(field: WeightField) -> bool {
    matches!(
        field,
        WeightField::StartWeightStones
            | WeightField::StartWeightStonePounds
            | WeightField::GoalWeightStones
            | WeightField::GoalWeightStonePounds
    )
}

/// Drives the Set Goal screen the way a UI would: appear, let the loads fill
/// the form, apply the user's edits, then press save.
async fn run_set_goal(service: &AppService, inputs: GoalInputs, assume_yes: bool) -> Result<()> {
    let navigation = Arc::new(CliNavigation::default());
    let screen = SetGoalScreen::new(
        Services {
            data: service.data.clone(),
            settings: Arc::new(service.config.clone()),
            dialogs: Arc::new(TerminalDialog::new(assume_yes)),
            analytics: Arc::new(TracingAnalytics),
            navigation: navigation.clone(),
        },
        service.form_defaults(),
    );

    screen.on_navigating_to();
    screen.on_navigated_to();
    screen.settle().await;

    if let Some(date) = inputs.start_date {
        screen.set_start_date(date);
        screen.settle().await;
    }
    if let Some(date) = inputs.goal_date {
        screen.set_goal_date(date);
    }

    let stones = screen.shows_stones_entry_fields();
    for (field, value) in inputs.fields {
        let Some(value) = value else { continue };
        if is_stones_field(field) != stones {
            eprintln!(
                "Warning: ignoring {field:?}, it does not apply to the '{}' unit setting.",
                service.config.units
            );
            continue;
        }
        screen.set_weight_text(field, value);
    }

    let form = screen.form();
    debug!(?form, "form ready");
    if !screen.can_save() {
        print_form(&form);
        if form.goal_date <= form.start_date {
            bail!("The goal date must be after the start date.");
        }
        bail!("Enter a valid start weight and goal weight.");
    }

    let outcome = screen.save().await;
    screen.on_navigated_from();
    match outcome {
        SaveOutcome::Saved => {
            debug!(dismissed = navigation.dismissed(), "save finished");
            println!("Goal saved.");
            Ok(())
        }
        SaveOutcome::Cancelled => {
            println!("Nothing was changed.");
            Ok(())
        }
        other => bail!("The goal was not saved ({other:?})."),
    }
}

const SINGLE_FIELDS: [(&str, WeightField); 2] = [
    ("Start weight", WeightField::StartWeight),
    ("Goal weight", WeightField::GoalWeight),
];

const STONES_FIELDS: [(&str, WeightField); 4] = [
    ("Start weight (st)", WeightField::StartWeightStones),
    ("Start weight (lb)", WeightField::StartWeightStonePounds),
    ("Goal weight (st)", WeightField::GoalWeightStones),
    ("Goal weight (lb)", WeightField::GoalWeightStonePounds),
];

fn print_form(form: &FormState) {
    println!("Start date: {}", form.start_date.format("%Y-%m-%d"));
    println!("Goal date:  {}", form.goal_date.format("%Y-%m-%d"));
    let fields: &[(&str, WeightField)] = if form.show_stones_entry_fields {
        &STONES_FIELDS
    } else {
        &SINGLE_FIELDS
    };
    for (label, field) in fields {
        println!("{label}: '{}'", form.field(*field));
    }
}

fn header_color(service: &AppService) -> Color {
    parse_color(&service.config.theme.header_color)
        .map(Color::from)
        .unwrap_or(Color::Green)
}

fn display_weight(weight: Decimal, unit: WeightUnit) -> String {
    match unit {
        WeightUnit::StonesAndPounds => StonesAndPounds::from_pounds(weight).to_string(),
        WeightUnit::Pounds | WeightUnit::Kilograms => {
            format!("{} {}", format_weight(weight), unit.abbreviation())
        }
    }
}

fn print_weight_table(entries: &[WeightEntry], header_color: Color) {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("Date").fg(header_color),
            Cell::new("Weight").fg(header_color),
        ]);
    for entry in entries {
        table.add_row(vec![
            Cell::new(entry.date.format("%Y-%m-%d").to_string()),
            Cell::new(display_weight(entry.weight, entry.unit)),
        ]);
    }
    println!("{table}");
}

fn write_weights_csv(entries: &[WeightEntry]) -> Result<()> {
    let mut writer = csv::Writer::from_writer(stdout());
    writer.write_record(["date", "weight", "unit"])?;
    for entry in entries {
        writer.write_record([
            entry.date.format("%Y-%m-%d").to_string(),
            entry.weight.to_string(),
            entry.unit.to_string(),
        ])?;
    }
    writer.flush()?;
    stdout().flush()?;
    Ok(())
}
