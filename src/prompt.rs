// src/prompt.rs
// Terminal stand-ins for the screen's dialog and navigation collaborators.
use anyhow::Result;
use async_trait::async_trait;
use std::io::{stdin, stdout, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::task;
use tracing::{debug, warn};
use weight_goal_lib::{DialogService, NavigationService};

pub struct TerminalDialog {
    assume_yes: bool,
}

impl TerminalDialog {
    pub const fn new(assume_yes: bool) -> Self {
        Self { assume_yes }
    }
}

fn read_confirmation(accept: &str, cancel: &str) -> std::io::Result<bool> {
    print!("{accept} / {cancel} [y/N]: ");
    stdout().flush()?;

    let mut input = String::new();
    stdin().read_line(&mut input)?;
    let answer = input.trim();
    Ok(answer.eq_ignore_ascii_case("y")
        || answer.eq_ignore_ascii_case("yes")
        || answer.eq_ignore_ascii_case(accept))
}

#[async_trait]
impl DialogService for TerminalDialog {
    async fn display_alert(
        &self,
        title: &str,
        message: &str,
        accept: &str,
        cancel: Option<&str>,
    ) -> bool {
        println!("\n{title}\n{message}");

        let Some(cancel) = cancel else {
            // Informational only
            return true;
        };
        if self.assume_yes {
            println!("{accept} (--yes)");
            return true;
        }

        let accept = accept.to_string();
        let cancel = cancel.to_string();
        match task::spawn_blocking(move || read_confirmation(&accept, &cancel)).await {
            Ok(Ok(confirmed)) => confirmed,
            Ok(Err(e)) => {
                warn!(error = %e, "could not read confirmation, treating as cancel");
                false
            }
            Err(e) => {
                warn!(error = %e, "confirmation prompt failed, treating as cancel");
                false
            }
        }
    }
}

/// Records that the screen asked to be dismissed.
#[derive(Default)]
pub struct CliNavigation {
    dismissed: AtomicBool,
}

impl CliNavigation {
    pub fn dismissed(&self) -> bool {
        self.dismissed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl NavigationService for CliNavigation {
    async fn go_back(&self, use_modal_navigation: bool) -> Result<()> {
        debug!(use_modal_navigation, "screen dismissed");
        self.dismissed.store(true, Ordering::SeqCst);
        Ok(())
    }
}
