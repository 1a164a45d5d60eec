//! Display formatting for CLI output

use console::style;
use trove_repo::{AnchorOutcome, PackageRef, PropagationEvent, RepoError, Severity};

/// Print a propagation event, colored by severity
pub fn print_event(event: &PropagationEvent) {
    match event.severity() {
        Severity::Error => eprintln!("{} {}", style("✗").red().bold(), style(event).red()),
        Severity::Info => match event {
            PropagationEvent::Copied { .. } => {
                println!("{} {}", style("✓").green().bold(), event)
            }
            _ => println!("{} {}", style("·").dim(), style(event).dim()),
        },
    }
}

/// Print a failed item of a multi-step operation
pub fn print_failure(error: &RepoError) {
    eprintln!("{} {}", style("✗").red().bold(), style(error).red());
}

pub fn print_anchor(outcome: &AnchorOutcome) {
    match outcome {
        AnchorOutcome::Anchored { .. } => println!("{} {}", style("⚓").cyan(), outcome),
        AnchorOutcome::Unchanged { .. } => println!("{} {}", style("·").dim(), style(outcome).dim()),
    }
}

pub fn print_removed(package: &PackageRef) {
    println!(
        "{} Removed {}",
        style("-").yellow().bold(),
        style(package.full_name()).yellow()
    );
}

/// One-line summary of a multi-step operation
pub fn print_summary(action: &str, done: usize, failed: usize) {
    if failed == 0 {
        println!("{} {} {}", style("✓").green().bold(), action, done);
    } else {
        println!(
            "{} {} {}, {} failed",
            style("!").yellow().bold(),
            action,
            done,
            style(failed).red()
        );
    }
}
