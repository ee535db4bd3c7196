//! Console reporting for harvest runs
//!
//! [`print_run_summary`] reports a run that just finished, item by item.
//! [`print_statistics`] reports a run loaded back from the journal.

use crate::harvester::{HarvestSummary, TaskOutcome};
use crate::output::RunSummary;

/// Prints per-item outcomes and persisted counts of a finished run
///
/// # Arguments
///
/// * `summary` - The summary returned by the harvester
pub fn print_run_summary(summary: &HarvestSummary) {
    println!("=== Harvest Run {} ===\n", summary.run_id);

    for phase in &summary.phases {
        println!(
            "{} phase: {} of {} items succeeded",
            phase.phase,
            phase.report.succeeded(),
            phase.report.items.len()
        );

        for item in &phase.report.items {
            match &item.outcome {
                TaskOutcome::Succeeded {
                    attempts,
                    admitted,
                    duplicates,
                } => println!(
                    "  [ok]     {} ({} attempts, {} records, {} duplicates)",
                    item.item.key, attempts, admitted, duplicates
                ),
                TaskOutcome::Exhausted {
                    attempts,
                    last_error,
                } => println!(
                    "  [failed] {} ({} attempts): {}",
                    item.item.key, attempts, last_error
                ),
            }
        }

        println!(
            "  Persisted {} records to {} ({} duplicates dropped)\n",
            phase.stats.persisted, phase.destination, phase.stats.duplicates
        );
    }

    println!("Total records persisted: {}", summary.records_persisted());
}

/// Prints statistics of a journaled run to stdout
///
/// # Arguments
///
/// * `stats` - The summary to display
pub fn print_statistics(stats: &RunSummary) {
    println!("=== Harvest Statistics ===\n");

    println!("Run {}:", stats.run_id);
    println!("  Status: {}", stats.status);
    println!("  Started: {}", stats.started_at);
    if let Some(finished) = &stats.finished_at {
        println!("  Finished: {}", finished);
    }
    if let Some(duration) = stats.duration_seconds {
        println!("  Duration: {} seconds", duration);
    }
    println!("  Records persisted: {}", stats.records_persisted);
    println!();

    if !stats.phases.is_empty() {
        println!("Items by Phase:");
        for phase in &stats.phases {
            println!(
                "  {}: {} succeeded, {} exhausted, {} records admitted, {} duplicates",
                phase.phase, phase.succeeded, phase.exhausted, phase.admitted, phase.duplicates
            );
        }
        println!();
    }

    if !stats.failures.is_empty() {
        println!("Failed Items ({}):", stats.failures.len());
        for failure in &stats.failures {
            println!(
                "  - [{}] {} after {} attempts: {}",
                failure.phase,
                failure.item,
                failure.attempts,
                failure.error.as_deref().unwrap_or("unknown error")
            );
        }
        println!();
    }

    println!(
        "Success Rate: {:.1}% ({} items)",
        stats.success_rate(),
        stats.total_items()
    );
}
