//! Markdown summary generation
//!
//! This module writes a human-readable markdown summary of a journaled run,
//! with a per-phase table and a table of items that exhausted their retries.

use crate::output::{OutputResult, RunSummary};
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Writes a markdown summary of a run
///
/// # Arguments
///
/// * `summary` - The run summary data
/// * `output_path` - Path where the markdown file should be written
///
/// # Returns
///
/// * `Ok(())` - Successfully wrote markdown summary
/// * `Err(OutputError)` - Failed to write summary
pub fn generate_markdown_summary(summary: &RunSummary, output_path: &Path) -> OutputResult<()> {
    let markdown = format_markdown_summary(summary);

    let mut file = File::create(output_path)?;
    file.write_all(markdown.as_bytes())?;

    Ok(())
}

/// Table cells cannot contain raw pipes or newlines
fn cell(text: &str) -> String {
    text.replace('|', "\\|").replace('\n', " ")
}

/// Formats a run summary as markdown
pub fn format_markdown_summary(summary: &RunSummary) -> String {
    let mut md = String::new();

    md.push_str("# Profile Harvest Summary\n\n");

    md.push_str("## Run Information\n\n");
    md.push_str(&format!("- **Run ID**: {}\n", summary.run_id));
    md.push_str(&format!("- **Started**: {}\n", summary.started_at));
    if let Some(finished) = &summary.finished_at {
        md.push_str(&format!("- **Finished**: {}\n", finished));
    }
    if let Some(duration) = summary.duration_seconds {
        md.push_str(&format!(
            "- **Duration**: {} seconds ({:.2} minutes)\n",
            duration,
            duration as f64 / 60.0
        ));
    }
    md.push_str(&format!("- **Status**: {}\n", summary.status));
    md.push_str(&format!("- **Config Hash**: {}\n", summary.config_hash));
    md.push_str(&format!(
        "- **Records Persisted**: {}\n",
        summary.records_persisted
    ));
    md.push_str(&format!(
        "- **Success Rate**: {:.2}%\n\n",
        summary.success_rate()
    ));

    md.push_str("## Phases\n\n");
    md.push_str("| Phase | Succeeded | Exhausted | Admitted | Duplicates |\n");
    md.push_str("|-------|-----------|-----------|----------|------------|\n");
    for phase in &summary.phases {
        md.push_str(&format!(
            "| {} | {} | {} | {} | {} |\n",
            phase.phase, phase.succeeded, phase.exhausted, phase.admitted, phase.duplicates
        ));
    }
    md.push('\n');

    if !summary.failures.is_empty() {
        md.push_str("## Failed Items\n\n");
        md.push_str("| Phase | Item | URL | Attempts | Last Error |\n");
        md.push_str("|-------|------|-----|----------|------------|\n");
        for failure in &summary.failures {
            md.push_str(&format!(
                "| {} | {} | {} | {} | {} |\n",
                failure.phase,
                cell(&failure.item),
                cell(&failure.url),
                failure.attempts,
                cell(failure.error.as_deref().unwrap_or("")),
            ));
        }
        md.push('\n');
    }

    md
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::PhaseTotals;
    use crate::storage::{OutcomeRecord, OutcomeStatus};

    fn create_test_summary() -> RunSummary {
        RunSummary {
            run_id: 1,
            started_at: "2024-01-01T00:00:00Z".to_string(),
            finished_at: Some("2024-01-01T00:10:00Z".to_string()),
            duration_seconds: Some(600),
            status: "completed".to_string(),
            config_hash: "abc123".to_string(),
            records_persisted: 57,
            phases: vec![PhaseTotals {
                phase: "search".to_string(),
                succeeded: 9,
                exhausted: 1,
                admitted: 57,
                duplicates: 3,
            }],
            failures: Vec::new(),
        }
    }

    #[test]
    fn test_format_markdown_summary() {
        let markdown = format_markdown_summary(&create_test_summary());

        assert!(markdown.contains("# Profile Harvest Summary"));
        assert!(markdown.contains("- **Run ID**: 1"));
        assert!(markdown.contains("- **Records Persisted**: 57"));
        assert!(markdown.contains("| search | 9 | 1 | 57 | 3 |"));
        assert!(markdown.contains("- **Success Rate**: 90.00%"));
        assert!(!markdown.contains("Failed Items"));
    }

    #[test]
    fn test_markdown_with_failures() {
        let mut summary = create_test_summary();
        summary.failures.push(OutcomeRecord {
            run_id: 1,
            phase: "search".to_string(),
            item: "bill gates".to_string(),
            url: "https://www.linkedin.com/pub/dir?firstName=bill".to_string(),
            status: OutcomeStatus::Exhausted,
            attempts: 4,
            admitted: 0,
            duplicates: 0,
            error: Some("HTTP 503 | upstream".to_string()),
        });

        let markdown = format_markdown_summary(&summary);

        assert!(markdown.contains("## Failed Items"));
        assert!(markdown.contains("| search | bill gates |"));
        assert!(markdown.contains("HTTP 503 \\| upstream"));
    }

    #[test]
    fn test_generate_markdown_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("summary.md");

        generate_markdown_summary(&create_test_summary(), &path).unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.starts_with("# Profile Harvest Summary"));
    }
}
