use super::DATE_FORMAT;
use crate::model::{CommitReport, ReportOutput};
use console::style;
use std::io::{self, Write};

pub const NO_COMMITS_MESSAGE: &str = "No new commits found for this user in the specified period.";

/// One header per repository, then one line per commit.
pub fn print_report<W: Write>(out: &mut W, report: &CommitReport) -> io::Result<()> {
    for group in &report.groups {
        writeln!(out)?;
        writeln!(out, "{} {}", style("===== REPOSITORY:").bold(), style(&group.repository_path).bold().cyan())?;
        for commit in &group.commits {
            writeln!(
                out,
                "{}  |  {}  |  {}  |  {}  |  '{}'",
                style(commit.created_at.format(DATE_FORMAT)).dim(),
                style(&commit.branch).green(),
                style(&commit.short_id).yellow(),
                commit.web_url,
                commit.title
            )?;
        }
    }
    Ok(())
}

pub fn print_json<W: Write>(out: &mut W, output: &ReportOutput<'_>) -> anyhow::Result<()> {
    writeln!(out, "{}", serde_json::to_string_pretty(output)?)?;
    Ok(())
}
