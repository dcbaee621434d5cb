use crate::config::DEFAULT_CONFIG_FILE;
use crate::discover::{Discoverer, EventScan, ProjectListing};
use crate::model::{SortOrder, MAX_DAYS};
use anyhow::Result;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

#[derive(Parser, Debug, Clone)]
#[command(name = "kuper")]
#[command(about = "Collect your own commits from a GitLab instance and report them")]
#[command(version)]
pub struct Cli {
    #[arg(long, value_parser = parse_instance_url, help = "GitLab instance URL (e.g. https://gitlab.com)")]
    pub instance: String,

    #[arg(
        long,
        value_parser = clap::value_parser!(u32).range(1..=i64::from(MAX_DAYS)),
        help = "Number of days to search for commits (max 45)"
    )]
    pub days: u32,

    #[arg(long, help = "Also generate an HTML report with per-commit diffs")]
    pub report: bool,

    #[arg(long, help = "Path to the configuration file", default_value = DEFAULT_CONFIG_FILE)]
    pub config: PathBuf,

    #[arg(long, value_enum, default_value_t = Strategy::Events, help = "How repositories are discovered")]
    pub strategy: Strategy,

    #[arg(long, value_enum, default_value_t = SortOrder::Ascending, help = "Commit order within a repository")]
    pub order: SortOrder,

    #[arg(long, help = "Directory holding template.html and commit_template.html")]
    pub templates: Option<PathBuf>,

    #[arg(long, help = "Directory the HTML report is written to", default_value = ".")]
    pub output_dir: PathBuf,

    #[arg(long, value_parser = humantime::parse_duration, default_value = "20s", help = "Timeout for each API request")]
    pub timeout: Duration,

    #[arg(long, help = "Print the collected commits as JSON instead of text")]
    pub json: bool,

    #[arg(long, short, help = "Suppress the banner and progress spinner")]
    pub quiet: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Strategy {
    /// Branches the user pushed to, from the push event feed
    Events,
    /// Every project the user is a member of, all branches
    Projects,
}

impl Strategy {
    pub fn discoverer(self) -> Box<dyn Discoverer> {
        match self {
            Strategy::Events => Box::new(EventScan),
            Strategy::Projects => Box::new(ProjectListing),
        }
    }
}

impl Cli {
    pub fn parse() -> Self {
        <Self as Parser>::parse()
    }

    pub fn execute(self) -> Result<()> {
        crate::activity::exec(&self)
    }
}

/// Accept `http(s)://host[:port][/path]`, dropping any trailing slash.
pub fn parse_instance_url(input: &str) -> std::result::Result<String, String> {
    let invalid = |reason: &str| format!("'{input}' is not a valid instance URL: {reason}");

    let trimmed = input.trim();
    if trimmed.chars().any(char::is_whitespace) {
        return Err(invalid("unexpected whitespace"));
    }
    let url = Url::parse(trimmed).map_err(|e| invalid(&e.to_string()))?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid("expected http:// or https://"));
    }
    if url.host_str().map_or(true, str::is_empty) {
        return Err(invalid("missing host"));
    }
    if !url.username().is_empty() || url.password().is_some() {
        return Err(invalid("credentials belong in the config file"));
    }
    if url.query().is_some() || url.fragment().is_some() {
        return Err(invalid("unexpected query or fragment"));
    }
    Ok(url.as_str().trim_end_matches('/').to_string())
}
