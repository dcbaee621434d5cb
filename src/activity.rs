//! The end-to-end run: discover, collect, aggregate, then print and render.

use crate::aggregate::aggregate;
use crate::cli::Cli;
use crate::collect::{CollectOptions, Collector, SeenCommits};
use crate::config::{Config, ValidConfig};
use crate::discover::{order_candidates, Discoverer, ExcludeRules};
use crate::error::{KuperError, Result};
use crate::model::{CommitReport, ReportOutput, SortOrder, TimeWindow, SCHEMA_VERSION};
use crate::remote::{GitLab, HttpTransport, RemoteClient};
use crate::render::{self, ReportContext, Templates};
use anyhow::Context;
use chrono::{Local, Utc};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info};

const BANNER: &str = "KUPer :: run for your commits";

/// Discover candidates, collect their commits and order the result. Only
/// global failures (listing, cancellation) are returned.
pub fn collect_report(
    api: &GitLab,
    discoverer: &dyn Discoverer,
    excludes: &ExcludeRules,
    options: &CollectOptions,
    order: SortOrder,
    progress: ProgressBar,
) -> Result<CommitReport> {
    let repositories = discoverer.discover(api, &options.window, excludes)?;
    let candidates = order_candidates(repositories);
    info!(
        "Scanning {} branch candidates found by {} discovery",
        candidates.len(),
        discoverer.name()
    );

    progress.set_length(candidates.len() as u64);
    let mut seen = SeenCommits::new();
    let commits = Collector::new(api, options)
        .with_progress(progress)
        .collect(&candidates, &mut seen)?;
    debug!("Retained {} distinct commits", seen.retained());

    Ok(aggregate(commits, order))
}

pub fn exec(cli: &Cli) -> anyhow::Result<()> {
    let config = Config::load(Some(&cli.config)).context("Failed to load configuration")?;
    let transport = HttpTransport::new(config.token.clone(), cli.timeout);
    let api = GitLab::new(RemoteClient::new(transport, &cli.instance));

    let stdout = std::io::stdout();
    run(cli, &config, &api, &mut stdout.lock())?;
    Ok(())
}

/// Returns the path of the HTML report, if one was written.
pub fn run<W: Write>(cli: &Cli, config: &ValidConfig, api: &GitLab, out: &mut W) -> anyhow::Result<Option<PathBuf>> {
    if !cli.quiet && !cli.json {
        writeln!(out, "{BANNER}\n")?;
    }

    let templates = if cli.report {
        let templates = match &cli.templates {
            Some(dir) => Templates::load(dir),
            None => Templates::builtin(),
        };
        Some(templates.context("Failed to load report templates")?)
    } else {
        None
    };

    let user = api.current_user().context("Could not determine current user's profile")?;
    let email = user
        .author_email()
        .ok_or_else(|| KuperError::Auth(format!("user '{}' has no visible email address", user.username)))?
        .to_string();

    let window = TimeWindow::last_days(cli.days, Utc::now())?;
    let excludes = ExcludeRules::new(config.excludes.iter().cloned());

    info!("Fetching commits for user {email} from the last {} days", cli.days);
    if !excludes.is_empty() {
        info!("Excluding the following repositories: {}", excludes.rules().join(", "));
    }

    let options = CollectOptions {
        author_email: email.clone(),
        window,
        fetch_diffs: cli.report,
    };
    let progress = if cli.quiet || cli.json {
        ProgressBar::hidden()
    } else {
        spinner()
    };
    let discoverer = cli.strategy.discoverer();
    let report = collect_report(api, discoverer.as_ref(), &excludes, &options, cli.order, progress)
        .context("Failed to collect commits")?;

    if cli.json {
        let output = ReportOutput {
            version: SCHEMA_VERSION,
            generated_at: Utc::now(),
            instance: &cli.instance,
            user: &user.username,
            since: window.start,
            days: window.days,
            repositories: &report.groups,
        };
        render::print_json(out, &output)?;
    }

    if report.is_empty() {
        if !cli.json {
            writeln!(out, "{}", render::NO_COMMITS_MESSAGE)?;
        }
        return Ok(None);
    }

    if !cli.json {
        render::print_report(out, &report)?;
    }

    let Some(templates) = templates else {
        return Ok(None);
    };

    let title = format!("Commit Report for {email} - Last {} Days", cli.days);
    let context = ReportContext::new(title, Utc::now(), &report);
    let html = render::render_report(&templates, &context).context("Failed to render HTML report")?;
    let file_name = render::report_file_name(&user.username, Local::now());
    let path = render::write_report(&cli.output_dir, &file_name, &html)
        .with_context(|| format!("Failed to write report to {}", cli.output_dir.display()))?;

    if !cli.json {
        writeln!(out, "\nSuccessfully generated HTML report: {}", path.display())?;
    }
    info!("Report contains {} commits", report.commit_count());
    Ok(Some(path))
}

fn spinner() -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} [{pos}/{len}] {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.enable_steady_tick(Duration::from_millis(120));
    pb
}
