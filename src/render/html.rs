use super::escape::Html;
use super::template::{Template, TemplateContext};
use super::DATE_FORMAT;
use crate::error::{KuperError, Result};
use crate::model::CommitReport;
use chrono::{DateTime, Local, Utc};
use std::path::{Path, PathBuf};

pub const PAGE_TEMPLATE_FILE: &str = "template.html";
pub const COMMIT_TEMPLATE_FILE: &str = "commit_template.html";

const BUILTIN_PAGE: &str = include_str!("../../templates/template.html");
const BUILTIN_COMMIT: &str = include_str!("../../templates/commit_template.html");

const DIFF_NOT_AVAILABLE: &str = "Diff not available.";

pub struct Templates {
    page: Template,
    commit: Template,
}

impl Templates {
    pub fn builtin() -> Result<Self> {
        Ok(Self {
            page: Template::parse(PAGE_TEMPLATE_FILE, BUILTIN_PAGE)?,
            commit: Template::parse(COMMIT_TEMPLATE_FILE, BUILTIN_COMMIT)?,
        })
    }

    /// Load both templates from `dir`.
    pub fn load(dir: &Path) -> Result<Self> {
        let read = |file: &str| -> Result<Template> {
            let path = dir.join(file);
            let source = std::fs::read_to_string(&path).map_err(|e| {
                KuperError::Template(format!("could not read template '{}': {e}", path.display()))
            })?;
            Template::parse(file, &source)
        };
        Ok(Self {
            page: read(PAGE_TEMPLATE_FILE)?,
            commit: read(COMMIT_TEMPLATE_FILE)?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    Meta,
    Addition,
    Removal,
    Context,
}

impl LineKind {
    pub fn css_class(self) -> &'static str {
        match self {
            LineKind::Meta => "diff-meta",
            LineKind::Addition => "diff-add",
            LineKind::Removal => "diff-del",
            LineKind::Context => "diff-ctx",
        }
    }
}

/// Purely textual classification by line prefix.
pub fn classify_line(line: &str) -> LineKind {
    if line.starts_with("+++") || line.starts_with("---") || line.starts_with("@@") {
        LineKind::Meta
    } else if line.starts_with('+') {
        LineKind::Addition
    } else if line.starts_with('-') {
        LineKind::Removal
    } else {
        LineKind::Context
    }
}

pub fn render_diff(text: &str) -> Html {
    let lines: Vec<String> = text
        .lines()
        .map(|line| {
            format!(
                "<span class=\"{}\">{}</span>",
                classify_line(line).css_class(),
                Html::escape(line)
            )
        })
        .collect();
    Html::trusted(lines.join("\n"))
}

#[derive(Debug, Clone)]
pub struct CommitView {
    pub url: String,
    pub title: String,
    pub sha: String,
    pub branch: String,
    pub date: String,
    pub diff: Option<String>,
}

impl TemplateContext for CommitView {
    fn value(&self, key: &str) -> Option<Html> {
        let html = match key {
            "commit_url" => Html::escape(&self.url),
            "commit_message" => Html::escape(&self.title),
            "sha" => Html::escape(&self.sha),
            "branch" => Html::escape(&self.branch),
            "date" => Html::escape(&self.date),
            "diff" => match &self.diff {
                Some(diff) => render_diff(diff),
                None => Html::escape(DIFF_NOT_AVAILABLE),
            },
            _ => return None,
        };
        Some(html)
    }
}

#[derive(Debug, Clone)]
pub struct RepositoryView {
    pub path: String,
    pub commits: Vec<CommitView>,
}

/// Everything the page needs, already in display order.
#[derive(Debug, Clone)]
pub struct ReportContext {
    pub title: String,
    pub generated_at: String,
    pub repositories: Vec<RepositoryView>,
}

impl ReportContext {
    pub fn new(title: impl Into<String>, generated_at: DateTime<Utc>, report: &CommitReport) -> Self {
        let repositories = report
            .groups
            .iter()
            .map(|group| RepositoryView {
                path: group.repository_path.clone(),
                commits: group
                    .commits
                    .iter()
                    .map(|c| CommitView {
                        url: c.web_url.clone(),
                        title: c.title.clone(),
                        sha: c.short_id.clone(),
                        branch: c.branch.clone(),
                        date: c.created_at.format(DATE_FORMAT).to_string(),
                        diff: c.diff.as_ref().map(|d| d.to_text()),
                    })
                    .collect(),
            })
            .collect();

        Self {
            title: title.into(),
            generated_at: generated_at.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
            repositories,
        }
    }
}

struct PageValues<'a> {
    context: &'a ReportContext,
    commits: Html,
}

impl TemplateContext for PageValues<'_> {
    fn value(&self, key: &str) -> Option<Html> {
        match key {
            "report_title" => Some(Html::escape(&self.context.title)),
            "generated_at" => Some(Html::escape(&self.context.generated_at)),
            "commits" => Some(self.commits.clone()),
            _ => None,
        }
    }
}

pub fn render_report(templates: &Templates, context: &ReportContext) -> Result<String> {
    let mut commits = Html::default();
    for repository in &context.repositories {
        commits.push(&Html::trusted(format!(
            "<h2>{}</h2>\n<div class=\"repo-block\">\n",
            Html::escape(&repository.path)
        )));
        for commit in &repository.commits {
            commits.push(&Html::trusted(templates.commit.render(commit)?));
        }
        commits.push(&Html::trusted("</div>\n"));
    }

    templates.page.render(&PageValues { context, commits })
}

/// `commit_report_<user>_<timestamp>.html`, with anything unsafe in a file
/// name replaced.
pub fn report_file_name(username: &str, at: DateTime<Local>) -> String {
    let user: String = username
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') { c } else { '_' })
        .collect();
    format!("commit_report_{user}_{}.html", at.format("%Y-%m-%d-%H-%M-%S"))
}

pub fn write_report(dir: &Path, file_name: &str, html: &str) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(file_name);
    std::fs::write(&path, html)?;
    Ok(path)
}
