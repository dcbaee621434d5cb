pub mod escape;
pub mod html;
pub mod template;
pub mod terminal;

pub use escape::{escape_html, Html};
pub use html::{render_report, report_file_name, write_report, ReportContext, Templates};
pub use template::{Template, TemplateContext};
pub use terminal::{print_json, print_report, NO_COMMITS_MESSAGE};

/// Commit timestamps are shown in UTC at minute precision.
pub const DATE_FORMAT: &str = "%Y-%m-%d %H:%M";
