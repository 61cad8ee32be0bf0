//! HTML rendering for the status page.

use std::fmt::Write;

use crate::analysis::ScoringStrategy;
use crate::categories::CategoryTable;
use crate::model::{FloodStatus, Verdict};

/// Everything the index page shows.
pub struct IndexView<'a> {
    pub verdict: &'a Verdict,
    pub report_count: usize,
    pub min_reports: usize,
    pub table: &'a CategoryTable,
    pub strategy: ScoringStrategy,
    pub thanks: bool,
    pub invalid: bool,
}

pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn status_class(status: FloodStatus) -> &'static str {
    match status {
        FloodStatus::Monitoring => "monitoring",
        FloodStatus::Dry => "dry",
        FloodStatus::Flooding => "flooding",
    }
}

pub fn render_index(view: &IndexView<'_>) -> String {
    let verdict = view.verdict;
    let mut html = String::new();

    // Writing to a String cannot fail.
    let _ = write!(
        html,
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
         <meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n\
         <title>Flood status: {status}</title>\n</head>\n<body>\n",
        status = verdict.status,
    );

    if view.thanks {
        html.push_str("<p class=\"banner thanks\">Thanks! Your report was recorded.</p>\n");
    }
    if view.invalid {
        html.push_str("<p class=\"banner invalid\">That report was invalid. Please try again.</p>\n");
    }

    let _ = write!(
        html,
        "<section class=\"status {class}\">\n<h1>{status}</h1>\n<p class=\"message\">{message}</p>\n",
        class = status_class(verdict.status),
        status = verdict.status,
        message = escape_html(&verdict.message),
    );
    if let Some(label) = &verdict.level_label {
        let _ = writeln!(html, "<p class=\"level\">Level: {}</p>", escape_html(label));
    }
    if let Some(level) = verdict.level {
        let _ = writeln!(html, "<p class=\"level\">Average level: {:.2}</p>", level);
    }
    let _ = write!(
        html,
        "<p class=\"count\">Based on {count} report{plural} (at least {min} needed).</p>\n</section>\n",
        count = view.report_count,
        plural = if view.report_count == 1 { "" } else { "s" },
        min = view.min_reports,
    );

    html.push_str(
        "<form method=\"post\" action=\"/report\">\n<fieldset>\n<legend>Is it flooded here?</legend>\n\
         <label><input type=\"radio\" name=\"flooded\" value=\"yes\" required> Yes</label>\n\
         <label><input type=\"radio\" name=\"flooded\" value=\"no\"> No</label>\n</fieldset>\n",
    );

    match view.strategy {
        ScoringStrategy::Categorical => {
            html.push_str("<fieldset>\n<legend>How deep?</legend>\n");
            for category in view.table.iter() {
                let _ = writeln!(
                    html,
                    "<label><input type=\"radio\" name=\"level_category\" value=\"{key}\"> {label}</label>",
                    key = escape_html(&category.key),
                    label = escape_html(&category.label),
                );
            }
            html.push_str("</fieldset>\n");
        }
        ScoringStrategy::MeanDeviation => {
            html.push_str(
                "<label>Water level <input type=\"number\" name=\"level\" min=\"0\" step=\"0.01\"></label>\n",
            );
        }
    }

    html.push_str("<button type=\"submit\">Send report</button>\n</form>\n</body>\n</html>\n");
    html
}
