//! Markdown rendering of a finished research answer.

use crate::synthesis::display_name;
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::fmt::Write;
use tools::ResultBundle;

/// Sources listed per tool.
const MAX_SOURCES_PER_TOOL: usize = 2;

/// Render the full report for a query.
pub fn render(query: &str, bundle: &ResultBundle, answer: &str, generated_at: DateTime<Utc>) -> String {
    let mut out = format!("# Research Results for: {}\n\n", query);

    if !answer.trim().is_empty() {
        let _ = write!(out, "## Summary\n{}\n\n", answer.trim());
    }

    if bundle.success_count() > 0 {
        out.push_str("## Detailed Information\n\n");
        for (i, (result, payload)) in bundle.successes().enumerate() {
            let _ = write!(
                out,
                "### {}. {} Results\n{}\n\n",
                i + 1,
                display_name(&result.tool),
                payload.content
            );
        }
    }

    let sources = sources(bundle);
    if !sources.is_empty() {
        out.push_str("## Sources\n");
        for (i, source) in sources.iter().enumerate() {
            let _ = writeln!(out, "{}. {}", i + 1, source);
        }
        out.push('\n');
    }

    let unavailable: Vec<String> = bundle
        .failures()
        .map(|r| match r.outcome.error_detail() {
            Some(detail) => format!("{} ({})", display_name(&r.tool), detail),
            None => display_name(&r.tool),
        })
        .collect();
    if !unavailable.is_empty() {
        let _ = write!(
            out,
            "## Note\nSome information sources were unavailable: {}\n\n",
            unavailable.join(", ")
        );
    }

    out.push_str(&footer(bundle, generated_at));
    out
}

/// Report for a query that could not be processed at all.
pub fn render_error(query: &str, message: &str) -> String {
    format!(
        "# Error Processing Query: {}\n\n\
         I encountered an error while processing your request:\n\n\
         **Error:** {}\n\n\
         Please try rephrasing your question or check if all required services are available.\n",
        query, message
    )
}

/// Deduplicated source labels in bundle order.
fn sources(bundle: &ResultBundle) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut sources = Vec::new();

    for (result, payload) in bundle.successes() {
        let name = display_name(&result.tool);
        let labels: Vec<String> = if payload.sources.is_empty() {
            vec![name]
        } else {
            payload
                .sources
                .iter()
                .take(MAX_SOURCES_PER_TOOL)
                .map(|url| format!("{}: {}", name, url))
                .collect()
        };

        for label in labels {
            if seen.insert(label.clone()) {
                sources.push(label);
            }
        }
    }

    sources
}

fn footer(bundle: &ResultBundle, generated_at: DateTime<Utc>) -> String {
    let succeeded = bundle.success_count();
    let mut parts = vec![format!(
        "**Tools Used:** {} successful, {} failed",
        succeeded,
        bundle.len() - succeeded
    )];

    if let Some(confidence) = bundle.average_confidence() {
        parts.push(format!("**Average Confidence:** {:.1}%", confidence * 100.0));
    }

    parts.push(format!(
        "**Generated:** {}",
        generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));

    format!("---\n{}\n", parts.join(" | "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::time::Duration;
    use tools::{ToolOutcome, ToolOutput, ToolResult};

    fn generated_at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 0).unwrap()
    }

    fn result(tool: &str, outcome: ToolOutcome) -> ToolResult {
        ToolResult {
            tool: tool.into(),
            outcome,
            attempts: 1,
            elapsed: Duration::from_millis(5),
        }
    }

    fn bundle() -> ResultBundle {
        ResultBundle::new(vec![
            result(
                "calculator",
                ToolOutcome::Success {
                    payload: ToolOutput::new("Calculation: 15 / 100 * 40 = 6").with_confidence(0.95),
                },
            ),
            result("web_search", ToolOutcome::timeout(Duration::from_secs(30))),
            result(
                "weather",
                ToolOutcome::Success {
                    payload: ToolOutput::new("Weather in Tokyo: 20.0°C")
                        .with_confidence(0.85)
                        .with_source("https://open-meteo.com")
                        .with_source("https://open-meteo.com"),
                },
            ),
        ])
    }

    #[test]
    fn test_render_sections() {
        let report = render("tip and weather", &bundle(), "It is warm and the tip is $6.", generated_at());

        assert!(report.starts_with("# Research Results for: tip and weather\n\n"));
        assert!(report.contains("## Summary\nIt is warm and the tip is $6.\n\n"));
        assert!(report.contains("### 1. Calculator Results\nCalculation: 15 / 100 * 40 = 6"));
        assert!(report.contains("### 2. Weather Results\nWeather in Tokyo: 20.0°C"));
        assert!(!report.contains("Web Search Results"));
        assert!(report.contains("## Sources\n1. Calculator\n2. Weather: https://open-meteo.com\n\n"));
        assert!(report.contains(
            "## Note\nSome information sources were unavailable: Web Search (Tool timed out after 30.0 seconds)"
        ));
    }

    #[test]
    fn test_footer() {
        let report = render("q", &bundle(), "answer", generated_at());

        assert!(report.ends_with(
            "---\n**Tools Used:** 2 successful, 1 failed | **Average Confidence:** 90.0% | **Generated:** 2024-05-01 12:30:00 UTC\n"
        ));
    }

    #[test]
    fn test_render_empty_bundle() {
        let report = render("q", &ResultBundle::default(), "Nothing found.", generated_at());

        assert!(!report.contains("## Detailed Information"));
        assert!(!report.contains("## Sources"));
        assert!(!report.contains("## Note"));
        assert!(!report.contains("Average Confidence"));
        assert!(report.contains("**Tools Used:** 0 successful, 0 failed"));
    }

    #[test]
    fn test_render_error() {
        let report = render_error("   ", "Query is empty");
        assert!(report.starts_with("# Error Processing Query:    \n"));
        assert!(report.contains("**Error:** Query is empty"));
    }
}
