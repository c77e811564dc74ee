//! Output formatting for CLI

use anyhow::Result;
use audio_ifeval_benchmarks::AreaReport;
use audio_ifeval_common::to_pretty_json_line;

/// Output format enum
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// The two report blocks (default)
    #[default]
    Text,
    /// JSON output
    Json,
    /// Markdown table
    Markdown,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text => write!(f, "text"),
            Self::Json => write!(f, "json"),
            Self::Markdown => write!(f, "markdown"),
        }
    }
}

/// Render an area report for stdout.
pub fn render_report(report: &AreaReport, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Text => Ok(report.to_string()),
        OutputFormat::Json => to_pretty_json_line(report),
        OutputFormat::Markdown => Ok(report.to_markdown()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report() -> AreaReport {
        let mut report = AreaReport::default();
        report.ifr.insert("m".to_string(), 64.0);
        report.rps.insert("m".to_string(), 100.0);
        report
    }

    #[test]
    fn test_text_output() {
        let text = render_report(&report(), OutputFormat::Text).unwrap();
        assert!(text.contains("Overall IFR Areas Score:\n{'m': 64.0}"));
        assert!(text.contains("Overall RPS Areas Score:\n{'m': 100.0}"));
    }

    #[test]
    fn test_json_output() {
        let json = render_report(&report(), OutputFormat::Json).unwrap();
        assert!(json.contains("\"ifr\""));
        assert!(json.contains("\"rps\""));
        assert!(json.ends_with('\n'));
    }

    #[test]
    fn test_markdown_output() {
        let md = render_report(&report(), OutputFormat::Markdown).unwrap();
        assert!(md.contains("| m | 64.0 | 100.0 |"));
    }

    #[test]
    fn test_output_format_display() {
        assert_eq!(OutputFormat::Text.to_string(), "text");
        assert_eq!(OutputFormat::Json.to_string(), "json");
        assert_eq!(OutputFormat::Markdown.to_string(), "markdown");
    }
}
