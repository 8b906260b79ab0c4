//! Output formatters for run reports
//!
//! Provides table, JSON, and summary output formats.

use std::io::Write;
use std::str::FromStr;

use crate::models::{Test, TestState};
use crate::report::RunReport;

/// Output format options
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    Table,
    Json,
    JsonPretty,
    Summary,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "table" => Ok(OutputFormat::Table),
            "json" => Ok(OutputFormat::Json),
            "json-pretty" | "jsonpretty" => Ok(OutputFormat::JsonPretty),
            "summary" => Ok(OutputFormat::Summary),
            other => Err(format!("unknown output format: {other}")),
        }
    }
}

/// Result formatter
pub struct ResultFormatter {
    format: OutputFormat,
    colorize: bool,
}

impl ResultFormatter {
    pub fn new(format: OutputFormat) -> Self {
        Self {
            format,
            colorize: true,
        }
    }

    pub fn no_color(mut self) -> Self {
        self.colorize = false;
        self
    }

    /// Format a single test
    pub fn format_test(&self, test: &Test) -> String {
        match self.format {
            OutputFormat::Table => self.format_test_table(test),
            OutputFormat::Json => serde_json::to_string(test).unwrap_or_default(),
            OutputFormat::JsonPretty => serde_json::to_string_pretty(test).unwrap_or_default(),
            OutputFormat::Summary => self.format_test_summary(test),
        }
    }

    fn status(&self, state: &TestState) -> String {
        let plain = format!("{} {}", state.symbol(), state);
        if !self.colorize {
            return plain;
        }
        let color = match state {
            TestState::Passed => "32",
            TestState::Failed(_) => "31",
            TestState::NotStarted | TestState::Running => "33",
        };
        format!("\x1b[{color}m{plain}\x1b[0m")
    }

    fn format_test_table(&self, test: &Test) -> String {
        let duration = test
            .duration()
            .map(|d| d.as_millis().to_string())
            .unwrap_or_else(|| "-".to_string());
        format!(
            "{} {} [{:>6}ms]",
            self.status(&test.state()),
            test.full_title(),
            duration
        )
    }

    fn format_test_summary(&self, test: &Test) -> String {
        let duration = test.duration().map(|d| d.as_millis()).unwrap_or_default();
        format!(
            "{} {} ({}ms)",
            test.state().symbol(),
            test.full_title(),
            duration
        )
    }

    /// Format a whole run
    pub fn format_report(&self, report: &RunReport) -> String {
        match self.format {
            OutputFormat::Table => self.format_report_table(report),
            OutputFormat::Json => serde_json::to_string(report).unwrap_or_default(),
            OutputFormat::JsonPretty => serde_json::to_string_pretty(report).unwrap_or_default(),
            OutputFormat::Summary => self.format_report_brief(report),
        }
    }

    fn format_report_table(&self, report: &RunReport) -> String {
        let mut output = String::new();

        output.push_str("\n╔══════════════════════════════════════════════════════════════\n");
        for test in &report.tests {
            output.push_str(&format!("║  {}\n", self.format_test_table(test)));
        }
        output.push_str("╠══════════════════════════════════════════════════════════════\n");

        let stats = &report.stats;
        let pass_str = if self.colorize {
            format!("\x1b[32m{}\x1b[0m", stats.passes)
        } else {
            stats.passes.to_string()
        };
        let fail_str = if self.colorize && stats.failures > 0 {
            format!("\x1b[31m{}\x1b[0m", stats.failures)
        } else {
            stats.failures.to_string()
        };
        output.push_str(&format!(
            "║  Total: {} | Pass: {} | Fail: {} | Pending: {}\n",
            stats.total(),
            pass_str,
            fail_str,
            stats.pending
        ));
        output.push_str(&format!("║  Duration: {}ms\n", stats.duration_ms));
        output.push_str("╚══════════════════════════════════════════════════════════════\n");

        let failed: Vec<_> = report.failed_tests().collect();
        if !failed.is_empty() {
            output.push_str("\nFailures:\n");
            for (index, test) in failed.iter().enumerate() {
                if let Some(failure) = test.error() {
                    output.push_str(&format!(
                        "  {}) {}\n     {}: {}\n",
                        index + 1,
                        test.full_title(),
                        failure.kind,
                        failure.message
                    ));
                }
            }
        }

        if !report.protocol_errors.is_empty() {
            output.push_str("\nProtocol errors:\n");
            for error in &report.protocol_errors {
                output.push_str(&format!("  - {error}\n"));
            }
        }

        output
    }

    fn format_report_brief(&self, report: &RunReport) -> String {
        let stats = &report.stats;
        let mut output = format!(
            "{} passing, {} failing, {} pending ({}ms)",
            stats.passes, stats.failures, stats.pending, stats.duration_ms
        );
        if !report.protocol_errors.is_empty() {
            output.push_str(&format!(
                ", {} protocol errors",
                report.protocol_errors.len()
            ));
        }
        output
    }

    /// Format selected tests for listing
    pub fn format_list(&self, tests: &[Test]) -> String {
        match self.format {
            OutputFormat::Json | OutputFormat::JsonPretty => {
                let titles: Vec<&str> = tests.iter().map(Test::full_title).collect();
                if self.format == OutputFormat::JsonPretty {
                    serde_json::to_string_pretty(&titles).unwrap_or_default()
                } else {
                    serde_json::to_string(&titles).unwrap_or_default()
                }
            }
            OutputFormat::Table | OutputFormat::Summary => tests
                .iter()
                .map(|test| format!("{}\n", test.full_title()))
                .collect(),
        }
    }
}

impl Default for ResultFormatter {
    fn default() -> Self {
        Self::new(OutputFormat::Table)
    }
}

/// Write a report to a file
pub fn write_report_to_file(
    path: &str,
    report: &RunReport,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let formatter = ResultFormatter::new(format).no_color();
    let content = formatter.format_report(report);

    let mut file = std::fs::File::create(path)?;
    file.write_all(content.as_bytes())?;

    Ok(())
}
