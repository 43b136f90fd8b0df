//! Output formatting for the CLI

use comfy_table::{Table, modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL};
use hemoscan_resilience::{AnalysisReport, HealthState, HealthStatus};
use owo_colors::OwoColorize;
use serde::Serialize;

use crate::cli::OutputFormat;
use crate::error::{CliError, CliResult};

/// JSON shape of a [`HealthStatus`]
#[derive(Debug, Serialize)]
pub struct StatusView<'a> {
    /// Coarse state
    pub state: HealthState,
    /// Human-readable explanation
    pub message: &'a str,
    /// Probe latency in milliseconds
    pub latency_ms: Option<u64>,
    /// Automatic checks have stopped
    pub manual_retry_required: bool,
}

impl<'a> From<&'a HealthStatus> for StatusView<'a> {
    fn from(status: &'a HealthStatus) -> Self {
        Self {
            state: status.state,
            message: &status.message,
            latency_ms: status
                .latency
                .map(|l| u64::try_from(l.as_millis()).unwrap_or(u64::MAX)),
            manual_retry_required: status.manual_retry_required,
        }
    }
}

#[derive(Serialize)]
struct ErrorView<'a> {
    error: String,
    category: String,
    causes: Vec<&'a str>,
    suggestions: Vec<&'a str>,
}

/// Format and display output based on format preference
#[derive(Debug, Clone, Copy)]
pub struct Formatter {
    format: OutputFormat,
    colored: bool,
}

impl Formatter {
    /// Create a formatter
    #[must_use]
    pub fn new(format: OutputFormat, colored: bool) -> Self {
        Self { format, colored }
    }

    /// Selected output format
    pub fn format(&self) -> OutputFormat {
        self.format
    }

    /// Display one health status
    ///
    /// # Errors
    ///
    /// Returns an error if JSON serialization fails.
    pub fn display_status(&self, status: &HealthStatus) -> CliResult<()> {
        match self.format {
            OutputFormat::Json => {
                println!("{}", serde_json::to_string(&StatusView::from(status))?);
                Ok(())
            }
            OutputFormat::Human => {
                println!("{}", self.status_line(status));
                Ok(())
            }
        }
    }

    /// One-line human rendering of a status
    pub fn status_line(&self, status: &HealthStatus) -> String {
        let latency = status
            .latency
            .map(|l| format!(" ({} ms)", l.as_millis()))
            .unwrap_or_default();
        let label = format!("[{}]", status.state);

        if !self.colored {
            return format!("{label} {}{latency}", status.message);
        }

        let label = match status.state {
            HealthState::Online => label.bright_green().bold().to_string(),
            HealthState::Slow => label.bright_yellow().bold().to_string(),
            HealthState::Offline => label.bright_red().bold().to_string(),
            HealthState::Checking => label.bright_blue().to_string(),
        };
        format!("{label} {}{}", status.message, latency.bright_black())
    }

    /// Display an analysis report
    ///
    /// # Errors
    ///
    /// Returns an error if JSON serialization fails.
    pub fn display_report(&self, report: &AnalysisReport) -> CliResult<()> {
        match self.format {
            OutputFormat::Json => {
                println!("{}", serde_json::to_string_pretty(report)?);
                Ok(())
            }
            OutputFormat::Human => {
                self.print_header("Lab Findings");
                if report.lab_findings.is_empty() {
                    self.print_info("No findings reported");
                } else {
                    println!("{}", findings_table(report));
                }

                if !report.recommended_specialties.is_empty() {
                    self.print_header("Recommended Specialties");
                    for specialty in &report.recommended_specialties {
                        self.print_bullet(specialty);
                    }
                }

                if !report.patient_briefing.is_empty() {
                    self.print_header("Patient Briefing");
                    println!("{}", report.patient_briefing);
                }
                Ok(())
            }
        }
    }

    /// Display error with causes and suggestions
    pub fn display_error(&self, error: &CliError) {
        let causes = error.causes();
        let suggestions = error.suggestions();

        if self.format == OutputFormat::Json {
            let view = ErrorView {
                error: error.user_message(),
                category: error.category().to_string(),
                causes,
                suggestions,
            };
            match serde_json::to_string(&view) {
                Ok(json) => eprintln!("{json}"),
                Err(_) => eprintln!("Error: {}", error.user_message()),
            }
            return;
        }

        if self.colored {
            eprintln!(
                "{} {}: {}",
                "Error".bright_red().bold(),
                format!("({})", error.category()).bright_black(),
                error.user_message()
            );
        } else {
            eprintln!("Error ({}): {}", error.category(), error.user_message());
        }

        self.print_list("Possible causes:", &causes);
        self.print_list("Suggestions:", &suggestions);
    }

    fn print_list(&self, title: &str, items: &[&str]) {
        if items.is_empty() {
            return;
        }
        if self.colored {
            eprintln!("\n{}", title.bright_yellow().bold());
            for item in items {
                eprintln!("  {} {}", "•".bright_blue(), item);
            }
        } else {
            eprintln!("\n{title}");
            for item in items {
                eprintln!("  • {item}");
            }
        }
    }

    fn print_header(&self, text: &str) {
        if self.colored {
            println!("\n{}", text.bright_cyan().bold());
            println!("{}", "=".repeat(text.len()).bright_cyan());
        } else {
            println!("\n{text}");
            println!("{}", "=".repeat(text.len()));
        }
    }

    fn print_info(&self, text: &str) {
        if self.colored {
            println!("{}", text.bright_blue());
        } else {
            println!("{text}");
        }
    }

    fn print_bullet(&self, text: &str) {
        if self.colored {
            println!("  {} {}", "•".bright_blue(), text.bright_green());
        } else {
            println!("  • {text}");
        }
    }
}

fn findings_table(report: &AnalysisReport) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_header(vec!["Analyte", "Value", "Result", "Severity", "Specialty", "Finding"]);

    for finding in &report.lab_findings {
        table.add_row(vec![
            finding.analyte.clone(),
            finding.value.to_string(),
            finding.result.clone(),
            finding.severity.to_string(),
            finding.specialty.clone(),
            finding.description.clone(),
        ]);
    }
    table
}
