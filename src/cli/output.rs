//! Styled terminal output for cfgsync
//!
//! Messages go to stdout with a status symbol; errors always go to stderr,
//! even in quiet mode. Spinners draw on stderr and vanish when it is not a
//! terminal.

use crate::git::progress::ProgressSink;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, Write};
use std::time::Duration;

/// Output handler for consistent CLI formatting
pub struct Output {
    verbose: bool,
    quiet: bool,
}

impl Output {
    pub fn new(verbose: bool, quiet: bool) -> Self {
        Self { verbose, quiet }
    }

    pub fn success(&self, message: &str) {
        if !self.quiet {
            println!("{} {}", style("✔").green(), message);
        }
    }

    /// Errors are always shown, even in quiet mode
    pub fn error(&self, message: &str) {
        eprintln!("{} {}", style("✖").red(), message);
    }

    pub fn warning(&self, message: &str) {
        if !self.quiet {
            println!("{} {}", style("⚠").yellow(), message);
        }
    }

    pub fn info(&self, message: &str) {
        if !self.quiet {
            println!("{} {}", style("ℹ").blue(), message);
        }
    }

    /// Print a verbose message (only if verbose mode is enabled)
    pub fn verbose(&self, message: &str) {
        if self.verbose && !self.quiet {
            println!("{} {}", style("ℹ").dim(), style(message).dim());
        }
    }

    pub fn is_verbose(&self) -> bool {
        self.verbose
    }

    pub fn header(&self, title: &str) {
        if !self.quiet {
            println!("\n{}", style(title).bold().underlined());
        }
    }

    pub fn section_header(&self, title: &str) {
        if !self.quiet {
            println!("\n{}", style(title).bold().cyan());
        }
    }

    /// Create a spinner for indefinite progress
    pub fn spinner(&self, message: &str) -> ProgressBar {
        if self.quiet {
            return ProgressBar::hidden();
        }
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::with_template("{spinner:.green} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.set_message(message.to_string());
        pb
    }

    pub fn list_item(&self, item: &str) {
        if !self.quiet {
            println!("  • {item}");
        }
    }

    /// Print a key-value pair with consistent styling
    pub fn key_value(&self, key: &str, value: &str, highlight: bool) {
        if !self.quiet {
            let styled_value = if highlight {
                style(value).green().bold()
            } else {
                style(value).white()
            };
            println!("  {:<18} {}", style(key).dim(), styled_value);
        }
    }

    /// Ask for user confirmation. Unreadable input counts as "no".
    pub fn confirm(&self, message: &str) -> bool {
        print!("{} {} (y/N): ", style("❯").cyan(), message);
        if io::stdout().flush().is_err() {
            return false;
        }

        let mut input = String::new();
        if io::stdin().read_line(&mut input).is_err() {
            return false;
        }

        matches!(input.trim().to_lowercase().as_str(), "y" | "yes")
    }

    pub fn blank_line(&self) {
        if !self.quiet {
            println!();
        }
    }
}

/// [`ProgressSink`] drawing an indicatif spinner with a running count.
///
/// The label given at construction stays on screen; phase titles reported
/// by the engine only go to the debug log.
pub struct SpinnerProgress {
    bar: ProgressBar,
    label: String,
}

impl SpinnerProgress {
    pub fn new(output: &Output, label: &str) -> Self {
        Self {
            bar: output.spinner(label),
            label: label.to_string(),
        }
    }
}

impl ProgressSink for SpinnerProgress {
    fn start(&self, title: &str, total: Option<u64>) {
        if let Some(total) = total {
            self.bar.set_length(total);
        }
        tracing::debug!(label = %self.label, phase = title, "progress started");
        self.bar.set_message(self.label.clone());
        self.bar.enable_steady_tick(Duration::from_millis(100));
    }

    fn update(&self, completed: u64) {
        self.bar.set_position(completed);
        self.bar.set_message(format!("{} ({completed} entries)", self.label));
    }

    fn finish(&self) {
        self.bar.finish_and_clear();
    }
}
