use crate::applier::{Decision, ErrorDecision, Operator};
use crate::error::{PrefixError, Result};
use crate::refactor::ChangeSet;
use colored::*;
use dialoguer::Select;

/// 터미널에서 응답을 받는 operator
pub struct TerminalOperator;

impl TerminalOperator {
    pub fn new() -> Self {
        Self
    }

    fn select(prompt: &str, items: &[&str], default: usize) -> Result<usize> {
        Select::new()
            .with_prompt(prompt)
            .items(items)
            .default(default)
            .interact()
            .map_err(|e| PrefixError::Io(std::io::Error::new(std::io::ErrorKind::Other, e)))
    }
}

impl Default for TerminalOperator {
    fn default() -> Self {
        Self::new()
    }
}

impl Operator for TerminalOperator {
    fn confirm(&mut self, changes: &ChangeSet) -> Result<Decision> {
        // Output to stderr so stdout keeps only the report
        eprintln!("\n{}", "[>] Planned patch:".cyan().bold());
        eprintln!("{}", changes.render());

        let choice = Self::select("Apply this patch?", &["[Y]es", "[n]o", "[q]uit"], 0)?;
        Ok(match choice {
            0 => Decision::Apply,
            1 => Decision::Skip,
            _ => Decision::Quit,
        })
    }

    fn on_error(&mut self, description: &str, error: &PrefixError) -> Result<ErrorDecision> {
        eprintln!("\n{} {}", "[X]".red(), description);
        eprintln!("    ({}) {}", error.kind().as_str(), error.to_string().dimmed());

        let choice = Self::select(
            "What now?",
            &["[r]etry", "[v]erbose", "[n]ext", "[Q]uit"],
            3,
        )?;
        Ok(match choice {
            0 => ErrorDecision::Retry,
            1 => ErrorDecision::Verbose,
            2 => ErrorDecision::Next,
            _ => ErrorDecision::Quit,
        })
    }

    fn show_detail(&mut self, detail: &str) {
        eprintln!("{}", detail.dimmed());
    }
}
