use crate::applier::{AppliedRun, ApplyOutcome, StepState};
use crate::error::{ErrorKind, PrefixError, Result};
use colored::*;
use serde::Serialize;

/// 출력 상세 수준
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    Quiet,
    Normal,
    Verbose,
}

impl Verbosity {
    pub fn from_flags(verbose: bool, quiet: bool) -> Self {
        if quiet {
            Verbosity::Quiet
        } else if verbose {
            Verbosity::Verbose
        } else {
            Verbosity::Normal
        }
    }
}

/// 실패한 변환 하나
#[derive(Debug, Clone, Serialize)]
pub struct Failure {
    pub description: String,
    pub kind: ErrorKind,
    /// 한 줄 요약
    pub error: String,
    /// `--verbose`용 상세 (source 체인 포함)
    #[serde(skip)]
    pub detail: String,
}

/// 실행 전체 결과
///
/// 종료 코드는 여기서만 결정됩니다.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunReport {
    pub successes: Vec<String>,
    pub failures: Vec<Failure>,
    pub skipped: Vec<String>,
    /// operator 종료 시 남은 변환 수
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aborted: Option<usize>,
}

impl RunReport {
    pub fn from_outcomes(outcomes: Vec<ApplyOutcome>, aborted: Option<usize>) -> Self {
        let mut report = RunReport {
            aborted,
            ..Default::default()
        };

        for outcome in outcomes {
            match outcome.error {
                Some(err) => report.failures.push(Failure {
                    description: outcome.description,
                    kind: err.kind(),
                    error: err.to_string(),
                    detail: err.detail(),
                }),
                None if outcome.state == StepState::Applied => {
                    report.successes.push(outcome.description)
                }
                None if outcome.state == StepState::Skipped => {
                    report.skipped.push(outcome.description)
                }
                None => {}
            }
        }

        report
    }

    pub fn from_run(run: AppliedRun) -> Self {
        Self::from_outcomes(run.outcomes, run.aborted)
    }

    /// 0: 실패 없음 또는 operator 종료, 1: 실패 있음
    pub fn exit_code(&self) -> i32 {
        if self.aborted.is_some() || self.failures.is_empty() {
            0
        } else {
            1
        }
    }

    /// 적용 후 트리 불일치로 분류된 실패 수
    pub fn validation_failures(&self) -> usize {
        self.failures
            .iter()
            .filter(|f| f.kind == ErrorKind::Validation)
            .count()
    }

    pub fn render_text(&self, verbosity: Verbosity, interactive: bool) -> String {
        let mut lines: Vec<String> = Vec::new();
        if verbosity == Verbosity::Quiet {
            return String::new();
        }

        if !interactive {
            for description in &self.successes {
                lines.push(format!("{}", "Successfully applied the patch:".green()));
                lines.push(format!("    {}", description));
            }
            for failure in &self.failures {
                lines.push(format!("{}", "Failed to apply the patch:".red()));
                lines.push(format!("    {}", failure.description));
                let message = match verbosity {
                    Verbosity::Verbose => &failure.detail,
                    _ => &failure.error,
                };
                lines.push(format!("The error was: ({}) {}", failure.kind.as_str(), message));
            }
        }

        if !self.failures.is_empty() {
            lines.push(format!(
                "Observed the total of {} failures",
                self.failures.len().to_string().bold()
            ));
            let inconsistent = self.validation_failures();
            if inconsistent > 0 {
                lines.push(format!(
                    "{} {} of them left the tree inconsistent",
                    "[!]".yellow(),
                    inconsistent
                ));
            }
        }

        if let Some(remaining) = self.aborted {
            lines.push(format!(
                "{} {}",
                "[!]".yellow(),
                PrefixError::UserAbort { remaining }
            ));
        }

        lines.join("\n")
    }

    /// `--json` 출력
    pub fn to_json(&self) -> Result<String> {
        #[derive(Serialize)]
        struct JsonReport<'a> {
            #[serde(flatten)]
            report: &'a RunReport,
            exit_code: i32,
        }

        Ok(serde_json::to_string_pretty(&JsonReport {
            report: self,
            exit_code: self.exit_code(),
        })?)
    }
}
