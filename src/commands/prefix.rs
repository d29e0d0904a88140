use crate::applier::{ChangeApplier, FailureMode};
use crate::config::Config;
use crate::error::Result;
use crate::index::{GlobSet, ProjectState, SearchPath, SourceLayout};
use crate::planner::{RenameRequest, TransformationPlanner};
use crate::refactor::{PythonBackend, RefactorBackend};
use crate::report::{RunReport, Verbosity};
use crate::ui::{create_progress_bar, TerminalOperator};
use colored::*;
use std::path::PathBuf;
use tracing::info;

/// `prefix-modules` 실행 옵션
#[derive(Debug, Clone)]
pub struct PrefixOptions {
    pub root: PathBuf,
    pub prefix: String,
    pub renames: Vec<RenameRequest>,
    /// CLI 값이 이미 병합된 설정
    pub config: Config,
    pub verbosity: Verbosity,
    /// `false`면 첫 에러가 그대로 올라옴 (`--dont-catch`)
    pub catch_errors: bool,
    /// 상태 메시지와 진행 막대를 끄기 (`--json`)
    pub machine_output: bool,
}

/// 최상위 모듈을 접두 패키지 아래로 옮기고 모든 참조를 고치기
pub fn run_prefix(options: &PrefixOptions) -> Result<RunReport> {
    let config = &options.config;
    let chatty = options.verbosity != Verbosity::Quiet && !options.machine_output;

    let layout = SourceLayout::new(&config.package_marker, &config.source_extension);
    let excludes = GlobSet::new(&config.exclude_globs)?;
    let state = ProjectState::capture(&options.root, layout, excludes)?;
    let plan = TransformationPlanner::plan(&state, &options.prefix, &options.renames)?;

    info!(
        root = %options.root.display(),
        modules = state.modules().len(),
        transformations = plan.len(),
        "planned run"
    );
    if chatty {
        eprintln!(
            "{} Restructuring {} under <{}> ({} transformation(s))",
            "[>]".cyan().bold(),
            options.root.display(),
            options.prefix.yellow(),
            plan.len()
        );
    }

    let backend = PythonBackend::new();
    let mut operator = TerminalOperator::new();
    let mut applier = ChangeApplier::new(
        &backend as &dyn RefactorBackend,
        config.mode,
        SearchPath::new(config.search_path.clone()),
    )
    .catch_errors(options.catch_errors);

    if config.mode == FailureMode::Interactive {
        applier = applier.with_operator(&mut operator);
    } else if chatty {
        applier = applier.with_progress(create_progress_bar(plan.len() as u64));
    }

    let run = applier.run(state, &plan)?;
    let report = RunReport::from_run(run);

    if chatty {
        if report.failures.is_empty() {
            eprintln!("{} {} patch(es) applied", "[OK]".green(), report.successes.len());
        } else {
            eprintln!(
                "{} {} of {} transformation(s) failed",
                "[X]".red(),
                report.failures.len(),
                plan.len()
            );
        }
    }

    Ok(report)
}
