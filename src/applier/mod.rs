//! Change applier: the only component that writes to the project tree.
//!
//! Each transformation goes through
//! `Pending → Planning → AwaitingDecision (interactive) → Applying → {Applied, Rejected, Fatal}`.
//! Transformations run strictly one after another; every planning call sees the
//! snapshot left behind by the previous step.

pub mod operator;
pub mod validate;

pub use operator::{Decision, ErrorDecision, Operator, ScriptedOperator};

use crate::error::{PrefixError, Result};
use crate::index::{GlobSet, ProjectState, SearchPath};
use crate::planner::Transformation;
use crate::refactor::{ChangeSet, PlanContext, RefactorBackend};
use clap::ValueEnum;
use indicatif::ProgressBar;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use validate::ImportSurvey;

/// 실패 처리 모드
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum FailureMode {
    /// 첫 실패에서 중단
    #[default]
    FirstError,
    /// 실패를 기록하고 다음 변환으로 진행
    KeepGoing,
    /// 변환마다 operator에게 확인
    Interactive,
}

/// 변환 하나의 진행 상태
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepState {
    Pending,
    Planning,
    AwaitingDecision,
    Applying,
    Applied,
    /// operator가 적용하지 않기로 함
    Skipped,
    /// 계획 단계에서 거부됨
    Rejected,
    /// 적용 또는 검증 중 실패
    Fatal,
}

/// 변환 하나를 끝낸 뒤 실행기가 할 일
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    /// 같은 변환을 다시 시도
    Continue,
    Next,
    Quit,
}

/// 변환 하나의 결과
#[derive(Debug)]
pub struct ApplyOutcome {
    pub action: Action,
    pub description: String,
    pub error: Option<PrefixError>,
    pub state: StepState,
}

impl ApplyOutcome {
    pub fn applied(description: String) -> Self {
        Self {
            action: Action::Next,
            description,
            error: None,
            state: StepState::Applied,
        }
    }

    pub fn skipped(description: String) -> Self {
        Self {
            action: Action::Next,
            description,
            error: None,
            state: StepState::Skipped,
        }
    }

    /// 확인 단계에서 operator가 종료를 선택
    pub fn quit(description: String) -> Self {
        Self {
            action: Action::Quit,
            description,
            error: None,
            state: StepState::AwaitingDecision,
        }
    }

    pub fn failed(description: String, state: StepState, error: PrefixError, action: Action) -> Self {
        Self {
            action,
            description,
            error: Some(error),
            state,
        }
    }

    pub fn is_success(&self) -> bool {
        self.state == StepState::Applied
    }

    pub fn is_failure(&self) -> bool {
        self.error.is_some()
    }
}

/// 전체 실행 결과
#[derive(Debug, Default)]
pub struct AppliedRun {
    pub outcomes: Vec<ApplyOutcome>,
    /// operator 종료 시 적용되지 않고 남은 변환 수
    pub aborted: Option<usize>,
}

/// 계획된 변환을 순서대로 적용하는 실행기
pub struct ChangeApplier<'a> {
    backend: &'a dyn RefactorBackend,
    mode: FailureMode,
    search_path: SearchPath,
    catch_errors: bool,
    operator: Option<&'a mut dyn Operator>,
    progress: Option<ProgressBar>,
}

impl<'a> ChangeApplier<'a> {
    pub fn new(backend: &'a dyn RefactorBackend, mode: FailureMode, search_path: SearchPath) -> Self {
        Self {
            backend,
            mode,
            search_path,
            catch_errors: true,
            operator: None,
            progress: None,
        }
    }

    /// interactive 모드의 결정 주체 지정
    pub fn with_operator(mut self, operator: &'a mut dyn Operator) -> Self {
        self.operator = Some(operator);
        self
    }

    /// `false`면 첫 에러를 결과로 기록하지 않고 그대로 반환 (`--dont-catch`)
    pub fn catch_errors(mut self, catch: bool) -> Self {
        self.catch_errors = catch;
        self
    }

    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = Some(progress);
        self
    }

    /// 모든 변환 실행
    pub fn run(&mut self, mut state: ProjectState, plan: &[Transformation]) -> Result<AppliedRun> {
        if self.mode == FailureMode::Interactive && self.operator.is_none() {
            return Err(PrefixError::Config(
                "interactive mode requires an operator".to_string(),
            ));
        }

        debug!(
            backend = self.backend.name(),
            mode = ?self.mode,
            transformations = plan.len(),
            "starting run"
        );
        let mut run = AppliedRun::default();

        for (index, transformation) in plan.iter().enumerate() {
            if let Some(pb) = &self.progress {
                pb.set_message(transformation.label());
            }

            let outcome = self.step(&mut state, transformation)?;
            state = state.refresh()?;

            if let Some(pb) = &self.progress {
                pb.inc(1);
            }

            let quit = outcome.action == Action::Quit;
            let applied = outcome.is_success();
            run.outcomes.push(outcome);

            if quit {
                if self.mode == FailureMode::Interactive {
                    let remaining = plan.len() - index - usize::from(applied);
                    info!(remaining, "run stopped by operator");
                    run.aborted = Some(remaining);
                } else {
                    info!(remaining = plan.len() - index - 1, "stopping after first error");
                }
                break;
            }
        }

        if let Some(pb) = &self.progress {
            pb.finish_and_clear();
        }

        Ok(run)
    }

    /// 변환 하나를 끝낼 때까지 (재시도 포함) 진행
    fn step(&mut self, state: &mut ProjectState, transformation: &Transformation) -> Result<ApplyOutcome> {
        let label = transformation.label();

        loop {
            debug!(transformation = %label, state = ?StepState::Planning, "step");
            let (stage, description, result) = match self.plan(state, transformation) {
                Err(err) => (StepState::Rejected, label.clone(), Err(err)),
                Ok(changes) => {
                    let description = changes.description().to_string();
                    if let Some(operator) = self.operator.as_deref_mut() {
                        if self.mode == FailureMode::Interactive {
                            debug!(transformation = %label, state = ?StepState::AwaitingDecision, "step");
                            match operator.confirm(&changes)? {
                                Decision::Apply => {}
                                Decision::Skip => return Ok(ApplyOutcome::skipped(description)),
                                Decision::Quit => return Ok(ApplyOutcome::quit(description)),
                            }
                        }
                    }
                    debug!(transformation = %label, state = ?StepState::Applying, "step");
                    let result = self.apply(state, transformation, &changes);
                    (StepState::Fatal, description, result)
                }
            };

            let err = match result {
                Ok(()) => {
                    info!(transformation = %description, "applied");
                    return Ok(ApplyOutcome::applied(description));
                }
                Err(err) => err,
            };

            if !self.catch_errors {
                return Err(err);
            }
            warn!(transformation = %description, kind = err.kind().as_str(), error = %err, "transformation failed");

            match self.on_failure(&description, &err)? {
                Action::Continue => {
                    *state = state.refresh()?;
                }
                action => return Ok(ApplyOutcome::failed(description, stage, err, action)),
            }
        }
    }

    fn plan(&self, state: &ProjectState, transformation: &Transformation) -> Result<ChangeSet> {
        let ctx = PlanContext::new(state, &self.search_path);
        match transformation {
            Transformation::RenameExternal {
                old_name,
                new_name,
                glob_scope,
            } => {
                let scope = GlobSet::new(std::slice::from_ref(glob_scope))?;
                let files = state.matching(&scope);
                self.backend.plan_rename(ctx, old_name, new_name, &files)
            }
            Transformation::ConvertToPackage { directory } => self
                .backend
                .plan_package_conversion(ctx, std::slice::from_ref(directory)),
            Transformation::MoveModule {
                module,
                destination_package,
            } => self.backend.plan_move(ctx, module, destination_package),
        }
    }

    /// 변경 적용 후 새 스냅샷으로 검증
    fn apply(
        &self,
        state: &ProjectState,
        transformation: &Transformation,
        changes: &ChangeSet,
    ) -> Result<()> {
        let before = ImportSurvey::capture(state, self.backend)?;
        let performed = changes.apply(state.root())?;
        debug!(performed, "changes written");

        let after_state = state.refresh()?;
        if let Transformation::MoveModule { module, .. } = transformation {
            validate::check_moved(&after_state, module)?;
        }
        let after = ImportSurvey::capture(&after_state, self.backend)?;
        let renamed = transformation.renamed_module();
        validate::check_consistency(
            state,
            &before,
            &after_state,
            &after,
            &self.search_path,
            renamed.as_ref().map(|(old, new)| (old.as_str(), new.as_str())),
        )
    }

    /// 모드에 따라 실패 후 행동 결정
    fn on_failure(&mut self, description: &str, err: &PrefixError) -> Result<Action> {
        match self.mode {
            FailureMode::FirstError => Ok(Action::Quit),
            FailureMode::KeepGoing => Ok(Action::Next),
            FailureMode::Interactive => {
                let operator = match self.operator.as_deref_mut() {
                    Some(operator) => operator,
                    None => return Ok(Action::Quit),
                };
                loop {
                    match operator.on_error(description, err)? {
                        ErrorDecision::Retry => return Ok(Action::Continue),
                        ErrorDecision::Verbose => {
                            operator.show_detail(&format!("{}\n{}", description, err.detail()))
                        }
                        ErrorDecision::Next => return Ok(Action::Next),
                        ErrorDecision::Quit => return Ok(Action::Quit),
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::index::{SourceLayout, TopLevelModule};
    use crate::planner::TransformationPlanner;
    use crate::refactor::PythonBackend;
    use crate::report::RunReport;
    use std::fs;
    use std::path::Path;

    fn write_files(root: &Path, files: &[(&str, &str)]) {
        for (path, content) in files {
            let full = root.join(path);
            fs::create_dir_all(full.parent().unwrap()).unwrap();
            fs::write(full, content).unwrap();
        }
    }

    fn snapshot(root: &Path) -> ProjectState {
        ProjectState::capture(root, SourceLayout::default(), GlobSet::default()).unwrap()
    }

    fn prefix_plan(state: &ProjectState) -> Vec<Transformation> {
        TransformationPlanner::plan(state, "app", &[]).unwrap()
    }

    #[test]
    fn test_prefix_scenario() {
        let dir = tempfile::tempdir().unwrap();
        write_files(
            dir.path(),
            &[("utils.py", "import other\n"), ("models.py", "import utils\n")],
        );
        let state = snapshot(dir.path());
        let plan = prefix_plan(&state);
        let backend = PythonBackend::new();

        let run = ChangeApplier::new(&backend, FailureMode::FirstError, SearchPath::default())
            .run(state, &plan)
            .unwrap();

        assert_eq!(run.outcomes.len(), 3);
        assert!(run.outcomes.iter().all(|o| o.is_success()));
        assert!(dir.path().join("app/__init__.py").exists());
        assert!(dir.path().join("app/utils.py").exists());
        assert!(!dir.path().join("utils.py").exists());
        assert!(!dir.path().join("models.py").exists());
        assert_eq!(
            fs::read_to_string(dir.path().join("app/models.py")).unwrap(),
            "import app.utils\n"
        );
    }

    #[test]
    fn test_keep_going_records_and_continues() {
        let dir = tempfile::tempdir().unwrap();
        write_files(
            dir.path(),
            &[
                ("app/__init__.py", ""),
                ("alpha.py", ""),
                ("beta.py", "import alpha\nif flag:\n    alpha = 3\nalpha.run()\n"),
            ],
        );
        let state = snapshot(dir.path());
        let plan = prefix_plan(&state);
        let backend = PythonBackend::new();

        let run = ChangeApplier::new(&backend, FailureMode::KeepGoing, SearchPath::default())
            .run(state, &plan)
            .unwrap();

        assert_eq!(run.outcomes.len(), 2);
        assert!(run.outcomes[0].is_failure());
        assert_eq!(run.outcomes[0].state, StepState::Rejected);
        assert!(run.outcomes[1].is_success());
        assert!(run.aborted.is_none());
        assert!(dir.path().join("alpha.py").exists());
        assert!(dir.path().join("app/beta.py").exists());
    }

    #[test]
    fn test_first_error_stops() {
        let dir = tempfile::tempdir().unwrap();
        write_files(
            dir.path(),
            &[
                ("app/__init__.py", ""),
                ("alpha.py", ""),
                ("beta.py", "import alpha\nif flag:\n    alpha = 3\nalpha.run()\n"),
            ],
        );
        let state = snapshot(dir.path());
        let plan = prefix_plan(&state);
        let backend = PythonBackend::new();

        let run = ChangeApplier::new(&backend, FailureMode::FirstError, SearchPath::default())
            .run(state, &plan)
            .unwrap();

        assert_eq!(run.outcomes.len(), 1);
        assert!(run.outcomes[0].is_failure());
        assert!(run.aborted.is_none());
        assert!(dir.path().join("beta.py").exists());
    }

    #[test]
    fn test_dont_catch_returns_error() {
        let dir = tempfile::tempdir().unwrap();
        write_files(
            dir.path(),
            &[
                ("app/__init__.py", ""),
                ("alpha.py", ""),
                ("beta.py", "import alpha\nif flag:\n    alpha = 3\nalpha.run()\n"),
            ],
        );
        let state = snapshot(dir.path());
        let plan = prefix_plan(&state);
        let backend = PythonBackend::new();

        let err = ChangeApplier::new(&backend, FailureMode::KeepGoing, SearchPath::default())
            .catch_errors(false)
            .run(state, &plan)
            .unwrap_err();
        assert!(matches!(err, PrefixError::Planning(_)));
    }

    #[test]
    fn test_interactive_skip_and_quit() {
        let dir = tempfile::tempdir().unwrap();
        write_files(
            dir.path(),
            &[("app/__init__.py", ""), ("a.py", ""), ("b.py", ""), ("c.py", "")],
        );
        let state = snapshot(dir.path());
        let plan = prefix_plan(&state);
        let backend = PythonBackend::new();
        let mut operator = ScriptedOperator::new(&[Decision::Apply, Decision::Skip, Decision::Quit], &[]);

        let run = ChangeApplier::new(&backend, FailureMode::Interactive, SearchPath::default())
            .with_operator(&mut operator)
            .run(state, &plan)
            .unwrap();

        assert_eq!(run.outcomes.len(), 3);
        assert!(run.outcomes[0].is_success());
        assert_eq!(run.outcomes[1].state, StepState::Skipped);
        assert_eq!(run.outcomes[2].action, Action::Quit);
        assert_eq!(run.aborted, Some(1));
        assert!(dir.path().join("app/a.py").exists());
        assert!(dir.path().join("b.py").exists());
        assert!(dir.path().join("c.py").exists());
        assert_eq!(operator.confirmed.len(), 3);
    }

    #[test]
    fn test_interactive_error_prompt_verbose_then_next() {
        let dir = tempfile::tempdir().unwrap();
        write_files(
            dir.path(),
            &[
                ("app/__init__.py", ""),
                ("alpha.py", ""),
                ("beta.py", "import alpha\nif flag:\n    alpha = 3\nalpha.run()\n"),
            ],
        );
        let state = snapshot(dir.path());
        let plan = prefix_plan(&state);
        let backend = PythonBackend::new();
        let mut operator = ScriptedOperator::new(
            &[Decision::Apply],
            &[ErrorDecision::Verbose, ErrorDecision::Next],
        );

        let run = ChangeApplier::new(&backend, FailureMode::Interactive, SearchPath::default())
            .with_operator(&mut operator)
            .run(state, &plan)
            .unwrap();

        assert_eq!(run.outcomes.len(), 2);
        assert!(run.outcomes[0].is_failure());
        assert!(run.outcomes[1].is_success());
        assert!(run.aborted.is_none());
        assert_eq!(operator.details.len(), 1);
        assert!(operator.details[0].contains("Planning"));
    }

    /// 실패 후 충돌 파일을 치우고 재시도를 고르는 operator
    struct ClearingOperator {
        conflict: std::path::PathBuf,
        errors: usize,
    }

    impl Operator for ClearingOperator {
        fn confirm(&mut self, _changes: &ChangeSet) -> Result<Decision> {
            Ok(Decision::Apply)
        }

        fn on_error(&mut self, _description: &str, _error: &PrefixError) -> Result<ErrorDecision> {
            self.errors += 1;
            fs::remove_file(&self.conflict)?;
            Ok(ErrorDecision::Retry)
        }

        fn show_detail(&mut self, _detail: &str) {}
    }

    #[test]
    fn test_interactive_retry_replans_from_fresh_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        write_files(
            dir.path(),
            &[("app/__init__.py", ""), ("app/a.py", ""), ("a.py", "")],
        );
        let state = snapshot(dir.path());
        let plan = prefix_plan(&state);
        let backend = PythonBackend::new();
        let mut operator = ClearingOperator {
            conflict: dir.path().join("app/a.py"),
            errors: 0,
        };

        let run = ChangeApplier::new(&backend, FailureMode::Interactive, SearchPath::default())
            .with_operator(&mut operator)
            .run(state, &plan)
            .unwrap();

        assert_eq!(run.outcomes.len(), 1);
        assert!(run.outcomes[0].is_success());
        assert_eq!(operator.errors, 1);
        assert!(dir.path().join("app/a.py").exists());
        assert!(!dir.path().join("a.py").exists());
    }

    /// 이동 계획을 비워서 돌려주는 backend
    struct EmptyMoveBackend;

    impl RefactorBackend for EmptyMoveBackend {
        fn name(&self) -> &str {
            "empty-move"
        }

        fn plan_rename(
            &self,
            _ctx: PlanContext<'_>,
            old_name: &str,
            new_name: &str,
            _scope: &[&crate::index::Module],
        ) -> Result<ChangeSet> {
            Ok(ChangeSet::new(format!("Rename {} to {}", old_name, new_name)))
        }

        fn plan_move(
            &self,
            _ctx: PlanContext<'_>,
            module: &TopLevelModule,
            destination: &str,
        ) -> Result<ChangeSet> {
            Ok(ChangeSet::new(format!(
                "Move module <{}> to <{}.{}>",
                module.name, destination, module.name
            )))
        }

        fn imported_names(&self, _source: &str) -> Result<Vec<String>> {
            Ok(Vec::new())
        }
    }

    #[test]
    fn test_move_that_leaves_source_behind_is_validation_failure() {
        let dir = tempfile::tempdir().unwrap();
        write_files(dir.path(), &[("app/__init__.py", ""), ("a.py", "")]);
        let state = snapshot(dir.path());
        let plan = vec![Transformation::MoveModule {
            module: TopLevelModule::new("a", "a.py", false),
            destination_package: "app".to_string(),
        }];

        let run = ChangeApplier::new(&EmptyMoveBackend, FailureMode::KeepGoing, SearchPath::default())
            .run(state, &plan)
            .unwrap();

        assert_eq!(run.outcomes.len(), 1);
        assert_eq!(run.outcomes[0].state, StepState::Fatal);
        let err = run.outcomes[0].error.as_ref().unwrap();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(dir.path().join("a.py").exists());

        let report = RunReport::from_run(run);
        assert_eq!(report.failures[0].kind, ErrorKind::Validation);
        assert_eq!(report.exit_code(), 1);
    }

    #[test]
    fn test_interactive_without_operator_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        write_files(dir.path(), &[("a.py", "")]);
        let state = snapshot(dir.path());
        let backend = PythonBackend::new();

        let err = ChangeApplier::new(&backend, FailureMode::Interactive, SearchPath::default())
            .run(state, &[])
            .unwrap_err();
        assert!(matches!(err, PrefixError::Config(_)));
    }

    #[test]
    fn test_failure_mode_names() {
        assert_eq!(
            serde_json::to_string(&FailureMode::KeepGoing).unwrap(),
            "\"keep-going\""
        );
        assert_eq!(
            FailureMode::from_str("first-error", false).unwrap(),
            FailureMode::FirstError
        );
    }
}
