use crate::applier::{ChangeApplier, FailureMode};
use crate::error::Result;
use crate::index::{GlobSet, ProjectState, SearchPath, SourceLayout};
use crate::planner::Transformation;
use crate::refactor::PythonBackend;
use crate::report::RunReport;
use std::path::PathBuf;
use tracing::info;

/// 모든 파일에 적용할 이름 변경 범위
const EVERY_FILE: &str = "**";

/// `python-import-rewrite` 실행 옵션
#[derive(Debug, Clone)]
pub struct RewriteOptions {
    pub path: PathBuf,
    /// (OLD, NEW) 쌍, 입력 순서대로 적용
    pub replacements: Vec<(String, String)>,
    pub exclude_globs: Vec<String>,
}

/// 디렉토리 아래 모든 소스의 import 이름 바꾸기 (keep-going)
pub fn run_import_rewrite(options: &RewriteOptions) -> Result<RunReport> {
    let excludes = GlobSet::new(&options.exclude_globs)?;
    let state = ProjectState::capture(&options.path, SourceLayout::default(), excludes)?;

    let plan: Vec<Transformation> = options
        .replacements
        .iter()
        .map(|(old, new)| Transformation::RenameExternal {
            old_name: old.clone(),
            new_name: new.clone(),
            glob_scope: EVERY_FILE.to_string(),
        })
        .collect();
    info!(files = state.modules().len(), renames = plan.len(), "rewriting imports");

    let backend = PythonBackend::new();
    let run = ChangeApplier::new(&backend, FailureMode::KeepGoing, SearchPath::default())
        .run(state, &plan)?;
    Ok(RunReport::from_run(run))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    const SOURCE: &str = r#"import numpy
import dontchange

def f():
    numpy = 1
    return numpy

def g():
    global numpy
    numpy = numpy.random()
    dontchange.numpy.asdf()
"#;

    const EXPECTED: &str = r#"import mynumpy
import dontchange

def f():
    numpy = 1
    return numpy

def g():
    global mynumpy
    mynumpy = mynumpy.random()
    dontchange.numpy.asdf()
"#;

    #[test]
    fn test_rewrite_tree() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("pkg")).unwrap();
        fs::write(dir.path().join("pkg/code.py"), SOURCE).unwrap();
        fs::write(dir.path().join("other.py"), "print('numpy')\n").unwrap();

        let report = run_import_rewrite(&RewriteOptions {
            path: dir.path().to_path_buf(),
            replacements: vec![("numpy".to_string(), "mynumpy".to_string())],
            exclude_globs: Vec::new(),
        })
        .unwrap();

        assert_eq!(report.exit_code(), 0);
        assert_eq!(fs::read_to_string(dir.path().join("pkg/code.py")).unwrap(), EXPECTED);
        assert_eq!(
            fs::read_to_string(dir.path().join("other.py")).unwrap(),
            "print('numpy')\n"
        );
    }

    #[test]
    fn test_bad_rename_is_reported_and_others_continue() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.py"), "import os\nimport numpy\n").unwrap();

        let report = run_import_rewrite(&RewriteOptions {
            path: dir.path().to_path_buf(),
            replacements: vec![
                ("os".to_string(), "not-valid".to_string()),
                ("numpy".to_string(), "np2".to_string()),
            ],
            exclude_globs: Vec::new(),
        })
        .unwrap();

        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.successes.len(), 1);
        assert_eq!(report.exit_code(), 1);
        assert_eq!(
            fs::read_to_string(dir.path().join("a.py")).unwrap(),
            "import os\nimport np2\n"
        );
    }
}
