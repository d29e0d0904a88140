//! Consistency checks run after every apply step.

use crate::error::{PrefixError, Result};
use crate::index::{ProjectState, SearchPath, TopLevelModule};
use crate::refactor::RefactorBackend;
use std::collections::BTreeSet;
use tracing::debug;

/// 적용 직전(또는 직후) 트리의 absolute import 목록
#[derive(Debug, Clone, Default)]
pub struct ImportSurvey {
    top_level: BTreeSet<String>,
    imports: Vec<String>,
    duplicates: usize,
}

impl ImportSurvey {
    /// 스냅샷의 모든 소스를 읽어 import 수집
    ///
    /// 파싱할 수 없는 파일은 건너뜁니다. 그런 파일에 대한 판단은 계획 단계의 몫입니다.
    pub fn capture(state: &ProjectState, backend: &dyn RefactorBackend) -> Result<Self> {
        let mut imports = Vec::new();
        for module in state.modules() {
            let source = match state.read_source(module) {
                Ok(source) => source,
                Err(e) => {
                    debug!(file = %module.path_str(), error = %e, "skipping unreadable file");
                    continue;
                }
            };
            match backend.imported_names(&source) {
                Ok(names) => imports.extend(names),
                Err(e) => debug!(file = %module.path_str(), error = %e, "skipping unparsable file"),
            }
        }

        Ok(Self {
            top_level: state.top_level_names(),
            imports,
            duplicates: state.duplicate_identifiers().len(),
        })
    }

    /// `watched` 최상위 이름으로 시작하면서 해석되지 않는 import
    fn dangling(
        &self,
        state: &ProjectState,
        search_path: &SearchPath,
        watched: &BTreeSet<String>,
    ) -> Vec<&str> {
        self.imports
            .iter()
            .filter(|name| {
                let first = name.split('.').next().unwrap_or_default();
                watched.contains(first)
            })
            .filter(|name| !state.resolves(name, search_path))
            .map(String::as_str)
            .collect()
    }
}

/// 적용 전후 비교로 새로 생긴 불일치만 실패로 봅니다
///
/// `renamed`는 이번 단계가 옮긴 모듈 이름 쌍입니다. 원래 해석되지 않던 import가
/// 함께 옮겨졌다면 새 이름으로 맞춰 비교합니다.
pub fn check_consistency(
    before_state: &ProjectState,
    before: &ImportSurvey,
    after_state: &ProjectState,
    after: &ImportSurvey,
    search_path: &SearchPath,
    renamed: Option<(&str, &str)>,
) -> Result<()> {
    if after.duplicates > before.duplicates {
        let listed: Vec<String> = after_state
            .duplicate_identifiers()
            .into_iter()
            .map(|(ident, paths)| {
                let paths: Vec<String> = paths.iter().map(|p| p.display().to_string()).collect();
                format!("{} ({})", ident, paths.join(", "))
            })
            .collect();
        return Err(PrefixError::Validation(format!(
            "duplicate module identifiers: {}",
            listed.join("; ")
        )));
    }

    let watched: BTreeSet<String> = before.top_level.union(&after.top_level).cloned().collect();
    let known: BTreeSet<String> = before
        .dangling(before_state, search_path, &watched)
        .into_iter()
        .map(|name| carry(name, renamed))
        .collect();
    let fresh: BTreeSet<&str> = after
        .dangling(after_state, search_path, &watched)
        .into_iter()
        .filter(|name| !known.contains(*name))
        .collect();

    if !fresh.is_empty() {
        let fresh: Vec<&str> = fresh.into_iter().collect();
        return Err(PrefixError::Validation(format!(
            "unresolved import(s) after applying: {}",
            fresh.join(", ")
        )));
    }

    Ok(())
}

/// 이번 단계가 바꾼 이름이면 바뀐 이름으로 비교
fn carry(name: &str, renamed: Option<(&str, &str)>) -> String {
    match renamed {
        Some((old, new)) if name == old || name.starts_with(&format!("{}.", old)) => {
            format!("{}{}", new, &name[old.len()..])
        }
        _ => name.to_string(),
    }
}

/// 이동이 성공했다면 원래 경로는 남아있지 않아야 합니다
pub fn check_moved(state: &ProjectState, module: &TopLevelModule) -> Result<()> {
    if state.absolute(&module.path).exists() {
        return Err(PrefixError::InvariantBreach(format!(
            "{} still exists after moving module <{}>",
            module.path.display(),
            module.name
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::{GlobSet, SourceLayout};
    use crate::refactor::PythonBackend;
    use std::fs;

    fn capture(root: &std::path::Path) -> (ProjectState, ImportSurvey) {
        let state =
            ProjectState::capture(root, SourceLayout::default(), GlobSet::default()).unwrap();
        let survey = ImportSurvey::capture(&state, &PythonBackend::new()).unwrap();
        (state, survey)
    }

    #[test]
    fn test_broken_reference_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("utils.py"), "").unwrap();
        fs::write(dir.path().join("models.py"), "import utils\nimport os\n").unwrap();
        let (before_state, before) = capture(dir.path());

        fs::create_dir(dir.path().join("app")).unwrap();
        fs::rename(dir.path().join("utils.py"), dir.path().join("app/utils.py")).unwrap();
        let (after_state, after) = capture(dir.path());

        let err = check_consistency(
            &before_state,
            &before,
            &after_state,
            &after,
            &SearchPath::default(),
            None,
        )
        .unwrap_err();
        assert!(matches!(err, PrefixError::Validation(ref m) if m.contains("utils")));
    }

    #[test]
    fn test_preexisting_dangling_import_is_not_blamed() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.py"), "import a.missing\n").unwrap();
        fs::write(dir.path().join("b.py"), "").unwrap();
        let (before_state, before) = capture(dir.path());

        fs::write(dir.path().join("c.py"), "").unwrap();
        let (after_state, after) = capture(dir.path());

        assert!(check_consistency(
            &before_state,
            &before,
            &after_state,
            &after,
            &SearchPath::default(),
            None,
        )
        .is_ok());
    }

    #[test]
    fn test_swapped_dangling_import_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("lib.py"), "").unwrap();
        fs::write(dir.path().join("util.py"), "").unwrap();
        fs::write(dir.path().join("x.py"), "import lib.gone\nimport util\n").unwrap();
        let (before_state, before) = capture(dir.path());

        // 하나가 고쳐지고 다른 하나가 깨짐: 개수는 그대로
        fs::write(dir.path().join("x.py"), "import lib\nimport util\n").unwrap();
        fs::remove_file(dir.path().join("util.py")).unwrap();
        let (after_state, after) = capture(dir.path());

        let err = check_consistency(
            &before_state,
            &before,
            &after_state,
            &after,
            &SearchPath::default(),
            None,
        )
        .unwrap_err();
        assert!(matches!(err, PrefixError::Validation(ref m) if m.ends_with(": util")));
    }

    #[test]
    fn test_dangling_import_moved_with_its_module() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.py"), "import a.missing\n").unwrap();
        let (before_state, before) = capture(dir.path());

        fs::create_dir(dir.path().join("app")).unwrap();
        fs::write(dir.path().join("app/__init__.py"), "").unwrap();
        fs::write(dir.path().join("app/a.py"), "import app.a.missing\n").unwrap();
        fs::remove_file(dir.path().join("a.py")).unwrap();
        let (after_state, after) = capture(dir.path());

        assert!(check_consistency(
            &before_state,
            &before,
            &after_state,
            &after,
            &SearchPath::default(),
            Some(("a", "app.a")),
        )
        .is_ok());
        assert!(check_consistency(
            &before_state,
            &before,
            &after_state,
            &after,
            &SearchPath::default(),
            None,
        )
        .is_err());
    }

    #[test]
    fn test_new_duplicate_identifier() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.py"), "").unwrap();
        let (before_state, before) = capture(dir.path());

        fs::create_dir(dir.path().join("a")).unwrap();
        fs::write(dir.path().join("a/__init__.py"), "").unwrap();
        let (after_state, after) = capture(dir.path());

        let err = check_consistency(
            &before_state,
            &before,
            &after_state,
            &after,
            &SearchPath::default(),
            None,
        )
        .unwrap_err();
        assert!(err.to_string().contains("duplicate"));
    }

    #[test]
    fn test_move_postcondition() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.py"), "").unwrap();
        let (state, _) = capture(dir.path());
        let module = TopLevelModule::new("a", "a.py", false);

        let err = check_moved(&state, &module).unwrap_err();
        assert!(matches!(err, PrefixError::InvariantBreach(_)));

        fs::remove_file(dir.path().join("a.py")).unwrap();
        assert!(check_moved(&state, &module).is_ok());
    }
}
