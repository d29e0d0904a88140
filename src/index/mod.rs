//! 프로젝트 인덱스 - 소스 파일 탐색, 제외 패턴, 경로 → 모듈 식별자 매핑

pub mod module;
pub mod scanner;
pub mod state;

pub use module::{Module, SourceLayout, TopLevelModule};
pub use scanner::{GlobSet, ProjectScanner};
pub use state::{ProjectState, SearchPath};

use crate::error::Result;
use std::path::Path;

/// 루트를 재귀 탐색해 제외 패턴에 걸리지 않는 모든 모듈 반환
pub fn discover(root: &Path, exclude_globs: &[String]) -> Result<Vec<Module>> {
    let excludes = GlobSet::new(exclude_globs)?;
    ProjectScanner::new(SourceLayout::default()).scan(root, &excludes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_discover_applies_excludes() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("tests")).unwrap();
        fs::write(dir.path().join("tests/test_a.py"), "").unwrap();
        fs::write(dir.path().join("a.py"), "").unwrap();

        let modules = discover(dir.path(), &["tests/**".to_string()]).unwrap();
        let idents: Vec<&str> = modules.iter().map(|m| m.identifier.as_str()).collect();
        assert_eq!(idents, vec!["a"]);
    }
}
