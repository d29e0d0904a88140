use crate::error::{PrefixError, Result};
use crate::index::module::{to_slash, Module, SourceLayout};
use glob::{MatchOptions, Pattern};
use std::path::Path;
use tracing::debug;
use walkdir::{DirEntry, WalkDir};

/// 어느 깊이에서든 건너뛰는 디렉토리
const ALWAYS_SKIP_DIRS: &[&str] = &["__pycache__", "node_modules", "venv", "site-packages"];

/// 루트 기준 경로에 대한 glob 목록
///
/// 대소문자를 구분하며 `*`는 `/`도 넘어갑니다.
#[derive(Debug, Clone, Default)]
pub struct GlobSet {
    patterns: Vec<Pattern>,
}

impl GlobSet {
    const OPTIONS: MatchOptions = MatchOptions {
        case_sensitive: true,
        require_literal_separator: false,
        require_literal_leading_dot: false,
    };

    pub fn new<S: AsRef<str>>(globs: &[S]) -> Result<Self> {
        let patterns = globs
            .iter()
            .map(|g| {
                Pattern::new(g.as_ref()).map_err(|e| PrefixError::Glob {
                    pattern: g.as_ref().to_string(),
                    message: e.to_string(),
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { patterns })
    }

    /// 하나라도 일치하면 true
    pub fn matches(&self, relative: &str) -> bool {
        self.patterns
            .iter()
            .any(|p| p.matches_with(relative, Self::OPTIONS))
    }
}

/// 프로젝트 스캐너 - 루트 아래 소스 파일을 모듈로 수집
pub struct ProjectScanner {
    layout: SourceLayout,
    follow_links: bool,
}

impl ProjectScanner {
    pub fn new(layout: SourceLayout) -> Self {
        Self {
            layout,
            follow_links: false,
        }
    }

    fn is_skipped(entry: &DirEntry) -> bool {
        if entry.depth() == 0 || !entry.file_type().is_dir() {
            return false;
        }
        let name = entry.file_name().to_string_lossy();
        name.starts_with('.') || ALWAYS_SKIP_DIRS.contains(&name.as_ref())
    }

    /// 제외 패턴에 걸리지 않는 모든 소스 파일 (경로 순 정렬)
    pub fn scan(&self, root: &Path, excludes: &GlobSet) -> Result<Vec<Module>> {
        let mut modules = Vec::new();

        let walker = WalkDir::new(root)
            .follow_links(self.follow_links)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| !Self::is_skipped(e));

        for entry in walker {
            let entry = entry.map_err(|e| {
                PrefixError::Io(std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))
            })?;
            if !entry.file_type().is_file() {
                continue;
            }

            let relative = match entry.path().strip_prefix(root) {
                Ok(rel) => rel,
                Err(_) => continue,
            };

            if excludes.matches(&to_slash(relative)) {
                debug!(path = %relative.display(), "excluded by glob");
                continue;
            }

            if let Some(module) = Module::from_relative(relative, &self.layout) {
                modules.push(module);
            }
        }

        Ok(modules)
    }
}
