use crate::error::Result;
use crate::index::module::{to_slash, Module, SourceLayout, TopLevelModule};
use crate::index::scanner::{GlobSet, ProjectScanner};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

/// import를 해석할 추가 루트 목록
///
/// 분석 중 인터프리터 경로를 전역으로 건드리는 대신 계획 호출에 값으로 전달됩니다.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchPath {
    roots: Vec<PathBuf>,
}

impl SearchPath {
    pub fn new(roots: Vec<PathBuf>) -> Self {
        Self { roots }
    }

    /// 검색 경로의 어느 루트에서든 모듈 또는 패키지로 존재하는지
    pub fn resolves(&self, qualified: &str, layout: &SourceLayout) -> bool {
        let relative: PathBuf = qualified.split('.').collect();
        self.roots.iter().any(|root| {
            let base = root.join(&relative);
            base.is_dir() || base.with_extension(&layout.extension).is_file()
        })
    }
}

/// 프로젝트 인덱스 스냅샷
///
/// 변경이 적용될 때마다 이전 경로가 무효화되므로 `refresh()`로 새 스냅샷을 받아야 합니다.
/// 스냅샷 자체는 불변이며 계획 단계에 참조로 전달됩니다.
#[derive(Debug, Clone)]
pub struct ProjectState {
    root: PathBuf,
    layout: SourceLayout,
    excludes: GlobSet,
    modules: Vec<Module>,
}

impl ProjectState {
    /// 루트를 탐색해 스냅샷 생성
    pub fn capture(root: &Path, layout: SourceLayout, excludes: GlobSet) -> Result<Self> {
        let modules = ProjectScanner::new(layout.clone()).scan(root, &excludes)?;
        Ok(Self {
            root: root.to_path_buf(),
            layout,
            excludes,
            modules,
        })
    }

    /// 같은 설정으로 다시 탐색한 새 스냅샷
    pub fn refresh(&self) -> Result<Self> {
        Self::capture(&self.root, self.layout.clone(), self.excludes.clone())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn layout(&self) -> &SourceLayout {
        &self.layout
    }

    pub fn modules(&self) -> &[Module] {
        &self.modules
    }

    pub fn module(&self, identifier: &str) -> Option<&Module> {
        self.modules.iter().find(|m| m.identifier == identifier)
    }

    pub fn absolute(&self, relative: &Path) -> PathBuf {
        self.root.join(relative)
    }

    pub fn read_source(&self, module: &Module) -> Result<String> {
        Ok(fs::read_to_string(self.absolute(&module.path))?)
    }

    pub fn is_excluded(&self, relative: &Path) -> bool {
        self.excludes.matches(&to_slash(relative))
    }

    /// glob 범위에 드는 모듈들
    pub fn matching(&self, scope: &GlobSet) -> Vec<&Module> {
        self.modules
            .iter()
            .filter(|m| scope.matches(&m.path_str()))
            .collect()
    }

    /// 최상위 모듈 이름 집합
    pub fn top_level_names(&self) -> BTreeSet<String> {
        self.modules
            .iter()
            .map(|m| m.top_level().to_string())
            .collect()
    }

    /// 최상위 모듈 목록 (이름 순)
    pub fn top_level_modules(&self) -> Vec<TopLevelModule> {
        let mut found: BTreeMap<String, TopLevelModule> = BTreeMap::new();
        for module in &self.modules {
            let first = match module.path.components().next() {
                Some(c) => PathBuf::from(c.as_os_str()),
                None => continue,
            };
            let name = module.top_level().to_string();
            let is_package = !module.is_root_file();
            found
                .entry(name.clone())
                .or_insert_with(|| TopLevelModule::new(name, first, is_package));
        }
        found.into_values().collect()
    }

    /// 소스를 포함하지만 패키지 마커가 없는 루트 아래 디렉토리들 (정렬됨)
    pub fn directories_missing_marker(&self) -> Vec<PathBuf> {
        let mut dirs: BTreeSet<PathBuf> = BTreeSet::new();
        for module in &self.modules {
            let mut parent = module.path.parent();
            while let Some(dir) = parent {
                if dir.as_os_str().is_empty() {
                    break;
                }
                dirs.insert(dir.to_path_buf());
                parent = dir.parent();
            }
        }
        dirs.into_iter()
            .filter(|dir| !self.has_marker(dir))
            .collect()
    }

    pub fn has_marker(&self, dir: &Path) -> bool {
        self.absolute(dir).join(&self.layout.package_marker).is_file()
    }

    /// 같은 식별자를 가진 모듈들 (예: `a.py` 와 `a/__init__.py`)
    pub fn duplicate_identifiers(&self) -> Vec<(String, Vec<PathBuf>)> {
        let mut by_ident: BTreeMap<&str, Vec<PathBuf>> = BTreeMap::new();
        for module in &self.modules {
            by_ident
                .entry(module.identifier.as_str())
                .or_default()
                .push(module.path.clone());
        }
        by_ident
            .into_iter()
            .filter(|(_, paths)| paths.len() > 1)
            .map(|(ident, paths)| (ident.to_string(), paths))
            .collect()
    }

    /// 점 이름이 이 스냅샷(또는 검색 경로)에서 모듈로 해석되는지
    ///
    /// 네임스페이스 디렉토리도 허용하므로 `a.b`는 `a.b.c`가 있으면 해석됩니다.
    pub fn resolves(&self, qualified: &str, search_path: &SearchPath) -> bool {
        let nested = format!("{}.", qualified);
        let in_snapshot = self
            .modules
            .iter()
            .any(|m| m.identifier == qualified || m.identifier.starts_with(&nested));
        in_snapshot || search_path.resolves(qualified, &self.layout)
    }
}
