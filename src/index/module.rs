use serde::Serialize;
use std::path::{Component, Path, PathBuf};

/// 소스 트리 구성 규칙 (패키지 마커, 확장자)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLayout {
    pub package_marker: String,
    pub extension: String,
}

impl SourceLayout {
    pub fn new(package_marker: impl Into<String>, extension: impl Into<String>) -> Self {
        Self {
            package_marker: package_marker.into(),
            extension: extension.into(),
        }
    }

    pub fn is_source(&self, path: &Path) -> bool {
        path.extension().and_then(|e| e.to_str()) == Some(self.extension.as_str())
    }
}

impl Default for SourceLayout {
    fn default() -> Self {
        Self::new("__init__.py", "py")
    }
}

/// 소스 파일 하나 (루트 기준 경로 + 점으로 구분된 식별자)
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Module {
    /// 모듈 식별자 (예: "pkg.utils")
    pub identifier: String,
    /// 루트 기준 상대 경로
    pub path: PathBuf,
}

impl Module {
    /// 루트 기준 경로에서 모듈 생성
    ///
    /// `pkg/__init__.py`는 `pkg`로 매핑됩니다. 루트의 패키지 마커는 모듈이 아닙니다.
    pub fn from_relative(path: &Path, layout: &SourceLayout) -> Option<Self> {
        if !layout.is_source(path) {
            return None;
        }

        let mut segments: Vec<String> = Vec::new();
        for component in path.components() {
            match component {
                Component::Normal(part) => segments.push(part.to_str()?.to_string()),
                Component::CurDir => {}
                _ => return None,
            }
        }

        let file_name = segments.pop()?;
        if file_name != layout.package_marker {
            let suffix = format!(".{}", layout.extension);
            segments.push(file_name.strip_suffix(&suffix)?.to_string());
        }

        if segments.is_empty() {
            return None;
        }

        Some(Self {
            identifier: segments.join("."),
            path: path.to_path_buf(),
        })
    }

    /// 최상위 이름 (식별자의 첫 세그먼트)
    pub fn top_level(&self) -> &str {
        self.identifier
            .split('.')
            .next()
            .unwrap_or(&self.identifier)
    }

    /// 모듈 파일이 루트 바로 아래에 있는지
    pub fn is_root_file(&self) -> bool {
        self.path.components().count() == 1
    }

    /// 슬래시 구분 상대 경로 (glob 매칭용)
    pub fn path_str(&self) -> String {
        to_slash(&self.path)
    }
}

pub fn to_slash(path: &Path) -> String {
    path.components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().to_string()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// 최상위 모듈: 루트의 파일 하나 또는 루트 바로 아래 디렉토리 하나
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct TopLevelModule {
    pub name: String,
    /// 루트 기준 경로 (`utils.py` 또는 `utils`)
    pub path: PathBuf,
    pub is_package: bool,
}

impl TopLevelModule {
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>, is_package: bool) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            is_package,
        }
    }
}
