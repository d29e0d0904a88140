use crate::error::Result;
use crate::index::{ProjectState, TopLevelModule};
use crate::index::module::to_slash;
use crate::refactor::python::QualifiedName;
use serde::Serialize;
use std::collections::BTreeSet;
use std::path::PathBuf;

/// 계획된 구조 변경 한 단위
///
/// 플래너가 만들고 적용기가 정확히 한 번 소비합니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Transformation {
    /// 외부 모듈 이름 변경 (glob 범위로 제한)
    RenameExternal {
        old_name: String,
        new_name: String,
        glob_scope: String,
    },
    /// 디렉토리에 패키지 마커 생성
    ConvertToPackage { directory: PathBuf },
    /// 최상위 모듈을 접두 패키지 아래로 이동
    MoveModule {
        module: TopLevelModule,
        destination_package: String,
    },
}

impl Transformation {
    /// 계획 실패 시에도 쓸 수 있는 사람이 읽는 설명
    pub fn label(&self) -> String {
        match self {
            Transformation::RenameExternal {
                old_name,
                new_name,
                glob_scope,
            } => format!(
                "Rename module <{}> to <{}> in files matching {}",
                old_name, new_name, glob_scope
            ),
            Transformation::ConvertToPackage { directory } => {
                format!("Convert directory {} to a package", to_slash(directory))
            }
            Transformation::MoveModule {
                module,
                destination_package,
            } => format!(
                "Move module <{}> to <{}.{}>",
                module.name, destination_package, module.name
            ),
        }
    }

    /// 이 변환이 바꾸는 모듈 이름 (이전, 이후)
    pub fn renamed_module(&self) -> Option<(String, String)> {
        match self {
            Transformation::RenameExternal {
                old_name, new_name, ..
            } => Some((old_name.clone(), new_name.clone())),
            Transformation::ConvertToPackage { .. } => None,
            Transformation::MoveModule {
                module,
                destination_package,
            } => Some((
                module.name.clone(),
                format!("{}.{}", destination_package, module.name),
            )),
        }
    }
}

/// `--rename-external OLD NEW GLOB` 한 건
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenameRequest {
    pub old_name: String,
    pub new_name: String,
    pub glob: String,
}

impl RenameRequest {
    pub fn new(old_name: &str, new_name: &str, glob: &str) -> Self {
        Self {
            old_name: old_name.to_string(),
            new_name: new_name.to_string(),
            glob: glob.to_string(),
        }
    }

    /// CLI에서 받은 평평한 값 목록을 (OLD, NEW, GLOB) 묶음으로 변환
    pub fn from_flat(values: &[String]) -> Vec<Self> {
        values
            .chunks_exact(3)
            .map(|c| Self::new(&c[0], &c[1], &c[2]))
            .collect()
    }
}

/// 변환 계획 생성기
///
/// 순서는 고정입니다: 외부 이름 변경(입력 순) → 패키지 변환(경로 순) → 모듈 이동(이름 순).
pub struct TransformationPlanner;

impl TransformationPlanner {
    pub fn plan(
        state: &ProjectState,
        prefix: &str,
        renames: &[RenameRequest],
    ) -> Result<Vec<Transformation>> {
        let prefix_name = QualifiedName::parse(prefix)?;
        let mut plan = Vec::new();

        for rename in renames {
            plan.push(Transformation::RenameExternal {
                old_name: rename.old_name.clone(),
                new_name: rename.new_name.clone(),
                glob_scope: rename.glob.clone(),
            });
        }

        let mut directories: BTreeSet<PathBuf> =
            state.directories_missing_marker().into_iter().collect();
        let mut package_dir = PathBuf::new();
        for segment in prefix_name.segments() {
            package_dir.push(segment);
            if !state.has_marker(&package_dir) {
                directories.insert(package_dir.clone());
            }
        }
        for directory in directories {
            plan.push(Transformation::ConvertToPackage { directory });
        }

        for module in Self::modules_to_move(state, &prefix_name) {
            plan.push(Transformation::MoveModule {
                module,
                destination_package: prefix_name.to_string(),
            });
        }

        Ok(plan)
    }

    /// 접두 패키지 밖의 최상위 모듈들 (제외 패턴에 걸린 것은 빠짐)
    fn modules_to_move(state: &ProjectState, prefix: &QualifiedName) -> Vec<TopLevelModule> {
        state
            .top_level_modules()
            .into_iter()
            .filter(|m| m.name != prefix.first())
            .filter(|m| !state.is_excluded(&m.path))
            .collect()
    }
}
