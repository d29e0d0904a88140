use crate::applier::FailureMode;
use crate::error::{PrefixError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// 저장소 단위 설정 파일 이름
pub const REPO_CONFIG_FILE: &str = ".prefix-modules.toml";

/// prefix-modules 설정
///
/// 저장소 루트의 `.prefix-modules.toml` 또는
/// 사용자 설정 디렉토리의 `prefix-modules/config.toml`에서 읽습니다.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// 실패 처리 모드 (first-error, keep-going, interactive)
    #[serde(default)]
    pub mode: FailureMode,

    /// 탐색과 모든 변환에서 제외할 경로 패턴
    #[serde(default)]
    pub exclude_globs: Vec<String>,

    /// 패키지 마커 파일 이름
    #[serde(default = "default_package_marker")]
    pub package_marker: String,

    /// 소스 파일 확장자 (점 제외)
    #[serde(default = "default_source_extension")]
    pub source_extension: String,

    /// 검증 시 import를 해석할 추가 루트
    #[serde(default)]
    pub search_path: Vec<PathBuf>,
}

fn default_package_marker() -> String {
    "__init__.py".to_string()
}

fn default_source_extension() -> String {
    "py".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            mode: FailureMode::default(),
            exclude_globs: Vec::new(),
            package_marker: default_package_marker(),
            source_extension: default_source_extension(),
            search_path: Vec::new(),
        }
    }
}

impl Config {
    /// 사용자 전역 설정 파일 경로
    fn user_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("prefix-modules").join("config.toml"))
    }

    /// 지정된 파일에서 설정 로드
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        toml::from_str(&content)
            .map_err(|e| PrefixError::Config(format!("{}: {}", path.display(), e)))
    }

    /// 설정 탐색: 명시 경로 → 저장소 설정 → 사용자 설정 → 기본값
    pub fn discover(explicit: Option<&Path>, repo_root: &Path) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load_from(path);
        }

        let repo_config = repo_root.join(REPO_CONFIG_FILE);
        if repo_config.exists() {
            return Self::load_from(&repo_config);
        }

        match Self::user_config_path() {
            Some(path) if path.exists() => Self::load_from(&path),
            _ => Ok(Self::default()),
        }
    }

    /// CLI 값을 설정 위에 덮어쓰기
    pub fn merge_cli(
        mut self,
        mode: Option<FailureMode>,
        exclude_globs: &[String],
        search_path: &[PathBuf],
    ) -> Self {
        if let Some(mode) = mode {
            self.mode = mode;
        }
        self.exclude_globs.extend(exclude_globs.iter().cloned());
        self.search_path.extend(search_path.iter().cloned());
        self
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| PrefixError::Config(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.mode, FailureMode::FirstError);
        assert!(config.exclude_globs.is_empty());
        assert_eq!(config.package_marker, "__init__.py");
        assert_eq!(config.source_extension, "py");
    }

    #[test]
    fn test_config_deserialization() {
        let toml_str = r#"
            mode = "keep-going"
            exclude_globs = ["tests/**", "setup.py"]
        "#;

        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.mode, FailureMode::KeepGoing);
        assert_eq!(config.exclude_globs.len(), 2);
        assert_eq!(config.package_marker, "__init__.py");
    }

    #[test]
    fn test_config_serialization() {
        let toml_string = Config::default().to_toml().unwrap();
        assert!(toml_string.contains("mode = \"first-error\""));
        assert!(toml_string.contains("package_marker"));
    }

    #[test]
    fn test_discover_prefers_repo_config() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(REPO_CONFIG_FILE), "mode = \"interactive\"\n").unwrap();

        let config = Config::discover(None, dir.path()).unwrap();
        assert_eq!(config.mode, FailureMode::Interactive);
    }

    #[test]
    fn test_invalid_config_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        fs::write(&path, "mode = \"sometimes\"\n").unwrap();

        let err = Config::discover(Some(&path), dir.path()).unwrap_err();
        assert!(matches!(err, PrefixError::Config(_)));
    }

    #[test]
    fn test_merge_cli_overrides_mode_and_appends_globs() {
        let config = Config {
            exclude_globs: vec!["a/**".to_string()],
            ..Config::default()
        };
        let merged = config.merge_cli(
            Some(FailureMode::KeepGoing),
            &["b/**".to_string()],
            &[PathBuf::from("/opt/lib")],
        );

        assert_eq!(merged.mode, FailureMode::KeepGoing);
        assert_eq!(merged.exclude_globs, vec!["a/**", "b/**"]);
        assert_eq!(merged.search_path, vec![PathBuf::from("/opt/lib")]);
    }
}
