use thiserror::Error;

#[derive(Error, Debug)]
pub enum PrefixError {
    /// 백엔드가 안전한 변경 집합을 계산하지 못함
    #[error("Planning failed: {0}")]
    Planning(String),

    /// 변경 집합을 디스크에 적용하는 중 실패
    #[error("Apply failed: {0}")]
    Apply(String),

    /// 적용은 성공했지만 이후 검증에서 트리 불일치 발견
    #[error("Validation failed: {0}")]
    Validation(String),

    /// 백엔드 결함을 나타내는 사후 조건 위반
    #[error("Invariant breach: {0}")]
    InvariantBreach(String),

    #[error("User quit with {remaining} transformation(s) left unapplied")]
    UserAbort { remaining: usize },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid qualified name: {0}")]
    InvalidName(String),

    #[error("Failed to parse {path}: {message}")]
    Parse { path: String, message: String },

    #[error("Invalid glob pattern '{pattern}': {message}")]
    Glob { pattern: String, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization/deserialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// 리포터가 실패를 분류할 때 쓰는 에러 종류
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum ErrorKind {
    #[serde(rename = "PlanningError")]
    Planning,
    #[serde(rename = "ApplyError")]
    Apply,
    #[serde(rename = "ValidationError")]
    Validation,
    UserAbort,
    #[serde(rename = "Error")]
    Other,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Planning => "PlanningError",
            ErrorKind::Apply => "ApplyError",
            ErrorKind::Validation => "ValidationError",
            ErrorKind::UserAbort => "UserAbort",
            ErrorKind::Other => "Error",
        }
    }
}

impl PrefixError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PrefixError::Planning(_)
            | PrefixError::InvalidName(_)
            | PrefixError::Parse { .. } => ErrorKind::Planning,
            PrefixError::Apply(_) | PrefixError::Io(_) => ErrorKind::Apply,
            PrefixError::Validation(_) | PrefixError::InvariantBreach(_) => ErrorKind::Validation,
            PrefixError::UserAbort { .. } => ErrorKind::UserAbort,
            PrefixError::Config(_) | PrefixError::Glob { .. } | PrefixError::Json(_) => {
                ErrorKind::Other
            }
        }
    }

    /// `--verbose` 출력용 상세 메시지 (source 체인 포함)
    pub fn detail(&self) -> String {
        let mut out = format!("{:?}", self);
        let mut source = std::error::Error::source(self);
        while let Some(err) = source {
            out.push_str(&format!("\n  caused by: {}", err));
            source = err.source();
        }
        out
    }
}

pub type Result<T> = std::result::Result<T, PrefixError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        assert_eq!(PrefixError::Planning("x".into()).kind(), ErrorKind::Planning);
        assert_eq!(PrefixError::Apply("x".into()).kind(), ErrorKind::Apply);
        assert_eq!(
            PrefixError::InvariantBreach("x".into()).kind(),
            ErrorKind::Validation
        );
        assert_eq!(
            PrefixError::UserAbort { remaining: 2 }.kind(),
            ErrorKind::UserAbort
        );
    }

    #[test]
    fn test_io_error_is_apply_error() {
        let err: PrefixError = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied").into();
        assert_eq!(err.kind(), ErrorKind::Apply);
        assert!(err.to_string().contains("denied"));
    }

    #[test]
    fn test_detail_includes_debug_form() {
        let err = PrefixError::Validation("dangling import".into());
        assert!(err.detail().contains("Validation"));
        assert!(err.detail().contains("dangling import"));
    }
}
