use crate::error::{PrefixError, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;

static QUALIFIED_NAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*(\.[A-Za-z_][A-Za-z0-9_]*)*$").unwrap()
});

const KEYWORDS: &[&str] = &[
    "False", "None", "True", "and", "as", "assert", "async", "await", "break", "class",
    "continue", "def", "del", "elif", "else", "except", "finally", "for", "from", "global", "if",
    "import", "in", "is", "lambda", "nonlocal", "not", "or", "pass", "raise", "return", "try",
    "while", "with", "yield",
];

/// 점으로 구분된 모듈 이름 (예: `app.utils`)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QualifiedName {
    segments: Vec<String>,
}

impl QualifiedName {
    pub fn parse(name: &str) -> Result<Self> {
        if !QUALIFIED_NAME.is_match(name) {
            return Err(PrefixError::InvalidName(name.to_string()));
        }
        let segments: Vec<String> = name.split('.').map(str::to_string).collect();
        if let Some(keyword) = segments.iter().find(|s| KEYWORDS.contains(&s.as_str())) {
            return Err(PrefixError::InvalidName(format!(
                "{} ('{}' is a keyword)",
                name, keyword
            )));
        }
        Ok(Self { segments })
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn first(&self) -> &str {
        &self.segments[0]
    }

    pub fn last(&self) -> &str {
        &self.segments[self.segments.len() - 1]
    }

    /// 마지막 세그먼트를 뺀 부모 이름 (단일 세그먼트면 None)
    pub fn parent(&self) -> Option<String> {
        if self.segments.len() < 2 {
            return None;
        }
        Some(self.segments[..self.segments.len() - 1].join("."))
    }

    pub fn is_prefix_of(&self, other: &[String]) -> bool {
        other.len() >= self.segments.len() && other[..self.segments.len()] == self.segments[..]
    }

    /// `other`의 앞부분(self)을 `replacement`로 바꾼 이름
    pub fn replace_prefix(&self, other: &[String], replacement: &QualifiedName) -> String {
        let mut out = replacement.segments.clone();
        out.extend(other[self.segments.len()..].iter().cloned());
        out.join(".")
    }

    pub fn child(&self, name: &str) -> Result<Self> {
        Self::parse(&format!("{}.{}", self, name))
    }
}

impl fmt::Display for QualifiedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.segments.join("."))
    }
}
