use crate::error::{PrefixError, Result};
use crate::refactor::ChangeSet;
use std::collections::VecDeque;

/// 적용 전 확인 응답
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Apply,
    Skip,
    Quit,
}

/// 적용 실패 후 응답
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorDecision {
    Retry,
    Verbose,
    Next,
    Quit,
}

/// interactive 모드에서 결정을 내리는 쪽
///
/// 터미널 구현은 `ui::prompt`에 있고, 테스트에서는 [`ScriptedOperator`]를 씁니다.
pub trait Operator {
    /// 변경 집합을 보여주고 적용 여부를 묻기
    fn confirm(&mut self, changes: &ChangeSet) -> Result<Decision>;

    /// 실패한 변환에 대해 다음 행동 묻기
    fn on_error(&mut self, description: &str, error: &PrefixError) -> Result<ErrorDecision>;

    /// 상세 에러 출력
    fn show_detail(&mut self, detail: &str);
}

/// 미리 정해진 응답을 순서대로 돌려주는 operator
///
/// 응답이 바닥나면 `Quit`을 돌려줍니다.
#[derive(Debug, Default)]
pub struct ScriptedOperator {
    decisions: VecDeque<Decision>,
    error_decisions: VecDeque<ErrorDecision>,
    /// 확인 요청을 받은 변경 집합 설명
    pub confirmed: Vec<String>,
    /// `show_detail`로 받은 내용
    pub details: Vec<String>,
}

impl ScriptedOperator {
    pub fn new(decisions: &[Decision], error_decisions: &[ErrorDecision]) -> Self {
        Self {
            decisions: decisions.iter().copied().collect(),
            error_decisions: error_decisions.iter().copied().collect(),
            confirmed: Vec::new(),
            details: Vec::new(),
        }
    }
}

impl Operator for ScriptedOperator {
    fn confirm(&mut self, changes: &ChangeSet) -> Result<Decision> {
        self.confirmed.push(changes.description().to_string());
        Ok(self.decisions.pop_front().unwrap_or(Decision::Quit))
    }

    fn on_error(&mut self, _description: &str, _error: &PrefixError) -> Result<ErrorDecision> {
        Ok(self.error_decisions.pop_front().unwrap_or(ErrorDecision::Quit))
    }

    fn show_detail(&mut self, detail: &str) {
        self.details.push(detail.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scripted_operator_replays_then_quits() {
        let mut op = ScriptedOperator::new(&[Decision::Skip], &[ErrorDecision::Retry]);
        let changes = ChangeSet::new("Move module <a> to <app.a>");

        assert_eq!(op.confirm(&changes).unwrap(), Decision::Skip);
        assert_eq!(op.confirm(&changes).unwrap(), Decision::Quit);
        assert_eq!(op.confirmed.len(), 2);

        let err = PrefixError::Apply("x".into());
        assert_eq!(op.on_error("a", &err).unwrap(), ErrorDecision::Retry);
        assert_eq!(op.on_error("a", &err).unwrap(), ErrorDecision::Quit);
    }
}
