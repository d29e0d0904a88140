use indicatif::{ProgressBar, ProgressStyle};

/// 변환 진행 막대 (non-interactive, non-quiet 실행용)
pub fn create_progress_bar(total: u64) -> ProgressBar {
    let pb = ProgressBar::new(total);
    if let Ok(style) =
        ProgressStyle::default_bar().template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
    {
        pb.set_style(style.progress_chars("█▓▒░ "));
    }
    pb
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_progress_bar() {
        let pb = create_progress_bar(10);
        assert_eq!(pb.length(), Some(10));
        pb.finish_and_clear();
    }
}
