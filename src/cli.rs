use clap::Parser;
use prefix_modules::applier::FailureMode;
use prefix_modules::planner::RenameRequest;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "prefix-modules")]
#[command(version)]
#[command(about = "Move top-level Python modules under a package prefix and rewrite their imports", long_about = None)]
pub struct Cli {
    /// 재구성할 코드베이스 루트
    pub repo_root: PathBuf,

    /// 모듈을 옮길 대상 패키지 (예: "app" 또는 "org.app")
    #[arg(long)]
    pub prefix: String,

    /// GLOB에 맞는 파일에서만 OLD를 NEW로 이름 변경 (반복 가능)
    #[arg(long, num_args = 3, value_names = ["OLD", "NEW", "GLOB"], action = clap::ArgAction::Append)]
    pub rename_external: Vec<String>,

    /// 탐색과 모든 변환에서 제외할 경로 패턴 (반복 가능)
    #[arg(short = 'e', long = "exclude-glob", value_name = "GLOB")]
    pub exclude_globs: Vec<String>,

    /// 실패 처리 모드. 미지정시 설정 파일의 mode 사용
    #[arg(long, value_enum)]
    pub mode: Option<FailureMode>,

    /// 실패마다 전체 에러 상세 출력
    #[arg(short = 'v', long, conflicts_with = "quiet")]
    pub verbose: bool,

    /// 아무것도 출력하지 않음 (종료 코드만)
    #[arg(short = 'q', long)]
    pub quiet: bool,

    /// 에러를 결과로 모으지 않고 즉시 종료 (디버깅용)
    #[arg(long)]
    pub dont_catch: bool,

    /// 검증 시 import를 해석할 추가 루트 (반복 가능)
    #[arg(long = "search-path", value_name = "DIR")]
    pub search_path: Vec<PathBuf>,

    /// 결과를 JSON으로 stdout에 출력
    #[arg(long)]
    pub json: bool,

    /// 설정 파일 경로
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

impl Cli {
    pub fn renames(&self) -> Vec<RenameRequest> {
        RenameRequest::from_flat(&self.rename_external)
    }
}
