use anyhow::{Context, Result};
use clap::Parser;
use colored::*;
use prefix_modules::commands::{run_import_rewrite, RewriteOptions};
use prefix_modules::logging;
use prefix_modules::report::Verbosity;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "python-import-rewrite")]
#[command(version)]
#[command(about = "Rename imported Python modules across a source tree", long_about = None)]
struct Cli {
    /// 소스 트리 경로
    #[arg(long)]
    path: PathBuf,

    /// OLD 모듈 이름을 NEW로 변경 (반복 가능, 입력 순서대로 적용)
    #[arg(long, num_args = 2, value_names = ["OLD", "NEW"], action = clap::ArgAction::Append, required = true)]
    replace: Vec<String>,

    /// 제외할 경로 패턴 (반복 가능)
    #[arg(short = 'e', long = "exclude-glob", value_name = "GLOB")]
    exclude_globs: Vec<String>,

    /// 실패마다 전체 에러 상세 출력
    #[arg(short = 'v', long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let verbosity = Verbosity::from_flags(cli.verbose, false);
    logging::init(verbosity);

    let replacements: Vec<(String, String)> = cli
        .replace
        .chunks_exact(2)
        .map(|pair| (pair[0].clone(), pair[1].clone()))
        .collect();

    let report = run_import_rewrite(&RewriteOptions {
        path: cli.path.clone(),
        replacements,
        exclude_globs: cli.exclude_globs.clone(),
    })
    .with_context(|| format!("Failed to rewrite imports under {}", cli.path.display()))?;

    eprintln!(
        "{} {} rename(s) applied, {} failed",
        "[OK]".green(),
        report.successes.len(),
        report.failures.len()
    );
    let text = report.render_text(verbosity, false);
    if !text.is_empty() {
        println!("{}", text);
    }

    std::process::exit(report.exit_code());
}
