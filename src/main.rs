use anyhow::{Context, Result};
use clap::Parser;
use colored::*;
use prefix_modules::commands::{run_prefix, PrefixOptions};
use prefix_modules::config::Config;
use prefix_modules::report::Verbosity;
use prefix_modules::{applier::FailureMode, logging};
use tracing::debug;

mod cli;

use cli::Cli;

fn main() -> Result<()> {
    let cli = Cli::parse();
    let verbosity = Verbosity::from_flags(cli.verbose, cli.quiet);
    logging::init(verbosity);

    let config = Config::discover(cli.config.as_deref(), &cli.repo_root)
        .context("Failed to load configuration")?
        .merge_cli(cli.mode, &cli.exclude_globs, &cli.search_path);
    debug!(config = %config.to_toml()?, "effective configuration");

    let options = PrefixOptions {
        root: cli.repo_root.clone(),
        prefix: cli.prefix.clone(),
        renames: cli.renames(),
        config,
        verbosity,
        catch_errors: !cli.dont_catch,
        machine_output: cli.json,
    };

    let report = match run_prefix(&options) {
        Ok(report) => report,
        Err(e) if cli.dont_catch => return Err(e).context("Transformation failed"),
        Err(e) => {
            if verbosity != Verbosity::Quiet {
                eprintln!("{} {}", "[X]".red(), e);
                if verbosity == Verbosity::Verbose {
                    eprintln!("{}", e.detail().dimmed());
                }
            }
            std::process::exit(1);
        }
    };

    if cli.json {
        println!("{}", report.to_json()?);
    } else {
        let interactive = options.config.mode == FailureMode::Interactive;
        let text = report.render_text(verbosity, interactive);
        if !text.is_empty() {
            println!("{}", text);
        }
    }

    std::process::exit(report.exit_code());
}
