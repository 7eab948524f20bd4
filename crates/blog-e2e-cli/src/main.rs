//! blog-e2e: run the blog's end-to-end scenarios
//!
//! ## Usage
//!
//! ```bash
//! blog-e2e run                          # whole catalog against Chromium
//! blog-e2e run --fixture --suite smoke  # in-process fixture driver
//! blog-e2e list                         # scenario ids
//! blog-e2e config                       # effective configuration
//! ```

use blog_e2e::{ReportFormat, RunReport};
use blog_e2e_cli::{
    effective_config, execute_run, list_ids, Cli, CliConfig, CliError, CliResult, ColorChoice,
    Commands, ProgressReporter, RunArgs, Verbosity,
};
use clap::Parser;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> CliResult<()> {
    let cli = Cli::parse();
    let config = build_config(&cli);
    init_tracing(config.verbosity);

    match cli.command {
        Commands::Run(args) => run_scenarios(&config, &args),
        Commands::List(args) => {
            for id in list_ids(&args)? {
                println!("{id}");
            }
            Ok(())
        }
        Commands::Config(args) => {
            print!("{}", effective_config(&args)?);
            Ok(())
        }
    }
}

fn build_config(cli: &Cli) -> CliConfig {
    let verbosity = Verbosity::from_flags(cli.quiet, cli.verbose);
    let color: ColorChoice = cli.color.into();
    CliConfig::new().with_verbosity(verbosity).with_color(color)
}

fn init_tracing(verbosity: Verbosity) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(verbosity.log_filter()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(verbosity.is_debug())
        .init();
}

fn run_scenarios(config: &CliConfig, args: &RunArgs) -> CliResult<()> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    let report = runtime.block_on(execute_run(config, args))?;
    emit_report(config, args, &report)?;

    if report.success() {
        Ok(())
    } else {
        Err(CliError::test_execution(format!(
            "{} of {} scenarios failed",
            report.failed(),
            report.outcomes.len()
        )))
    }
}

fn emit_report(config: &CliConfig, args: &RunArgs, report: &RunReport) -> CliResult<()> {
    let reporter = ProgressReporter::new(config.color.should_color(), config.verbosity.is_quiet());
    let format = ReportFormat::from(args.format);

    if let Some(path) = &args.output {
        std::fs::write(path, report.render(format)?)?;
        reporter.report(report);
        reporter.success(&format!("Report written to {}", path.display()));
        return Ok(());
    }

    match format {
        ReportFormat::Json => println!("{}", report.render(format)?),
        ReportFormat::Text => {
            reporter.header("Results");
            reporter.report(report);
        }
    }
    Ok(())
}
