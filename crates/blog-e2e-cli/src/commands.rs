//! CLI command definitions using clap

use blog_e2e::{ReportFormat, RunConfig};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// blog-e2e: end-to-end browser scenarios for Willian Nguyen's blog
#[derive(Parser, Debug)]
#[command(name = "blog-e2e")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (failures and errors only)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Color output (auto, always, never)
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorArg,

    /// Subcommand to run
    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the scenario catalog
    Run(RunArgs),

    /// List scenario ids
    List(ListArgs),

    /// Print the effective configuration as YAML
    Config(ConfigArgs),
}

/// Arguments for the run command
#[derive(Parser, Debug, Default)]
pub struct RunArgs {
    /// Base URL of the blog under test
    #[arg(long, value_name = "URL")]
    pub base_url: Option<String>,

    /// Only run these suites (repeatable; `blog-posts` matches "Blog Posts")
    #[arg(short, long = "suite", value_name = "NAME")]
    pub suites: Vec<String>,

    /// Only run scenarios whose id matches this regex
    #[arg(short, long, value_name = "REGEX")]
    pub grep: Option<String>,

    /// Concurrent scenarios (0 = available parallelism)
    #[arg(short = 'j', long)]
    pub workers: Option<usize>,

    /// Show the browser window
    #[arg(long)]
    pub headed: bool,

    /// Run against the in-process fixture instead of Chromium
    #[arg(long)]
    pub fixture: bool,

    /// Skip remaining scenarios after the first failure
    #[arg(long)]
    pub fail_fast: bool,

    /// Report format
    #[arg(long, default_value = "text")]
    pub format: FormatArg,

    /// Write the report to this file instead of stdout
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Configuration file (defaults to ./blog-e2e.yaml when present)
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

impl RunArgs {
    /// Apply command-line overrides on top of a loaded configuration
    #[must_use]
    pub fn overlay(&self, mut config: RunConfig) -> RunConfig {
        if let Some(url) = &self.base_url {
            config = config.with_base_url(url.clone());
        }
        if let Some(workers) = self.workers {
            config = config.with_workers(workers);
        }
        if self.headed {
            config = config.with_headless(false);
        }
        if self.fail_fast {
            config = config.with_fail_fast(true);
        }
        config
    }
}

/// Arguments for the list command
#[derive(Parser, Debug, Default)]
pub struct ListArgs {
    /// Only list these suites
    #[arg(short, long = "suite", value_name = "NAME")]
    pub suites: Vec<String>,
}

/// Arguments for the config command
#[derive(Parser, Debug, Default)]
pub struct ConfigArgs {
    /// Configuration file (defaults to ./blog-e2e.yaml when present)
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

/// Color argument
#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum ColorArg {
    /// Automatic color detection
    #[default]
    Auto,
    /// Always use colors
    Always,
    /// Never use colors
    Never,
}

impl From<ColorArg> for crate::config::ColorChoice {
    fn from(arg: ColorArg) -> Self {
        match arg {
            ColorArg::Auto => Self::Auto,
            ColorArg::Always => Self::Always,
            ColorArg::Never => Self::Never,
        }
    }
}

/// Report format argument
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FormatArg {
    /// Human-readable text
    #[default]
    Text,
    /// JSON report
    Json,
}

impl From<FormatArg> for ReportFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Text => Self::Text,
            FormatArg::Json => Self::Json,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::config::ColorChoice;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("blog-e2e").chain(args.iter().copied())).unwrap()
    }

    mod parse_tests {
        use super::*;

        #[test]
        fn test_run_defaults() {
            let cli = parse(&["run"]);
            let Commands::Run(args) = cli.command else {
                panic!("expected run");
            };
            assert!(args.suites.is_empty());
            assert!(!args.fixture);
            assert_eq!(args.format, FormatArg::Text);
            assert_eq!(cli.verbose, 0);
        }

        #[test]
        fn test_run_all_flags() {
            let cli = parse(&[
                "run",
                "--base-url",
                "https://blog.example",
                "--suite",
                "smoke",
                "--suite",
                "blog-posts",
                "--grep",
                "title",
                "--workers",
                "2",
                "--headed",
                "--fixture",
                "--fail-fast",
                "--format",
                "json",
                "--output",
                "report.json",
                "--config",
                "ci.yaml",
            ]);
            let Commands::Run(args) = cli.command else {
                panic!("expected run");
            };
            assert_eq!(args.suites, vec!["smoke", "blog-posts"]);
            assert_eq!(args.grep.as_deref(), Some("title"));
            assert_eq!(args.workers, Some(2));
            assert!(args.headed && args.fixture && args.fail_fast);
            assert_eq!(args.format, FormatArg::Json);
            assert_eq!(args.output, Some(PathBuf::from("report.json")));
            assert_eq!(args.config, Some(PathBuf::from("ci.yaml")));
        }

        #[test]
        fn test_global_flags_after_subcommand() {
            let cli = parse(&["list", "-vv", "--color", "never"]);
            assert_eq!(cli.verbose, 2);
            assert_eq!(ColorChoice::from(cli.color), ColorChoice::Never);
        }

        #[test]
        fn test_unknown_format_rejected() {
            let result = Cli::try_parse_from(["blog-e2e", "run", "--format", "tap"]);
            assert!(result.is_err());
        }

        #[test]
        fn test_subcommand_required() {
            assert!(Cli::try_parse_from(["blog-e2e"]).is_err());
        }
    }

    mod overlay_tests {
        use super::*;

        #[test]
        fn test_no_flags_keeps_config() {
            let base = RunConfig::default().with_workers(3);
            assert_eq!(RunArgs::default().overlay(base.clone()), base);
        }

        #[test]
        fn test_flags_override_config() {
            let args = RunArgs {
                base_url: Some("https://blog.example".into()),
                workers: Some(1),
                headed: true,
                fail_fast: true,
                ..RunArgs::default()
            };
            let config = args.overlay(RunConfig::default().with_workers(4));
            assert_eq!(config.base_url, "https://blog.example");
            assert_eq!(config.workers, 1);
            assert!(!config.headless);
            assert!(config.fail_fast);
        }

        #[test]
        fn test_absent_headed_keeps_file_value() {
            let config = RunArgs::default().overlay(RunConfig::default().with_headless(false));
            assert!(!config.headless);
        }
    }

    #[test]
    fn test_format_conversion() {
        assert_eq!(ReportFormat::from(FormatArg::Json), ReportFormat::Json);
        assert_eq!(ReportFormat::from(FormatArg::Text), ReportFormat::Text);
    }
}
