mod stopwatch;

use std::io::IsTerminal;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use miette::{Context, IntoDiagnostic, Result};
use tracing::{debug, info, Level};

use todolens_core::{LensConfig, OutputFormat};
use todolens_history::mining::GitRepository;
use todolens_history::stats::RepoSummary;
use todolens_history::walker::{walk_with_progress, WalkOptions};
use todolens_report::aggregate::{aggregate, SampleRegistry};
use todolens_report::format::{render_aggregation, render_runs, RunReport};
use todolens_report::records::write_run;

use crate::stopwatch::Stopwatch;

const CONFIG_FILE: &str = ".todolens.toml";

#[derive(Parser)]
#[command(
    name = "todolens",
    version,
    about = "Mine git history for TODO/FIXME markers and measure how long they live",
    long_about = "todolens walks the commit history of one or more repositories, tracks every\n\
                   TODO/FIXME line from the commit that added it to the commit that removed it,\n\
                   and writes per-TODO and per-repository statistics as CSV.\n\n\
                   Examples:\n  \
                     todolens mine rust-lang/rust-clippy         Clone (if needed) and mine a GitHub repo\n  \
                     todolens mine owner/repo --max-count 500    Only walk the newest 500 commits\n  \
                     todolens aggregate --samples samples.csv    Combine finished runs by sample\n  \
                     todolens init                               Write a default .todolens.toml"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Path to configuration file (default: .todolens.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Output format
    #[arg(
        long,
        global = true,
        default_value = "text",
        long_help = "Output format for command results.\n\n\
                       Formats:\n  \
                         text      Human-readable summaries (default)\n  \
                         json      Machine-readable JSON with camelCase keys\n  \
                         markdown  GitHub-flavored Markdown"
    )]
    format: OutputFormat,

    /// Enable verbose output
    #[arg(long, short, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Walk repository history and write TODO lifecycle data
    #[command(long_about = "Walk repository history and write TODO lifecycle data.\n\n\
        Each repository handle is looked up under the base directory and cloned from\n\
        the clone prefix when missing. For every handle three files are written to the\n\
        base directory: <run>_<handle>__todos.csv, __summary.csv and __commithashes.txt.\n\n\
        Examples:\n  todolens mine owner/repo\n  todolens mine a/b c/d --base-dir data --lines-after 3")]
    Mine {
        /// Repository handles, e.g. owner/repo
        #[arg(required = true)]
        repos: Vec<String>,

        /// Directory holding checkouts and run output (default: .)
        #[arg(long)]
        base_dir: Option<PathBuf>,

        /// Maximum commits to walk per repository, -1 for all (default: -1)
        #[arg(long, allow_negative_numbers = true)]
        max_count: Option<i64>,

        /// Lines after a TODO to include in its context (default: 1)
        #[arg(long)]
        lines_after: Option<usize>,

        /// Prefix for output file names (default: run)
        #[arg(long)]
        run_handle: Option<String>,

        /// Remote prefix to clone missing repositories from (default: https://github.com/)
        #[arg(long)]
        clone_from: Option<String>,
    },
    /// Combine finished runs across a sample registry
    #[command(long_about = "Combine finished runs across a sample registry.\n\n\
        The registry is a ';'-separated file with 'repo' and 'Sample' columns. Each\n\
        registered repository needs a *_todos.csv and a *_cloc.csv in the data directory.\n\
        Violations are reported on stderr and do not stop processing.\n\n\
        Examples:\n  todolens aggregate\n  todolens aggregate --samples study.csv --data-dir data\n  \
        todolens aggregate --drop owner/broken")]
    Aggregate {
        /// Sample registry (default: samples.csv)
        #[arg(long)]
        samples: Option<PathBuf>,

        /// Directory holding run output (default: the run base directory)
        #[arg(long)]
        data_dir: Option<PathBuf>,

        /// Delete a repository's data files and aggregate without it (repeatable)
        #[arg(long = "drop", value_name = "REPO")]
        drop_repos: Vec<String>,
    },
    /// Create a default .todolens.toml configuration file
    Init,
}

const DEFAULT_CONFIG: &str = r#"# todolens configuration

[walk]
# max_commits = -1
# lines_after = 1
# token_pattern = "(?i)TODO|FIXME"

[run]
# base_dir = "."
# run_handle = "run"
# clone_from = "https://github.com/"

[aggregate]
# sample_list = "samples.csv"
"#;

fn load_config(path: Option<&Path>) -> Result<LensConfig> {
    match path {
        Some(path) => LensConfig::from_file(path)
            .wrap_err_with(|| format!("failed to load config from {}", path.display())),
        None => {
            let default_path = Path::new(CONFIG_FILE);
            if default_path.exists() {
                Ok(LensConfig::from_file(default_path)?)
            } else {
                Ok(LensConfig::default())
            }
        }
    }
}

fn spinner(message: String) -> Result<Option<indicatif::ProgressBar>> {
    if !std::io::stderr().is_terminal() {
        return Ok(None);
    }
    let pb = indicatif::ProgressBar::new_spinner();
    pb.set_style(
        indicatif::ProgressStyle::with_template("{spinner:.cyan} {msg} ({elapsed})")
            .into_diagnostic()?,
    );
    pb.set_message(message);
    pb.enable_steady_tick(std::time::Duration::from_millis(120));
    Ok(Some(pb))
}

fn mine(config: LensConfig, repos: &[String], format: OutputFormat, verbose: bool) -> Result<()> {
    let options = WalkOptions::from_config(&config.walk)?;
    let run = &config.run;
    if verbose {
        eprintln!(
            "base dir: {}, run handle: {}, lines after: {}",
            run.base_dir.display(),
            run.run_handle,
            options.lines_after
        );
    }

    let mut stopwatch = Stopwatch::new();
    let mut reports = Vec::with_capacity(repos.len());

    for handle in repos {
        stopwatch.reset();
        let local = run.local_dir(handle);
        let source = GitRepository::open_or_clone(&run.remote_url(handle), &local)
            .wrap_err_with(|| format!("failed to prepare {handle}"))?;
        stopwatch.lap("open repository");

        let pb = spinner(format!("Walking {handle}..."))?;
        let outcome = walk_with_progress(&source, &options, |commits| {
            if let Some(pb) = &pb {
                pb.set_message(format!("Walking {handle}: {commits} commits"));
            }
        })
        .inspect_err(|_e| {
            if let Some(pb) = &pb {
                pb.finish_with_message("Failed");
            }
        })?;
        if let Some(pb) = pb {
            pb.finish_with_message(format!("{handle}: {} commits", outcome.run.commit_count));
        }
        stopwatch.lap("analyze commits");

        let files = write_run(run, handle, &outcome)?;
        stopwatch.lap("write run output");
        debug!(repo = %handle, path = %files.todos.display(), "run output written");
        if verbose {
            eprintln!("{handle}: wrote {}", files.todos.display());
        }

        reports.push(RunReport {
            repo: handle.clone(),
            todos: outcome.todos.len(),
            summary: RepoSummary::from_run(&outcome.run),
        });
    }

    println!("{}", render_runs(&reports, format)?);
    eprintln!("Stopwatch lap stats:\n{}", stopwatch.summary());
    Ok(())
}

fn main() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .build(),
        )
    }))
    .into_diagnostic()?;
    human_panic::setup_panic!();

    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_max_level(if cli.verbose { Level::DEBUG } else { Level::INFO })
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let config = load_config(cli.config.as_deref())?;

    if cli.verbose {
        eprintln!("format: {}", cli.format);
    }

    match cli.command {
        Command::Mine {
            repos,
            base_dir,
            max_count,
            lines_after,
            run_handle,
            clone_from,
        } => {
            let mut config = config;
            if let Some(base_dir) = base_dir {
                config.run.base_dir = base_dir;
            }
            if let Some(run_handle) = run_handle {
                config.run.run_handle = run_handle;
            }
            if let Some(clone_from) = clone_from {
                config.run.clone_from = clone_from;
            }
            if let Some(max_count) = max_count {
                config.walk.max_commits = max_count;
            }
            if let Some(lines_after) = lines_after {
                config.walk.lines_after = lines_after;
            }
            mine(config, &repos, cli.format, cli.verbose)?;
        }
        Command::Aggregate {
            samples,
            data_dir,
            drop_repos,
        } => {
            let samples = samples.unwrap_or_else(|| config.aggregate.sample_list.clone());
            let data_dir = data_dir.unwrap_or_else(|| config.run.base_dir.clone());

            let registry = SampleRegistry::from_path(&samples)
                .wrap_err_with(|| format!("failed to read sample registry {}", samples.display()))?;
            let mut aggregation = aggregate(&registry, &data_dir)?;
            if !drop_repos.is_empty() {
                let removed = aggregation.remove_samples(&drop_repos)?;
                info!(removed, "dropped samples, refreshing aggregation");
                aggregation = aggregate(&registry, &data_dir)?;
            }

            let violations = aggregation.violation_report();
            if !violations.is_empty() {
                eprintln!("{violations}");
            }
            println!("{}", render_aggregation(&aggregation, cli.format)?);
        }
        Command::Init => {
            let path = Path::new(CONFIG_FILE);
            if path.exists() {
                miette::bail!("{CONFIG_FILE} already exists");
            }
            std::fs::write(path, DEFAULT_CONFIG).into_diagnostic()?;
            println!("Created {CONFIG_FILE} with default configuration");
        }
    }

    Ok(())
}
