//! CABAS automation CLI
//!
//! Drives the visual login engine against the CAB Service Platform client.
//!
//! Usage:
//!   cabas test                # launch + login once, exit 0/1
//!   cabas interactive         # prompted run (default command)
//!   cabas run                 # downstream pipeline (placeholder)
//!   cabas --config prod.json --verbose test

use std::fs;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use cabas::{Config, Session};

#[derive(Parser)]
#[command(name = "cabas")]
#[command(about = "Visual login automation for the CAB Service Platform client")]
struct Cli {
    /// Path to the JSON configuration file.
    #[arg(long, short, global = true, default_value = "config.json")]
    config: PathBuf,

    /// Log debug detail to stderr regardless of the configured level.
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Launch the client, run one login, print PASS/FAIL and exit 0/1.
    Test,
    /// Confirm interactively, then launch and log in with progress output.
    Interactive,
    /// Run the full monitoring workflow.
    Run,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match Config::load(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{} {e}", "configuration error:".red().bold());
            return ExitCode::FAILURE;
        }
    };

    let _log_guard = match init_logging(&config, cli.verbose) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("{} {e:#}", "logging setup failed:".red().bold());
            return ExitCode::FAILURE;
        }
    };
    info!(config = %cli.config.display(), "configuration loaded");

    let result = match cli.command.unwrap_or(Commands::Interactive) {
        Commands::Test => run_test(&config),
        Commands::Interactive => run_interactive(&config),
        Commands::Run => run_pipeline(&config),
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{} {e:#}", "error:".red().bold());
            ExitCode::FAILURE
        }
    }
}

/// File logging always; stderr echo only with `--verbose`. The returned
/// guard must stay alive for the buffered writer to flush.
fn init_logging(config: &Config, verbose: bool) -> Result<WorkerGuard> {
    let path = Path::new(&config.logging.file_path);
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir)
        .with_context(|| format!("creating log directory {}", dir.display()))?;
    let file_name = path
        .file_name()
        .map(|name| name.to_os_string())
        .unwrap_or_else(|| "automation.log".into());

    let appender = tracing_appender::rolling::never(dir, file_name);
    let (writer, guard) = tracing_appender::non_blocking(appender);

    let level = if verbose {
        "debug".to_string()
    } else {
        config.logging.level.to_lowercase()
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&level));
    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(writer)
        .with_ansi(false);

    let registry = tracing_subscriber::registry().with(filter).with(file_layer);
    if verbose {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
            .init();
    } else {
        registry.init();
    }
    Ok(guard)
}

fn run_test(config: &Config) -> Result<ExitCode> {
    let mut session = Session::new(config.cabas.clone()).context("initializing desktop engine")?;

    println!("{}", "CABAS login test".bold());
    println!("  target: {}", config.cabas.exe_path);

    let outcome = match session.launch() {
        Ok(()) => Some(session.login()),
        Err(e) => {
            println!("  {} {e}", "launch failed:".red());
            None
        }
    };

    let passed = match &outcome {
        Some(outcome) if outcome.success => {
            match outcome.strategy {
                Some(strategy) => println!("  result: {} via {strategy:?}", "PASS".green().bold()),
                None => println!("  result: {}", "PASS".green().bold()),
            }
            true
        }
        Some(outcome) => {
            println!("  result: {} ({})", "FAIL".red().bold(), outcome.detail);
            false
        }
        None => {
            println!("  result: {}", "FAIL".red().bold());
            false
        }
    };
    println!("  screenshots: {}", session.screenshot_dir().display());

    // Teardown runs regardless of the verdict; a half-started client must
    // not survive a failed test.
    if !session.close() {
        println!("  {}", "warning: processes survived teardown".yellow());
    }

    Ok(if passed {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn run_interactive(config: &Config) -> Result<ExitCode> {
    println!("{}", "CABAS interactive login".bold());
    println!("{}", config.summary());
    println!();

    if !confirm("Proceed with automated login?", true)? {
        println!("aborted");
        return Ok(ExitCode::SUCCESS);
    }

    let mut session = Session::new(config.cabas.clone()).context("initializing desktop engine")?;

    println!("launching {} ...", config.cabas.exe_path);
    if let Err(e) = session.launch() {
        eprintln!("{} {e}", "launch failed:".red().bold());
        session.close();
        return Ok(ExitCode::FAILURE);
    }

    println!("running login strategies ...");
    let outcome = session.login();
    if outcome.success {
        match outcome.strategy {
            Some(strategy) => {
                println!("{} via {strategy:?}", "login verified".green().bold())
            }
            None => println!("{}", "login verified".green().bold()),
        }
    } else if outcome.aborted {
        println!("{} {}", "aborted:".red().bold(), outcome.detail);
    } else {
        println!("{} {}", "login failed:".red().bold(), outcome.detail);
    }
    println!("screenshots in {}", session.screenshot_dir().display());

    if confirm("Close the application?", true)? {
        if session.close() {
            println!("application closed");
        } else {
            println!("{}", "some processes survived teardown".yellow());
        }
    } else {
        println!("leaving the application open");
    }

    Ok(if outcome.success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn run_pipeline(_config: &Config) -> Result<ExitCode> {
    println!(
        "the monitoring pipeline is not implemented yet; use `cabas test` to verify the login flow"
    );
    Ok(ExitCode::SUCCESS)
}

fn confirm(prompt: &str, default_yes: bool) -> Result<bool> {
    let hint = if default_yes { "[Y/n]" } else { "[y/N]" };
    print!("{prompt} {hint} ");
    io::stdout().flush()?;

    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(match line.trim().to_lowercase().as_str() {
        "" => default_yes,
        "y" | "yes" => true,
        _ => false,
    })
}
