//! demotime - Main entry point
//!
//! Command line presenter for scripted demos. Every invocation loads the
//! workspace state, performs one navigation request and exits; `present`
//! keeps a runner alive and reads triggers from stdin.

use demotime::cli::{Cli, Commands};
use demotime::process_guard::{self, ProcessGuard};
use demotime::{
    ConsoleEffector, DemoRunner, EffectorRegistry, EngineConfig, LogObserver, NavOutcome,
    RunReport, RunStatus, ScriptEffector, StdinPrompter, SystemClipboard, TerminalEffector,
};
use std::io::{self, BufRead, Write};
use std::path::Path;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

/// Initialize the tracing subscriber; `RUST_LOG` overrides the default level
fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

fn effectors(config: &EngineConfig, workspace: &Path, dry_run: bool) -> EffectorRegistry {
    let registry = EffectorRegistry::new().with(Box::new(ConsoleEffector::new()));
    if dry_run {
        info!("Dry run: steps are described, not executed");
        return registry;
    }
    registry
        .with(Box::new(ScriptEffector::new(workspace)))
        .with(Box::new(TerminalEffector::new(config.shell.clone(), workspace)))
}

/// Main application entry point
fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse_args();
    init_logging(cli.verbose);
    info!("demotime starting up");

    // Scripts and terminal commands are stopped with us on SIGINT/SIGTERM
    if let Err(e) = process_guard::init_signal_handlers() {
        warn!("Failed to initialize signal handlers: {}", e);
    }
    let guard = ProcessGuard::new();

    let workspace = cli.workspace.clone();
    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(|| EngineConfig::default_path(&workspace));
    if let Commands::Init { force } = cli.command {
        return init_config(&config_path, force);
    }
    debug!("Loading configuration from {:?}", config_path);
    let config = EngineConfig::load_or_default(&config_path)?;

    let registry = effectors(&config, &workspace, cli.dry_run);
    let mut runner = match DemoRunner::open_workspace(&workspace, config) {
        Ok(runner) => runner
            .with_clipboard(Box::new(SystemClipboard))
            .with_prompter(Box::new(StdinPrompter))
            .with_observer(Box::new(LogObserver))
            .with_effectors(registry),
        Err(e) => {
            error!("Failed to open workspace: {}", e);
            eprintln!("✗ Failed to open workspace {:?}: {}", workspace, e);
            std::process::exit(1);
        }
    };

    let outcome = match cli.command {
        Commands::Next { file } => runner.advance(file.as_deref())?,
        Commands::Previous => runner.retreat()?,
        Commands::Run { id } => runner.run_by_id(&id)?,
        Commands::Start { file, index } => runner.jump(&file, index)?,
        Commands::Reset => {
            runner.reset()?;
            println!("✓ Demo cursor reset");
            return Ok(());
        }
        Commands::Status => {
            print_status(&mut runner);
            return Ok(());
        }
        Commands::List => {
            print_list(&runner);
            return Ok(());
        }
        Commands::Present => return present(&mut runner),
        // written before the workspace was opened
        Commands::Init { .. } => return Ok(()),
    };

    print_outcome(&outcome);
    if runner.is_suspended() {
        println!("  (run `demotime present` to continue suspended demos interactively)");
    }
    if guard.child_count() > 0 {
        debug!("Stopping {} step processes on exit", guard.child_count());
    }
    Ok(())
}

/// Write the default configuration to `path`
fn init_config(path: &Path, force: bool) -> Result<(), Box<dyn std::error::Error>> {
    if path.exists() && !force {
        eprintln!("✗ {:?} already exists (use --force to overwrite)", path);
        std::process::exit(1);
    }
    EngineConfig::default().save_to_file(path)?;
    info!("Wrote default configuration to {:?}", path);
    println!("✓ Configuration written to {}", path.display());
    Ok(())
}

/// Interactive loop: one trigger per line
fn present(runner: &mut DemoRunner) -> Result<(), Box<dyn std::error::Error>> {
    println!("n = next, p = previous, r <id> = run by id, c = continue, reset, q = quit");
    loop {
        print!("demotime> ");
        io::stdout().flush()?;

        let mut line = String::new();
        if io::stdin().lock().read_line(&mut line)? == 0 {
            break;
        }
        let line = line.trim();
        let (command, argument) = match line.split_once(char::is_whitespace) {
            Some((command, argument)) => (command, Some(argument.trim())),
            None => (line, None),
        };

        let outcome = match (command, argument) {
            ("" | "n" | "next", _) => runner.advance(None),
            ("p" | "previous", _) => runner.retreat(),
            ("r" | "run", Some(id)) => runner.run_by_id(id),
            ("c" | "continue", _) => runner.resume(),
            ("reset", _) => {
                match runner.reset() {
                    Ok(()) => println!("✓ Demo cursor reset"),
                    Err(e) => eprintln!("✗ {}", e),
                }
                continue;
            }
            ("s" | "status", _) => {
                print_status(runner);
                continue;
            }
            ("q" | "quit", _) => break,
            _ => {
                println!("Unknown command: {}", line);
                continue;
            }
        };

        match outcome {
            Ok(outcome) => print_outcome(&outcome),
            Err(e) if e.is_snippet_failure() => eprintln!("✗ Demo aborted: {}", e),
            Err(e) => {
                error!("{}", e);
                eprintln!("✗ {}", e);
            }
        }
    }
    Ok(())
}

fn print_outcome(outcome: &NavOutcome) {
    match outcome {
        NavOutcome::Ran(report) => print_report(report),
        NavOutcome::Exhausted => println!("✓ All demos have been executed"),
        NavOutcome::AtStart => println!("Already at the first demo"),
        NavOutcome::NoDemoFile => println!("✗ No demo file found or selected"),
        NavOutcome::UnknownDemo(id) => println!("✗ Demo \"{}\" not found", id),
        NavOutcome::PreviousDisabled => println!("✗ Running the previous demo is disabled"),
        NavOutcome::Busy => println!("A demo is waiting to be continued (c)"),
        NavOutcome::NothingSuspended => println!("Nothing to continue"),
    }
}

fn print_report(report: &RunReport) {
    println!(
        "✓ {} [{}#{}]: {} steps executed, {} skipped",
        report.demo_title, report.file_path, report.demo_idx, report.executed, report.skipped
    );
    for failure in &report.failures {
        println!("  ✗ step {} ({}): {}", failure.index, failure.action, failure.message);
    }
    if let RunStatus::Suspended { at, message } = &report.status {
        match message {
            Some(message) => println!("  ⏸ paused at step {}: {}", at, message),
            None => println!("  ⏸ paused at step {}", at),
        }
    }
}

fn print_status(runner: &mut DemoRunner) {
    let cursor = runner.status();
    if cursor.is_idle() {
        println!("No demo has run yet");
    } else {
        println!("File: {} ({})", cursor.file_path, cursor.version);
        for entry in &cursor.history {
            match &entry.id {
                Some(id) => println!("  #{} {} [{}]", entry.idx, entry.title, id),
                None => println!("  #{} {}", entry.idx, entry.title),
            }
        }
    }
    if runner.is_suspended() {
        println!("A run is suspended");
    }
    match runner.peek_next() {
        Some(next) => println!("Next: {} [{}#{}]", next.demo.title, next.file_path, next.idx),
        None => println!("Next: nothing left"),
    }
}

fn print_list(runner: &DemoRunner) {
    for (path, file) in runner.list() {
        let Some(file) = file else {
            println!("{} (invalid)", path);
            continue;
        };
        println!("{} - {} ({})", path, file.title, file.version());
        for (idx, demo) in file.demos.iter().enumerate() {
            let marker = if demo.disabled { " (disabled)" } else { "" };
            match &demo.id {
                Some(id) => println!("  {:>3}. {} [{}]{}", idx, demo.title, id, marker),
                None => println!("  {:>3}. {}{}", idx, demo.title, marker),
            }
        }
    }
}
