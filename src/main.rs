//! Thread view CLI
//!
//! Replays scripted debug-session notifications through the thread registry
//! and banner projector.

use clap::Parser;
use colored::Colorize;
use threadview::commands::Commands;
use threadview::common::{config::Config, logging, paths, Result};
use threadview::replay;

#[derive(Parser)]
#[command(name = "threadview", about = "Debugger thread view state aggregator")]
#[command(version, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config_file = match &cli.command {
        Commands::Config { file } => file.clone(),
        _ => None,
    };
    let config = match &config_file {
        Some(path) => Config::from_path(path),
        None => Config::load(),
    };
    let config = match config {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };

    // Held until exit so buffered log lines are flushed
    let _log_guard = match &config.logging.file {
        Some(path) => match logging::init_file(path) {
            Ok(guard) => Some(guard),
            Err(e) => {
                eprintln!("Warning: Could not open log file {}: {}", path.display(), e);
                logging::init_cli();
                None
            }
        },
        None => {
            logging::init_cli();
            None
        }
    };

    let result = match cli.command {
        Commands::Replay {
            scenarios,
            verbose,
            json,
        } => run_replay(&config, &scenarios, verbose, json).await,
        Commands::Config { .. } => {
            show_config(&config, config_file.as_deref());
            Ok(true)
        }
    };

    match result {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    }
}

async fn run_replay(
    config: &Config,
    scenarios: &[std::path::PathBuf],
    verbose: bool,
    json: bool,
) -> Result<bool> {
    let mut failed = Vec::new();
    for path in scenarios {
        let result = replay::run_scenario(path, &config.view, verbose).await?;
        if json {
            println!("{}", serde_json::to_string_pretty(&result.snapshot)?);
        }
        if !result.passed {
            failed.push(result);
        }
    }

    if failed.is_empty() {
        return Ok(true);
    }
    println!("{}", "Failed scenarios:".red().bold());
    for result in &failed {
        println!(
            "  {} {} (step {}/{}): {}",
            "✗".red(),
            result.name,
            result.steps_run,
            result.steps_total,
            result.error.as_deref().unwrap_or("unknown error")
        );
    }
    Ok(false)
}

fn show_config(config: &Config, file: Option<&std::path::Path>) {
    let source = file
        .map(|p| p.display().to_string())
        .or_else(|| paths::config_path().map(|p| p.display().to_string()))
        .unwrap_or_else(|| "<none>".to_string());
    println!("{} {}", "Config file:".cyan(), source);
    println!("  view.history_limit = {}", config.view.history_limit);
    println!("  view.max_menu_items = {}", config.view.max_menu_items);
    match &config.logging.file {
        Some(path) => println!("  logging.file = {}", path.display()),
        None => println!("  logging.file = <stderr>"),
    }
}
