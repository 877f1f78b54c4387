//! Modload - Main entry point

use colored::Colorize;
use modload::fixtures::Dataset;
use modload::{Cli, Config};
use modload_common::logging::{init_logging, LogConfig, LogLevel, LogOutput};
use clap::Parser;
use std::process;
use tracing::error;

#[tokio::main]
async fn main() {
    // A .env file is optional
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let log_config = LogConfig::builder()
        .level(if cli.verbose { LogLevel::Debug } else { LogLevel::Warn })
        .output(LogOutput::Console)
        .log_file_prefix("modload")
        .build();

    // Environment variables take precedence
    let log_config = log_config.clone().merge_env().unwrap_or(log_config);

    // The import works without logging
    let _ = init_logging(&log_config);

    let result = match Config::from_env() {
        Ok(config) => modload::run(&config.with_cli(&cli)).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(summary) => {
            println!(
                "\n{} Import finished: {} module(s), {} fiche(s), {} video(s), {} quiz(zes)",
                "✓".green().bold(),
                summary.module_count(),
                summary.total(Dataset::Fiches),
                summary.total(Dataset::Videos),
                summary.total(Dataset::Quizzes),
            );
        }
        Err(e) => {
            error!(error = %e, "Import failed");
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    }
}
