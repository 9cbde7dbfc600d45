mod analytics;
mod cli;
mod config;
mod db;
mod error;
mod models;
mod province;
mod sample;

use anyhow::Context;
use clap::Parser;
use cli::{App, ChartArgs, Cli, Commands, HeatmapArgs, RankArgs};
use colored::*;
use config::Config;
use dialoguer::{theme::ColorfulTheme, Select};
use tracing::{error, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Logs go to stderr (stdout carries tables or JSON), plus a daily file when `LOG_DIR` is set.
fn init_tracing(config: &Config) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let json_layer = config
        .log_json
        .then(|| fmt::layer().json().with_writer(std::io::stderr));
    let plain_layer = (!config.log_json).then(|| fmt::layer().with_writer(std::io::stderr));

    let (file_layer, guard) = match &config.log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "aq-insights.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (Some(fmt::layer().with_ansi(false).with_writer(writer)), Some(guard))
        },
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(json_layer)
        .with(plain_layer)
        .with(file_layer)
        .init();
    guard
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env().context("failed to load configuration")?;
    let _log_guard = init_tracing(&config);
    config.log_sources();
    let args = Cli::parse();

    info!("Initializing air quality insights...");
    let app = App::new(&config, args.readings.as_deref(), args.json)
        .await
        .context("failed to open the reading store")?;

    if let Some(command) = args.command {
        app.run_command(command).await?;
        return Ok(());
    }

    println!("{}", "Air quality insights".cyan().bold());
    interactive(&app).await?;
    Ok(())
}

/// Menu loop used when no subcommand is given.
async fn interactive(app: &App) -> error::Result<()> {
    loop {
        let options = &[
            "Province chart",
            "Province heatmap (1 year)",
            "Daily ranking",
            "Generate sample data",
            "Initialize database schema",
            "Exit",
        ];

        let selection = Select::with_theme(&ColorfulTheme::default())
            .with_prompt("What would you like to do?")
            .items(options)
            .default(0)
            .interact_opt()?
            .unwrap_or(options.len() - 1);

        println!();

        let command = match selection {
            0 => chart_from_prompts(),
            1 => heatmap_from_prompts(),
            2 => rank_from_prompts(),
            3 => cli::prompt_days().map(|days| Commands::Seed { days, per_day: 24, out: None }),
            4 => Ok(Commands::InitDb),
            _ => {
                println!("{}", "Goodbye!".green());
                break;
            },
        };

        let result = match command {
            Ok(command) => app.run_command(command).await,
            Err(e) => Err(e),
        };
        match result {
            Err(e) if e.is_invalid_argument() => {
                println!("{} {}", "Invalid input:".yellow(), e.to_string().yellow());
            },
            Err(e) => {
                error!("Command failed: {:?}", e);
                println!("{} {}", "Error:".red(), e.to_string().red());
            },
            Ok(()) => {},
        }
        println!();
    }
    Ok(())
}

fn chart_from_prompts() -> error::Result<Commands> {
    let range = cli::prompt_range()?;
    let province = cli::prompt_province_filter()?;
    let metric = cli::prompt_metric()?;
    Ok(Commands::Chart(ChartArgs {
        range: range.to_string(),
        province,
        metric: metric.to_string(),
    }))
}

fn heatmap_from_prompts() -> error::Result<Commands> {
    let province = cli::prompt_province()?;
    let metric = cli::prompt_metric()?;
    Ok(Commands::Heatmap(HeatmapArgs {
        province,
        metric: metric.to_string(),
    }))
}

fn rank_from_prompts() -> error::Result<Commands> {
    let date = cli::prompt_date()?;
    let metric = cli::prompt_metric()?;
    let group = cli::prompt_group()?;
    let limit = cli::prompt_limit()?;
    Ok(Commands::Rank(RankArgs {
        date: Some(date),
        metric: metric.to_string(),
        group: group.to_string(),
        limit,
    }))
}
