//! groupstat - Group chat statistics reports
//!
//! Render a report for one group on demand, manage the groups that get
//! automatic reports, or run the scheduler.

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use groupstat_core::analytics::{registered, RenderedReport};
use groupstat_core::schedule;
use groupstat_core::service::write_frames;
use groupstat_core::{Config, ReportService};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "groupstat")]
#[command(about = "Group chat statistics reports")]
#[command(version)]
struct Args {
    /// Config file (default: ~/.config/groupstat/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render a report for one group now
    Report {
        /// Group id
        #[arg(long)]
        group: String,

        /// End of the window as HH:MM (default: first configured time)
        #[arg(long)]
        time: Option<String>,

        /// Window length in minutes (default: analysis.duration_minutes)
        #[arg(long)]
        duration: Option<u32>,

        /// Export format (png = image files, json = JSON, md = markdown)
        #[arg(long, default_value = "png")]
        export: String,

        /// Directory for image files (default: report.output_dir)
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Add a group to automatic reports
    Subscribe { group: String },
    /// Remove a group from automatic reports
    Unsubscribe { group: String },
    /// List groups that get automatic reports
    Subscriptions,
    /// Send reports to subscribed groups at the configured times
    Daemon,
    /// List analyzers in report order
    Analyzers,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    if let Err(e) = run(args).await {
        match e.downcast_ref::<groupstat_core::Error>() {
            Some(core) => eprintln!("{}", core.user_message()),
            None => eprintln!("Error: {:#}", e),
        }
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<()> {
    let config_path = args.config.clone().unwrap_or_else(Config::config_path);
    let config = if config_path.exists() {
        Config::load_from(&config_path).context("failed to load configuration")?
    } else {
        Config::default()
    };
    let daemon = matches!(args.command, Command::Daemon);
    let log_guard =
        groupstat_core::logging::init(&config.logging, daemon).context("failed to set up logging")?;

    match args.command {
        Command::Report {
            group,
            time,
            duration,
            export,
            out,
        } => {
            if !matches!(export.as_str(), "png" | "json" | "md") {
                anyhow::bail!("Unknown export format: {}. Use 'png', 'json' or 'md'", export);
            }
            let time = time
                .or_else(|| config.analysis.times.first().cloned())
                .unwrap_or_else(|| "23:00".to_string());
            let duration = duration.unwrap_or(config.analysis.duration_minutes);
            let out_dir = out.clone().unwrap_or_else(|| config.report.output_dir());

            let (service, _client) = ReportService::connect(config)?;
            let report = service.run(&group, &time, duration).await?;

            match export.as_str() {
                "json" => print_json(&report)?,
                "md" => print_markdown(&report),
                _ => {}
            }
            if export == "png" || out.is_some() {
                let paths = write_frames(&report, &out_dir, Utc::now())
                    .context("failed to save report images")?;
                for path in paths {
                    println!("{}", path.display());
                }
            }
        }
        Command::Subscribe { group } => {
            let service = offline_service(config, config_path)?;
            if service.subscribe(&group)? {
                println!("Subscribed {group}");
            } else {
                println!("{group} is already subscribed");
            }
        }
        Command::Unsubscribe { group } => {
            let service = offline_service(config, config_path)?;
            if service.unsubscribe(&group)? {
                println!("Unsubscribed {group}");
            } else {
                println!("{group} was not subscribed");
            }
        }
        Command::Subscriptions => {
            if config.analysis.subscribed_groups.is_empty() {
                println!("No subscribed groups.");
            }
            for group in &config.analysis.subscribed_groups {
                println!("{group}");
            }
        }
        Command::Daemon => {
            let (service, client) = ReportService::connect(config)?;
            let service = service.with_config_path(config_path);
            tracing::info!(
                groups = service.subscribed_groups().len(),
                log_dir = %log_guard.log_dir().display(),
                "Daemon started"
            );
            tokio::select! {
                result = schedule::run_daemon(&service, client.as_ref()) => result?,
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("Daemon stopped");
                }
            }
        }
        Command::Analyzers => {
            for (i, kind) in registered().iter().enumerate() {
                println!("{:>2}. {}", i + 1, kind.id);
            }
        }
    }

    Ok(())
}

/// Service for bookkeeping commands; nothing is contacted until a report runs.
fn offline_service(config: Config, config_path: PathBuf) -> Result<ReportService> {
    let (service, _client) = ReportService::connect(config)?;
    Ok(service.with_config_path(config_path))
}

fn print_json(report: &RenderedReport) -> Result<()> {
    let json = serde_json::to_string_pretty(report).context("failed to serialize report")?;
    println!("{}", json);
    Ok(())
}

fn print_markdown(report: &RenderedReport) {
    println!("# {}", report.meta.title);
    println!();
    for line in &report.meta.header {
        println!("- {}", line);
    }

    for tally in &report.tallies {
        println!();
        println!("## {}", tally.name);
        println!();
        if tally.entries.is_empty() {
            println!("*No data.*");
            continue;
        }
        println!("| # | Key | {} |", capitalize(&tally.unit));
        println!("|---|-----|------:|");
        for (i, (key, value)) in tally.entries.iter().take(10).enumerate() {
            println!("| {} | {} | {} |", i + 1, key, value);
        }
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
