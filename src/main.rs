mod analyzer;
mod api;
mod cli;
mod config;
mod db;
mod export;

use crate::analyzer::chart::{ChartBody, ChartDataset, Granularity, build_chart_dataset};
use crate::analyzer::report::{describe_instant, format_minutes};
use crate::analyzer::session::{SessionRecord, parse_session_log};
use crate::analyzer::{Dashboard, build_dashboard};
use crate::cli::record::{build_log_entry, demo_cycle, parse_clock_time, parse_kind, planned_minutes};
use crate::cli::{Cli, Commands, ConfigCommands, ExportCommands};
use crate::config::Config;
use crate::db::{Database, SessionStore};
use crate::export::csv::export_csv;
use crate::export::png::render_timeline_png;
use crate::export::save_export;
use anyhow::{Context, Result, bail};
use chrono::{DateTime, Local, NaiveDate, TimeZone};
use clap::Parser;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .with_target(false)
        .compact()
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Init => handle_init(),
        Commands::Config { command } => handle_config_command(command),
        Commands::Status => handle_status(),
        Commands::Doctor => handle_doctor(),
        Commands::Log {
            kind,
            start,
            date,
            minutes,
            skipped_after,
        } => handle_log(&kind, &start, date, minutes, skipped_after),
        Commands::Import { file } => handle_import(&file),
        Commands::Demo { replace } => handle_demo(replace),
        Commands::Stats { now, json } => handle_stats(now, json),
        Commands::Insights { now } => handle_insights(now),
        Commands::Chart {
            granularity,
            now,
            json,
        } => handle_chart(granularity, now, json),
        Commands::Export { command } => handle_export(command),
        Commands::Report { date } => handle_report(date),
        Commands::Serve => {
            let config = load_or_default_config()?;
            run_service(config).await
        }
        Commands::Clear { yes } => handle_clear(yes),
    }
}

fn handle_init() -> Result<()> {
    let config = load_or_default_config()?;
    config.ensure_bootstrap_files()?;
    config.save()?;
    let _ = Database::open(&config.db_path)?;

    println!("PomoStats initialized");
    println!("- config: {}", Config::config_path()?.display());
    println!("- database: {}", config.db_path.display());
    println!("- reports: {}", config.report_dir.display());
    println!("- exports: {}", config.export_dir.display());

    Ok(())
}

fn handle_config_command(command: ConfigCommands) -> Result<()> {
    match command {
        ConfigCommands::Set { key, value } => {
            let mut config = load_or_default_config()?;
            config.set_value(&key, &value)?;
            config.ensure_bootstrap_files()?;
            config.save()?;

            println!("Config saved: {key} = {value}");
            Ok(())
        }
        ConfigCommands::Get { key } => {
            let config = load_config()?;
            let value = config
                .get_value(&key)
                .with_context(|| format!("Unsupported config key: {key}"))?;

            println!("{value}");
            Ok(())
        }
    }
}

fn handle_status() -> Result<()> {
    let config = load_config()?;
    let database = Database::open(&config.db_path)?;

    println!("PomoStats status");
    println!("- sessions: {}", database.session_count()?);
    println!(
        "- last_session_end: {}",
        describe_instant(&Local, database.latest_session_end()?)
    );
    println!(
        "- latest_report_date: {}",
        database
            .latest_report_meta()?
            .map(|meta| meta.date)
            .unwrap_or_else(|| "none".to_string())
    );
    println!("- api_port: {}", config.api_port);

    Ok(())
}

fn handle_doctor() -> Result<()> {
    let config_path = Config::config_path()?;
    let mut issues = Vec::new();

    if config_path.exists() {
        println!("[OK] config.json found: {}", config_path.display());
    } else {
        println!("[WARN] config.json not found: {}", config_path.display());
        issues.push("config missing".to_string());
    }

    let config = load_or_default_config()?;

    match Database::open(&config.db_path).and_then(|database| database.session_count()) {
        Ok(count) => println!(
            "[OK] SQLite reachable: {} ({count} sessions)",
            config.db_path.display()
        ),
        Err(error) => {
            println!("[WARN] SQLite check failed: {error:#}");
            issues.push("db unreachable".to_string());
        }
    }

    [
        ("report dir", &config.report_dir),
        ("export dir", &config.export_dir),
    ]
    .into_iter()
    .for_each(|(label, dir)| {
        if dir.exists() {
            println!("[OK] {label} exists: {}", dir.display());
        } else {
            println!("[WARN] {label} missing: {}", dir.display());
            issues.push(format!("{label} missing"));
        }
    });

    println!(
        "[OK] timer: work {}m, short break {}m, long break {}m, {} intervals",
        config.work_minutes, config.short_break_minutes, config.long_break_minutes, config.intervals
    );

    if issues.is_empty() {
        println!("doctor result: no issues");
    } else {
        println!("doctor result: {} warning(s)", issues.len());
    }

    Ok(())
}

fn handle_log(
    kind: &str,
    start: &str,
    date: Option<String>,
    minutes: Option<u32>,
    skipped_after: Option<u32>,
) -> Result<()> {
    let config = load_or_default_config()?;
    let kind = parse_kind(kind)?;
    let time = parse_clock_time(start)?;
    let date = parse_optional_date(date)?;
    let minutes = minutes.unwrap_or_else(|| planned_minutes(&config, kind));

    let records = build_log_entry(&Local, date, time, kind, minutes, skipped_after)?;
    let mut database = Database::open(&config.db_path)?;
    database.append_sessions(&records)?;

    records.iter().for_each(|record| {
        println!(
            "Logged {} ({}): {} - {}",
            record.kind.label(),
            record.status_label(),
            describe_instant(&Local, Some(record.start)),
            describe_instant(&Local, Some(record.end))
        );
    });

    Ok(())
}

fn handle_import(file: &Path) -> Result<()> {
    let config = load_or_default_config()?;
    let content = fs::read_to_string(file)
        .with_context(|| format!("Failed to read session export: {}", file.display()))?;

    let (sessions, anomalies) = parse_session_log(&content);
    let mut database = Database::open(&config.db_path)?;
    database.append_sessions(&sessions)?;
    info!(
        accepted = sessions.len(),
        rejected = anomalies.rejected(),
        "session export imported"
    );

    println!("Imported {} session(s) from {}", sessions.len(), file.display());
    if anomalies.rejected() > 0 {
        println!(
            "- skipped: {} invalid span, {} unknown kind, {} malformed",
            anomalies.invalid_span, anomalies.unknown_kind, anomalies.malformed
        );
    }

    Ok(())
}

fn handle_demo(replace: bool) -> Result<()> {
    let config = load_or_default_config()?;
    let mut database = Database::open(&config.db_path)?;

    if replace {
        let removed = database.clear_sessions()?;
        info!(removed, "session history cleared before demo");
    }

    let sessions = demo_cycle(&config, Local::now().timestamp_millis());
    database.append_sessions(&sessions)?;

    println!(
        "Demo data generated: {} sessions (work={}m, short={}m, long={}m, cycles={})",
        sessions.len(),
        config.work_minutes,
        config.short_break_minutes,
        config.long_break_minutes,
        config.intervals.max(1)
    );

    Ok(())
}

fn handle_stats(now: Option<i64>, json: bool) -> Result<()> {
    let (sessions, now) = load_snapshot(now)?;
    let dashboard = build_dashboard(&sessions, &now);

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&dashboard).context("Failed to serialize dashboard")?
        );
        return Ok(());
    }

    print_dashboard(&dashboard);
    Ok(())
}

fn handle_insights(now: Option<i64>) -> Result<()> {
    let (sessions, now) = load_snapshot(now)?;
    let dashboard = build_dashboard(&sessions, &now);

    dashboard
        .insights
        .iter()
        .for_each(|insight| println!("- {insight}"));

    Ok(())
}

fn handle_chart(granularity: Granularity, now: Option<i64>, json: bool) -> Result<()> {
    let (sessions, now) = load_snapshot(now)?;
    let dataset = build_chart_dataset(&sessions, granularity, &now);

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&dataset).context("Failed to serialize chart")?
        );
        return Ok(());
    }

    print_chart(&dataset);
    Ok(())
}

fn handle_export(command: ExportCommands) -> Result<()> {
    let config = load_or_default_config()?;
    let today = Local::now().format("%Y-%m-%d").to_string();

    let path = match command {
        ExportCommands::Csv { output } => {
            let sessions = Database::open(&config.db_path)?.load_sessions()?;
            let content = export_csv(&sessions, &Local);
            write_output(
                output,
                &config.export_dir,
                &format!("pomodoro-sessions-{today}.csv"),
                content.as_bytes(),
            )?
        }
        ExportCommands::Png {
            granularity,
            now,
            output,
        } => {
            let (sessions, now) = load_snapshot(now)?;
            let dataset = build_chart_dataset(&sessions, granularity, &now);
            let bytes = render_timeline_png(&dataset)?;
            write_output(
                output,
                &config.export_dir,
                &format!("timeline-{granularity}-{}.png", now.format("%Y-%m-%d")),
                &bytes,
            )?
        }
    };

    println!("Exported: {}", path.display());
    Ok(())
}

fn handle_report(date: Option<String>) -> Result<()> {
    let config = load_or_default_config()?;
    let target_date = parse_optional_date(date)?;

    let (report, saved) = analyzer::generate_and_store_report(&config, target_date)?;

    println!("Report generated: {}", report.date);
    println!("- Markdown: {}", saved.markdown_path.display());
    println!("- JSON: {}", saved.json_path.display());

    Ok(())
}

fn handle_clear(yes: bool) -> Result<()> {
    if !yes {
        bail!("Refusing to erase session history without --yes");
    }

    let config = load_config()?;
    let removed = Database::open(&config.db_path)?.clear_sessions()?;
    println!("Session history cleared ({removed} record(s) removed)");

    Ok(())
}

async fn run_service(config: Config) -> Result<()> {
    config.ensure_bootstrap_files()?;
    let _ = Database::open(&config.db_path)?;

    let shared_config = Arc::new(config);
    info!(port = shared_config.api_port, "PomoStats service started");

    api::run_server(shared_config).await
}

fn print_dashboard(dashboard: &Dashboard) {
    let stats = &dashboard.stats;

    println!("Today: {} Pomodoros", stats.today_work_sessions);
    println!("Rolling week: {} Pomodoros", stats.week_work_sessions);
    println!("Month: {} Pomodoros", stats.month_work_sessions);
    println!("Month focus time: {}", format_minutes(stats.total_minutes));
    println!("Average session: {}", format_minutes(stats.avg_session_minutes));
    println!("Completion rate: {}%", stats.completion_rate);
    println!("Streak: {} day(s)", stats.streak);
    println!("Focus score: {}", stats.focus_score);
    println!("Week over week: {}", dashboard.week_over_week_label);
    println!("Best day: {}", dashboard.best_day);
    println!("Peak hour: {}", dashboard.peak_hour);
    println!(
        "Breakdown: work {} ({}%), short {} ({}%), long {} ({}%), skipped {} ({}%)",
        dashboard.breakdown.work,
        dashboard.breakdown.work_percent,
        dashboard.breakdown.short,
        dashboard.breakdown.short_percent,
        dashboard.breakdown.long,
        dashboard.breakdown.long_percent,
        dashboard.breakdown.skipped,
        dashboard.breakdown.skipped_percent
    );

    let heat = dashboard
        .hourly_intensity
        .iter()
        .map(|level| [' ', '.', ':', '*', '#'][usize::from(*level).min(4)])
        .collect::<String>();
    println!("Hourly heat: [{heat}]");
}

fn print_chart(dataset: &ChartDataset) {
    println!(
        "{} chart: {} - {}",
        dataset.granularity,
        describe_instant(&Local, Some(dataset.window.start_ms)),
        describe_instant(&Local, Some(dataset.window.end_ms))
    );

    match &dataset.body {
        ChartBody::Timeline { bars, .. } if bars.is_empty() => println!("- no sessions"),
        ChartBody::Timeline { bars, .. } => bars
            .iter()
            .for_each(|bar| println!("- {}", bar.tooltip)),
        ChartBody::Weekly { days, .. } => days.iter().for_each(|day| {
            println!(
                "{} {}  work {:.0}m  short {:.0}m  long {:.0}m",
                day.name, day.date, day.work_minutes, day.short_minutes, day.long_minutes
            )
        }),
        ChartBody::Monthly { cells, .. } => cells
            .iter()
            .filter(|cell| cell.minutes > 0.0)
            .for_each(|cell| {
                println!(
                    "{}  {:.0}m  level {}",
                    cell.date, cell.minutes, cell.intensity
                )
            }),
    }
}

fn write_output(
    output: Option<PathBuf>,
    default_dir: &Path,
    default_name: &str,
    content: &[u8],
) -> Result<PathBuf> {
    match output {
        None => save_export(default_dir, default_name, content),
        Some(path) => {
            let dir = path
                .parent()
                .filter(|parent| !parent.as_os_str().is_empty())
                .unwrap_or(Path::new("."));
            let name = path
                .file_name()
                .with_context(|| format!("Invalid output path: {}", path.display()))?
                .to_string_lossy()
                .to_string();
            save_export(dir, &name, content)
        }
    }
}

fn load_snapshot(now: Option<i64>) -> Result<(Vec<SessionRecord>, DateTime<Local>)> {
    let config = load_or_default_config()?;
    let sessions = Database::open(&config.db_path)?.load_sessions()?;
    let now = match now {
        None => Local::now(),
        Some(value) => Local
            .timestamp_millis_opt(value)
            .single()
            .with_context(|| format!("Invalid --now timestamp: {value}"))?,
    };

    Ok((sessions, now))
}

fn parse_optional_date(input: Option<String>) -> Result<NaiveDate> {
    input
        .as_deref()
        .map(|date| {
            NaiveDate::parse_from_str(date, "%Y-%m-%d")
                .with_context(|| format!("Invalid date format: {date}. Example: 2026-02-18"))
        })
        .transpose()?
        .map_or_else(|| Ok(Local::now().date_naive()), Ok)
}

fn load_or_default_config() -> Result<Config> {
    Config::load().or_else(|_| {
        let config = Config::default();
        config.ensure_bootstrap_files()?;
        config.save()?;
        Ok(config)
    })
}

fn load_config() -> Result<Config> {
    Config::load().with_context(|| "Config file not found. Run `PomoStats init` first.".to_string())
}
