// Subcommand implementations.
//
// Every command loads config, opens the local store (always needed for run
// history) and, for parse/import, builds the configured backend and drives an
// ImportSession. User output goes to stdout; progress lines to stderr.

use std::fmt::Write as _;
use std::future::Future;
use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use chrono::Utc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use playerport_core::coordinator::{CommitOptions, ImportProgress, ImportSummary};
use playerport_core::csv_import::{current_season, ParseOptions};
use playerport_core::model::{Gender, MissingTeamBucket, NewTeam, ParsedPlayerRow, Team};
use playerport_core::session::ParseReport;
use playerport_core::store::RunRecord;
use playerport_core::template::{self, SAMPLE_CSV};
use playerport_core::{ClubBackend, ImportError, ImportSession, SessionConfig, Store};
use playerport_http::{HttpBackend, HttpConfig};

use crate::cli::{Cli, Command, InputArgs, TeamsCommand};
use crate::config::{self, BackendKind, Config};

const SAMPLE_SOURCE: &str = "sample";

pub async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Template { out } => {
            let path = template::write_template(&out)?;
            println!("Template written to {}", path.display());
            Ok(())
        }
        Command::Sample => {
            println!("{SAMPLE_CSV}");
            Ok(())
        }
        Command::Parse { input } => {
            let config = load(cli.config_dir.as_deref(), cli.org)?;
            parse(&config, &input).await
        }
        Command::Import {
            input,
            create_missing,
            concurrency,
        } => {
            let config = load(cli.config_dir.as_deref(), cli.org)?;
            import(&config, &input, create_missing, concurrency).await
        }
        Command::Teams { action } => {
            let config = load(cli.config_dir.as_deref(), cli.org)?;
            teams(&config, action).await
        }
        Command::History { limit } => {
            let config = load(cli.config_dir.as_deref(), cli.org)?;
            history(&config, limit)
        }
    }
}

fn load(config_dir: Option<&Path>, org: Option<String>) -> Result<Config> {
    let mut config = config::load_config(config_dir).context("failed to load configuration")?;
    if let Some(org) = org {
        config.organization_id = org;
    }
    info!(
        organization = %config.organization_id,
        backend = ?config.backend.kind,
        "config loaded from {}",
        config.base_dir.display()
    );
    Ok(config)
}

// ---------------------------------------------------------------------------
// Backend wiring
// ---------------------------------------------------------------------------

fn open_store(config: &Config) -> Result<Arc<Store>> {
    let path = config.resolved_db_path();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let path = path.to_string_lossy();
    let store = Store::open(&path).with_context(|| format!("failed to open database at {path}"))?;
    Ok(Arc::new(store))
}

fn build_backend(config: &Config, store: &Arc<Store>) -> Result<Arc<dyn ClubBackend>> {
    match config.backend.kind {
        BackendKind::Sqlite => {
            let backend: Arc<dyn ClubBackend> = store.clone();
            Ok(backend)
        }
        BackendKind::Http => {
            let backend = HttpBackend::new(HttpConfig {
                url: config.backend.url.clone(),
                auth_token: config.credentials.auth_token.clone(),
                timeout: config.backend.timeout(),
            })
            .context("failed to build HTTP backend")?;
            Ok(Arc::new(backend))
        }
    }
}

fn session_config(config: &Config) -> SessionConfig {
    SessionConfig {
        organization_id: config.organization_id.clone(),
        parse: ParseOptions {
            delimiter: config.import.delimiter_byte(),
            default_season: None,
        },
        clear_on_partial_success: config.import.clear_on_partial_success,
    }
}

/// Load the input into the session and parse it. Returns the source label
/// recorded with runs.
async fn load_and_parse(
    session: &mut ImportSession,
    input: &InputArgs,
) -> Result<(String, ParseReport)> {
    let source = match &input.file {
        Some(path) if !input.sample => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            session.set_text(text)?;
            path.display().to_string()
        }
        _ => {
            session.load_sample()?;
            SAMPLE_SOURCE.to_string()
        }
    };
    let report = session.parse().await?;
    Ok((source, report))
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

async fn parse(config: &Config, input: &InputArgs) -> Result<()> {
    let store = open_store(config)?;
    let backend = build_backend(config, &store)?;
    let mut session = ImportSession::new(backend, session_config(config));

    let (_, report) = load_and_parse(&mut session, input).await?;
    print!("{}", render_report(&report));
    print!("{}", render_rows(session.rows()));
    print!("{}", render_missing(&session.missing_teams()));
    Ok(())
}

async fn import(
    config: &Config,
    input: &InputArgs,
    create_missing: bool,
    concurrency: Option<usize>,
) -> Result<()> {
    let concurrency = concurrency.unwrap_or(config.import.concurrency);
    if concurrency == 0 {
        bail!("--concurrency must be > 0");
    }

    let store = open_store(config)?;
    let backend = build_backend(config, &store)?;
    let mut session = ImportSession::new(backend, session_config(config));

    let (source, report) = load_and_parse(&mut session, input).await?;
    print!("{}", render_report(&report));

    let missing = session.missing_teams();
    if !missing.is_empty() {
        session.begin_review()?;
        print!("{}", render_missing(&missing));
        if create_missing {
            let created = session
                .create_missing_teams(&missing)
                .await
                .context("failed to create missing teams")?;
            println!("Created {} team(s)", created.len());
        } else {
            println!(
                "{} player(s) without a team will not be imported (use --create-missing)",
                session.stats().unmatched
            );
        }
    }

    let cancel = CancellationToken::new();
    let ctrl_c = cancel_on_signal(tokio::signal::ctrl_c(), cancel.clone());

    let (progress_tx, mut progress_rx) = mpsc::unbounded_channel();
    let printer = tokio::spawn(async move {
        while let Some(progress) = progress_rx.recv().await {
            eprintln!("{}", progress_line(&progress));
        }
    });

    let options = CommitOptions {
        concurrency,
        cancel,
        progress: Some(progress_tx),
    };
    let started_at = Utc::now();
    let result = session.import_matched(&options).await;
    drop(options);
    ctrl_c.abort();
    let _ = printer.await;

    let run = match result {
        Ok(run) => run,
        Err(ImportError::NoMatchedPlayers) => bail!("No players to import"),
        Err(e) => return Err(e).context("import failed"),
    };

    store
        .record_run(&config.organization_id, &source, started_at, &run.summary)
        .context("failed to record import run")?;

    println!("{}", summary_line(&run.summary));
    for failure in &run.summary.failures {
        println!("  row {} {}: {}", failure.row_index + 1, failure.name, failure.message);
    }

    if run.summary.succeeded == 0 {
        bail!("no players were imported");
    }
    Ok(())
}

/// Cancel `cancel` once `signal` resolves successfully.
pub fn cancel_on_signal<S>(signal: S, cancel: CancellationToken) -> JoinHandle<()>
where
    S: Future<Output = std::io::Result<()>> + Send + 'static,
{
    tokio::spawn(async move {
        match signal.await {
            Ok(()) => {
                warn!("interrupt received, cancelling import");
                cancel.cancel();
            }
            Err(e) => warn!("failed to listen for interrupt: {e}"),
        }
    })
}

async fn teams(config: &Config, action: TeamsCommand) -> Result<()> {
    let store = open_store(config)?;
    let backend = build_backend(config, &store)?;

    match action {
        TeamsCommand::List => {
            let teams = backend
                .list_teams(&config.organization_id)
                .await
                .context("failed to list teams")?;
            print!("{}", render_teams(&teams));
        }
        TeamsCommand::Add {
            sport,
            age_group,
            gender,
            season,
            name,
        } => {
            let gender = Gender::normalize(&gender);
            let team = NewTeam {
                name: name.unwrap_or_else(|| format!("{age_group} {gender}")),
                organization_id: config.organization_id.clone(),
                sport,
                age_group,
                gender,
                season: season.unwrap_or_else(current_season),
                is_active: true,
            };
            let id = backend
                .create_team(&team)
                .await
                .with_context(|| format!("failed to create team {}", team.name))?;
            info!(%id, team = %team.name, "team created");
            println!(
                "Created team {} ({} · {} · {}) with id {id}",
                team.name, team.sport, team.season, team.gender
            );
        }
    }
    Ok(())
}

fn history(config: &Config, limit: usize) -> Result<()> {
    let store = open_store(config)?;
    let runs = store.recent_runs(&config.organization_id, limit)?;
    print!("{}", render_history(&runs));
    Ok(())
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

pub fn render_report(report: &ParseReport) -> String {
    let mut out = format!(
        "Parsed {} player(s): {} matched, {} without a team",
        report.parsed, report.stats.matched, report.stats.unmatched
    );
    if report.skipped > 0 {
        let _ = write!(out, " ({} row(s) skipped)", report.skipped);
    }
    out.push('\n');
    out
}

pub fn render_rows(rows: &[ParsedPlayerRow]) -> String {
    let name_width = rows.iter().map(|r| r.name.len()).max().unwrap_or(0).max(4);
    let sport_width = rows.iter().map(|r| r.sport.len()).max().unwrap_or(0).max(5);

    let mut out = format!(
        "{:>4}  {:<name_width$}  {:<6}  {:<sport_width$}  {:<6}  {:<6}  Team\n",
        "#", "Name", "Age", "Sport", "Gender", "Season"
    );
    for row in rows {
        let team = row.matched_team_name.as_deref().unwrap_or("-- no match --");
        let _ = writeln!(
            out,
            "{:>4}  {:<name_width$}  {:<6}  {:<sport_width$}  {:<6}  {:<6}  {}",
            row.row_index + 1,
            row.name,
            row.age_group,
            row.sport,
            row.gender,
            row.season,
            team
        );
    }
    out
}

pub fn render_missing(buckets: &[MissingTeamBucket]) -> String {
    if buckets.is_empty() {
        return String::new();
    }
    let mut out = format!("Missing teams ({}):\n", buckets.len());
    for b in buckets {
        let _ = writeln!(
            out,
            "  {} {} · {} · {} ({} player{})",
            b.age_group,
            b.gender,
            b.sport,
            b.season,
            b.count,
            if b.count == 1 { "" } else { "s" }
        );
    }
    out
}

pub fn progress_line(progress: &ImportProgress) -> String {
    let mut line = format!("Importing players... {}/{}", progress.current, progress.total);
    if progress.failed > 0 {
        let _ = write!(line, " ({} failed)", progress.failed);
    }
    line
}

pub fn summary_line(summary: &ImportSummary) -> String {
    let mut line = format!(
        "Imported {} of {} player(s)",
        summary.succeeded, summary.total
    );
    if summary.failed > 0 {
        let _ = write!(line, ", {} failed", summary.failed);
    }
    if summary.cancelled {
        let _ = write!(line, ", cancelled with {} not started", summary.skipped);
    }
    line
}

pub fn render_teams(teams: &[Team]) -> String {
    if teams.is_empty() {
        return "No teams\n".to_string();
    }
    let mut out = String::new();
    for team in teams {
        let _ = writeln!(
            out,
            "{}  {} · {} · {} · {}",
            team.id,
            team.name,
            team.sport.as_deref().unwrap_or("-"),
            team.gender.as_deref().unwrap_or("-"),
            team.season.as_deref().unwrap_or("-")
        );
    }
    out
}

pub fn render_history(runs: &[RunRecord]) -> String {
    if runs.is_empty() {
        return "No import runs recorded\n".to_string();
    }
    let mut out = String::new();
    for run in runs {
        let _ = writeln!(
            out,
            "#{} {} {}: {}/{} imported, {} failed, {} skipped{}",
            run.id,
            run.finished_at,
            run.source,
            run.succeeded,
            run.total,
            run.failed,
            run.skipped,
            if run.cancelled { " (cancelled)" } else { "" }
        );
    }
    out
}
