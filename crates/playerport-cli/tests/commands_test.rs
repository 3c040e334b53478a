// End-to-end runs of the subcommands against a temporary config directory
// and the SQLite backend.

use std::path::{Path, PathBuf};

use clap::Parser;
use playerport_cli::cli::Cli;
use playerport_cli::commands;
use playerport_core::model::{Gender, NewTeam};
use playerport_core::Store;

const ORG: &str = "club_cli";

const PLAYERS_CSV: &str = "Name,AgeGroup,Sport,Gender,Season,ParentEmail
John Smith,U12,GAA Football,Male,2025, Mary.Smith@Email.com
Emma Johnson,U10,GAA Football,Female,2025,
";

/// Temp dir with config/playerport.toml pointing at data/playerport.db, a
/// seeded U12 Boys team, and players.csv.
fn setup(name: &str) -> PathBuf {
    let tmp = std::env::temp_dir().join(format!("playerport_cmd_{name}_{}", std::process::id()));
    let _ = std::fs::remove_dir_all(&tmp);
    std::fs::create_dir_all(tmp.join("config")).unwrap();
    std::fs::create_dir_all(tmp.join("data")).unwrap();
    std::fs::write(
        tmp.join("config/playerport.toml"),
        format!(
            "[organization]\nid = \"{ORG}\"\n\n\
             [backend]\nkind = \"sqlite\"\n\n\
             [database]\npath = \"data/playerport.db\"\n\n\
             [import]\nconcurrency = 1\n"
        ),
    )
    .unwrap();
    std::fs::write(tmp.join("players.csv"), PLAYERS_CSV).unwrap();

    let store = open_store(&tmp);
    store
        .insert_team(&NewTeam {
            name: "U12 Boys".into(),
            organization_id: ORG.into(),
            sport: "GAA Football".into(),
            age_group: "U12".into(),
            gender: Gender::Boys,
            season: "2025".into(),
            is_active: true,
        })
        .unwrap();
    tmp
}

fn open_store(base: &Path) -> Store {
    Store::open(&base.join("data/playerport.db").to_string_lossy()).unwrap()
}

fn cli(base: &Path, args: &[&str]) -> Cli {
    let mut argv = vec![
        "playerport".to_string(),
        "--config-dir".to_string(),
        base.display().to_string(),
    ];
    argv.extend(args.iter().map(|a| a.to_string()));
    Cli::try_parse_from(argv).unwrap()
}

#[tokio::test]
async fn import_with_create_missing_imports_every_row() {
    let base = setup("create_missing");
    let csv = base.join("players.csv").display().to_string();

    commands::run(cli(&base, &["import", &csv, "--create-missing"]))
        .await
        .unwrap();

    let store = open_store(&base);
    assert_eq!(store.teams(ORG).unwrap().len(), 2);
    assert_eq!(store.player_count(ORG).unwrap(), 2);

    let runs = store.recent_runs(ORG, 5).unwrap();
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0].source, csv);
    assert_eq!((runs[0].total, runs[0].succeeded, runs[0].failed), (2, 2, 0));

    let _ = std::fs::remove_dir_all(&base);
}

#[tokio::test]
async fn import_without_create_missing_skips_unmatched_rows() {
    let base = setup("matched_only");
    let csv = base.join("players.csv").display().to_string();

    commands::run(cli(&base, &["import", &csv])).await.unwrap();

    let store = open_store(&base);
    assert_eq!(store.teams(ORG).unwrap().len(), 1);
    assert_eq!(store.player_count(ORG).unwrap(), 1);

    // history reads the run just recorded.
    commands::run(cli(&base, &["history", "--limit", "3"]))
        .await
        .unwrap();

    let _ = std::fs::remove_dir_all(&base);
}

#[tokio::test]
async fn org_override_without_teams_fails() {
    let base = setup("no_teams");
    let csv = base.join("players.csv").display().to_string();

    let err = commands::run(cli(&base, &["--org", "empty_org", "parse", &csv]))
        .await
        .unwrap_err();
    assert!(format!("{err:#}").contains("no teams found"), "{err:#}");

    let _ = std::fs::remove_dir_all(&base);
}

#[tokio::test]
async fn parse_sample_does_not_write_players() {
    let base = setup("parse_sample");

    commands::run(cli(&base, &["parse", "--sample"])).await.unwrap();
    assert_eq!(open_store(&base).player_count(ORG).unwrap(), 0);

    let _ = std::fs::remove_dir_all(&base);
}

#[tokio::test]
async fn template_written_into_directory() {
    let base = setup("template");
    let out = base.display().to_string();

    commands::run(cli(&base, &["template", "--out", &out]))
        .await
        .unwrap();
    let written = std::fs::read_to_string(base.join("player_import_template.csv")).unwrap();
    assert!(written.starts_with("Name,AgeGroup,Sport,Gender,Season"));

    let _ = std::fs::remove_dir_all(&base);
}

/// Temp dir holding only the shipped defaults, as on a fresh install.
fn fresh_install(name: &str) -> PathBuf {
    let tmp = std::env::temp_dir().join(format!("playerport_fresh_{name}_{}", std::process::id()));
    let _ = std::fs::remove_dir_all(&tmp);
    std::fs::create_dir_all(tmp.join("defaults")).unwrap();
    std::fs::copy("defaults/playerport.toml", tmp.join("defaults/playerport.toml")).unwrap();
    tmp
}

#[tokio::test]
async fn fresh_install_needs_a_team_then_imports_sample() {
    let base = fresh_install("sample");

    // Nothing to match against yet.
    let err = commands::run(cli(&base, &["import", "--sample", "--create-missing"]))
        .await
        .unwrap_err();
    assert!(format!("{err:#}").contains("no teams found"), "{err:#}");

    commands::run(cli(
        &base,
        &[
            "teams",
            "add",
            "--sport",
            "GAA Football",
            "--age-group",
            "U12",
            "--gender",
            "Male",
            "--season",
            "2025",
        ],
    ))
    .await
    .unwrap();
    commands::run(cli(&base, &["teams", "list"])).await.unwrap();

    commands::run(cli(&base, &["import", "--sample", "--create-missing"]))
        .await
        .unwrap();

    let store = Store::open(&base.join("playerport.db").to_string_lossy()).unwrap();
    let teams = store.teams("demo-club").unwrap();
    assert_eq!(teams[0].name, "U12 Boys");
    // U10 Girls, U14 Boys and U12 Girls hurling were created for the rest.
    assert_eq!(teams.len(), 4);
    assert_eq!(store.player_count("demo-club").unwrap(), 4);

    let runs = store.recent_runs("demo-club", 5).unwrap();
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0].source, "sample");

    let _ = std::fs::remove_dir_all(&base);
}
