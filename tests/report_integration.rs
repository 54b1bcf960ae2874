//! Report pipeline integration tests over a SQLite source file

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use rusqlite::{params, Connection};
use serde_json::Value;

use roster_attrs::convert::AttributeConverter;
use roster_attrs::core::{ImportError, PipelineConfig, DEFAULT_PROFILE_PATH};
use roster_attrs::profile::load_profile;
use roster_attrs::report::{write_json, ReportGenerator, SourceStore};

const PUSHES: [&str; 4] = ["Main Event", "Midcard", "TRAINEE", ""];

fn bundled_profile_path() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join(DEFAULT_PROFILE_PATH)
}

/// A roster missing several profile columns (acting, psychology, stamina,
/// inring, entertainment) so they are read as NULL.
fn create_roster(path: &Path, workers: i64) {
    let conn = Connection::open(path).unwrap();
    conn.execute_batch(
        "CREATE TABLE workers (
            id INTEGER PRIMARY KEY,
            first_name TEXT,
            last_name TEXT,
            technique INTEGER,
            selling REAL,
            promo INTEGER,
            charisma TEXT,
            age INTEGER,
            experience_years INTEGER,
            push TEXT
        );",
    )
    .unwrap();

    for id in 1..=workers {
        let technique = (id * 37) % 101;
        let selling = ((id * 53) % 101) as f64;
        let promo = if id % 5 == 0 { None } else { Some((id * 29) % 101) };
        let charisma = ((id * 41) % 101).to_string();
        conn.execute(
            "INSERT INTO workers VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                id,
                format!("Worker{}", id),
                "Test",
                technique,
                selling,
                promo,
                charisma,
                18 + id % 30,
                id % 25,
                PUSHES[(id % 4) as usize],
            ],
        )
        .unwrap();
    }
}

fn run_report(source: &Path, out: &Path, seed: u64) {
    let profile = load_profile(&bundled_profile_path()).unwrap();
    let store = SourceStore::open(source).unwrap();
    let generator = ReportGenerator::new(PipelineConfig::default()).unwrap();
    let mut converter = AttributeConverter::seeded(profile, seed);

    let report = generator.generate(&store, &mut converter).unwrap();
    write_json(out, &report).unwrap();
}

fn read_json(path: &Path) -> Value {
    serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
}

#[test]
fn test_report_shape_and_outliers() {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("roster.db");
    let out = dir.path().join("report.json");
    create_roster(&source, 60);

    run_report(&source, &out, 1337);
    let report = read_json(&out);

    assert_eq!(report["sourceTable"], "workers");

    let converted = report["converted"]["attributes"].as_object().unwrap();
    assert_eq!(converted.len(), 8);
    for (id, stats) in converted {
        assert_eq!(stats["count"], 60, "{}", id);
        assert!(stats["min"].as_f64().unwrap() >= 1.0);
        assert!(stats["max"].as_f64().unwrap() <= 20.0);
        assert_eq!(stats["histogram"].as_array().unwrap().len(), 20);
    }

    // absent column: no raw values observed
    assert_eq!(report["source"]["attributes"]["acting"]["count"], 0);
    // promo is NULL for every fifth worker
    assert_eq!(report["source"]["attributes"]["promo"]["count"], 48);

    let overboosted = report["overboosted"].as_array().unwrap();
    let too_weak = report["tooWeak"].as_array().unwrap();
    assert_eq!(overboosted.len(), 20);
    assert_eq!(too_weak.len(), 20);
    assert!(overboosted[0]["average"].as_f64() >= too_weak[0]["average"].as_f64());
    assert!(overboosted[0]["name"].as_str().unwrap().ends_with(" Test"));
}

#[test]
fn test_same_seed_writes_identical_reports() {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("roster.db");
    create_roster(&source, 45);

    let first = dir.path().join("first.json");
    let second = dir.path().join("second.json");
    run_report(&source, &first, 42);
    run_report(&source, &second, 42);

    assert_eq!(fs::read(&first).unwrap(), fs::read(&second).unwrap());
}

#[test]
fn test_export_lists_every_worker() {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("roster.db");
    create_roster(&source, 12);

    let profile = load_profile(&bundled_profile_path()).unwrap();
    let store = SourceStore::open(&source).unwrap();
    let generator = ReportGenerator::new(PipelineConfig::default()).unwrap();
    let mut converter = AttributeConverter::seeded(profile, 0);

    let workers = generator.export(&store, &mut converter).unwrap();
    assert_eq!(workers.len(), 12);
    assert_eq!(workers[0].worker_id, "1");
    assert_eq!(workers[0].name, "Worker1 Test");
    assert!(workers.iter().all(|w| w.attributes.len() == 8));
}

#[test]
fn test_missing_source_store() {
    let dir = tempfile::tempdir().unwrap();
    let result = SourceStore::open(&dir.path().join("absent.db"));
    assert!(matches!(result, Err(ImportError::SourceNotFound(_))));
}

#[test]
fn test_cli_attr_report() {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("roster.db");
    let out = dir.path().join("report.json");
    create_roster(&source, 25);

    let status = Command::new(env!("CARGO_BIN_EXE_roster-attrs"))
        .arg("attr-report")
        .arg("--source")
        .arg(&source)
        .arg("--out")
        .arg(&out)
        .arg("--profile")
        .arg(bundled_profile_path())
        .arg("--seed")
        .arg("5")
        .status()
        .unwrap();

    assert!(status.success());
    assert_eq!(read_json(&out)["sourceTable"], "workers");
}

#[test]
fn test_cli_fails_without_source() {
    let dir = tempfile::tempdir().unwrap();
    let output = Command::new(env!("CARGO_BIN_EXE_roster-attrs"))
        .arg("attr-report")
        .arg("--out")
        .arg(dir.path().join("report.json"))
        .arg("--profile")
        .arg(bundled_profile_path())
        .output()
        .unwrap();

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("--source"));
}

#[test]
fn test_cli_fails_on_malformed_profile() {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("roster.db");
    let profile = dir.path().join("broken.json");
    create_roster(&source, 3);
    fs::write(&profile, r#"{ "sourceTable": "workers" }"#).unwrap();

    let status = Command::new(env!("CARGO_BIN_EXE_roster-attrs"))
        .arg("export")
        .arg("--source")
        .arg(&source)
        .arg("--out")
        .arg(dir.path().join("workers.json"))
        .arg("--profile")
        .arg(&profile)
        .status()
        .unwrap();

    assert!(!status.success());
}
