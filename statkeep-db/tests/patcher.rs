//! Patch-engine behavior: ordering, idempotence, failure recovery, gaps.

use statkeep_db::{
    Database, DbSettings, PatchError, PatchSet, Query, apply_named, apply_pending, schema_version,
};
use tempfile::TempDir;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn open_db(dir: &TempDir) -> Database {
    Database::connect(DbSettings::new(dir.path().join("stats.db"))).unwrap()
}

/// Numbered script that logs its own application. Patch 1 also creates
/// the tables the run itself needs.
fn logged_patch(version: u32) -> String {
    let mut sql = String::new();
    if version == 1 {
        sql.push_str(
            "CREATE TABLE IF NOT EXISTS settings (key TEXT PRIMARY KEY, value TEXT NOT NULL);\n\
             CREATE TABLE IF NOT EXISTS patch_log (version INTEGER NOT NULL);\n",
        );
    }
    sql.push_str(&format!("INSERT INTO patch_log (version) VALUES ({version});\n"));
    sql
}

fn logged_set(versions: impl IntoIterator<Item = u32>) -> PatchSet {
    versions
        .into_iter()
        .fold(PatchSet::new(), |set, v| set.with_patch(v, logged_patch(v)))
}

fn applied_versions(db: &Database) -> Vec<i32> {
    db.try_query("SELECT version FROM patch_log ORDER BY rowid", &[])
        .unwrap()
        .iter()
        .map(|row| row.get_int("version").unwrap())
        .collect()
}

#[test]
fn fresh_store_reads_as_version_zero() {
    init_logging();
    let dir = TempDir::new().unwrap();
    let db = open_db(&dir);
    assert_eq!(schema_version(&db).unwrap(), 0);
}

#[test]
fn contiguous_patches_apply_once_in_order() {
    init_logging();
    let dir = TempDir::new().unwrap();
    let db = open_db(&dir);
    let patches = logged_set(1..=4);

    let summary = apply_pending(&db, &patches, false).unwrap();
    assert_eq!(summary.from, 0);
    assert_eq!(summary.to, 4);
    assert_eq!(summary.applied, 4);
    assert_eq!(schema_version(&db).unwrap(), 4);
    assert_eq!(applied_versions(&db), vec![1, 2, 3, 4]);

    // A second run finds nothing to do and re-executes nothing.
    let summary = apply_pending(&db, &patches, false).unwrap();
    assert_eq!(summary.applied, 0);
    assert_eq!(applied_versions(&db), vec![1, 2, 3, 4]);
}

#[test]
fn recorded_version_survives_a_restart() {
    init_logging();
    let dir = TempDir::new().unwrap();
    let patches = logged_set(1..=2);

    let db = open_db(&dir);
    apply_pending(&db, &patches, false).unwrap();
    db.close();

    // A fresh process picks up where the last one stopped.
    let db = open_db(&dir);
    assert_eq!(schema_version(&db).unwrap(), 2);
    let summary = apply_pending(&db, &patches, false).unwrap();
    assert_eq!(summary.applied, 0);
    assert_eq!(applied_versions(&db), vec![1, 2]);
}

#[test]
fn failing_patch_aborts_and_reruns_from_the_same_version() {
    init_logging();
    let dir = TempDir::new().unwrap();
    let db = open_db(&dir);

    let broken = logged_set([1, 3])
        .with_patch(2, "INSERT INTO no_such_table (x) VALUES (1);");
    let err = apply_pending(&db, &broken, false).unwrap_err();
    match err {
        PatchError::Script { version, .. } => assert_eq!(version, 2),
        other => panic!("unexpected error: {other}"),
    }
    // Version stuck at the last success; patch 3 never ran.
    assert_eq!(schema_version(&db).unwrap(), 1);
    assert_eq!(applied_versions(&db), vec![1]);

    // Supplying a fixed patch 2 resumes at 2, not 1 or 3.
    let fixed = logged_set(1..=3);
    let summary = apply_pending(&db, &fixed, false).unwrap();
    assert_eq!(summary.from, 1);
    assert_eq!(summary.to, 3);
    assert_eq!(applied_versions(&db), vec![1, 2, 3]);
}

#[test]
fn gap_halts_discovery_even_with_later_patches_present() {
    init_logging();
    let dir = TempDir::new().unwrap();
    let db = open_db(&dir);

    let gapped = logged_set([1, 3]);
    let summary = apply_pending(&db, &gapped, false).unwrap();
    assert_eq!(summary.to, 1);
    assert_eq!(schema_version(&db).unwrap(), 1);
    assert_eq!(applied_versions(&db), vec![1]);

    // Once patch 2 exists the walk continues past it.
    let complete = logged_set(1..=3);
    let summary = apply_pending(&db, &complete, false).unwrap();
    assert_eq!(summary.to, 3);
    assert_eq!(applied_versions(&db), vec![1, 2, 3]);
}

#[test]
fn force_restarts_the_walk_from_zero() {
    init_logging();
    let dir = TempDir::new().unwrap();
    let db = open_db(&dir);
    let patches = PatchSet::bundled();

    apply_pending(&db, &patches, false).unwrap();
    assert_eq!(schema_version(&db).unwrap(), 3);

    // The bundled scripts are written to survive reapplication.
    let summary = apply_pending(&db, &patches, true).unwrap();
    assert_eq!(summary.from, 0);
    assert_eq!(summary.to, 3);
    assert_eq!(summary.applied, 3);
    assert_eq!(schema_version(&db).unwrap(), 3);
}

#[test]
fn named_patch_runs_without_touching_the_version() {
    init_logging();
    let dir = TempDir::new().unwrap();
    let db = open_db(&dir);
    let patches = PatchSet::bundled();
    apply_pending(&db, &patches, false).unwrap();

    assert!(
        Query::table("players")
            .value("player_id", 42)
            .value("name", "dakota")
            .value("online", true)
            .insert(&db)
    );

    assert!(apply_named(&db, &patches, "offline_reset").unwrap());
    let rows = Query::table("players").filter("player_id", 42).select(&db);
    assert!(!rows[0].get_bool("online").unwrap());
    assert_eq!(schema_version(&db).unwrap(), 3);

    // Unknown ids are reported, not fatal.
    assert!(!apply_named(&db, &patches, "no_such_patch").unwrap());
}

#[test]
fn bundled_schema_supports_the_statistics_tables() {
    init_logging();
    let dir = TempDir::new().unwrap();
    let db = open_db(&dir);
    apply_pending(&db, &PatchSet::bundled(), false).unwrap();

    for table in ["settings", "players", "total_blocks", "total_distances"] {
        let rows = db
            .try_query(
                "SELECT name FROM sqlite_master WHERE type = 'table' AND name = ?1",
                &[table.into()],
            )
            .unwrap();
        assert_eq!(rows.len(), 1, "missing table {table}");
    }
}
