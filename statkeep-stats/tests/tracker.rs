//! Intake gating around blocking and background patch runs.

use statkeep_db::{Database, DbSettings, PatchSet, Query, schema_version};
use statkeep_stats::Tracker;
use tempfile::TempDir;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn open_db(dir: &TempDir) -> Database {
    Database::connect(DbSettings::new(dir.path().join("stats.db"))).unwrap()
}

#[test]
fn intake_opens_after_a_successful_blocking_run() {
    init_logging();
    let dir = TempDir::new().unwrap();
    let tracker = Tracker::new(open_db(&dir), PatchSet::bundled());

    assert!(tracker.is_paused());
    let summary = tracker.patch_blocking(false).unwrap();
    assert_eq!(summary.to, 3);
    assert!(!tracker.is_paused());
    assert_eq!(schema_version(tracker.database()).unwrap(), 3);
}

#[test]
fn intake_stays_paused_when_the_blocking_run_fails() {
    init_logging();
    let dir = TempDir::new().unwrap();
    let patches = PatchSet::new().with_patch(1, "INSERT INTO no_such_table (x) VALUES (1);");
    let tracker = Tracker::new(open_db(&dir), patches);

    assert!(tracker.patch_blocking(false).is_err());
    assert!(tracker.is_paused());
}

#[test]
fn background_run_patches_and_reopens_intake() {
    init_logging();
    let dir = TempDir::new().unwrap();
    let tracker = Tracker::new(open_db(&dir), PatchSet::bundled());

    let handle = tracker.patch_background(false);
    let summary = handle.join().unwrap().unwrap();
    assert_eq!(summary.from, 0);
    assert_eq!(summary.to, 3);
    assert!(!tracker.is_paused());
    assert_eq!(schema_version(tracker.database()).unwrap(), 3);
}

#[test]
fn background_failure_still_reopens_intake() {
    init_logging();
    let dir = TempDir::new().unwrap();
    let patches = PatchSet::new().with_patch(1, "INSERT INTO no_such_table (x) VALUES (1);");
    let tracker = Tracker::new(open_db(&dir), patches);

    let handle = tracker.patch_background(false);
    assert!(handle.join().unwrap().is_err());
    // Failure is reported, not wedging: producers may resume against a
    // store that simply is not up to date.
    assert!(!tracker.is_paused());
}

#[test]
fn named_patch_runs_through_the_tracker() {
    init_logging();
    let dir = TempDir::new().unwrap();
    let tracker = Tracker::new(open_db(&dir), PatchSet::bundled());
    tracker.patch_blocking(false).unwrap();

    assert!(
        Query::table("players")
            .value("player_id", 8)
            .value("name", "ghost")
            .value("online", true)
            .insert(tracker.database())
    );
    assert!(tracker.run_named_patch("offline_reset").unwrap());
    let rows = Query::table("players")
        .filter("player_id", 8)
        .select(tracker.database());
    assert!(!rows[0].get_bool("online").unwrap());
}
