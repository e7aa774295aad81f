//! Integration tests for recast-send daemon

use assert_cmd::Command;
use chrono::{Duration, TimeZone, Utc};
use librecast::{
    IntervalUnit, JsonStore, QueuedPost, Schedule, ScheduleFrequency, ScheduleStore,
};
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

/// Setup test environment with config and an app-data document path
fn setup_test_env() -> (TempDir, String, String) {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("config.toml");
    let data_path = temp_dir.path().join("appdata.json");

    // Create minimal config; no [platform] section, so publishes run in
    // dry-run mode.
    let config_content = format!(
        r#"
[store]
path = "{}"

[scheduling]
tick_interval_minutes = 1
governor_interval_ms = 0
max_attempts = 3
retry_delay_secs = 0
"#,
        data_path.display().to_string().replace('\\', "/")
    );

    fs::write(&config_path, config_content).unwrap();

    (
        temp_dir,
        config_path.to_str().unwrap().to_string(),
        data_path.to_str().unwrap().to_string(),
    )
}

fn hourly_schedule(group: &str) -> Schedule {
    let mut schedule = Schedule::new(
        "hourly backlog".to_string(),
        group.to_string(),
        ScheduleFrequency::new(1, IntervalUnit::Hour),
    );
    schedule.accounts = vec!["main".to_string()];
    schedule
}

/// Seed the app-data document the way the UI would have written it.
async fn seed(data_path: &str, schedules: Vec<Schedule>, posts: Vec<QueuedPost>) {
    let store = JsonStore::new(data_path);
    store.save_posts(posts).await.unwrap();
    store.load_schedules().await.unwrap();
    store.save_schedules(schedules).await.unwrap();
}

async fn load(data_path: &str) -> librecast::AppData {
    JsonStore::new(data_path).load().await.unwrap()
}

// BASIC FUNCTIONALITY TESTS

#[tokio::test]
async fn test_once_flag_exits_immediately() {
    let (_temp_dir, config_path, _data_path) = setup_test_env();

    let mut cmd = Command::cargo_bin("recast-send").unwrap();

    // Should exit successfully with --once even with no schedules
    cmd.env("RECAST_CONFIG", &config_path)
        .arg("--once")
        .assert()
        .success()
        .stderr(predicate::str::contains("recast-send daemon starting"))
        .stderr(predicate::str::contains("evaluated schedules once, exiting"))
        .stderr(predicate::str::contains("recast-send daemon stopped"));
}

#[tokio::test]
async fn test_verbose_logging() {
    let (_temp_dir, config_path, _data_path) = setup_test_env();

    let mut cmd = Command::cargo_bin("recast-send").unwrap();

    cmd.env("RECAST_CONFIG", &config_path)
        .arg("--once")
        .arg("--verbose")
        .assert()
        .success();
}

#[tokio::test]
async fn test_custom_poll_interval() {
    let (_temp_dir, config_path, _data_path) = setup_test_env();

    let mut cmd = Command::cargo_bin("recast-send").unwrap();

    cmd.env("RECAST_CONFIG", &config_path)
        .arg("--once")
        .arg("--poll-interval")
        .arg("5")
        .assert()
        .success()
        .stderr(predicate::str::contains("Tick interval: 300s"));
}

#[tokio::test]
async fn test_dry_run_mode_without_platform_command() {
    let (_temp_dir, config_path, _data_path) = setup_test_env();

    let mut cmd = Command::cargo_bin("recast-send").unwrap();

    cmd.env("RECAST_CONFIG", &config_path)
        .arg("--once")
        .assert()
        .success()
        .stderr(predicate::str::contains("dry-run mode"));
}

// TICK BEHAVIOR TESTS

#[tokio::test]
async fn test_once_bootstraps_new_schedule_without_publishing() {
    let (_temp_dir, config_path, data_path) = setup_test_env();
    seed(
        &data_path,
        vec![hourly_schedule("g")],
        vec![QueuedPost::new("g".to_string(), "draft".to_string())],
    )
    .await;

    let mut cmd = Command::cargo_bin("recast-send").unwrap();
    cmd.env("RECAST_CONFIG", &config_path)
        .arg("--once")
        .assert()
        .success();

    // The baseline tick sets last_triggered but consumes no post.
    let data = load(&data_path).await;
    assert!(data.schedules[0].last_triggered.is_some());
    assert!(data.posts[0].republished_at.is_none());
}

#[tokio::test]
async fn test_once_publishes_due_schedule() {
    let (_temp_dir, config_path, data_path) = setup_test_env();
    let mut schedule = hourly_schedule("g");
    // The next occurrence lands a few seconds in the past, inside the
    // one-minute tick window.
    schedule.last_triggered = Some(Utc::now() - Duration::hours(1) - Duration::seconds(10));
    seed(
        &data_path,
        vec![schedule],
        vec![QueuedPost::new("g".to_string(), "draft".to_string())],
    )
    .await;

    let mut cmd = Command::cargo_bin("recast-send").unwrap();
    cmd.env("RECAST_CONFIG", &config_path)
        .arg("--once")
        .assert()
        .success()
        .stderr(predicate::str::contains("schedule is due"));

    let data = load(&data_path).await;
    assert!(data.posts[0].republished_at.is_some());
}

#[tokio::test]
async fn test_once_skips_occurrence_missed_beyond_window() {
    let (_temp_dir, config_path, data_path) = setup_test_env();
    let mut schedule = hourly_schedule("g");
    let last = Utc::now() - Duration::hours(6);
    schedule.last_triggered = Some(last);
    seed(
        &data_path,
        vec![schedule],
        vec![QueuedPost::new("g".to_string(), "draft".to_string())],
    )
    .await;

    let mut cmd = Command::cargo_bin("recast-send").unwrap();
    cmd.env("RECAST_CONFIG", &config_path)
        .arg("--once")
        .assert()
        .success();

    // No catch-up: the post stays queued and the baseline does not move.
    let data = load(&data_path).await;
    assert!(data.posts[0].republished_at.is_none());
    assert_eq!(data.schedules[0].last_triggered, Some(last));
}

// CLI ACTION TESTS

#[tokio::test]
async fn test_trigger_now_publishes_and_persists() {
    let (_temp_dir, config_path, data_path) = setup_test_env();
    let schedule = hourly_schedule("g");
    let schedule_id = schedule.id.clone();
    seed(
        &data_path,
        vec![schedule],
        vec![QueuedPost::new("g".to_string(), "draft".to_string())],
    )
    .await;

    let mut cmd = Command::cargo_bin("recast-send").unwrap();
    cmd.env("RECAST_CONFIG", &config_path)
        .arg("--trigger-now")
        .arg(&schedule_id)
        .assert()
        .success();

    let data = load(&data_path).await;
    assert!(data.posts[0].republished_at.is_some());
    assert!(data.schedules[0].last_triggered.is_some());
}

#[tokio::test]
async fn test_trigger_now_unknown_schedule_exits_not_found() {
    let (_temp_dir, config_path, _data_path) = setup_test_env();

    let mut cmd = Command::cargo_bin("recast-send").unwrap();
    cmd.env("RECAST_CONFIG", &config_path)
        .arg("--trigger-now")
        .arg("missing")
        .assert()
        .failure()
        .code(4)
        .stderr(predicate::str::contains("schedule not found"));
}

#[tokio::test]
async fn test_lookups_prints_json_preview() {
    let (_temp_dir, config_path, data_path) = setup_test_env();
    let mut schedule = hourly_schedule("g");
    schedule.last_triggered = Some(Utc.with_ymd_and_hms(2025, 9, 23, 9, 0, 0).unwrap());
    let schedule_id = schedule.id.clone();
    seed(
        &data_path,
        vec![schedule],
        vec![
            QueuedPost::new("g".to_string(), "first".to_string()),
            QueuedPost::new("g".to_string(), "second".to_string()),
        ],
    )
    .await;

    let mut cmd = Command::cargo_bin("recast-send").unwrap();
    let output = cmd
        .env("RECAST_CONFIG", &config_path)
        .arg("--lookups")
        .arg(&schedule_id)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let preview: serde_json::Value = serde_json::from_slice(&output).unwrap();
    assert_eq!(preview["next_occurrences"].as_array().unwrap().len(), 3);
    assert_eq!(preview["next_posts"].as_array().unwrap().len(), 2);
    assert_eq!(preview["next_posts"][0]["content"], "first");

    // Read-only: nothing was published.
    let data = load(&data_path).await;
    assert!(data.posts.iter().all(|p| p.republished_at.is_none()));
}

#[tokio::test]
async fn test_lookups_unknown_schedule_exits_not_found() {
    let (_temp_dir, config_path, _data_path) = setup_test_env();

    let mut cmd = Command::cargo_bin("recast-send").unwrap();
    cmd.env("RECAST_CONFIG", &config_path)
        .arg("--lookups")
        .arg("missing")
        .assert()
        .failure()
        .code(4);
}

// CONFIGURATION TESTS

#[tokio::test]
async fn test_daemon_requires_parseable_config() {
    let temp_dir = TempDir::new().unwrap();
    let invalid_config = temp_dir.path().join("invalid.toml");

    // Create invalid config
    fs::write(&invalid_config, "invalid toml content [[[").unwrap();

    let mut cmd = Command::cargo_bin("recast-send").unwrap();

    cmd.env("RECAST_CONFIG", invalid_config.to_str().unwrap())
        .arg("--once")
        .assert()
        .failure()
        .code(2);
}

#[tokio::test]
async fn test_defaults_fill_missing_scheduling_section() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("config.toml");
    let data_path = temp_dir.path().join("appdata.json");

    // Config with only a store path; everything else defaults.
    let config_content = format!(
        r#"
[store]
path = "{}"
"#,
        data_path.display().to_string().replace('\\', "/")
    );
    fs::write(&config_path, config_content).unwrap();

    let mut cmd = Command::cargo_bin("recast-send").unwrap();

    cmd.env("RECAST_CONFIG", config_path.to_str().unwrap())
        .arg("--once")
        .assert()
        .success()
        .stderr(predicate::str::contains("Tick interval: 60s"));
}
