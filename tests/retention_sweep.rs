use chrono::{DateTime, Duration, NaiveTime, TimeZone, Utc};
use hrms_kernel::{
    config::RetentionConfig,
    models::{ClockRecord, ClockStatus, MEDIA_FIELDS},
    repository::MemoryStore,
    services::retention::run_retention_sweep,
};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 9, 1, 3, 0, 0).unwrap()
}

/// A completed day with every photo and address populated.
fn record_captured(days_ago: i64) -> ClockRecord {
    let captured = now() - Duration::days(days_ago);
    let mut r = ClockRecord::new(Uuid::new_v4(), captured.date_naive(), captured);
    let t = |h| NaiveTime::from_hms_opt(h, 0, 0);
    r.clock_in_1 = t(9);
    r.clock_out_1 = t(13);
    r.clock_in_2 = t(14);
    r.clock_out_2 = t(18);
    r.location_in_1 = Some("3.139003,101.686855".to_string());
    r.photo_in_1 = Some("cGhvdG8x".to_string());
    r.photo_out_1 = Some("cGhvdG8y".to_string());
    r.photo_in_2 = Some("cGhvdG8z".to_string());
    r.photo_out_2 = Some("cGhvdG80".to_string());
    r.address_in_1 = Some("Jalan Ampang, Kuala Lumpur".to_string());
    r.address_out_1 = Some("Jalan Ampang, Kuala Lumpur".to_string());
    r.address_in_2 = Some("Jalan Ampang, Kuala Lumpur".to_string());
    r.address_out_2 = Some("Jalan Ampang, Kuala Lumpur".to_string());
    r.face_detected_in_1 = Some(true);
    r.face_detected_out_1 = Some(true);
    r.face_detected_in_2 = Some(true);
    r.face_detected_out_2 = Some(true);
    r.total_work_minutes = 480;
    r.status = ClockStatus::Completed;
    r.version = 4;
    r.media_retention_eligible_at = Some(captured);
    r
}

#[tokio::test]
async fn clears_every_media_field_and_logs_it() {
    let store = MemoryStore::new();
    let old = record_captured(200);
    let id = old.id;
    store.put_clock_record(old.clone());

    let report = run_retention_sweep(
        &store,
        &RetentionConfig::default(),
        now(),
        &CancellationToken::new(),
    )
    .await
    .unwrap();

    assert_eq!(report.deleted, 1);
    assert_eq!(report.errors, 0);
    assert_eq!(report.exit_code(), 0);

    let swept = store.clock_record(id).unwrap();
    assert!(!swept.has_media());
    assert_eq!(swept.media_deleted_at, Some(now()));
    assert_eq!(
        (swept.clock_in_1, swept.clock_out_1, swept.clock_in_2, swept.clock_out_2),
        (old.clock_in_1, old.clock_out_1, old.clock_in_2, old.clock_out_2)
    );
    assert_eq!(swept.face_detected_in_1, Some(true));
    assert_eq!(swept.face_detected_out_2, Some(true));
    assert_eq!(swept.location_in_1, old.location_in_1);
    assert_eq!(swept.total_work_minutes, 480);

    let logs = store.retention_logs();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].clock_record_id, id);
    assert_eq!(logs[0].cleared_at, now());
    assert_eq!(logs[0].cleared_fields, MEDIA_FIELDS.map(String::from).to_vec());

    assert_eq!(report.summary.completed, 1);
    assert_eq!(report.summary.pending, 0);
}

#[tokio::test]
async fn recent_records_are_left_alone_and_rerun_is_a_no_op() {
    let store = MemoryStore::new();
    let old = record_captured(200);
    let fresh = record_captured(30);
    let fresh_id = fresh.id;
    store.put_clock_record(old);
    store.put_clock_record(fresh);
    let config = RetentionConfig::default();
    let cancel = CancellationToken::new();

    let first = run_retention_sweep(&store, &config, now(), &cancel).await.unwrap();
    assert_eq!(first.deleted, 1);
    assert!(store.clock_record(fresh_id).unwrap().has_media());

    let second = run_retention_sweep(&store, &config, now(), &cancel).await.unwrap();
    assert_eq!(second.processed, 0);
    assert_eq!(second.deleted, 0);
    assert_eq!(store.retention_logs().len(), 1);
    assert_eq!(second.summary.total, 2);
    assert_eq!(second.summary.completed, 1);
}

#[tokio::test]
async fn dry_run_changes_nothing() {
    let store = MemoryStore::new();
    let old = record_captured(200);
    let id = old.id;
    store.put_clock_record(old.clone());
    let config = RetentionConfig {
        dry_run: true,
        ..RetentionConfig::default()
    };

    let report = run_retention_sweep(&store, &config, now(), &CancellationToken::new())
        .await
        .unwrap();

    assert!(report.dry_run);
    assert_eq!(report.planned, 1);
    assert_eq!(report.deleted, 0);
    assert_eq!(store.clock_record(id).unwrap(), old);
    assert!(store.retention_logs().is_empty());
    assert_eq!(report.summary.pending, 1);
}

#[tokio::test]
async fn force_ignores_the_window() {
    let store = MemoryStore::new();
    let fresh = record_captured(3);
    let id = fresh.id;
    store.put_clock_record(fresh);
    let config = RetentionConfig {
        force: true,
        ..RetentionConfig::default()
    };

    let report = run_retention_sweep(&store, &config, now(), &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(report.deleted, 1);
    assert!(store.clock_record(id).unwrap().media_deleted_at.is_some());
}

#[tokio::test]
async fn one_failing_record_does_not_stop_the_sweep() {
    let store = MemoryStore::new();
    let mut ids = Vec::new();
    for days in [400, 300, 250, 190] {
        let r = record_captured(days);
        ids.push(r.id);
        store.put_clock_record(r);
    }
    store.fail_media_clear_for(ids[0]);
    let config = RetentionConfig {
        batch_size: 2,
        ..RetentionConfig::default()
    };

    let report = run_retention_sweep(&store, &config, now(), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.deleted, 3);
    assert_eq!(report.errors, 1);
    assert_eq!(report.failures[0].0, ids[0]);
    assert_eq!(report.exit_code(), 1);
    assert!(store.clock_record(ids[0]).unwrap().has_media());
    assert_eq!(store.retention_logs().len(), 3);
    assert_eq!(report.summary.overdue, 1);
}

#[tokio::test]
async fn run_cap_limits_the_work() {
    let store = MemoryStore::new();
    for days in [400, 300, 250] {
        store.put_clock_record(record_captured(days));
    }
    let config = RetentionConfig {
        batch_size: 1,
        max_records_per_run: 2,
        ..RetentionConfig::default()
    };

    let report = run_retention_sweep(&store, &config, now(), &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(report.processed, 2);
    assert_eq!(report.deleted, 2);
    assert_eq!(report.summary.pending, 1);
}

#[tokio::test]
async fn cancelled_sweep_stops_before_touching_records() {
    let store = MemoryStore::new();
    let old = record_captured(200);
    let id = old.id;
    store.put_clock_record(old);
    let cancel = CancellationToken::new();
    cancel.cancel();

    let report = run_retention_sweep(&store, &RetentionConfig::default(), now(), &cancel)
        .await
        .unwrap();

    assert!(report.cancelled);
    assert_eq!(report.processed, 0);
    assert!(store.clock_record(id).unwrap().has_media());
}
