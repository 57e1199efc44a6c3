//! Backup and restore passes between an etcd backend and a SQLite mirror.

mod common;

use common::test_db::TestDatabase;
use common::{etcd_backend, item};
use gantry::storage::MirrorStore;
use gantry::sync::{sync_backend_to_mirror, sync_mirror_to_backend, SyncDirection, SYNC_ACTOR};
use gantry::{ConfigBackend, ConfigItem, Scope};

fn dev() -> Scope {
    Scope::new("t1", "p1", "dev")
}

#[tokio::test]
async fn test_backup_copies_backend_then_reruns_as_noop() {
    let db = TestDatabase::new("backup_noop").await;
    let mirror = db.mirror();
    let (_etcd, backend) = etcd_backend();
    backend.publish(&item("dev", "A", "1")).await.unwrap();
    backend.publish(&item("dev", "B", "2")).await.unwrap();

    let report = sync_backend_to_mirror(&dev(), backend.as_ref(), &mirror).await.unwrap();
    assert_eq!(report.direction, SyncDirection::BackendToMirror);
    assert_eq!((report.scanned, report.written, report.skipped), (2, 2, 0));

    let records = mirror.find_all(&dev()).await.unwrap();
    let values: Vec<(&str, &str)> =
        records.iter().map(|r| (r.key.as_str(), r.value.as_str())).collect();
    assert_eq!(values, vec![("A", "1"), ("B", "2")]);
    assert!(records.iter().all(|r| r.last_update_user == SYNC_ACTOR));

    let rerun = sync_backend_to_mirror(&dev(), backend.as_ref(), &mirror).await.unwrap();
    assert_eq!((rerun.written, rerun.skipped), (0, 2));
    assert_eq!(mirror.find_all(&dev()).await.unwrap(), records);
}

#[tokio::test]
async fn test_backup_updates_changed_values_and_keeps_extra_records() {
    let db = TestDatabase::new("backup_update").await;
    let mirror = db.mirror();
    let (_etcd, backend) = etcd_backend();
    backend.publish(&item("dev", "A", "new")).await.unwrap();
    mirror.upsert(&item("dev", "A", "old").with_application("web"), "alice").await.unwrap();
    mirror.upsert(&item("dev", "Z", "only-in-mirror"), "alice").await.unwrap();

    let report = sync_backend_to_mirror(&dev(), backend.as_ref(), &mirror).await.unwrap();
    assert_eq!(report.written, 1);

    let a = mirror.find(&item("dev", "A", "")).await.unwrap().unwrap();
    assert_eq!(a.value, "new");
    assert_eq!(a.application, "web");
    assert_eq!(a.last_update_user, SYNC_ACTOR);
    assert!(mirror.find(&item("dev", "Z", "")).await.unwrap().is_some());
}

#[tokio::test]
async fn test_backup_of_project_scope_covers_every_environment() {
    let db = TestDatabase::new("backup_project").await;
    let mirror = db.mirror();
    let (_etcd, backend) = etcd_backend();
    backend.publish(&item("dev", "A", "1")).await.unwrap();
    backend.publish(&item("prod", "A", "2")).await.unwrap();
    backend.publish(&ConfigItem::new("t1", "p10", "dev", "A").with_value("x")).await.unwrap();

    let project = Scope::new("t1", "p1", "");
    let report = sync_backend_to_mirror(&project, backend.as_ref(), &mirror).await.unwrap();
    assert_eq!(report.written, 2);
    assert_eq!(mirror.find_all(&project).await.unwrap().len(), 2);
    assert!(mirror.find_all(&Scope::new("t1", "p10", "")).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_restore_skips_empty_and_identical_values() {
    let db = TestDatabase::new("restore_noop").await;
    let mirror = db.mirror();
    let (etcd, backend) = etcd_backend();
    backend.publish(&item("dev", "A", "1")).await.unwrap();
    mirror.upsert(&item("dev", "A", "1"), "alice").await.unwrap();
    mirror.upsert(&item("dev", "C", ""), "alice").await.unwrap();
    etcd.clear_calls();

    let report = sync_mirror_to_backend(&dev(), &mirror, backend.as_ref()).await.unwrap();
    assert_eq!(report.direction, SyncDirection::MirrorToBackend);
    assert_eq!((report.scanned, report.written, report.skipped), (2, 0, 2));
    assert_eq!(etcd.calls_starting_with("put"), 0);
    assert_eq!(etcd.value("root/t1/p1/dev/C"), None);
}

#[tokio::test]
async fn test_restore_publishes_missing_and_changed_values() {
    let db = TestDatabase::new("restore_publish").await;
    let mirror = db.mirror();
    let (etcd, backend) = etcd_backend();
    backend.publish(&item("dev", "A", "drifted")).await.unwrap();
    mirror.upsert(&item("dev", "A", "1"), "alice").await.unwrap();
    mirror.upsert(&item("dev", "B", "2"), "alice").await.unwrap();

    let report = sync_mirror_to_backend(&dev(), &mirror, backend.as_ref()).await.unwrap();
    assert_eq!(report.written, 2);
    assert_eq!(etcd.value("root/t1/p1/dev/A").as_deref(), Some("1"));
    assert_eq!(etcd.value("root/t1/p1/dev/B").as_deref(), Some("2"));

    let rerun = sync_mirror_to_backend(&dev(), &mirror, backend.as_ref()).await.unwrap();
    assert_eq!(rerun.written, 0);
}

#[tokio::test]
async fn test_sync_rejects_invalid_scope() {
    let db = TestDatabase::new("sync_invalid").await;
    let mirror = db.mirror();
    let (etcd, backend) = etcd_backend();

    let invalid = Scope::new("t1", "", "dev");
    assert!(sync_backend_to_mirror(&invalid, backend.as_ref(), &mirror).await.is_err());
    assert!(etcd.calls().is_empty());
}
