//! Hold / release workflow against the SQLite store

mod helpers;

use fsq_common::Error;
use fsq_lots::{LotFilter, LotStatus};
use helpers::{lot, TestEnv};
use uuid::Uuid;

#[tokio::test]
async fn test_hold_release_round_trip() {
    let env = TestEnv::new().await.unwrap();
    let svc = env.tenant();
    let l = lot(&svc, "LOT-001").await.unwrap();

    let held = svc.put_on_hold(l.id, "Supplier recall notice").await.unwrap();
    assert!(held.is_on_hold);
    assert_eq!(held.status, LotStatus::Quarantine);

    let stored = svc.get_lot(l.id).await.unwrap().unwrap();
    assert!(stored.is_on_hold);
    assert_eq!(stored.hold_reason.as_deref(), Some("Supplier recall notice"));
    assert!(stored.hold_date.is_some());
    assert_eq!(stored.status, LotStatus::Quarantine);

    let released = svc.release_lot(l.id, "qa.manager").await.unwrap();
    assert!(!released.is_on_hold);
    assert_eq!(released.status, LotStatus::Released);

    let stored = svc.get_lot(l.id).await.unwrap().unwrap();
    assert!(!stored.is_on_hold);
    assert_eq!(stored.released_by.as_deref(), Some("qa.manager"));
    assert!(stored.released_date.is_some());
    assert_eq!(stored.status, LotStatus::Released);
}

#[tokio::test]
async fn test_double_hold_allowed() {
    let env = TestEnv::new().await.unwrap();
    let svc = env.tenant();
    let l = lot(&svc, "LOT-001").await.unwrap();

    svc.put_on_hold(l.id, "first").await.unwrap();
    let held = svc.put_on_hold(l.id, "second").await.unwrap();
    assert_eq!(held.hold_reason.as_deref(), Some("second"));
    assert_eq!(svc.lots_on_hold_count().await.unwrap(), 1);
}

#[tokio::test]
async fn test_release_requires_hold() {
    let env = TestEnv::new().await.unwrap();
    let svc = env.tenant();
    let l = lot(&svc, "LOT-001").await.unwrap();

    let err = svc.release_lot(l.id, "qa").await.unwrap_err();
    assert!(matches!(err, Error::InvalidState(_)));
    assert!(err.is_client_error());

    // Released lots cannot be released again
    svc.put_on_hold(l.id, "swab").await.unwrap();
    svc.release_lot(l.id, "qa").await.unwrap();
    assert!(matches!(svc.release_lot(l.id, "qa").await.unwrap_err(), Error::InvalidState(_)));
}

#[tokio::test]
async fn test_hold_unknown_lot() {
    let env = TestEnv::new().await.unwrap();
    let svc = env.tenant();

    assert!(matches!(svc.put_on_hold(Uuid::new_v4(), "x").await.unwrap_err(), Error::NotFound(_)));
    assert!(matches!(svc.release_lot(Uuid::new_v4(), "x").await.unwrap_err(), Error::NotFound(_)));
}

#[tokio::test]
async fn test_empty_reason_rejected() {
    let env = TestEnv::new().await.unwrap();
    let svc = env.tenant();
    let l = lot(&svc, "LOT-001").await.unwrap();

    assert!(matches!(svc.put_on_hold(l.id, "").await.unwrap_err(), Error::InvalidInput(_)));
    assert!(!svc.get_lot(l.id).await.unwrap().unwrap().is_on_hold);
}

#[tokio::test]
async fn test_on_hold_count_and_filter_per_tenant() {
    let env = TestEnv::new().await.unwrap();
    let svc = env.tenant();
    let other = env.tenant();

    let a = lot(&svc, "A").await.unwrap();
    let b = lot(&svc, "B").await.unwrap();
    lot(&svc, "C").await.unwrap();
    let foreign = lot(&other, "A").await.unwrap();

    svc.put_on_hold(a.id, "metal detected").await.unwrap();
    svc.put_on_hold(b.id, "temperature excursion").await.unwrap();
    other.put_on_hold(foreign.id, "label error").await.unwrap();

    assert_eq!(svc.lots_on_hold_count().await.unwrap(), 2);
    assert_eq!(other.lots_on_hold_count().await.unwrap(), 1);

    let filter = LotFilter {
        is_on_hold: Some(true),
        ..LotFilter::default()
    };
    let (held, total) = svc.list_lots(&filter, 0, 100).await.unwrap();
    assert_eq!(total, 2);
    assert!(held.iter().all(|l| l.is_on_hold && l.tenant_id == svc.tenant_id()));
}
