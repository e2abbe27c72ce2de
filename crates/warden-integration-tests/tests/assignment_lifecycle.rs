//! Integration tests for assignment management persisted to a YAML file.
//!
//! Every change goes through an [`Authorizer`] and is checked again after
//! reopening the file, the way a restarted service would see it.

mod common;

use std::collections::BTreeSet;
use std::sync::Arc;

use common::VillageHarness;
use warden_auth::{AuthError, Authorizer, CapabilityMutation};
use warden_storage::Assignments;
use warden_test::{FailingStore, test_admin, test_identity};

#[tokio::test]
async fn test_add_survives_restart() {
    let village = VillageHarness::new();
    let boss = test_identity("boss@corleone.com");

    let auth = village.open().await;
    assert!(!auth.check(Some(&boss), "villager").unwrap());

    let report = auth.add(Some(&test_admin()), &boss, "mafia").await.unwrap();
    assert_eq!(report.status, "ok");
    assert_eq!(
        report.capabilities,
        BTreeSet::from(["mafia".to_owned(), "villager".to_owned()])
    );

    let restarted = village.open().await;
    assert!(restarted.check(Some(&boss), "mafia").unwrap());
    assert!(restarted.check(Some(&boss), "villager").unwrap());
    assert!(!restarted.check(Some(&boss), "police").unwrap());

    let on_disk: Assignments = serde_yaml::from_str(&village.read_assignments()).unwrap();
    assert!(on_disk.has("boss@corleone.com", "mafia"));
    assert!(!on_disk.has("boss@corleone.com", "villager"));
}

#[tokio::test]
async fn test_existing_file_is_honored() {
    let village = VillageHarness::new();
    village.write_assignments(
        "quimby@springfield.us:\n- mayor\n\"paul.baguette@paris.fr\":\n- mafia\n- baker\n",
    );

    let auth = village.open().await;
    let quimby = test_identity("quimby@springfield.us");
    let paul = test_identity("paul.baguette@paris.fr");

    assert!(auth.check(Some(&quimby), "police").unwrap());
    assert!(auth.check(Some(&paul), "baker").unwrap());
    assert!(auth.check(Some(&paul), "mafia").unwrap());
    assert!(!auth.check(Some(&paul), "mayor").unwrap());
}

#[tokio::test]
async fn test_set_replaces_and_remove_withdraws() {
    let village = VillageHarness::new();
    let admin = test_admin();
    let paul = test_identity("paul.baguette@paris.fr");

    let auth = village.open().await;
    auth.set(Some(&admin), &paul, ["mafia", "baker"]).await.unwrap();
    auth.set(Some(&admin), &paul, ["police"]).await.unwrap();

    let restarted = village.open().await;
    assert_eq!(
        restarted.assigned(&paul).unwrap(),
        BTreeSet::from(["police".to_owned()])
    );
    assert!(!restarted.check(Some(&paul), "baker").unwrap());

    restarted.remove(Some(&admin), &paul, "police").await.unwrap();
    let restarted = village.open().await;
    assert!(!restarted.check(Some(&paul), "villager").unwrap());
}

#[tokio::test]
async fn test_override_cannot_be_removed() {
    let village = VillageHarness::new();
    let admin = test_admin();

    let auth = village.open().await;
    let report = auth
        .set(Some(&admin), &admin, Vec::<String>::new())
        .await
        .unwrap();
    assert!(report.capabilities.contains("admin"));

    let restarted = village.open().await;
    assert!(restarted.check(Some(&admin), "mayor").unwrap());
    assert!(restarted.is_manager(&admin).unwrap());
}

#[tokio::test]
async fn test_delegated_management() {
    let village = VillageHarness::new();
    let admin = test_admin();
    let quimby = test_identity("quimby@springfield.us");
    let wiggum = test_identity("wiggum@springfield.us");

    let auth = village.open().await;
    assert!(matches!(
        auth.add(Some(&quimby), &wiggum, "police").await,
        Err(AuthError::PermissionDenied { .. })
    ));

    auth.add(Some(&admin), &quimby, "user_management")
        .await
        .unwrap();
    auth.add(Some(&quimby), &wiggum, "police").await.unwrap();

    let restarted = village.open().await;
    assert!(restarted.check(Some(&wiggum), "police").unwrap());
    assert!(!restarted.check(Some(&wiggum), "user_management").unwrap());
}

#[tokio::test]
async fn test_rejected_mutations_leave_file_untouched() {
    let village = VillageHarness::new();
    village.write_assignments("boss@corleone.com:\n- mafia\n");
    let before = village.read_assignments();
    let boss = test_identity("boss@corleone.com");

    let auth = village.open().await;
    assert!(matches!(
        auth.add(None, &boss, "mayor").await,
        Err(AuthError::Unauthenticated)
    ));
    assert!(matches!(
        auth.add(Some(&boss), &boss, "mayor").await,
        Err(AuthError::PermissionDenied { .. })
    ));
    assert!(matches!(
        auth.add(Some(&test_admin()), &boss, "astronaut").await,
        Err(AuthError::UnknownCapability { .. })
    ));

    assert_eq!(village.read_assignments(), before);
}

#[tokio::test]
async fn test_failed_save_is_not_published() {
    let village = VillageHarness::new();
    let store = Arc::new(FailingStore::new(Assignments::new()));
    let auth = Authorizer::load(village.graph(), store.clone(), &village.policy())
        .await
        .unwrap();
    let boss = test_identity("boss@corleone.com");

    store.set_failing(true);
    let err = auth
        .mutate(
            Some(&test_admin()),
            CapabilityMutation::AddCapability {
                email: boss.clone(),
                capability: "mafia".to_owned(),
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err.status_code(), 500);
    assert!(!auth.check(Some(&boss), "mafia").unwrap());

    store.set_failing(false);
    auth.add(Some(&test_admin()), &boss, "mafia").await.unwrap();
    assert!(auth.check(Some(&boss), "mafia").unwrap());
    assert_eq!(store.saves(), 1);
}

#[tokio::test]
async fn test_concurrent_grants_all_persist() {
    let village = VillageHarness::new();
    let auth = Arc::new(village.open().await);
    let admin = test_admin();

    let emails: Vec<String> = (0..16).map(|n| format!("villager{n}@village.org")).collect();
    let results = futures::future::join_all(emails.iter().map(|email| {
        let auth = Arc::clone(&auth);
        let admin = admin.clone();
        let email = test_identity(email);
        async move { auth.add(Some(&admin), &email, "villager").await }
    }))
    .await;
    assert!(results.iter().all(Result::is_ok));

    let restarted = village.open().await;
    for email in &emails {
        assert!(restarted.check(Some(&test_identity(email)), "villager").unwrap());
    }
}
