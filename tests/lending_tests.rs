//! Lending engine integration tests over the in-memory store

mod common;

use chrono::Utc;
use liberon_core::{
    config::LendingConfig,
    error::AppError,
    store::{InventoryStore, LoanStore, TitleStore},
};

const T1: &str = "9780000000001";
const T2: &str = "9780000000002";
const T3: &str = "9780000000003";
const T4: &str = "9780000000004";

#[tokio::test]
async fn duplicate_loans_and_stockouts_are_rejected() {
    let (store, services) = common::services();
    let engine = &services.lending;
    engine.add_title(T1, 2).await.unwrap();

    // Member 1 takes the first copy.
    engine.issue_loan(1, T1).await.unwrap();
    let item = InventoryStore::get(store.as_ref(), T1).await.unwrap().unwrap();
    assert_eq!(item.loanable_copies, 1);

    // Same member, same title: rejected before inventory is touched.
    assert!(matches!(
        engine.issue_loan(1, T1).await.unwrap_err(),
        AppError::DuplicateLoan { .. }
    ));

    // Member 2 takes the last copy; member 3 finds the shelf empty.
    engine.issue_loan(2, T1).await.unwrap();
    assert!(matches!(
        engine.issue_loan(3, T1).await.unwrap_err(),
        AppError::OutOfStock(_)
    ));

    let item = InventoryStore::get(store.as_ref(), T1).await.unwrap().unwrap();
    assert_eq!(item.loanable_copies, 0);
    assert_eq!(item.total_copies, 2);
}

#[tokio::test]
async fn issuing_unknown_title_fails() {
    let (_, services) = common::services();
    assert!(matches!(
        services.lending.issue_loan(1, T1).await.unwrap_err(),
        AppError::TitleNotFound(_)
    ));
}

#[tokio::test]
async fn borrow_limit_caps_a_member_at_three() {
    let (_, services) = common::services();
    let engine = &services.lending;
    for isbn in [T1, T2, T3, T4] {
        engine.add_title(isbn, 1).await.unwrap();
    }

    engine.issue_loan(1, T1).await.unwrap();
    engine.issue_loan(1, T2).await.unwrap();
    engine.issue_loan(1, T3).await.unwrap();
    assert_eq!(engine.count_active(1).await.unwrap(), 3);

    assert!(matches!(
        engine.issue_loan(1, T4).await.unwrap_err(),
        AppError::BorrowLimitExceeded { current: 3, limit: 3 }
    ));

    // Returning one frees a slot.
    engine.return_loan(1, T1, Utc::now()).await.unwrap();
    engine.issue_loan(1, T4).await.unwrap();
}

#[tokio::test]
async fn issue_then_return_restores_inventory() {
    let (store, services) = common::services();
    let engine = &services.lending;
    engine.add_title(T1, 3).await.unwrap();

    let before = InventoryStore::get(store.as_ref(), T1).await.unwrap().unwrap();
    engine.issue_loan(5, T1).await.unwrap();
    let returned = engine.return_loan(5, T1, Utc::now()).await.unwrap();
    assert!(returned.returned_at.is_some());

    let after = InventoryStore::get(store.as_ref(), T1).await.unwrap().unwrap();
    assert_eq!(after.loanable_copies, before.loanable_copies);

    // Exactly one closed record remains in the member's history.
    let history = engine.loan_history(5).await.unwrap();
    assert_eq!(history.len(), 1);
    assert!(!history[0].is_active());

    // A second return of the same pair has nothing to act on.
    assert!(matches!(
        engine.return_loan(5, T1, Utc::now()).await.unwrap_err(),
        AppError::NoActiveLoan { .. }
    ));
}

#[tokio::test]
async fn renewal_is_single_shot() {
    let (_, services) = common::services();
    let engine = &services.lending;
    engine.add_title(T1, 1).await.unwrap();

    let loan = engine.issue_loan(1, T1).await.unwrap();
    let renewed = engine.renew_loan(loan.id).await.unwrap();
    assert!(renewed.renewed);

    assert!(matches!(
        engine.renew_loan(loan.id).await.unwrap_err(),
        AppError::AlreadyRenewed(_)
    ));
    assert!(matches!(
        engine.renew_loan(9999).await.unwrap_err(),
        AppError::NotFound(_)
    ));

    engine.return_loan(1, T1, Utc::now()).await.unwrap();
    assert!(matches!(
        engine.renew_loan(loan.id).await.unwrap_err(),
        AppError::AlreadyReturned(_)
    ));
}

#[tokio::test]
async fn quantity_adjustments_respect_copies_on_loan() {
    let (store, services) = common::services();
    let engine = &services.lending;
    engine.add_title(T1, 2).await.unwrap();
    engine.issue_loan(1, T1).await.unwrap();

    // Shrink to exactly the on-loan count: allowed, nothing left to lend.
    let item = engine.adjust_quantity(T1, 1).await.unwrap();
    assert_eq!(item.total_copies, 1);
    assert_eq!(item.loanable_copies, 0);

    // Below the on-loan count: rejected.
    assert!(matches!(
        engine.adjust_quantity(T1, 0).await.unwrap_err(),
        AppError::InvalidAdjustment(_)
    ));

    // No-op adjustment: rejected to force caller intent.
    assert!(matches!(
        engine.adjust_quantity(T1, 1).await.unwrap_err(),
        AppError::InvalidAdjustment(_)
    ));

    // Growing the stock adds loanable copies.
    let item = engine.adjust_quantity(T1, 4).await.unwrap();
    assert_eq!(item.total_copies, 4);
    assert_eq!(item.loanable_copies, 3);

    let stored = InventoryStore::get(store.as_ref(), T1).await.unwrap().unwrap();
    assert_eq!(stored.loanable_copies, 3);
}

#[tokio::test]
async fn retire_refuses_while_loans_active_and_keeps_history_titles() {
    let (store, services) = common::services();
    let engine = &services.lending;
    engine.add_title(T1, 1).await.unwrap();
    engine.add_title(T2, 1).await.unwrap();

    engine.issue_loan(1, T1).await.unwrap();
    assert!(matches!(
        engine.retire_title(T1).await.unwrap_err(),
        AppError::TitleInUse(_)
    ));

    // After the copy is back the title can be retired, but its
    // bibliographic record stays: loan history references it.
    engine.return_loan(1, T1, Utc::now()).await.unwrap();
    engine.retire_title(T1).await.unwrap();
    assert!(InventoryStore::get(store.as_ref(), T1).await.unwrap().is_none());
    assert!(TitleStore::get(store.as_ref(), T1).await.unwrap().is_some());

    // A title never lent leaves no trace.
    engine.retire_title(T2).await.unwrap();
    assert!(TitleStore::get(store.as_ref(), T2).await.unwrap().is_none());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn concurrent_issues_never_oversell() {
    // Contention needs headroom on the retry bound; the race itself is what
    // is under test here.
    let config = LendingConfig {
        reserve_max_attempts: 64,
        ..Default::default()
    };
    let (store, services) = common::services_with(&config);
    services.lending.add_title(T1, 3).await.unwrap();

    let mut handles = Vec::new();
    for member_id in 1..=8 {
        let engine = services.lending.clone();
        handles.push(tokio::spawn(
            async move { engine.issue_loan(member_id, T1).await },
        ));
    }

    let mut issued = 0;
    let mut out_of_stock = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => issued += 1,
            Err(AppError::OutOfStock(_)) => out_of_stock += 1,
            Err(e) => panic!("unexpected error: {}", e),
        }
    }

    assert_eq!(issued, 3);
    assert_eq!(out_of_stock, 5);
    let item = InventoryStore::get(store.as_ref(), T1).await.unwrap().unwrap();
    assert_eq!(item.loanable_copies, 0);
}

#[tokio::test]
async fn store_uniqueness_is_the_final_arbiter() {
    let (store, services) = common::services();
    let engine = &services.lending;
    engine.add_title(T1, 2).await.unwrap();

    // Simulate a racing writer that opened a record between the engine's
    // pre-check and its open: the store-level uniqueness check still wins,
    // and the compensating release keeps the counts consistent.
    engine.issue_loan(1, T1).await.unwrap();
    let err = LoanStore::open(store.as_ref(), 1, T1, Utc::now()).await.unwrap_err();
    assert!(matches!(err, AppError::DuplicateLoan { .. }));
    assert_eq!(engine.count_active(1).await.unwrap(), 1);
}
