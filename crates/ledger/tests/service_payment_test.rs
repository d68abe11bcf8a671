//! Integration tests for service payments and payout accounts.
//!
//! Skipped unless `DATABASE_URL` is set.

use std::env;

use sea_orm::{DatabaseConnection, TransactionTrait};
use uuid::Uuid;

use kobo_core::ledger::{LedgerError, LedgerStore, Purpose, TxnReference};
use kobo_ledger::migration::Migrator;
use kobo_ledger::repositories::payout_account::{CreatePayoutAccountInput, PayoutAccountError};
use kobo_ledger::{PayoutAccountRepository, WalletRepository};
use kobo_shared::Money;
use sea_orm_migration::MigratorTrait;

async fn test_db() -> Option<DatabaseConnection> {
    let Ok(url) = env::var("DATABASE_URL") else {
        eprintln!("DATABASE_URL not set, skipping integration test");
        return None;
    };
    let db = kobo_ledger::connect(&url, 10)
        .await
        .expect("failed to connect to test database");
    Migrator::up(&db, None).await.expect("migrations failed");
    Some(db)
}

fn unique_tag(prefix: &str) -> String {
    format!("{prefix}_{}", Uuid::new_v4().simple())
}

async fn funded_wallet(repo: &WalletRepository, prefix: &str, minor: i64) -> String {
    let tag = unique_tag(prefix);
    repo.create_wallet(&tag).await.unwrap();
    if minor > 0 {
        let r = TxnReference::generate(Purpose::Topup, &tag, chrono::Utc::now());
        repo.credit_pending(&tag, Money::from_minor(minor), &r)
            .await
            .unwrap();
        repo.finalize_credit(&r).await.unwrap();
    }
    tag
}

#[tokio::test]
async fn test_service_payment_moves_funds_within_outer_transaction() {
    let Some(db) = test_db().await else { return };
    let repo = WalletRepository::new(db.clone());
    let patient = funded_wallet(&repo, "patient", 50_000).await;
    let doctor = funded_wallet(&repo, "doctor", 0).await;

    let txn = db.begin().await.unwrap();
    let reference = WalletRepository::begin_service_payment(
        &txn,
        &patient,
        &doctor,
        Money::from_minor(20_000),
        "Appointment payment",
    )
    .await
    .unwrap();
    txn.commit().await.unwrap();

    assert!(reference.as_str().starts_with("service_payment_"));
    assert_eq!(
        repo.balance(&patient).await.unwrap().available,
        Money::from_minor(30_000)
    );
    assert_eq!(
        repo.balance(&doctor).await.unwrap().available,
        Money::from_minor(20_000)
    );
}

#[tokio::test]
async fn test_service_payment_rolls_back_with_the_booking() {
    let Some(db) = test_db().await else { return };
    let repo = WalletRepository::new(db.clone());
    let patient = funded_wallet(&repo, "patient_rb", 50_000).await;
    let doctor = funded_wallet(&repo, "doctor_rb", 0).await;

    let txn = db.begin().await.unwrap();
    WalletRepository::begin_service_payment(
        &txn,
        &patient,
        &doctor,
        Money::from_minor(20_000),
        "Appointment payment",
    )
    .await
    .unwrap();
    // the booking fails downstream; its transaction rolls back
    txn.rollback().await.unwrap();

    assert_eq!(
        repo.balance(&patient).await.unwrap().available,
        Money::from_minor(50_000)
    );
    assert_eq!(repo.balance(&doctor).await.unwrap().available, Money::ZERO);
    assert!(repo.transactions(&patient).await.unwrap().iter().all(|r| {
        r.purpose != Purpose::ServicePayment
    }));
}

#[tokio::test]
async fn test_service_payment_insufficient_funds() {
    let Some(db) = test_db().await else { return };
    let repo = WalletRepository::new(db.clone());
    let patient = funded_wallet(&repo, "patient_poor", 1_000).await;
    let doctor = funded_wallet(&repo, "doctor_if", 0).await;

    let txn = db.begin().await.unwrap();
    let err = WalletRepository::begin_service_payment(
        &txn,
        &patient,
        &doctor,
        Money::from_minor(20_000),
        "Appointment payment",
    )
    .await
    .unwrap_err();
    assert!(matches!(err, LedgerError::InsufficientFunds { .. }));
}

fn account_input(usertag: &str, account_number: &str) -> CreatePayoutAccountInput {
    CreatePayoutAccountInput {
        usertag: usertag.to_string(),
        account_name: "ADA OKAFOR".to_string(),
        account_number: account_number.to_string(),
        bank_code: "058".to_string(),
        bank_name: "Guaranty Trust Bank".to_string(),
        recipient_code: format!("RCP_{account_number}"),
    }
}

#[tokio::test]
async fn test_payout_account_limit_and_soft_deactivation() {
    let Some(db) = test_db().await else { return };
    let wallets = WalletRepository::new(db.clone());
    let repo = PayoutAccountRepository::new(db);
    let tag = funded_wallet(&wallets, "payout", 0).await;

    for i in 0..3 {
        repo.create(account_input(&tag, &format!("012345678{i}")))
            .await
            .unwrap();
    }
    let err = repo
        .create(account_input(&tag, "0123456789"))
        .await
        .unwrap_err();
    assert!(matches!(err, PayoutAccountError::LimitReached));

    // deactivating one frees a slot; the row survives for audit
    let accounts = repo.list_active(&tag).await.unwrap();
    assert_eq!(accounts.len(), 3);
    repo.deactivate(&tag, accounts[0].id).await.unwrap();
    assert_eq!(repo.list_active(&tag).await.unwrap().len(), 2);

    repo.create(account_input(&tag, "0123456799")).await.unwrap();

    // ownership lookup only sees active rows
    let err = repo
        .find_by_recipient_code(&tag, &accounts[0].recipient_code)
        .await
        .unwrap_err();
    assert!(matches!(err, PayoutAccountError::NotFound));
}
