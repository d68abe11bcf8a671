//! Initial schema: wallets, wallet_transactions, payout_accounts.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared(INITIAL_SQL).await?;
        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared(
            "DROP TABLE IF EXISTS payout_accounts CASCADE;
             DROP TABLE IF EXISTS wallet_transactions CASCADE;
             DROP TABLE IF EXISTS wallets CASCADE;
             DROP TYPE IF EXISTS transaction_status;
             DROP TYPE IF EXISTS transaction_purpose;
             DROP TYPE IF EXISTS transaction_direction;
             DROP TYPE IF EXISTS wallet_status;",
        )
        .await?;
        Ok(())
    }
}

const INITIAL_SQL: &str = r"
CREATE TYPE wallet_status AS ENUM ('active', 'suspended');
CREATE TYPE transaction_direction AS ENUM ('credit', 'debit');
CREATE TYPE transaction_purpose AS ENUM ('topup', 'withdrawal', 'service_payment');
CREATE TYPE transaction_status AS ENUM
    ('initiated', 'pending', 'success', 'failed', 'reversed', 'disputed');

-- Wallets: one per user, suspended rather than deleted
CREATE TABLE wallets (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    usertag VARCHAR(64) NOT NULL UNIQUE,
    available_balance BIGINT NOT NULL DEFAULT 0,
    pending_balance BIGINT NOT NULL DEFAULT 0,
    status wallet_status NOT NULL DEFAULT 'active',
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT chk_available_non_negative CHECK (available_balance >= 0),
    CONSTRAINT chk_pending_non_negative CHECK (pending_balance >= 0)
);

-- Append-only transaction log, correlated with the provider by reference
CREATE TABLE wallet_transactions (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    usertag VARCHAR(64) NOT NULL REFERENCES wallets(usertag),
    amount BIGINT NOT NULL,
    direction transaction_direction NOT NULL,
    purpose transaction_purpose NOT NULL,
    reference VARCHAR(128) NOT NULL UNIQUE,
    provider_reference VARCHAR(128),
    access_code VARCHAR(64),
    transfer_code VARCHAR(64),
    status transaction_status NOT NULL,
    memo TEXT,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT chk_amount_positive CHECK (amount > 0)
);

-- Wallet history listing
CREATE INDEX idx_wallet_transactions_usertag
    ON wallet_transactions(usertag, created_at DESC);

-- Reconciliation lookup by reference is the hot path
CREATE INDEX idx_wallet_transactions_reference ON wallet_transactions(reference);

-- Registered payout destinations, soft-deactivated only
CREATE TABLE payout_accounts (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    usertag VARCHAR(64) NOT NULL REFERENCES wallets(usertag),
    account_name VARCHAR(128) NOT NULL,
    account_number VARCHAR(32) NOT NULL,
    bank_code VARCHAR(16) NOT NULL,
    bank_name VARCHAR(128) NOT NULL,
    recipient_code VARCHAR(64) NOT NULL,
    is_active BOOLEAN NOT NULL DEFAULT true,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now()
);

-- Active accounts per user (limit enforced in the repository)
CREATE INDEX idx_payout_accounts_user
    ON payout_accounts(usertag) WHERE is_active;

-- One active registration per destination
CREATE UNIQUE INDEX idx_payout_accounts_destination
    ON payout_accounts(usertag, bank_code, account_number) WHERE is_active;
";
