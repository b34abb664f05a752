//! Initial database migration.
//!
//! Creates the ledger, party, category and money-exchange tables the
//! transaction reversal engine reads and writes.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();

        // ============================================================
        // PART 1: ENUMS
        // ============================================================
        db.execute_unprepared(ENUMS_SQL).await?;

        // ============================================================
        // PART 2: LEDGER ACCOUNTS
        // ============================================================
        db.execute_unprepared(LEDGER_ACCOUNTS_SQL).await?;
        db.execute_unprepared(LEDGER_ACCOUNT_HISTORY_SQL).await?;

        // ============================================================
        // PART 3: COUNTER-PARTIES
        // ============================================================
        db.execute_unprepared(PARTIES_SQL).await?;
        db.execute_unprepared(FAMILY_SUMMARIES_SQL).await?;

        // ============================================================
        // PART 4: CATEGORIES & TRANSACTIONS
        // ============================================================
        db.execute_unprepared(EXPENSE_CATEGORIES_SQL).await?;
        db.execute_unprepared(TRANSACTIONS_SQL).await?;
        db.execute_unprepared(MONEY_EXCHANGES_SQL).await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared(DROP_ALL_SQL).await?;
        Ok(())
    }
}

// ============================================================
// SQL CONSTANTS
// ============================================================

const ENUMS_SQL: &str = r"
CREATE TYPE transaction_kind AS ENUM ('credit', 'debit', 'transfer');

CREATE TYPE party_store AS ENUM (
    'agent',
    'vendor',
    'customer',
    'air_customer',
    'haji',
    'umrah'
);

CREATE TYPE balance_adjustment_kind AS ENUM (
    'opening',
    'credit',
    'debit',
    'transfer_out',
    'transfer_in',
    'reversal'
);
";

const LEDGER_ACCOUNTS_SQL: &str = r"
-- Bank and cash accounts
CREATE TABLE ledger_accounts (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    name VARCHAR(255) NOT NULL,
    balance NUMERIC(19, 4) NOT NULL DEFAULT 0,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
);
";

const LEDGER_ACCOUNT_HISTORY_SQL: &str = r"
-- Append-only balance history, the audit trail of every balance change
CREATE TABLE ledger_account_history (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    account_id UUID NOT NULL REFERENCES ledger_accounts(id) ON DELETE CASCADE,
    amount NUMERIC(19, 4) NOT NULL,
    kind balance_adjustment_kind NOT NULL,
    note TEXT NOT NULL DEFAULT '',
    transaction_id UUID,
    recorded_at TIMESTAMPTZ NOT NULL DEFAULT now()
);

CREATE INDEX idx_history_account ON ledger_account_history(account_id, recorded_at);
CREATE INDEX idx_history_transaction ON ledger_account_history(transaction_id)
    WHERE transaction_id IS NOT NULL;
";

const PARTIES_SQL: &str = r"
-- Agents, vendors, customers and pilgrims with their running aggregates
CREATE TABLE parties (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    store party_store NOT NULL,
    code VARCHAR(64) NOT NULL,
    alias VARCHAR(64),
    family_id VARCHAR(64),
    is_active BOOLEAN NOT NULL DEFAULT true,
    total_due NUMERIC(19, 4) NOT NULL DEFAULT 0,
    hajj_due NUMERIC(19, 4) NOT NULL DEFAULT 0,
    umrah_due NUMERIC(19, 4) NOT NULL DEFAULT 0,
    total_deposit NUMERIC(19, 4) NOT NULL DEFAULT 0,
    total_paid NUMERIC(19, 4) NOT NULL DEFAULT 0,
    paid_amount NUMERIC(19, 4) NOT NULL DEFAULT 0,
    total_amount NUMERIC(19, 4) NOT NULL DEFAULT 0,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT uq_parties_store_code UNIQUE (store, code),
    CONSTRAINT chk_alias_air_customer CHECK (alias IS NULL OR store = 'air_customer'),
    CONSTRAINT chk_family_pilgrim CHECK (family_id IS NULL OR store IN ('haji', 'umrah'))
);

CREATE INDEX idx_parties_alias ON parties(store, alias) WHERE alias IS NOT NULL;
CREATE INDEX idx_parties_family ON parties(store, family_id)
    WHERE family_id IS NOT NULL AND is_active = true;
";

const FAMILY_SUMMARIES_SQL: &str = r"
-- Family-level totals across active pilgrim members
CREATE TABLE family_summaries (
    store party_store NOT NULL,
    family_id VARCHAR(64) NOT NULL,
    member_count INTEGER NOT NULL DEFAULT 0,
    total_amount NUMERIC(19, 4) NOT NULL DEFAULT 0,
    paid_amount NUMERIC(19, 4) NOT NULL DEFAULT 0,
    total_due NUMERIC(19, 4) NOT NULL DEFAULT 0,
    computed_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    PRIMARY KEY (store, family_id)
);
";

const EXPENSE_CATEGORIES_SQL: &str = r"
-- Operating-expense category rollups
CREATE TABLE expense_categories (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    name VARCHAR(255) NOT NULL UNIQUE,
    total_amount NUMERIC(19, 4) NOT NULL DEFAULT 0,
    item_count INTEGER NOT NULL DEFAULT 0,
    last_updated DATE
);
";

const TRANSACTIONS_SQL: &str = r"
-- Financial transactions (credit, debit, transfer)
CREATE TABLE transactions (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    transaction_code VARCHAR(64) NOT NULL UNIQUE,
    kind transaction_kind NOT NULL,
    amount NUMERIC(19, 4),
    party_id VARCHAR(64),
    party_type VARCHAR(32),
    from_account_id UUID REFERENCES ledger_accounts(id) ON DELETE SET NULL,
    target_account_id UUID REFERENCES ledger_accounts(id) ON DELETE SET NULL,
    service_category VARCHAR(255),
    expense_category_id UUID REFERENCES expense_categories(id) ON DELETE SET NULL,
    scope VARCHAR(64),
    is_active BOOLEAN NOT NULL DEFAULT true,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT chk_transfer_accounts CHECK (
        kind <> 'transfer' OR from_account_id IS DISTINCT FROM target_account_id
    )
);

CREATE INDEX idx_transactions_party ON transactions(party_type, party_id)
    WHERE party_id IS NOT NULL;
";

const MONEY_EXCHANGES_SQL: &str = r"
-- Currency exchange records optionally linked to a transaction
CREATE TABLE money_exchanges (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    reference VARCHAR(64) NOT NULL UNIQUE,
    linked_transaction_id UUID,
    is_linked BOOLEAN NOT NULL DEFAULT false,
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
);
";

const DROP_ALL_SQL: &str = r"
-- Order matters due to foreign key constraints
DROP TABLE IF EXISTS money_exchanges CASCADE;
DROP TABLE IF EXISTS transactions CASCADE;
DROP TABLE IF EXISTS expense_categories CASCADE;
DROP TABLE IF EXISTS family_summaries CASCADE;
DROP TABLE IF EXISTS parties CASCADE;
DROP TABLE IF EXISTS ledger_account_history CASCADE;
DROP TABLE IF EXISTS ledger_accounts CASCADE;

DROP TYPE IF EXISTS balance_adjustment_kind;
DROP TYPE IF EXISTS party_store;
DROP TYPE IF EXISTS transaction_kind;
";
