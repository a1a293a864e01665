//! SQL schema definitions.

/// Complete schema for presale backend v1 database.
pub const SCHEMA_V1: &str = r#"
-- ============================================================
-- Affiliate: users & ancestry
-- ============================================================

CREATE TABLE IF NOT EXISTS users (
    wallet TEXT PRIMARY KEY,
    referral_code TEXT NOT NULL UNIQUE,
    sponsor_wallet TEXT,
    created_at INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_users_code ON users(referral_code);

-- One row per (user, upline level). Levels are contiguous starting at 1
-- and written once at registration time.
CREATE TABLE IF NOT EXISTS ancestry (
    wallet TEXT NOT NULL,
    ancestor_wallet TEXT NOT NULL,
    level INTEGER NOT NULL CHECK (level BETWEEN 1 AND 5),
    created_at INTEGER NOT NULL,
    PRIMARY KEY (wallet, level)
);

CREATE INDEX IF NOT EXISTS idx_ancestry_ancestor ON ancestry(ancestor_wallet, level);

-- ============================================================
-- Affiliate: commission ledger
-- ============================================================

-- The UNIQUE (event_id, beneficiary_wallet, level) key makes commission
-- distribution idempotent per event, across processes and restarts.
CREATE TABLE IF NOT EXISTS commissions (
    id TEXT PRIMARY KEY,
    source_wallet TEXT NOT NULL,
    beneficiary_wallet TEXT NOT NULL,
    level INTEGER NOT NULL CHECK (level BETWEEN 1 AND 5),
    percentage REAL NOT NULL,
    amount REAL NOT NULL,
    event_type TEXT NOT NULL,
    event_id TEXT NOT NULL,
    status TEXT NOT NULL DEFAULT 'pending',
    created_at INTEGER NOT NULL,
    UNIQUE (event_id, beneficiary_wallet, level)
);

CREATE INDEX IF NOT EXISTS idx_commissions_beneficiary
    ON commissions(beneficiary_wallet, level);
CREATE INDEX IF NOT EXISTS idx_commissions_source ON commissions(source_wallet);

-- ============================================================
-- Notifications
-- ============================================================

CREATE TABLE IF NOT EXISTS notifications (
    id TEXT PRIMARY KEY,
    wallet TEXT NOT NULL,
    notif_type TEXT NOT NULL,
    title TEXT NOT NULL,
    body TEXT NOT NULL,
    payload TEXT NOT NULL,
    read INTEGER NOT NULL DEFAULT 0,
    created_at INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_notifications_wallet ON notifications(wallet, created_at);

-- ============================================================
-- Presale: purchases & progress
-- ============================================================

CREATE TABLE IF NOT EXISTS purchases (
    purchase_id TEXT PRIMARY KEY,
    wallet TEXT NOT NULL,
    token_amount INTEGER NOT NULL,
    amount_usd REAL NOT NULL,
    payment_method TEXT NOT NULL,
    referral_code TEXT,
    status TEXT NOT NULL DEFAULT 'initiated',
    created_at INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_purchases_wallet ON purchases(wallet);
CREATE INDEX IF NOT EXISTS idx_purchases_status ON purchases(status);

CREATE TABLE IF NOT EXISTS presale_state (
    id INTEGER PRIMARY KEY CHECK (id = 1),
    total_raised REAL NOT NULL DEFAULT 0,
    goal REAL NOT NULL DEFAULT 2000000,
    participants INTEGER NOT NULL DEFAULT 0,
    is_active INTEGER NOT NULL DEFAULT 1
);
"#;
