// [libs/infra/db/src/schema.rs]
/*!
 * =================================================================
 * APARATO: SOVEREIGN DATABASE SCHEMA (V1.0 - LEDGER GROUND ZERO)
 * CLASIFICACIÓN: INFRASTRUCTURE LAYER (ESTRATO L3)
 * RESPONSABILIDAD: GOBERNANZA ESTRUCTURAL E IDEMPOTENCIA TOTAL
 *
 * Seis agregados: credit_ledgers, credit_transactions, usage_anomalies,
 * subscriptions, invoices, invoice_lines. Todas las sentencias son
 * idempotentes: se pueden reaplicar en cada arranque sin error, sin
 * herramienta de migración dedicada.
 * =================================================================
 */

use anyhow::{Context, Result};
use libsql::Connection;
use tracing::{debug, info, instrument};

const LEDGER_TABLES: &[(&str, &str)] = &[
    ("TABLE_CREDIT_LEDGERS", r#"
        CREATE TABLE IF NOT EXISTS credit_ledgers (
            id TEXT PRIMARY KEY,
            tenant_id TEXT NOT NULL UNIQUE,
            balance TEXT NOT NULL DEFAULT '0',
            monthly_limit TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );
    "#),
    ("TABLE_CREDIT_TRANSACTIONS", r#"
        CREATE TABLE IF NOT EXISTS credit_transactions (
            id TEXT PRIMARY KEY,
            tenant_id TEXT NOT NULL,
            ledger_id TEXT NOT NULL,
            transaction_type TEXT NOT NULL,
            amount TEXT NOT NULL,
            balance_before TEXT NOT NULL,
            balance_after TEXT NOT NULL,
            reference_type TEXT,
            reference_id TEXT,
            idempotency_key TEXT NOT NULL UNIQUE,
            created_at TEXT NOT NULL
        );
    "#),
    ("TABLE_USAGE_ANOMALIES", r#"
        CREATE TABLE IF NOT EXISTS usage_anomalies (
            id TEXT PRIMARY KEY,
            tenant_id TEXT NOT NULL,
            anomaly_type TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'DETECTED',
            threshold_value TEXT NOT NULL,
            actual_value TEXT NOT NULL,
            period_start TEXT NOT NULL,
            period_end TEXT NOT NULL,
            description TEXT NOT NULL,
            metadata TEXT,
            detected_at TEXT NOT NULL,
            notified_at TEXT,
            resolved_at TEXT,
            resolved_by TEXT
        );
    "#),
    ("TABLE_SUBSCRIPTIONS", r#"
        CREATE TABLE IF NOT EXISTS subscriptions (
            id TEXT PRIMARY KEY,
            tenant_id TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'ACTIVE',
            plan_name TEXT NOT NULL,
            monthly_credits TEXT NOT NULL,
            start_date TEXT NOT NULL,
            end_date TEXT
        );
    "#),
    ("TABLE_INVOICES", r#"
        CREATE TABLE IF NOT EXISTS invoices (
            id TEXT PRIMARY KEY,
            tenant_id TEXT NOT NULL,
            invoice_number TEXT NOT NULL UNIQUE,
            status TEXT NOT NULL DEFAULT 'DRAFT',
            total_amount TEXT NOT NULL,
            currency TEXT NOT NULL DEFAULT 'USD',
            billing_period_start TEXT NOT NULL,
            billing_period_end TEXT NOT NULL,
            issued_at TEXT,
            paid_at TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            UNIQUE(tenant_id, billing_period_start, billing_period_end)
        );
    "#),
    ("TABLE_INVOICE_LINES", r#"
        CREATE TABLE IF NOT EXISTS invoice_lines (
            id TEXT PRIMARY KEY,
            invoice_id TEXT NOT NULL,
            description TEXT NOT NULL,
            quantity TEXT NOT NULL,
            unit_price TEXT NOT NULL,
            total_price TEXT NOT NULL,
            created_at TEXT NOT NULL
        );
    "#),
];

const LEDGER_INDEXES: &[(&str, &str)] = &[
    ("IDX_TRANSACTIONS_TENANT_CREATED", "CREATE INDEX IF NOT EXISTS idx_transactions_tenant_created ON credit_transactions(tenant_id, created_at DESC);"),
    ("IDX_TRANSACTIONS_REFERENCE", "CREATE INDEX IF NOT EXISTS idx_transactions_reference ON credit_transactions(reference_type, reference_id);"),
    ("IDX_ANOMALIES_TENANT_DETECTED", "CREATE INDEX IF NOT EXISTS idx_anomalies_tenant_detected ON usage_anomalies(tenant_id, detected_at);"),
    ("IDX_SUBSCRIPTIONS_STATUS", "CREATE INDEX IF NOT EXISTS idx_subscriptions_status ON subscriptions(status);"),
    ("IDX_INVOICE_LINES_INVOICE", "CREATE INDEX IF NOT EXISTS idx_invoice_lines_invoice ON invoice_lines(invoice_id);"),
];

/// Ejecuta la secuencia maestra de sincronización del esquema del ledger.
///
/// # Errors
/// Retorna error si alguna tabla base falla en solidificarse, indicando
/// un colapso en el enlace con la base de datos.
#[instrument(skip(database_connection))]
pub async fn apply_full_ledger_schema(database_connection: &Connection) -> Result<()> {
    info!("🏗️ [SCHEMA_ENGINE]: Initiating ledger structural synchronization...");

    for (identifier, sql) in LEDGER_TABLES {
        debug!("  ↳ Solidifying: {}", identifier);
        database_connection
            .execute(sql, ())
            .await
            .with_context(|| format!("CRITICAL_SOLIDIFICATION_FAULT: {}", identifier))?;
    }

    for (identifier, sql) in LEDGER_INDEXES {
        debug!("  ↳ Hardening: {}", identifier);
        database_connection
            .execute(sql, ())
            .await
            .with_context(|| format!("INDEX_HARDENING_FAULT: {}", identifier))?;
    }

    info!("✅ [SCHEMA_ENGINE]: Ledger schema level and certified.");
    Ok(())
}
