// [libs/infra/db/src/repositories/transaction.rs]
/*!
 * APARATO: CREDIT TRANSACTION REPOSITORY (V1.0 - LEDGER GROUND ZERO)
 * CLASIFICACIÓN: INFRASTRUCTURE ADAPTER (ESTRATO L3)
 * RESPONSABILIDAD: RASTRO DE AUDITORÍA INMUTABLE
 */

use libsql::{params, Row, Transaction};
use rust_decimal::Decimal;
use tracing::instrument;

use super::parse_timestamp;
use crate::errors::DbError;
use ledger_domain_models::{CreditTransaction, TransactionType};

const SELECT_COLUMNS: &str = "id, tenant_id, ledger_id, transaction_type, amount, balance_before, \
     balance_after, reference_type, reference_id, idempotency_key, created_at";

fn row_to_transaction(row: Row) -> Result<CreditTransaction, DbError> {
    let raw_type = row.get::<String>(3)?;
    let transaction_type = TransactionType::parse(&raw_type)
        .ok_or_else(|| DbError::MappingError(format!("UNKNOWN_TRANSACTION_TYPE: {raw_type}")))?;

    Ok(CreditTransaction {
        id: row.get::<String>(0)?,
        tenant_id: row.get::<String>(1)?,
        ledger_id: row.get::<String>(2)?,
        transaction_type,
        amount: super::parse_decimal(&row.get::<String>(4)?)?,
        balance_before: super::parse_decimal(&row.get::<String>(5)?)?,
        balance_after: super::parse_decimal(&row.get::<String>(6)?)?,
        reference_type: row.get::<Option<String>>(7)?,
        reference_id: row.get::<Option<String>>(8)?,
        idempotency_key: row.get::<String>(9)?,
        created_at: parse_timestamp(&row.get::<String>(10)?)?,
    })
}

/// Inserta la entrada de auditoría. Una violación de unicidad sobre
/// `idempotency_key` es una señal de "carrera perdida": el llamador
/// debe detectarla vía `DbError::is_unique_violation` y releer en vez
/// de propagar un fallo genuino.
#[instrument(skip(transaction, entry))]
pub async fn create(transaction: &Transaction, entry: &CreditTransaction) -> Result<(), DbError> {
    let insert_result = transaction
        .execute(
            "INSERT INTO credit_transactions (
                id, tenant_id, ledger_id, transaction_type, amount, balance_before,
                balance_after, reference_type, reference_id, idempotency_key, created_at
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                entry.id.clone(),
                entry.tenant_id.clone(),
                entry.ledger_id.clone(),
                entry.transaction_type.as_str().to_string(),
                entry.amount.to_string(),
                entry.balance_before.to_string(),
                entry.balance_after.to_string(),
                entry.reference_type.clone(),
                entry.reference_id.clone(),
                entry.idempotency_key.clone(),
                entry.created_at.to_rfc3339(),
            ],
        )
        .await;

    match insert_result {
        Ok(_) => Ok(()),
        Err(sql_fault) if DbError::is_unique_violation(&sql_fault) => Err(DbError::DuplicateIdempotencyKey),
        Err(sql_fault) => Err(DbError::from(sql_fault)),
    }
}

/// Recupera la transacción ganadora de una carrera de idempotencia.
#[instrument(skip(transaction))]
pub async fn get_by_idempotency_key(
    transaction: &Transaction,
    idempotency_key: &str,
) -> Result<Option<CreditTransaction>, DbError> {
    let mut rows = transaction
        .query(
            &format!("SELECT {SELECT_COLUMNS} FROM credit_transactions WHERE idempotency_key = ?1"),
            params![idempotency_key.to_string()],
        )
        .await?;

    match rows.next().await? {
        Some(row) => Ok(Some(row_to_transaction(row)?)),
        None => Ok(None),
    }
}

/// Lista paginada de transacciones de un tenant, más recientes primero.
#[instrument(skip(transaction))]
pub async fn get_by_tenant(
    transaction: &Transaction,
    tenant_id: &str,
    limit: i64,
    offset: i64,
) -> Result<Vec<CreditTransaction>, DbError> {
    let mut rows = transaction
        .query(
            &format!(
                "SELECT {SELECT_COLUMNS} FROM credit_transactions \
                 WHERE tenant_id = ?1 ORDER BY created_at DESC, id DESC LIMIT ?2 OFFSET ?3"
            ),
            params![tenant_id.to_string(), limit, offset],
        )
        .await?;

    let mut transactions = Vec::new();
    while let Some(row) = rows.next().await? {
        transactions.push(row_to_transaction(row)?);
    }
    Ok(transactions)
}

/// Cuenta el total de transacciones de un tenant, independiente de la
/// paginación.
#[instrument(skip(transaction))]
pub async fn count_by_tenant(transaction: &Transaction, tenant_id: &str) -> Result<i64, DbError> {
    let mut rows = transaction
        .query(
            "SELECT COUNT(*) FROM credit_transactions WHERE tenant_id = ?1",
            params![tenant_id.to_string()],
        )
        .await?;

    match rows.next().await? {
        Some(row) => Ok(row.get::<i64>(0)?),
        None => Ok(0),
    }
}

/// Suma el consumo (`CONSUME`) agrupado por tenant dentro de la ventana
/// `[period_start, period_end)`, usado por el detector de anomalías. El
/// agrupamiento ocurre en SQL, no en Rust: con muchos tenants esto es
/// una sola pasada sobre el índice `(tenant_id, created_at)` en vez de
/// N consultas.
#[instrument(skip(transaction))]
pub async fn sum_consumption_by_tenant(
    transaction: &Transaction,
    period_start: chrono::DateTime<chrono::Utc>,
    period_end: chrono::DateTime<chrono::Utc>,
) -> Result<Vec<(String, Decimal)>, DbError> {
    let mut rows = transaction
        .query(
            "SELECT tenant_id, amount FROM credit_transactions \
             WHERE transaction_type = 'CONSUME' AND created_at >= ?1 AND created_at < ?2 \
             ORDER BY tenant_id ASC",
            params![period_start.to_rfc3339(), period_end.to_rfc3339()],
        )
        .await?;

    let mut totals: Vec<(String, Decimal)> = Vec::new();
    while let Some(row) = rows.next().await? {
        let tenant_id = row.get::<String>(0)?;
        let amount = super::parse_decimal(&row.get::<String>(1)?)?;

        match totals.last_mut() {
            Some((last_tenant, last_total)) if *last_tenant == tenant_id => *last_total += amount,
            _ => totals.push((tenant_id, amount)),
        }
    }
    Ok(totals)
}

/// Recalcula el balance de un ledger a partir de su historial de
/// transacciones, el lado independiente de la reconciliación.
/// `ledger_sign` decide el signo por tipo; `ADJUST` ya trae su
/// magnitud firmada en `amount`.
#[instrument(skip(transaction))]
pub async fn sum_by_ledger(transaction: &Transaction, ledger_id: &str) -> Result<Decimal, DbError> {
    let mut rows = transaction
        .query(
            "SELECT transaction_type, amount FROM credit_transactions WHERE ledger_id = ?1",
            params![ledger_id.to_string()],
        )
        .await?;

    let mut total = Decimal::ZERO;
    while let Some(row) = rows.next().await? {
        let raw_type = row.get::<String>(0)?;
        let transaction_type = TransactionType::parse(&raw_type)
            .ok_or_else(|| DbError::MappingError(format!("UNKNOWN_TRANSACTION_TYPE: {raw_type}")))?;
        let amount = super::parse_decimal(&row.get::<String>(1)?)?;

        total += match transaction_type {
            TransactionType::Adjust => amount,
            other => amount * Decimal::from(other.ledger_sign()),
        };
    }
    Ok(total)
}
