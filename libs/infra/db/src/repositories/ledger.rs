// [libs/infra/db/src/repositories/ledger.rs]
/*!
 * APARATO: CREDIT LEDGER REPOSITORY (V1.0 - LEDGER GROUND ZERO)
 * CLASIFICACIÓN: INFRASTRUCTURE ADAPTER (ESTRATO L3)
 * RESPONSABILIDAD: PERSISTENCIA DEL BALANCE PREPAGO POR TENANT
 */

use libsql::{params, Row, Transaction};
use tracing::instrument;

use super::{parse_optional_decimal, parse_timestamp};
use crate::errors::DbError;
use ledger_domain_models::CreditLedger;

fn row_to_ledger(row: Row) -> Result<CreditLedger, DbError> {
    Ok(CreditLedger {
        id: row.get::<String>(0)?,
        tenant_id: row.get::<String>(1)?,
        balance: super::parse_decimal(&row.get::<String>(2)?)?,
        monthly_limit: parse_optional_decimal(row.get::<Option<String>>(3)?)?,
        created_at: parse_timestamp(&row.get::<String>(4)?)?,
        updated_at: parse_timestamp(&row.get::<String>(5)?)?,
    })
}

const SELECT_COLUMNS: &str = "id, tenant_id, balance, monthly_limit, created_at, updated_at";

/// Recupera el ledger de un tenant, si existe.
#[instrument(skip(transaction))]
pub async fn get_by_tenant(transaction: &Transaction, tenant_id: &str) -> Result<Option<CreditLedger>, DbError> {
    let mut rows = transaction
        .query(
            &format!("SELECT {SELECT_COLUMNS} FROM credit_ledgers WHERE tenant_id = ?1"),
            params![tenant_id.to_string()],
        )
        .await?;

    match rows.next().await? {
        Some(row) => Ok(Some(row_to_ledger(row)?)),
        None => Ok(None),
    }
}

/// Inserta un ledger recién creado con balance cero.
#[instrument(skip(transaction, ledger))]
pub async fn create(transaction: &Transaction, ledger: &CreditLedger) -> Result<(), DbError> {
    transaction
        .execute(
            "INSERT INTO credit_ledgers (id, tenant_id, balance, monthly_limit, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                ledger.id.clone(),
                ledger.tenant_id.clone(),
                ledger.balance.to_string(),
                ledger.monthly_limit.map(|v| v.to_string()),
                ledger.created_at.to_rfc3339(),
                ledger.updated_at.to_rfc3339(),
            ],
        )
        .await?;
    Ok(())
}

/// Aplica el nuevo balance calculado por el manejador de comando. El
/// cálculo aritmético vive en el dominio; este repositorio únicamente
/// persiste el resultado ya computado.
#[instrument(skip(transaction))]
pub async fn update_balance(
    transaction: &Transaction,
    ledger_id: &str,
    new_balance: rust_decimal::Decimal,
    updated_at: chrono::DateTime<chrono::Utc>,
) -> Result<(), DbError> {
    transaction
        .execute(
            "UPDATE credit_ledgers SET balance = ?1, updated_at = ?2 WHERE id = ?3",
            params![new_balance.to_string(), updated_at.to_rfc3339(), ledger_id.to_string()],
        )
        .await?;
    Ok(())
}

/// Lista todos los ledgers, usado por el reconciliador y el
/// asignador mensual para barrer tenants existentes.
#[instrument(skip(transaction))]
pub async fn get_all(transaction: &Transaction) -> Result<Vec<CreditLedger>, DbError> {
    let mut rows = transaction
        .query(&format!("SELECT {SELECT_COLUMNS} FROM credit_ledgers ORDER BY tenant_id ASC"), ())
        .await?;

    let mut ledgers = Vec::new();
    while let Some(row) = rows.next().await? {
        ledgers.push(row_to_ledger(row)?);
    }
    Ok(ledgers)
}
