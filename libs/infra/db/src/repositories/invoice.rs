// [libs/infra/db/src/repositories/invoice.rs]
/*!
 * APARATO: INVOICE REPOSITORY (V1.0 - LEDGER GROUND ZERO)
 * CLASIFICACIÓN: INFRASTRUCTURE ADAPTER (ESTRATO L3)
 * RESPONSABILIDAD: PERSISTENCIA DE FACTURAS Y LÍNEAS
 */

use chrono::Datelike;
use libsql::{params, Row, Transaction};
use tracing::instrument;

use super::{parse_optional_timestamp, parse_timestamp};
use crate::errors::DbError;
use ledger_domain_models::{Invoice, InvoiceLine, InvoiceStatus};

const INVOICE_COLUMNS: &str = "id, tenant_id, invoice_number, status, total_amount, currency, \
     billing_period_start, billing_period_end, issued_at, paid_at, created_at, updated_at";

const LINE_COLUMNS: &str = "id, invoice_id, description, quantity, unit_price, total_price, created_at";

fn row_to_invoice(row: Row) -> Result<Invoice, DbError> {
    let raw_status = row.get::<String>(3)?;
    let status = InvoiceStatus::parse(&raw_status)
        .ok_or_else(|| DbError::MappingError(format!("UNKNOWN_INVOICE_STATUS: {raw_status}")))?;

    Ok(Invoice {
        id: row.get::<String>(0)?,
        tenant_id: row.get::<String>(1)?,
        invoice_number: row.get::<String>(2)?,
        status,
        total_amount: super::parse_decimal(&row.get::<String>(4)?)?,
        currency: row.get::<String>(5)?,
        billing_period_start: parse_timestamp(&row.get::<String>(6)?)?,
        billing_period_end: parse_timestamp(&row.get::<String>(7)?)?,
        issued_at: parse_optional_timestamp(row.get::<Option<String>>(8)?)?,
        paid_at: parse_optional_timestamp(row.get::<Option<String>>(9)?)?,
        created_at: parse_timestamp(&row.get::<String>(10)?)?,
        updated_at: parse_timestamp(&row.get::<String>(11)?)?,
    })
}

fn row_to_line(row: Row) -> Result<InvoiceLine, DbError> {
    Ok(InvoiceLine {
        id: row.get::<String>(0)?,
        invoice_id: row.get::<String>(1)?,
        description: row.get::<String>(2)?,
        quantity: super::parse_decimal(&row.get::<String>(3)?)?,
        unit_price: super::parse_decimal(&row.get::<String>(4)?)?,
        total_price: super::parse_decimal(&row.get::<String>(5)?)?,
        created_at: parse_timestamp(&row.get::<String>(6)?)?,
    })
}

/// A lo sumo una factura por (tenant_id, billing_period_start,
/// billing_period_end). El asignador mensual consulta esto antes de
/// crear, haciendo la operación idempotente a nivel de periodo.
#[instrument(skip(transaction))]
pub async fn exists_for_period(
    transaction: &Transaction,
    tenant_id: &str,
    period_start: chrono::DateTime<chrono::Utc>,
    period_end: chrono::DateTime<chrono::Utc>,
) -> Result<bool, DbError> {
    let mut rows = transaction
        .query(
            "SELECT 1 FROM invoices WHERE tenant_id = ?1 AND billing_period_start = ?2 AND billing_period_end = ?3",
            params![tenant_id.to_string(), period_start.to_rfc3339(), period_end.to_rfc3339()],
        )
        .await?;
    Ok(rows.next().await?.is_some())
}

/// Genera el siguiente número de factura para el año en curso con el
/// formato `INV-<year>-<secuencial de 6 dígitos>`, contando las
/// facturas ya emitidas ese año. El reintento acotado ante colisión
/// vive en el manejador de dominio, no aquí: esta función sólo calcula
/// el candidato siguiente bajo el bloqueo de escritura ya adquirido por
/// la unidad de trabajo.
#[instrument(skip(transaction))]
pub async fn generate_invoice_number(
    transaction: &Transaction,
    reference_date: chrono::DateTime<chrono::Utc>,
) -> Result<String, DbError> {
    let year = reference_date.year();
    let prefix = format!("INV-{year}-");

    let mut rows = transaction
        .query(
            "SELECT COUNT(*) FROM invoices WHERE invoice_number LIKE ?1",
            params![format!("{prefix}%")],
        )
        .await?;

    let existing_count = match rows.next().await? {
        Some(row) => row.get::<i64>(0)?,
        None => 0,
    };

    Ok(format!("{prefix}{:06}", existing_count + 1))
}

#[instrument(skip(transaction, invoice))]
pub async fn create(transaction: &Transaction, invoice: &Invoice) -> Result<(), DbError> {
    let insert_result = transaction
        .execute(
            "INSERT INTO invoices (
                id, tenant_id, invoice_number, status, total_amount, currency,
                billing_period_start, billing_period_end, issued_at, paid_at, created_at, updated_at
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
            params![
                invoice.id.clone(),
                invoice.tenant_id.clone(),
                invoice.invoice_number.clone(),
                invoice.status.as_str().to_string(),
                invoice.total_amount.to_string(),
                invoice.currency.clone(),
                invoice.billing_period_start.to_rfc3339(),
                invoice.billing_period_end.to_rfc3339(),
                invoice.issued_at.map(|v| v.to_rfc3339()),
                invoice.paid_at.map(|v| v.to_rfc3339()),
                invoice.created_at.to_rfc3339(),
                invoice.updated_at.to_rfc3339(),
            ],
        )
        .await;

    match insert_result {
        Ok(_) => Ok(()),
        Err(sql_fault) if DbError::is_unique_violation(&sql_fault) => Err(DbError::DuplicateInvoiceNumber),
        Err(sql_fault) => Err(DbError::from(sql_fault)),
    }
}

#[instrument(skip(transaction, lines))]
pub async fn insert_lines(transaction: &Transaction, lines: &[InvoiceLine]) -> Result<(), DbError> {
    for line in lines {
        transaction
            .execute(
                "INSERT INTO invoice_lines (id, invoice_id, description, quantity, unit_price, total_price, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    line.id.clone(),
                    line.invoice_id.clone(),
                    line.description.clone(),
                    line.quantity.to_string(),
                    line.unit_price.to_string(),
                    line.total_price.to_string(),
                    line.created_at.to_rfc3339(),
                ],
            )
            .await?;
    }
    Ok(())
}

#[instrument(skip(transaction))]
pub async fn get_by_id(transaction: &Transaction, invoice_id: &str) -> Result<Option<Invoice>, DbError> {
    let mut rows = transaction
        .query(&format!("SELECT {INVOICE_COLUMNS} FROM invoices WHERE id = ?1"), params![invoice_id.to_string()])
        .await?;

    match rows.next().await? {
        Some(row) => Ok(Some(row_to_invoice(row)?)),
        None => Ok(None),
    }
}

#[instrument(skip(transaction))]
pub async fn get_lines_by_invoice(transaction: &Transaction, invoice_id: &str) -> Result<Vec<InvoiceLine>, DbError> {
    let mut rows = transaction
        .query(
            &format!("SELECT {LINE_COLUMNS} FROM invoice_lines WHERE invoice_id = ?1 ORDER BY created_at ASC"),
            params![invoice_id.to_string()],
        )
        .await?;

    let mut lines = Vec::new();
    while let Some(row) = rows.next().await? {
        lines.push(row_to_line(row)?);
    }
    Ok(lines)
}
