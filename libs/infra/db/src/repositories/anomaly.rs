// [libs/infra/db/src/repositories/anomaly.rs]
/*!
 * APARATO: USAGE ANOMALY REPOSITORY (V1.0 - LEDGER GROUND ZERO)
 * CLASIFICACIÓN: INFRASTRUCTURE ADAPTER (ESTRATO L3)
 * RESPONSABILIDAD: PERSISTENCIA DE DETECCIONES DE CONSUMO ANÓMALO
 */

use libsql::{params, Row, Transaction};
use tracing::instrument;

use super::{parse_optional_timestamp, parse_timestamp};
use crate::errors::DbError;
use ledger_domain_models::{AnomalyStatus, AnomalyType, UsageAnomaly};

const SELECT_COLUMNS: &str = "id, tenant_id, anomaly_type, status, threshold_value, actual_value, \
     period_start, period_end, description, metadata, detected_at, notified_at, resolved_at, resolved_by";

fn row_to_anomaly(row: Row) -> Result<UsageAnomaly, DbError> {
    let raw_type = row.get::<String>(2)?;
    let anomaly_type = AnomalyType::parse(&raw_type)
        .ok_or_else(|| DbError::MappingError(format!("UNKNOWN_ANOMALY_TYPE: {raw_type}")))?;

    let raw_status = row.get::<String>(3)?;
    let status = AnomalyStatus::parse(&raw_status)
        .ok_or_else(|| DbError::MappingError(format!("UNKNOWN_ANOMALY_STATUS: {raw_status}")))?;

    let raw_metadata = row.get::<Option<String>>(9)?;
    let metadata = raw_metadata
        .map(|value| serde_json::from_str(&value))
        .transpose()
        .map_err(|e| DbError::MappingError(format!("METADATA_DECODE_FAULT: {e}")))?;

    Ok(UsageAnomaly {
        id: row.get::<String>(0)?,
        tenant_id: row.get::<String>(1)?,
        anomaly_type,
        status,
        threshold_value: super::parse_decimal(&row.get::<String>(4)?)?,
        actual_value: super::parse_decimal(&row.get::<String>(5)?)?,
        period_start: parse_timestamp(&row.get::<String>(6)?)?,
        period_end: parse_timestamp(&row.get::<String>(7)?)?,
        description: row.get::<String>(8)?,
        metadata,
        detected_at: parse_timestamp(&row.get::<String>(10)?)?,
        notified_at: parse_optional_timestamp(row.get::<Option<String>>(11)?)?,
        resolved_at: parse_optional_timestamp(row.get::<Option<String>>(12)?)?,
        resolved_by: row.get::<Option<String>>(13)?,
    })
}

/// Verifica si ya existe una anomalía para (tenant_id, period_start,
/// period_end) — contrato de unicidad aplicado por el detector, no por
/// restricción de esquema.
#[instrument(skip(transaction))]
pub async fn exists_for_tenant_period(
    transaction: &Transaction,
    tenant_id: &str,
    period_start: chrono::DateTime<chrono::Utc>,
    period_end: chrono::DateTime<chrono::Utc>,
) -> Result<bool, DbError> {
    let mut rows = transaction
        .query(
            "SELECT 1 FROM usage_anomalies WHERE tenant_id = ?1 AND period_start = ?2 AND period_end = ?3",
            params![tenant_id.to_string(), period_start.to_rfc3339(), period_end.to_rfc3339()],
        )
        .await?;
    Ok(rows.next().await?.is_some())
}

#[instrument(skip(transaction, anomaly))]
pub async fn create(transaction: &Transaction, anomaly: &UsageAnomaly) -> Result<(), DbError> {
    let metadata_json = anomaly
        .metadata
        .as_ref()
        .map(serde_json::to_string)
        .transpose()
        .map_err(|e| DbError::MappingError(format!("METADATA_ENCODE_FAULT: {e}")))?;

    transaction
        .execute(
            "INSERT INTO usage_anomalies (
                id, tenant_id, anomaly_type, status, threshold_value, actual_value,
                period_start, period_end, description, metadata, detected_at,
                notified_at, resolved_at, resolved_by
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
            params![
                anomaly.id.clone(),
                anomaly.tenant_id.clone(),
                anomaly.anomaly_type.as_str().to_string(),
                anomaly.status.as_str().to_string(),
                anomaly.threshold_value.to_string(),
                anomaly.actual_value.to_string(),
                anomaly.period_start.to_rfc3339(),
                anomaly.period_end.to_rfc3339(),
                anomaly.description.clone(),
                metadata_json,
                anomaly.detected_at.to_rfc3339(),
                anomaly.notified_at.map(|v| v.to_rfc3339()),
                anomaly.resolved_at.map(|v| v.to_rfc3339()),
                anomaly.resolved_by.clone(),
            ],
        )
        .await?;
    Ok(())
}

/// Marca el momento de notificación tras entregar con éxito a la
/// estrategia configurada (Logging/Webhook/Composite).
#[instrument(skip(transaction))]
pub async fn mark_notified(
    transaction: &Transaction,
    anomaly_id: &str,
    notified_at: chrono::DateTime<chrono::Utc>,
) -> Result<(), DbError> {
    transaction
        .execute(
            "UPDATE usage_anomalies SET notified_at = ?1 WHERE id = ?2",
            params![notified_at.to_rfc3339(), anomaly_id.to_string()],
        )
        .await?;
    Ok(())
}

/// Transiciona el estado (DETECTED -> ACKNOWLEDGED/RESOLVED/FALSE_POSITIVE).
#[instrument(skip(transaction))]
pub async fn update_status(
    transaction: &Transaction,
    anomaly_id: &str,
    status: AnomalyStatus,
    resolved_at: Option<chrono::DateTime<chrono::Utc>>,
    resolved_by: Option<&str>,
) -> Result<(), DbError> {
    transaction
        .execute(
            "UPDATE usage_anomalies SET status = ?1, resolved_at = ?2, resolved_by = ?3 WHERE id = ?4",
            params![
                status.as_str().to_string(),
                resolved_at.map(|v| v.to_rfc3339()),
                resolved_by.map(|v| v.to_string()),
                anomaly_id.to_string(),
            ],
        )
        .await?;
    Ok(())
}

/// Recupera una anomalía completa por id, usada tras `create` para
/// entregarla a la estrategia de notificación configurada.
#[instrument(skip(transaction))]
pub async fn get_by_id(transaction: &Transaction, anomaly_id: &str) -> Result<Option<UsageAnomaly>, DbError> {
    let mut rows = transaction
        .query(
            &format!("SELECT {SELECT_COLUMNS} FROM usage_anomalies WHERE id = ?1"),
            params![anomaly_id.to_string()],
        )
        .await?;

    match rows.next().await? {
        Some(row) => Ok(Some(row_to_anomaly(row)?)),
        None => Ok(None),
    }
}
