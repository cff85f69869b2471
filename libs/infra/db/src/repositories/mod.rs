// [libs/infra/db/src/repositories/mod.rs]
//! Repositorios de agregación del ledger de créditos. Todas las
//! funciones reciben un `&libsql::Transaction` en vez de una
//! `Connection`: ambos tipos comparten la misma superficie
//! `.execute()`/`.query()`, y hasta las rutas de sólo lectura operan
//! dentro de una unidad de trabajo (en modo de lectura diferida).

pub mod anomaly;
pub mod invoice;
pub mod ledger;
pub mod subscription;
pub mod transaction;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::str::FromStr;

use crate::errors::DbError;

/// Decodifica una columna de texto ISO-8601 en `DateTime<Utc>`.
pub(crate) fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, DbError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| DbError::MappingError(format!("TIMESTAMP_DECODE_FAULT: {e} (raw={raw})")))
}

/// Decodifica una columna de texto ISO-8601 opcional.
pub(crate) fn parse_optional_timestamp(raw: Option<String>) -> Result<Option<DateTime<Utc>>, DbError> {
    raw.map(|value| parse_timestamp(&value)).transpose()
}

/// Decodifica una columna de texto decimal (`TEXT` en SQLite — nunca
/// `REAL`, para preservar la precisión exacta a escala 6).
pub(crate) fn parse_decimal(raw: &str) -> Result<Decimal, DbError> {
    Decimal::from_str(raw).map_err(|e| DbError::MappingError(format!("DECIMAL_DECODE_FAULT: {e} (raw={raw})")))
}

pub(crate) fn parse_optional_decimal(raw: Option<String>) -> Result<Option<Decimal>, DbError> {
    raw.map(|value| parse_decimal(&value)).transpose()
}
