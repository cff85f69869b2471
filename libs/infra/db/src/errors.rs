// [libs/infra/db/src/errors.rs]
/*!
 * =================================================================
 * APARATO: DATABASE ERROR CATALOG (V1.0 - LEDGER GROUND ZERO)
 * CLASIFICACIÓN: INFRASTRUCTURE CORE (ESTRATO L3)
 * RESPONSABILIDAD: CATALOGACIÓN SEMÁNTICA DE FALLOS DE PERSISTENCIA
 * =================================================================
 */

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    /// Error de enlace físico o de red con el cluster de Turso/libSQL.
    #[error("[L3_DB_NET_FAULT]: DATABASE_UPLINK_SEVERED -> {0}")]
    ConnectionError(String),

    /// Fallo en la configuración del entorno (Variables vacías o malformadas).
    #[error("[L3_DB_CONFIG_FAULT]: STRATEGIC_ENV_VOID -> {0}")]
    ConfigurationError(String),

    /// Error de sintaxis o ejecución devuelto por el motor libSQL.
    #[error("[L3_DB_QUERY_FAULT]: SQL_QUERY_REJECTED -> {0}")]
    QueryError(#[from] libsql::Error),

    /// Fallo en la transformación de tipos entre SQLite y el Dominio Rust.
    #[error("[L3_DB_MAPPING_FAULT]: DATA_MAPPING_VIOLATION -> {0}")]
    MappingError(String),

    /// La llave de idempotencia ya existe — contrato, no excepción: el
    /// llamador debe releer la fila ganadora y reintentar.
    #[error("[L3_LEDGER_FAULT]: DUPLICATE_IDEMPOTENCY_KEY")]
    DuplicateIdempotencyKey,

    /// Conflicto de unicidad en `invoice_number` bajo generación concurrente.
    #[error("[L3_LEDGER_FAULT]: DUPLICATE_INVOICE_NUMBER")]
    DuplicateInvoiceNumber,
}

impl DbError {
    /// Distingue una violación de restricción UNIQUE del resto de fallos de
    /// consulta, para que los manejadores de comando puedan tratarla como
    /// la señal de "perdí la carrera" en vez de un fallo genuino.
    pub fn is_unique_violation(sql_fault: &libsql::Error) -> bool {
        let message = sql_fault.to_string().to_lowercase();
        message.contains("unique constraint") || message.contains("unique_violation")
    }
}
