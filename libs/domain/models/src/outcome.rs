// [libs/domain/models/src/outcome.rs]
/*!
 * Gramática de resultados tácticos del ledger.
 *
 * Un `Result<T, LedgerError>` con un `ErrorKind` cerrado (no texto libre)
 * para que el transporte pueda mapear de forma exhaustiva a códigos HTTP,
 * y un `reason` de diagnóstico separado del `message` orientado al
 * llamador.
 */

use thiserror::Error;

/// Catálogo cerrado de fallos del protocolo de ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InsufficientCredit,
    LedgerNotFound,
    InvoiceNotFound,
    InvalidInvoiceStatus,
    InvoiceAlreadyExists,
    ConsumeCreditFailed,
    RefundCreditFailed,
    AllocateCreditFailed,
    DetectionFailed,
    ReconciliationFailed,
    CreateInvoiceFailed,
    GenerateProformaFailed,
    GetBalanceFailed,
    ListTransactionsFailed,
    ValidationError,
}

impl ErrorKind {
    /// La representación `UPPER_SNAKE` que viaja en el envelope de error HTTP.
    pub fn code(self) -> &'static str {
        match self {
            ErrorKind::InsufficientCredit => "INSUFFICIENT_CREDIT",
            ErrorKind::LedgerNotFound => "LEDGER_NOT_FOUND",
            ErrorKind::InvoiceNotFound => "INVOICE_NOT_FOUND",
            ErrorKind::InvalidInvoiceStatus => "INVALID_INVOICE_STATUS",
            ErrorKind::InvoiceAlreadyExists => "INVOICE_ALREADY_EXISTS",
            ErrorKind::ConsumeCreditFailed => "CONSUME_CREDIT_FAILED",
            ErrorKind::RefundCreditFailed => "REFUND_CREDIT_FAILED",
            ErrorKind::AllocateCreditFailed => "ALLOCATE_CREDIT_FAILED",
            ErrorKind::DetectionFailed => "DETECTION_FAILED",
            ErrorKind::ReconciliationFailed => "RECONCILIATION_FAILED",
            ErrorKind::CreateInvoiceFailed => "CREATE_INVOICE_FAILED",
            ErrorKind::GenerateProformaFailed => "GENERATE_PROFORMA_FAILED",
            ErrorKind::GetBalanceFailed => "GET_BALANCE_FAILED",
            ErrorKind::ListTransactionsFailed => "LIST_TRANSACTIONS_FAILED",
            ErrorKind::ValidationError => "VALIDATION_ERROR",
        }
    }
}

/// Error tácito del ledger: un código estable más un mensaje humano y,
/// opcionalmente, una razón de diagnóstico (nunca expuesta para que el
/// llamador ramifique sobre ella — solo para logs).
#[derive(Debug, Error, Clone)]
#[error("[{}] {message}", kind.code())]
pub struct LedgerError {
    pub kind: ErrorKind,
    pub message: String,
    pub reason: Option<String>,
}

impl LedgerError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self { kind, message: message.into(), reason: None }
    }

    pub fn with_reason(kind: ErrorKind, message: impl Into<String>, reason: impl Into<String>) -> Self {
        Self { kind, message: message.into(), reason: Some(reason.into()) }
    }

    /// Envuelve un fallo inesperado de capa inferior bajo el código dado,
    /// preservando el mensaje original únicamente como `reason` diagnóstico.
    pub fn wrap(kind: ErrorKind, message: impl Into<String>, lower_layer_fault: impl std::fmt::Display) -> Self {
        Self::with_reason(kind, message, lower_layer_fault.to_string())
    }
}

/// Resultado táctico de toda operación del ledger.
pub type Outcome<T> = Result<T, LedgerError>;
