// [apps/api/src/error.rs]
/*!
 * =================================================================
 * APARATO: HTTP ERROR ENVELOPE (V1.0 - LEDGER GROUND ZERO)
 * CLASIFICACIÓN: API ADAPTER LAYER (ESTRATO L4)
 * RESPONSABILIDAD: TRADUCCIÓN DE `LedgerError` A CÓDIGOS HTTP
 *
 * La fachada nunca expone `reason` (diagnóstico interno) al llamador —
 * sólo viaja al log estructurado. El mapeo es exhaustivo sobre
 * `ErrorKind` para que agregar un código nuevo obligue a decidir su
 * estatus HTTP aquí.
 * =================================================================
 */

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use ledger_domain_models::{ErrorKind, LedgerError};
use serde::Serialize;
use tracing::warn;

#[derive(Debug, Serialize)]
struct ErrorBody {
    code: &'static str,
    message: String,
}

#[derive(Debug, Serialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

/// Envoltura delgada sobre `LedgerError` para que los manejadores de
/// ruta puedan usar `?` y que `IntoResponse` cierre el mapeo a HTTP.
pub struct ApiError(pub LedgerError);

impl From<LedgerError> for ApiError {
    fn from(fault: LedgerError) -> Self {
        Self(fault)
    }
}

fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::InsufficientCredit => StatusCode::PAYMENT_REQUIRED,
        ErrorKind::LedgerNotFound => StatusCode::NOT_FOUND,
        ErrorKind::InvoiceNotFound => StatusCode::NOT_FOUND,
        ErrorKind::InvalidInvoiceStatus => StatusCode::BAD_REQUEST,
        ErrorKind::InvoiceAlreadyExists => StatusCode::BAD_REQUEST,
        ErrorKind::ValidationError => StatusCode::UNPROCESSABLE_ENTITY,
        ErrorKind::ConsumeCreditFailed
        | ErrorKind::RefundCreditFailed
        | ErrorKind::AllocateCreditFailed
        | ErrorKind::DetectionFailed
        | ErrorKind::ReconciliationFailed
        | ErrorKind::CreateInvoiceFailed
        | ErrorKind::GenerateProformaFailed
        | ErrorKind::GetBalanceFailed
        | ErrorKind::ListTransactionsFailed => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let fault = self.0;
        let status = status_for(fault.kind);

        if status == StatusCode::INTERNAL_SERVER_ERROR {
            warn!(code = fault.kind.code(), reason = ?fault.reason, "unhandled ledger fault surfaced to transport");
        }

        let body = ErrorEnvelope { error: ErrorBody { code: fault.kind.code(), message: fault.message } };
        (status, Json(body)).into_response()
    }
}
