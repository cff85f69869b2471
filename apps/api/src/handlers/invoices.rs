// [apps/api/src/handlers/invoices.rs]
/*!
 * =================================================================
 * APARATO: PROFORMA INVOICE HTTP HANDLERS (V1.0 - LEDGER GROUND ZERO)
 * CLASIFICACIÓN: API ADAPTER LAYER (ESTRATO L4)
 * RESPONSABILIDAD: RUTAS DE VISTA PREVIA DE FACTURAS
 *
 * Ninguno de estos dos manejadores pertenece al núcleo de comandos y
 * consultas de crédito — leen la factura y sus líneas directamente bajo
 * su propia unidad de trabajo de sólo lectura y delegan el renderizado
 * al colaborador `ledger-infra-pdf`.
 * =================================================================
 */

use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine as _;
use ledger_domain_models::{ErrorKind, InvoiceStatus, LedgerError};
use ledger_infra_db::repositories::invoice as invoice_repo;
use ledger_infra_db::UnitOfWork;
use ledger_infra_pdf::generate_proforma_invoice;
use serde::Serialize;
use tracing::instrument;

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct ProformaResponse {
    pub invoice_id: String,
    pub invoice_number: String,
    pub pdf_base64: String,
}

async fn load_draft_invoice_and_lines(
    state: &AppState,
    invoice_id: &str,
) -> Result<(ledger_domain_models::Invoice, Vec<ledger_domain_models::InvoiceLine>), ApiError> {
    let uow = UnitOfWork::begin_read_only(&state.database_client)
        .await
        .map_err(|e| LedgerError::wrap(ErrorKind::GenerateProformaFailed, "failed to open read scope", e))?;

    let invoice = invoice_repo::get_by_id(uow.handle(), invoice_id)
        .await
        .map_err(|e| LedgerError::wrap(ErrorKind::GenerateProformaFailed, "failed to read invoice", e))?
        .ok_or_else(|| LedgerError::new(ErrorKind::InvoiceNotFound, format!("no invoice found with id {invoice_id}")))?;

    if invoice.status != InvoiceStatus::Draft {
        return Err(LedgerError::new(
            ErrorKind::InvalidInvoiceStatus,
            format!("proforma preview is only available for draft invoices, invoice {invoice_id} is {}", invoice.status.as_str()),
        )
        .into());
    }

    let lines = invoice_repo::get_lines_by_invoice(uow.handle(), invoice_id)
        .await
        .map_err(|e| LedgerError::wrap(ErrorKind::GenerateProformaFailed, "failed to read invoice lines", e))?;

    uow.rollback()
        .await
        .map_err(|e| LedgerError::wrap(ErrorKind::GenerateProformaFailed, "failed to close read scope", e))?;

    Ok((invoice, lines))
}

/// `GET /billing/invoices/{id}/proforma`
#[instrument(skip(state))]
pub async fn handle_get_proforma(
    State(state): State<AppState>,
    Path(invoice_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let (invoice, lines) = load_draft_invoice_and_lines(&state, &invoice_id).await?;

    let pdf_bytes =
        generate_proforma_invoice(&invoice, &lines, &state.company_name, &state.company_address)?;

    Ok((
        StatusCode::OK,
        Json(ProformaResponse {
            invoice_id: invoice.id,
            invoice_number: invoice.invoice_number,
            pdf_base64: BASE64_STANDARD.encode(pdf_bytes),
        }),
    ))
}

/// `GET /billing/invoices/{id}/proforma/pdf`
#[instrument(skip(state))]
pub async fn handle_get_proforma_pdf(
    State(state): State<AppState>,
    Path(invoice_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let (invoice, lines) = load_draft_invoice_and_lines(&state, &invoice_id).await?;

    let pdf_bytes =
        generate_proforma_invoice(&invoice, &lines, &state.company_name, &state.company_address)?;

    let filename = format!("proforma_{}.pdf", invoice.invoice_number);

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (header::CONTENT_DISPOSITION, format!("attachment; filename={filename}")),
        ],
        pdf_bytes,
    ))
}
