// [apps/api/src/handlers/billing.rs]
/*!
 * =================================================================
 * APARATO: CREDIT LEDGER HTTP HANDLERS (V1.0 - LEDGER GROUND ZERO)
 * CLASIFICACIÓN: API ADAPTER LAYER (ESTRATO L4)
 * RESPONSABILIDAD: RUTAS DE FACTURACIÓN DE CRÉDITOS
 *
 * Validación mínima de presencia/positividad de campos (`VALIDATION_ERROR`)
 * — la fachada es deliberadamente delgada; la validación de esquema
 * completa queda fuera del núcleo de dominio.
 * =================================================================
 */

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use ledger_domain_billing::{consume, dto, estimate_cost, get_balance, list_transactions, refund};
use ledger_domain_models::{ErrorKind, LedgerError};
use serde::Deserialize;
use tracing::instrument;

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ConsumeRequest {
    pub tenant_id: String,
    pub amount: rust_decimal::Decimal,
    pub idempotency_key: String,
    pub reference_type: Option<String>,
    pub reference_id: Option<String>,
}

fn validate_mutation_fields(
    tenant_id: &str,
    amount: rust_decimal::Decimal,
    idempotency_key: &str,
) -> Result<(), ApiError> {
    if tenant_id.trim().is_empty() {
        return Err(LedgerError::new(ErrorKind::ValidationError, "tenant_id must not be empty").into());
    }
    if idempotency_key.trim().is_empty() {
        return Err(LedgerError::new(ErrorKind::ValidationError, "idempotency_key must not be empty").into());
    }
    if amount <= rust_decimal::Decimal::ZERO {
        return Err(LedgerError::new(ErrorKind::ValidationError, "amount must be strictly positive").into());
    }
    Ok(())
}

/// `POST /billing/credits/consume`
#[instrument(skip(state, request), fields(tenant_id = %request.tenant_id))]
pub async fn handle_consume(
    State(state): State<AppState>,
    Json(request): Json<ConsumeRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_mutation_fields(&request.tenant_id, request.amount, &request.idempotency_key)?;

    let response = consume(
        &state.database_client,
        dto::ConsumeCommand {
            tenant_id: request.tenant_id,
            amount: request.amount,
            idempotency_key: request.idempotency_key,
            reference_type: request.reference_type,
            reference_id: request.reference_id,
        },
    )
    .await?;

    Ok((StatusCode::OK, Json(response)))
}

/// `POST /billing/credits/refund`
#[instrument(skip(state, request), fields(tenant_id = %request.tenant_id))]
pub async fn handle_refund(
    State(state): State<AppState>,
    Json(request): Json<ConsumeRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_mutation_fields(&request.tenant_id, request.amount, &request.idempotency_key)?;

    let response = refund(
        &state.database_client,
        dto::RefundCommand {
            tenant_id: request.tenant_id,
            amount: request.amount,
            idempotency_key: request.idempotency_key,
            reference_type: request.reference_type,
            reference_id: request.reference_id,
        },
    )
    .await?;

    Ok((StatusCode::OK, Json(response)))
}

/// `GET /billing/credits/balance/{tenant_id}`
#[instrument(skip(state))]
pub async fn handle_get_balance(
    State(state): State<AppState>,
    Path(tenant_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let balance = get_balance(&state.database_client, &tenant_id).await?;
    Ok((StatusCode::OK, Json(balance)))
}

#[derive(Debug, Deserialize)]
pub struct ListTransactionsQuery {
    pub tenant_id: String,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// `GET /billing/credits/transactions?tenant_id=&limit=&offset=`
#[instrument(skip(state))]
pub async fn handle_list_transactions(
    State(state): State<AppState>,
    Query(query): Query<ListTransactionsQuery>,
) -> Result<impl IntoResponse, ApiError> {
    if query.tenant_id.trim().is_empty() {
        return Err(LedgerError::new(ErrorKind::ValidationError, "tenant_id query parameter is required").into());
    }

    let limit = query.limit.unwrap_or(20);
    let offset = query.offset.unwrap_or(0);

    if limit <= 0 || offset < 0 {
        return Err(LedgerError::new(
            ErrorKind::ValidationError,
            "limit must be positive and offset must be non-negative",
        )
        .into());
    }

    let response = list_transactions(&state.database_client, &query.tenant_id, limit, offset).await?;
    Ok((StatusCode::OK, Json(response)))
}

#[derive(Debug, Deserialize)]
pub struct EstimateRequest {
    pub task_id: Option<String>,
    #[serde(default)]
    pub pipeline_steps: Vec<String>,
}

/// `POST /billing/credits/estimate` — pura, no toca la base de datos.
#[instrument(skip(request))]
pub async fn handle_estimate(Json(request): Json<EstimateRequest>) -> Result<impl IntoResponse, ApiError> {
    let response = estimate_cost(dto::EstimateCommand {
        task_id: request.task_id,
        pipeline_steps: request.pipeline_steps,
    })?;
    Ok((StatusCode::OK, Json(response)))
}
