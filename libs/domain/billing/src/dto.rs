// [libs/domain/billing/src/dto.rs]
//! Objetos de transferencia de los manejadores de comando y consulta.
//! Separados de las entidades de `ledger_domain_models` porque no todo
//! campo de una entidad pertenece a la frontera pública.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Deserialize)]
pub struct ConsumeCommand {
    pub tenant_id: String,
    pub amount: Decimal,
    pub idempotency_key: String,
    pub reference_type: Option<String>,
    pub reference_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RefundCommand {
    pub tenant_id: String,
    pub amount: Decimal,
    pub idempotency_key: String,
    pub reference_type: Option<String>,
    pub reference_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AllocateCommand {
    pub tenant_id: String,
    pub amount: Decimal,
    pub idempotency_key: String,
    pub reference_type: Option<String>,
    pub reference_id: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreditTransactionResponse {
    pub transaction_id: String,
    pub tenant_id: String,
    pub transaction_type: String,
    pub amount: Decimal,
    pub balance_before: Decimal,
    pub balance_after: Decimal,
    pub reference_type: Option<String>,
    pub reference_id: Option<String>,
    pub idempotency_key: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BalanceResponse {
    pub tenant_id: String,
    pub balance: Decimal,
    pub last_updated: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EstimateCommand {
    pub task_id: Option<String>,
    pub pipeline_steps: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EstimateResponse {
    pub estimated_credits: Decimal,
    pub breakdown: BTreeMap<String, Decimal>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TransactionSummary {
    pub id: String,
    pub transaction_type: String,
    pub amount: Decimal,
    pub balance_after: Decimal,
    pub reference_type: Option<String>,
    pub reference_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ListTransactionsResponse {
    pub transactions: Vec<TransactionSummary>,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}
