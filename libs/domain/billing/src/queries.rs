// [libs/domain/billing/src/queries.rs]
/*!
 * APARATO: CREDIT QUERY HANDLERS (V1.0 - LEDGER GROUND ZERO)
 * CLASIFICACIÓN: DOMAIN LOGIC (ESTRATO L2)
 * RESPONSABILIDAD: GetBalance / ListTransactions / EstimateCost
 *
 * Las tres operaciones son de sólo lectura: abren la unidad de trabajo
 * en modo diferido, no compiten por el bloqueo de escritura con
 * Consume/Refund/Allocate.
 */

use ledger_domain_models::{ErrorKind, LedgerError, Outcome};
use ledger_infra_db::repositories::{ledger, transaction as transaction_repo};
use ledger_infra_db::{TursoClient, UnitOfWork};
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use tracing::instrument;

use crate::dto::{BalanceResponse, EstimateCommand, EstimateResponse, ListTransactionsResponse, TransactionSummary};

/// Recupera el balance actual de un tenant.
#[instrument(skip(client))]
pub async fn get_balance(client: &TursoClient, tenant_id: &str) -> Outcome<BalanceResponse> {
    let uow = UnitOfWork::begin_read_only(client)
        .await
        .map_err(|e| LedgerError::wrap(ErrorKind::GetBalanceFailed, "failed to open read scope", e))?;

    let found = ledger::get_by_tenant(uow.handle(), tenant_id)
        .await
        .map_err(|e| LedgerError::wrap(ErrorKind::GetBalanceFailed, "failed to read ledger", e))?;

    let found = found.ok_or_else(|| {
        LedgerError::new(ErrorKind::LedgerNotFound, format!("no credit ledger found for tenant {tenant_id}"))
    })?;

    Ok(BalanceResponse { tenant_id: found.tenant_id, balance: found.balance, last_updated: found.updated_at })
}

/// Lista paginada del historial de transacciones de un tenant, más
/// recientes primero.
#[instrument(skip(client))]
pub async fn list_transactions(
    client: &TursoClient,
    tenant_id: &str,
    limit: i64,
    offset: i64,
) -> Outcome<ListTransactionsResponse> {
    let uow = UnitOfWork::begin_read_only(client)
        .await
        .map_err(|e| LedgerError::wrap(ErrorKind::ListTransactionsFailed, "failed to open read scope", e))?;

    let rows = transaction_repo::get_by_tenant(uow.handle(), tenant_id, limit, offset)
        .await
        .map_err(|e| LedgerError::wrap(ErrorKind::ListTransactionsFailed, "failed to list transactions", e))?;

    let total = transaction_repo::count_by_tenant(uow.handle(), tenant_id)
        .await
        .map_err(|e| LedgerError::wrap(ErrorKind::ListTransactionsFailed, "failed to count transactions", e))?;

    let transactions = rows
        .into_iter()
        .map(|entry| TransactionSummary {
            id: entry.id,
            transaction_type: entry.transaction_type.as_str().to_string(),
            amount: entry.amount,
            balance_after: entry.balance_after,
            reference_type: entry.reference_type,
            reference_id: entry.reference_id,
            created_at: entry.created_at,
        })
        .collect();

    Ok(ListTransactionsResponse { transactions, total, limit, offset })
}

/// Matriz de costo por tipo de paso de pipeline. En producción estos
/// valores vendrían de configuración; se mantiene estática aquí. La
/// asimetría entre el total (que cuenta duplicados) y el desglose (que
/// los colapsa en una sola entrada) es deliberada, no un defecto.
fn step_cost_matrix() -> BTreeMap<&'static str, Decimal> {
    let mut matrix = BTreeMap::new();
    matrix.insert("ANALYSIS", Decimal::new(100, 1));
    matrix.insert("USER_STORIES", Decimal::new(125, 1));
    matrix.insert("CODE", Decimal::new(150, 1));
    matrix.insert("TEST", Decimal::new(80, 1));
    matrix.insert("REVIEW", Decimal::new(50, 1));
    matrix.insert("DEPLOY", Decimal::new(30, 1));
    matrix
}

const DEFAULT_STEP_COST: i64 = 50;

/// Estima el costo en créditos de un pipeline sin mutar ningún balance.
#[instrument(skip(command))]
pub fn estimate_cost(command: EstimateCommand) -> Outcome<EstimateResponse> {
    let matrix = step_cost_matrix();
    let mut breakdown = BTreeMap::new();
    let mut total = Decimal::ZERO;

    for step in &command.pipeline_steps {
        let normalized = step.to_uppercase();
        let cost = matrix.get(normalized.as_str()).copied().unwrap_or(Decimal::new(DEFAULT_STEP_COST, 1));
        breakdown.insert(normalized, cost);
        total += cost;
    }

    Ok(EstimateResponse { estimated_credits: total, breakdown })
}
