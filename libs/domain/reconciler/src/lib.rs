// [libs/domain/reconciler/src/lib.rs]
/*!
 * =================================================================
 * APARATO: LEDGER BALANCE RECONCILER (V1.0 - LEDGER GROUND ZERO)
 * CLASIFICACIÓN: DOMAIN LOGIC (ESTRATO L2)
 * RESPONSABILIDAD: AUDITORÍA DE CONSISTENCIA BALANCE <-> HISTORIAL
 *
 * Para cada ledger, recalcula el balance a partir de la suma de
 * `credit_transactions` y lo compara contra el valor almacenado. Nunca
 * muta — abre su alcance en modo diferido y lo descarta al terminar.
 * Las discrepancias se reportan, nunca se corrigen automáticamente.
 * =================================================================
 */

use chrono::{DateTime, Utc};
use ledger_domain_models::{ErrorKind, LedgerError, Outcome};
use ledger_infra_db::repositories::{ledger as ledger_repo, transaction as transaction_repo};
use ledger_infra_db::{TursoClient, UnitOfWork};
use rust_decimal::Decimal;
use tracing::{error, info, instrument};

#[derive(Debug, Clone, PartialEq)]
pub struct LedgerDiscrepancy {
    pub tenant_id: String,
    pub ledger_id: String,
    pub ledger_balance: Decimal,
    pub calculated_balance: Decimal,
    pub discrepancy: Decimal,
}

#[derive(Debug, Clone)]
pub struct ReconciliationSummary {
    pub total_ledgers_checked: usize,
    pub discrepancies: Vec<LedgerDiscrepancy>,
    pub reconciliation_time: DateTime<Utc>,
    pub execution_time_ms: u128,
}

impl ReconciliationSummary {
    pub fn discrepancies_found(&self) -> usize {
        self.discrepancies.len()
    }
}

/// Ejecuta una pasada de reconciliación completa sobre todos los
/// ledgers. Registra cada discrepancia con severidad alta (`error!`):
/// son alertas accionables, no ruido de depuración.
#[instrument(skip(client))]
pub async fn run_once(client: &TursoClient) -> Outcome<ReconciliationSummary> {
    let started_at = std::time::Instant::now();
    let reconciliation_time = Utc::now();

    let uow = UnitOfWork::begin_read_only(client)
        .await
        .map_err(|e| LedgerError::wrap(ErrorKind::ReconciliationFailed, "failed to open read scope", e))?;

    let ledgers = ledger_repo::get_all(uow.handle())
        .await
        .map_err(|e| LedgerError::wrap(ErrorKind::ReconciliationFailed, "failed to list ledgers", e))?;

    let mut discrepancies = Vec::new();

    for ledger in &ledgers {
        let calculated_balance = transaction_repo::sum_by_ledger(uow.handle(), &ledger.id)
            .await
            .map_err(|e| LedgerError::wrap(ErrorKind::ReconciliationFailed, "failed to sum ledger transactions", e))?;

        if calculated_balance != ledger.balance {
            discrepancies.push(LedgerDiscrepancy {
                tenant_id: ledger.tenant_id.clone(),
                ledger_id: ledger.id.clone(),
                ledger_balance: ledger.balance,
                calculated_balance,
                discrepancy: ledger.balance - calculated_balance,
            });
        }
    }

    uow.rollback()
        .await
        .map_err(|e| LedgerError::wrap(ErrorKind::ReconciliationFailed, "failed to close read scope", e))?;

    if !discrepancies.is_empty() {
        error!(count = discrepancies.len(), "ALERT: ledger discrepancies found");
        for discrepancy in &discrepancies {
            error!(
                tenant_id = %discrepancy.tenant_id,
                ledger_id = %discrepancy.ledger_id,
                stored = %discrepancy.ledger_balance,
                calculated = %discrepancy.calculated_balance,
                delta = %discrepancy.discrepancy,
                "ledger balance mismatch"
            );
        }
    } else {
        info!(total_ledgers_checked = ledgers.len(), "reconciliation complete, no discrepancies");
    }

    Ok(ReconciliationSummary {
        total_ledgers_checked: ledgers.len(),
        discrepancies,
        reconciliation_time,
        execution_time_ms: started_at.elapsed().as_millis(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ledger_domain_billing::{allocate, dto::AllocateCommand};
    use ledger_infra_db::TursoClient;
    use rust_decimal_macros::dec;

    async fn in_memory_client() -> TursoClient {
        TursoClient::connect(":memory:", None).await.expect("in-memory ledger database")
    }

    #[tokio::test]
    async fn reports_no_discrepancies_for_a_consistent_ledger() {
        let client = in_memory_client().await;
        allocate(
            &client,
            AllocateCommand {
                tenant_id: "tenant_consistent".into(),
                amount: dec!(100),
                idempotency_key: "allocation:tenant_consistent:2026-07".into(),
                reference_type: None,
                reference_id: None,
            },
        )
        .await
        .expect("seed allocation");

        let summary = run_once(&client).await.expect("reconciliation succeeds");

        assert_eq!(summary.total_ledgers_checked, 1);
        assert_eq!(summary.discrepancies_found(), 0);
    }

    #[tokio::test]
    async fn flags_a_ledger_whose_stored_balance_was_tampered_with() {
        let client = in_memory_client().await;
        allocate(
            &client,
            AllocateCommand {
                tenant_id: "tenant_tampered".into(),
                amount: dec!(100),
                idempotency_key: "allocation:tenant_tampered:2026-07".into(),
                reference_type: None,
                reference_id: None,
            },
        )
        .await
        .expect("seed allocation");

        let uow = UnitOfWork::begin_for_write(&client).await.expect("write scope");
        uow.handle()
            .execute("UPDATE credit_ledgers SET balance = '999999.000000' WHERE tenant_id = 'tenant_tampered'", ())
            .await
            .expect("tamper with stored balance");
        uow.commit().await.expect("commit tamper");

        let summary = run_once(&client).await.expect("reconciliation succeeds");

        assert_eq!(summary.discrepancies_found(), 1);
        assert_eq!(summary.discrepancies[0].tenant_id, "tenant_tampered");
        assert_eq!(summary.discrepancies[0].calculated_balance, dec!(100));
    }
}
