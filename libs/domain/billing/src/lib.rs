// [libs/domain/billing/src/lib.rs]
/*!
 * =================================================================
 * APARATO: BILLING CORE ENGINE (V1.0 - LEDGER GROUND ZERO)
 * CLASIFICACIÓN: DOMAIN LOGIC (ESTRATO L2)
 * RESPONSABILIDAD: GOBERNANZA FINANCIERA DEL LEDGER DE CRÉDITOS
 *
 * Manejadores de comando (Consume/Refund/Allocate) y de consulta
 * (GetBalance/ListTransactions/EstimateCost) sobre el balance prepago
 * de un tenant. La persistencia vive en `ledger-infra-db`; este crate
 * orquesta la aritmética de dominio y las reglas de negocio.
 * =================================================================
 */

pub mod commands;
pub mod dto;
pub mod queries;

pub use commands::{allocate, consume, refund};
pub use queries::{estimate_cost, get_balance, list_transactions};

#[cfg(test)]
mod tests {
    use super::*;
    use dto::{AllocateCommand, ConsumeCommand, RefundCommand};
    use ledger_domain_models::ErrorKind;
    use ledger_infra_db::TursoClient;
    use rust_decimal_macros::dec;

    async fn in_memory_client() -> TursoClient {
        TursoClient::connect(":memory:", None).await.expect("in-memory ledger database")
    }

    #[tokio::test]
    async fn allocate_creates_ledger_on_first_use() {
        let client = in_memory_client().await;

        let response = allocate(
            &client,
            AllocateCommand {
                tenant_id: "tenant_alpha".into(),
                amount: dec!(100),
                idempotency_key: "allocation:tenant_alpha:2026-07".into(),
                reference_type: Some("subscription".into()),
                reference_id: None,
            },
        )
        .await
        .expect("allocation should succeed");

        assert_eq!(response.balance_before, dec!(0));
        assert_eq!(response.balance_after, dec!(100));

        let balance = get_balance(&client, "tenant_alpha").await.expect("balance should be readable");
        assert_eq!(balance.balance, dec!(100));
    }

    #[tokio::test]
    async fn allocate_is_idempotent_under_same_key() {
        let client = in_memory_client().await;
        let command = || AllocateCommand {
            tenant_id: "tenant_beta".into(),
            amount: dec!(50),
            idempotency_key: "allocation:tenant_beta:2026-07".into(),
            reference_type: None,
            reference_id: None,
        };

        let first = allocate(&client, command()).await.expect("first allocation succeeds");
        let second = allocate(&client, command()).await.expect("replay returns the same transaction");

        assert_eq!(first.transaction_id, second.transaction_id);
        assert_eq!(second.balance_after, dec!(50));
    }

    #[tokio::test]
    async fn consume_rejects_insufficient_balance() {
        let client = in_memory_client().await;
        allocate(
            &client,
            AllocateCommand {
                tenant_id: "tenant_gamma".into(),
                amount: dec!(10),
                idempotency_key: "allocation:tenant_gamma:2026-07".into(),
                reference_type: None,
                reference_id: None,
            },
        )
        .await
        .expect("seed allocation");

        let failure = consume(
            &client,
            ConsumeCommand {
                tenant_id: "tenant_gamma".into(),
                amount: dec!(25),
                idempotency_key: "pipeline_1:step_1".into(),
                reference_type: None,
                reference_id: None,
            },
        )
        .await
        .expect_err("consume should fail with insufficient credit");

        assert_eq!(failure.kind, ErrorKind::InsufficientCredit);
    }

    #[tokio::test]
    async fn consume_then_refund_restores_balance() {
        let client = in_memory_client().await;
        allocate(
            &client,
            AllocateCommand {
                tenant_id: "tenant_delta".into(),
                amount: dec!(100),
                idempotency_key: "allocation:tenant_delta:2026-07".into(),
                reference_type: None,
                reference_id: None,
            },
        )
        .await
        .expect("seed allocation");

        consume(
            &client,
            ConsumeCommand {
                tenant_id: "tenant_delta".into(),
                amount: dec!(40),
                idempotency_key: "pipeline_2:step_1".into(),
                reference_type: None,
                reference_id: None,
            },
        )
        .await
        .expect("consume should succeed");

        refund(
            &client,
            RefundCommand {
                tenant_id: "tenant_delta".into(),
                amount: dec!(40),
                idempotency_key: "refund:pipeline_2:step_1".into(),
                reference_type: None,
                reference_id: None,
            },
        )
        .await
        .expect("refund should succeed");

        let balance = get_balance(&client, "tenant_delta").await.expect("balance readable");
        assert_eq!(balance.balance, dec!(100));
    }

    #[tokio::test]
    async fn get_balance_reports_ledger_not_found() {
        let client = in_memory_client().await;
        let failure = get_balance(&client, "tenant_missing").await.expect_err("missing tenant should fail");
        assert_eq!(failure.kind, ErrorKind::LedgerNotFound);
    }

    #[test]
    fn estimate_cost_sums_known_and_unknown_steps() {
        let response = estimate_cost(dto::EstimateCommand {
            task_id: None,
            pipeline_steps: vec!["analysis".into(), "unknown_step".into()],
        })
        .expect("estimate should not fail");

        assert_eq!(response.breakdown.get("ANALYSIS"), Some(&dec!(10.0)));
        assert_eq!(response.breakdown.get("UNKNOWN_STEP"), Some(&dec!(5.0)));
        assert_eq!(response.estimated_credits, dec!(15.0));
    }
}
