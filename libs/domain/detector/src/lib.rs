// [libs/domain/detector/src/lib.rs]
/*!
 * =================================================================
 * APARATO: ABNORMAL USAGE DETECTOR (V1.0 - LEDGER GROUND ZERO)
 * CLASIFICACIÓN: DOMAIN LOGIC (ESTRATO L2)
 * RESPONSABILIDAD: DETECCIÓN DE CONSUMO ANÓMALO POR VENTANA
 *
 * 1. Resuelve la ventana `[period_start, period_end)` (por defecto, la
 *    última hora truncada).
 * 2. Agrega el consumo por tenant dentro de la ventana.
 * 3. Para cada tenant cuyo consumo supera el umbral, comprueba
 *    deduplicación y crea un registro `DETECTED`.
 * 4. Confirma una sola vez al final, incluso sin anomalías nuevas.
 * 5. Notifica cada anomalía recién creada fuera de todo alcance
 *    transaccional; si la entrega tiene éxito, marca `notified_at` en
 *    un alcance de escritura acotado a esa sola actualización.
 * =================================================================
 */

use chrono::{DateTime, Duration, TimeZone, Timelike, Utc};
use ledger_domain_models::{AnomalyStatus, AnomalyType, ErrorKind, LedgerError, Outcome, UsageAnomaly};
use ledger_domain_notification::NotificationGateway;
use ledger_infra_db::repositories::{anomaly as anomaly_repo, transaction as transaction_repo};
use ledger_infra_db::{TursoClient, UnitOfWork};
use rust_decimal::Decimal;
use tracing::{info, instrument, warn};
use uuid::Uuid;

/// Resumen de una pasada de detección, devuelto a los llamadores del
/// worker (apps/anomaly-detector) y a las pruebas de integración.
#[derive(Debug, Clone)]
pub struct DetectionSummary {
    pub anomalies_detected: usize,
    pub anomaly_ids: Vec<String>,
    pub period_start: DateTime<Utc>,
    pub period_end: DateTime<Utc>,
    pub threshold_used: Decimal,
}

/// Configuración de una pasada del detector: el tipo de ventana
/// (hourly/daily, las dos variantes soportadas en runtime) decide el
/// `anomaly_type` y el umbral contra el cual comparar.
#[derive(Debug, Clone)]
pub struct DetectorConfig {
    pub threshold: Decimal,
    pub anomaly_type: AnomalyType,
}

fn default_window(period_start: Option<DateTime<Utc>>, period_end: Option<DateTime<Utc>>) -> (DateTime<Utc>, DateTime<Utc>) {
    let period_end = period_end.unwrap_or_else(|| {
        let now = Utc::now();
        Utc.with_ymd_and_hms(now.year(), now.month(), now.day(), now.hour(), 0, 0).single().unwrap_or(now)
    });
    let period_start = period_start.unwrap_or_else(|| period_end - Duration::hours(1));
    (period_start, period_end)
}

use chrono::Datelike;

/// Ejecuta una pasada de detección para la ventana dada.
#[instrument(skip(client, notifier, config))]
pub async fn run_once(
    client: &TursoClient,
    notifier: &NotificationGateway,
    config: &DetectorConfig,
    period_start: Option<DateTime<Utc>>,
    period_end: Option<DateTime<Utc>>,
) -> Outcome<DetectionSummary> {
    let (period_start, period_end) = default_window(period_start, period_end);

    info!(?period_start, ?period_end, threshold = %config.threshold, "running abnormal usage detection");

    let uow = UnitOfWork::begin_for_write(client)
        .await
        .map_err(|e| LedgerError::wrap(ErrorKind::DetectionFailed, "failed to open detection scope", e))?;

    let consumption_by_tenant = transaction_repo::sum_consumption_by_tenant(uow.handle(), period_start, period_end)
        .await
        .map_err(|e| LedgerError::wrap(ErrorKind::DetectionFailed, "failed to aggregate consumption", e))?;

    let mut created_ids = Vec::new();

    for (tenant_id, total_consumed) in consumption_by_tenant {
        if total_consumed <= config.threshold {
            continue;
        }

        let already_detected = anomaly_repo::exists_for_tenant_period(uow.handle(), &tenant_id, period_start, period_end)
            .await
            .map_err(|e| LedgerError::wrap(ErrorKind::DetectionFailed, "failed to check anomaly dedup", e))?;

        if already_detected {
            continue;
        }

        let anomaly = UsageAnomaly {
            id: Uuid::new_v4().to_string(),
            tenant_id: tenant_id.clone(),
            anomaly_type: config.anomaly_type,
            status: AnomalyStatus::Detected,
            threshold_value: config.threshold,
            actual_value: total_consumed,
            period_start,
            period_end,
            description: format!(
                "Tenant {tenant_id} exceeded {} threshold. Consumed: {total_consumed}, Threshold: {}",
                config.anomaly_type.as_str(),
                config.threshold,
            ),
            metadata: None,
            detected_at: Utc::now(),
            notified_at: None,
            resolved_at: None,
            resolved_by: None,
        };

        anomaly_repo::create(uow.handle(), &anomaly)
            .await
            .map_err(|e| LedgerError::wrap(ErrorKind::DetectionFailed, "failed to persist anomaly", e))?;

        warn!(tenant_id = %tenant_id, actual_value = %total_consumed, threshold = %config.threshold, "anomaly detected");
        created_ids.push(anomaly.id);
    }

    // Confirmamos una sola vez aunque no se haya creado ninguna anomalía,
    // para cerrar el alcance limpiamente en cualquier caso.
    uow.commit()
        .await
        .map_err(|e| LedgerError::wrap(ErrorKind::DetectionFailed, "failed to commit detection pass", e))?;

    for anomaly_id in &created_ids {
        notify_and_mark(client, notifier, anomaly_id).await;
    }

    info!(detected = created_ids.len(), "detection pass complete");

    Ok(DetectionSummary {
        anomalies_detected: created_ids.len(),
        anomaly_ids: created_ids,
        period_start,
        period_end,
        threshold_used: config.threshold,
    })
}

/// Notifica una anomalía recién creada fuera de todo alcance
/// transaccional: el POST del webhook (hasta 10s de timeout) no debe
/// sostener el bloqueo de escritura de toda la base de datos, o
/// serializaría a Consume/Refund/Allocate y a la próxima pasada de
/// detección detrás de una llamada de red externa. Sólo si la entrega
/// tiene éxito se abre un alcance de escritura, acotado a `mark_notified`.
async fn notify_and_mark(client: &TursoClient, notifier: &NotificationGateway, anomaly_id: &str) {
    let anomaly = {
        let uow = match UnitOfWork::begin_read_only(client).await {
            Ok(uow) => uow,
            Err(fault) => {
                warn!(anomaly_id, error = %fault, "failed to open notification read scope");
                return;
            }
        };

        match anomaly_repo::get_by_id(uow.handle(), anomaly_id).await {
            Ok(Some(anomaly)) => anomaly,
            Ok(None) => {
                warn!(anomaly_id, "anomaly vanished before notification");
                return;
            }
            Err(fault) => {
                warn!(anomaly_id, error = %fault, "failed to re-read anomaly for notification");
                return;
            }
        }
    };

    if !notifier.send_anomaly_alert(&anomaly).await {
        return;
    }

    let uow = match UnitOfWork::begin_for_write(client).await {
        Ok(uow) => uow,
        Err(fault) => {
            warn!(anomaly_id, error = %fault, "failed to open mark-notified write scope");
            return;
        }
    };

    if let Err(fault) = anomaly_repo::mark_notified(uow.handle(), anomaly_id, Utc::now()).await {
        warn!(anomaly_id, error = %fault, "failed to mark anomaly as notified");
        return;
    }

    if let Err(fault) = uow.commit().await {
        warn!(anomaly_id, error = %fault, "failed to commit notified-at update");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ledger_domain_billing::{allocate, consume};
    use ledger_domain_billing::dto::{AllocateCommand, ConsumeCommand};
    use rust_decimal_macros::dec;

    async fn in_memory_client() -> TursoClient {
        TursoClient::connect(":memory:", None).await.expect("in-memory ledger database")
    }

    async fn seed_consumption(client: &TursoClient, tenant_id: &str, amount: Decimal, key: &str) {
        allocate(
            client,
            AllocateCommand {
                tenant_id: tenant_id.into(),
                amount: dec!(100000),
                idempotency_key: format!("seed:{tenant_id}"),
                reference_type: None,
                reference_id: None,
            },
        )
        .await
        .expect("seed allocation");

        consume(
            client,
            ConsumeCommand {
                tenant_id: tenant_id.into(),
                amount,
                idempotency_key: key.into(),
                reference_type: None,
                reference_id: None,
            },
        )
        .await
        .expect("seed consumption");
    }

    #[tokio::test]
    async fn flags_tenants_exceeding_threshold_and_dedups_on_rerun() {
        let client = in_memory_client().await;
        let notifier = NotificationGateway::configured(None);
        let config = DetectorConfig { threshold: dec!(50), anomaly_type: AnomalyType::HourlyThreshold };

        let period_start = Utc::now() - Duration::hours(1);
        let period_end = Utc::now() + Duration::hours(1);

        seed_consumption(&client, "tenant_over", dec!(75), "consume:over").await;
        seed_consumption(&client, "tenant_under", dec!(10), "consume:under").await;

        let first_pass = run_once(&client, &notifier, &config, Some(period_start), Some(period_end))
            .await
            .expect("first detection pass succeeds");

        assert_eq!(first_pass.anomalies_detected, 1);

        let second_pass = run_once(&client, &notifier, &config, Some(period_start), Some(period_end))
            .await
            .expect("second detection pass succeeds");

        assert_eq!(second_pass.anomalies_detected, 0, "dedup contract forbids a second row for the same period");
    }
}
