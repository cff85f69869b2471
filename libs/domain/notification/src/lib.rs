// [libs/domain/notification/src/lib.rs]
/*!
 * =================================================================
 * APARATO: ANOMALY NOTIFICATION GATEWAY (V1.0 - LEDGER GROUND ZERO)
 * CLASIFICACIÓN: DOMAIN LOGIC (ESTRATO L2)
 * RESPONSABILIDAD: COLABORADOR DE NOTIFICACIÓN DE ANOMALÍAS
 *
 * Tres estrategias:
 * - Logging: siempre entrega true (nunca falla).
 * - Webhook: POST de un payload JSON al endpoint configurado.
 * - Composite: delega a varias estrategias; éxito si alguna entrega true.
 *
 * El núcleo del ledger sólo conoce `send_anomaly_alert(anomaly) ->
 * bool`; decide llamar a `anomaly.mark_notified` según ese booleano.
 * =================================================================
 */

use ledger_domain_models::UsageAnomaly;
use serde::Serialize;
use std::time::Duration;
use tracing::{error, info, warn};

#[derive(Debug, Serialize)]
struct AnomalyAlertPayload<'a> {
    r#type: &'static str,
    anomaly_id: &'a str,
    tenant_id: &'a str,
    anomaly_type: &'static str,
    status: &'static str,
    threshold_value: String,
    actual_value: String,
    period_start: String,
    period_end: String,
    description: &'a str,
    detected_at: String,
}

/// Entrega una alerta escribiéndola en el log estructurado. Nunca falla:
/// es el colaborador de respaldo cuando no hay webhook configurado.
#[derive(Debug, Clone, Default)]
pub struct LoggingNotificationGateway;

impl LoggingNotificationGateway {
    pub async fn send_anomaly_alert(&self, anomaly: &UsageAnomaly) -> bool {
        warn!(
            tenant_id = %anomaly.tenant_id,
            anomaly_type = anomaly.anomaly_type.as_str(),
            actual_value = %anomaly.actual_value,
            threshold_value = %anomaly.threshold_value,
            period_start = %anomaly.period_start,
            period_end = %anomaly.period_end,
            "[ANOMALY ALERT]"
        );
        true
    }
}

/// Entrega una alerta vía webhook HTTP. El éxito depende de que el
/// servidor remoto responda con un código 2xx; cualquier fallo de red o
/// de estado se traga y reporta como `false` — el llamador sólo necesita
/// el booleano de éxito.
#[derive(Debug, Clone)]
pub struct WebhookNotificationGateway {
    webhook_url: String,
    client: reqwest::Client,
}

impl WebhookNotificationGateway {
    pub fn new(webhook_url: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_default();
        Self { webhook_url: webhook_url.into(), client }
    }

    pub async fn send_anomaly_alert(&self, anomaly: &UsageAnomaly) -> bool {
        let payload = AnomalyAlertPayload {
            r#type: "anomaly_alert",
            anomaly_id: &anomaly.id,
            tenant_id: &anomaly.tenant_id,
            anomaly_type: anomaly.anomaly_type.as_str(),
            status: anomaly.status.as_str(),
            threshold_value: anomaly.threshold_value.to_string(),
            actual_value: anomaly.actual_value.to_string(),
            period_start: anomaly.period_start.to_rfc3339(),
            period_end: anomaly.period_end.to_rfc3339(),
            description: &anomaly.description,
            detected_at: anomaly.detected_at.to_rfc3339(),
        };

        match self.client.post(&self.webhook_url).json(&payload).send().await {
            Ok(response) if response.status().is_success() => {
                info!(anomaly_id = %anomaly.id, webhook_url = %self.webhook_url, "webhook notification delivered");
                true
            }
            Ok(response) => {
                error!(anomaly_id = %anomaly.id, status = %response.status(), "webhook notification rejected");
                false
            }
            Err(fault) => {
                error!(anomaly_id = %anomaly.id, error = %fault, "webhook notification failed");
                false
            }
        }
    }
}

/// Colaborador de notificación configurado. `Composite` entrega `true`
/// si al menos una estrategia delegada entrega `true`.
#[derive(Debug, Clone)]
pub enum NotificationGateway {
    Logging(LoggingNotificationGateway),
    Webhook(WebhookNotificationGateway),
    Composite(Vec<NotificationGateway>),
}

impl NotificationGateway {
    /// Construye el colaborador según configuración
    /// (`ANOMALY_NOTIFICATION_WEBHOOK`): siempre incluye logging; añade
    /// webhook si hay URL configurada.
    pub fn configured(webhook_url: Option<&str>) -> Self {
        match webhook_url {
            Some(url) if !url.is_empty() => NotificationGateway::Composite(vec![
                NotificationGateway::Logging(LoggingNotificationGateway),
                NotificationGateway::Webhook(WebhookNotificationGateway::new(url)),
            ]),
            _ => NotificationGateway::Logging(LoggingNotificationGateway),
        }
    }

    pub fn send_anomaly_alert<'a>(
        &'a self,
        anomaly: &'a UsageAnomaly,
    ) -> std::pin::Pin<Box<dyn std::future::Future<Output = bool> + Send + 'a>> {
        Box::pin(async move {
            match self {
                NotificationGateway::Logging(gateway) => gateway.send_anomaly_alert(anomaly).await,
                NotificationGateway::Webhook(gateway) => gateway.send_anomaly_alert(anomaly).await,
                NotificationGateway::Composite(gateways) => {
                    let mut any_success = false;
                    for gateway in gateways {
                        if gateway.send_anomaly_alert(anomaly).await {
                            any_success = true;
                        }
                    }
                    any_success
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use ledger_domain_models::{AnomalyStatus, AnomalyType};
    use rust_decimal_macros::dec;

    fn sample_anomaly() -> UsageAnomaly {
        let now = Utc::now();
        UsageAnomaly {
            id: "anomaly-1".into(),
            tenant_id: "tenant_alpha".into(),
            anomaly_type: AnomalyType::HourlyThreshold,
            status: AnomalyStatus::Detected,
            threshold_value: dec!(100),
            actual_value: dec!(150),
            period_start: now - chrono::Duration::hours(1),
            period_end: now,
            description: "consumption exceeded threshold".into(),
            metadata: None,
            detected_at: now,
            notified_at: None,
            resolved_at: None,
            resolved_by: None,
        }
    }

    #[tokio::test]
    async fn logging_gateway_always_succeeds() {
        let gateway = NotificationGateway::configured(None);
        assert!(gateway.send_anomaly_alert(&sample_anomaly()).await);
    }

    #[tokio::test]
    async fn composite_succeeds_when_webhook_unreachable_because_logging_never_fails() {
        let gateway = NotificationGateway::configured(Some("http://127.0.0.1:1/unreachable"));
        assert!(gateway.send_anomaly_alert(&sample_anomaly()).await);
    }
}
