// [apps/anomaly-detector/src/main.rs]
/*!
 * =================================================================
 * APARATO: ANOMALY DETECTOR WORKER SHELL (V1.0 - LEDGER GROUND ZERO)
 * CLASIFICACIÓN: APPLICATION SHELL (ESTRATO L4)
 * RESPONSABILIDAD: IGNICIÓN DEL CICLO DE DETECCIÓN DE CONSUMO ANÓMALO
 *
 * Cada ciclo ejecuta dos pasadas independientes, hourly y daily, una por
 * cada umbral configurado. `--once` ejecuta un único ciclo y sale; el
 * modo por defecto es continuo con `run_forever`.
 * =================================================================
 */

use clap::Parser;
use ledger_domain_detector::{run_once, DetectorConfig};
use ledger_domain_models::AnomalyType;
use ledger_domain_notification::NotificationGateway;
use ledger_infra_db::TursoClient;
use ledger_shared_config::AppConfig;
use ledger_shared_heimdall::init_tracing;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{error, info, warn};

#[derive(Parser, Debug)]
#[command(author = "Raz Podesta <metaShark Tech>", about = "Abnormal usage detection worker")]
struct WorkerDirectives {
    /// Ejecuta una sola pasada de detección y termina.
    #[arg(long)]
    once: bool,

    /// Intervalo entre ciclos en modo continuo (default: 3600s).
    #[arg(long, env = "ANOMALY_DETECTION_INTERVAL_SECONDS", default_value_t = 3600)]
    interval_seconds: u64,
}

async fn run_detection_cycle(client: &TursoClient, notifier: &NotificationGateway, config: &AppConfig) {
    let hourly = DetectorConfig { threshold: config.anomaly_hourly_threshold, anomaly_type: AnomalyType::HourlyThreshold };

    match run_once(client, notifier, &hourly, None, None).await {
        Ok(summary) => info!(detected = summary.anomalies_detected, "hourly detection pass complete"),
        Err(fault) => error!(error = %fault, "hourly detection pass failed"),
    }

    let now = chrono::Utc::now();
    let daily_period_end = now;
    let daily_period_start = now - chrono::Duration::hours(24);
    let daily = DetectorConfig { threshold: config.anomaly_daily_threshold, anomaly_type: AnomalyType::DailyThreshold };

    match run_once(client, notifier, &daily, Some(daily_period_start), Some(daily_period_end)).await {
        Ok(summary) => info!(detected = summary.anomalies_detected, "daily detection pass complete"),
        Err(fault) => error!(error = %fault, "daily detection pass failed"),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    init_tracing("ledger_anomaly_detector");

    let directives = WorkerDirectives::parse();
    let config = AppConfig::load()?;

    if !config.anomaly_detection_enabled {
        warn!("anomaly detection is disabled via ANOMALY_DETECTION_ENABLED, exiting");
        return Ok(());
    }

    let client = TursoClient::connect(&config.db_uri, config.db_auth_token.clone()).await?;
    let notifier = NotificationGateway::configured(config.anomaly_notification_webhook.as_deref());

    if directives.once {
        info!("running a single detection cycle");
        run_detection_cycle(&client, &notifier, &config).await;
        return Ok(());
    }

    let shutdown_signal = Arc::new(AtomicBool::new(false));
    let shutdown_signal_for_handler = Arc::clone(&shutdown_signal);

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("shutdown requested, finishing current cycle");
            shutdown_signal_for_handler.store(true, Ordering::SeqCst);
        }
    });

    ledger_shared_worker_runtime::run_forever("anomaly-detector", directives.interval_seconds, shutdown_signal, || {
        run_detection_cycle(&client, &notifier, &config)
    })
    .await;

    Ok(())
}
