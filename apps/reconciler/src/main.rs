// [apps/reconciler/src/main.rs]
/*!
 * =================================================================
 * APARATO: LEDGER RECONCILER WORKER SHELL (V1.0 - LEDGER GROUND ZERO)
 * CLASIFICACIÓN: APPLICATION SHELL (ESTRATO L4)
 * RESPONSABILIDAD: IGNICIÓN DEL CICLO DE AUDITORÍA DE CONSISTENCIA
 *
 * `--once` ejecuta una sola pasada y sale; el modo por defecto es
 * continuo diario (`--interval` segundos, o `RECONCILIATION_INTERVAL_SECONDS`).
 * =================================================================
 */

use clap::Parser;
use ledger_domain_reconciler::run_once;
use ledger_infra_db::TursoClient;
use ledger_shared_config::AppConfig;
use ledger_shared_heimdall::init_tracing;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{error, info, warn};

#[derive(Parser, Debug)]
#[command(author = "Raz Podesta <metaShark Tech>", about = "Ledger balance reconciliation worker")]
struct WorkerDirectives {
    /// Ejecuta una sola pasada de reconciliación y termina.
    #[arg(long)]
    once: bool,

    /// Intervalo entre pasadas en modo continuo.
    #[arg(long, env = "RECONCILIATION_INTERVAL_SECONDS_OVERRIDE")]
    interval: Option<u64>,
}

async fn run_reconciliation_pass(client: &TursoClient) {
    match run_once(client).await {
        Ok(summary) => {
            if summary.discrepancies_found() > 0 {
                warn!(
                    discrepancies = summary.discrepancies_found(),
                    total_ledgers_checked = summary.total_ledgers_checked,
                    "reconciliation pass found discrepancies"
                );
            } else {
                info!(total_ledgers_checked = summary.total_ledgers_checked, "reconciliation pass clean");
            }
        }
        Err(fault) => error!(error = %fault, "reconciliation pass failed"),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    init_tracing("ledger_reconciler");

    let directives = WorkerDirectives::parse();
    let config = AppConfig::load()?;

    if !config.reconciliation_enabled {
        warn!("reconciliation is disabled via RECONCILIATION_ENABLED, exiting");
        return Ok(());
    }

    let client = TursoClient::connect(&config.db_uri, config.db_auth_token.clone()).await?;

    if directives.once {
        info!("running a single reconciliation pass");
        run_reconciliation_pass(&client).await;
        return Ok(());
    }

    let interval_seconds = directives.interval.unwrap_or(config.reconciliation_interval_seconds);

    let shutdown_signal = Arc::new(AtomicBool::new(false));
    let shutdown_signal_for_handler = Arc::clone(&shutdown_signal);

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("shutdown requested, finishing current pass");
            shutdown_signal_for_handler.store(true, Ordering::SeqCst);
        }
    });

    ledger_shared_worker_runtime::run_forever("reconciler", interval_seconds, shutdown_signal, || {
        run_reconciliation_pass(&client)
    })
    .await;

    Ok(())
}
