// [apps/monthly-allocator/src/main.rs]
/*!
 * =================================================================
 * APARATO: MONTHLY ALLOCATOR WORKER SHELL (V1.0 - LEDGER GROUND ZERO)
 * CLASIFICACIÓN: APPLICATION SHELL (ESTRATO L4)
 * RESPONSABILIDAD: IGNICIÓN DEL CICLO DE ASIGNACIÓN MENSUAL
 *
 * Tres modos:
 * - `--year Y --month M`: una sola pasada explícita para ese periodo.
 * - (por defecto, sin `--continuous`): una sola pasada para el mes
 *   calendario anterior.
 * - `--continuous`: bucle diario gobernado por
 *   `should_run_monthly_allocation` (sólo dispara dentro de los
 *   primeros `MONTHLY_ALLOCATION_RUN_DAY` días del mes, a lo sumo una
 *   vez por mes calendario).
 * =================================================================
 */

use clap::Parser;
use ledger_domain_allocator::run_once;
use ledger_infra_db::TursoClient;
use ledger_shared_config::AppConfig;
use ledger_shared_heimdall::init_tracing;
use ledger_shared_worker_runtime::should_run_monthly_allocation;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::time::{interval, Duration};
use tracing::{error, info, warn};

const DAILY_GATE_CHECK_SECONDS: u64 = 86_400;

#[derive(Parser, Debug)]
#[command(author = "Raz Podesta <metaShark Tech>", about = "Monthly credit allocation worker")]
struct WorkerDirectives {
    /// Año explícito del periodo de facturación.
    #[arg(long)]
    year: Option<i32>,

    /// Mes explícito (1-12) del periodo de facturación.
    #[arg(long)]
    month: Option<u32>,

    /// Bucle diario gobernado por la ventana de ejecución mensual.
    #[arg(long)]
    continuous: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    init_tracing("ledger_monthly_allocator");

    let directives = WorkerDirectives::parse();
    let config = AppConfig::load()?;

    if !config.monthly_allocation_enabled {
        warn!("monthly allocation is disabled via MONTHLY_ALLOCATION_ENABLED, exiting");
        return Ok(());
    }

    let client = TursoClient::connect(&config.db_uri, config.db_auth_token.clone()).await?;

    if !directives.continuous {
        info!(year = ?directives.year, month = ?directives.month, "running a single monthly allocation pass");
        match run_once(&client, directives.year, directives.month, config.monthly_allocation_credit_price).await {
            Ok(summary) => {
                info!(
                    total_subscriptions = summary.total_subscriptions,
                    successful_allocations = summary.successful_allocations,
                    invoices_created = summary.invoices_created,
                    "monthly allocation pass complete"
                );
                return Ok(());
            }
            Err(fault) => {
                error!(error = %fault, "monthly allocation pass failed");
                return Err(Box::new(fault));
            }
        }
    }

    let shutdown_signal = Arc::new(AtomicBool::new(false));
    let shutdown_signal_for_handler = Arc::clone(&shutdown_signal);

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("shutdown requested, stopping after current check");
            shutdown_signal_for_handler.store(true, Ordering::SeqCst);
        }
    });

    info!(run_day = config.monthly_allocation_run_day, "starting continuous monthly allocation gate");

    let mut last_processed_month: Option<(i32, u32)> = None;
    let mut ticker = interval(Duration::from_secs(DAILY_GATE_CHECK_SECONDS));

    loop {
        ticker.tick().await;

        if shutdown_signal.load(Ordering::SeqCst) {
            break;
        }

        let today = chrono::Utc::now();
        if !should_run_monthly_allocation(today, config.monthly_allocation_run_day, last_processed_month) {
            continue;
        }

        use chrono::Datelike;
        match run_once(&client, None, None, config.monthly_allocation_credit_price).await {
            Ok(summary) => {
                info!(
                    total_subscriptions = summary.total_subscriptions,
                    successful_allocations = summary.successful_allocations,
                    invoices_created = summary.invoices_created,
                    "monthly allocation pass complete"
                );
                last_processed_month = Some((today.year(), today.month()));
            }
            Err(fault) => error!(error = %fault, "monthly allocation pass failed, will retry next window"),
        }
    }

    info!("monthly allocator shutting down");
    Ok(())
}
