// [libs/shared/worker-runtime/src/lib.rs]
/*!
 * =================================================================
 * APARATO: WORKER RUNTIME HARNESS (V1.0 - LEDGER GROUND ZERO)
 * CLASIFICACIÓN: SHARED UTILITY (ESTRATO L4)
 * RESPONSABILIDAD: BUCLE DE EJECUCIÓN PERIÓDICA DE TRABAJADORES
 *
 * Generaliza el patrón `tokio::time::interval` + `tokio::spawn` a
 * cualquier tarea periódica del ledger (detector/asignador/
 * reconciliador), con una señal de apagado ordenado `Arc<AtomicBool>`
 * compartida por los tres shells de trabajador.
 * =================================================================
 */

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::interval;
use tracing::{info, warn};

/// Ejecuta `task` cada `interval_seconds`, deteniéndose cuando
/// `shutdown_signal` se marca en `true`. La primera ejecución ocurre
/// tras el primer tick, no al arrancar.
pub async fn run_forever<F, Fut>(worker_name: &str, interval_seconds: u64, shutdown_signal: Arc<AtomicBool>, mut task: F)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = ()>,
{
    let mut ticker = interval(Duration::from_secs(interval_seconds));
    info!(worker_name, interval_seconds, "worker runtime started");

    loop {
        ticker.tick().await;

        if shutdown_signal.load(Ordering::SeqCst) {
            warn!(worker_name, "shutdown signal observed, stopping worker loop");
            break;
        }

        task().await;

        if shutdown_signal.load(Ordering::SeqCst) {
            warn!(worker_name, "shutdown signal observed after cycle, stopping worker loop");
            break;
        }
    }

    info!(worker_name, "worker runtime stopped");
}

/// Gobierna cuándo el asignador mensual debe disparar un nuevo ciclo en
/// modo continuo: sólo en los primeros `run_day` días del mes, y a lo
/// sumo una vez por mes calendario (guarda en memoria, no persistida).
pub fn should_run_monthly_allocation(
    today: chrono::DateTime<chrono::Utc>,
    run_day: u32,
    last_processed_month: Option<(i32, u32)>,
) -> bool {
    use chrono::Datelike;
    let current_month = (today.year(), today.month());
    today.day() <= run_day && last_processed_month != Some(current_month)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::sync::atomic::AtomicU32;

    #[test]
    fn monthly_gate_opens_only_within_the_run_window_and_once_per_month() {
        let early_in_month = chrono::Utc.with_ymd_and_hms(2026, 7, 2, 0, 0, 0).single().unwrap();
        let late_in_month = chrono::Utc.with_ymd_and_hms(2026, 7, 20, 0, 0, 0).single().unwrap();

        assert!(should_run_monthly_allocation(early_in_month, 3, None));
        assert!(!should_run_monthly_allocation(late_in_month, 3, None));
        assert!(!should_run_monthly_allocation(early_in_month, 3, Some((2026, 7))));
        assert!(should_run_monthly_allocation(early_in_month, 3, Some((2026, 6))));
    }

    #[tokio::test(start_paused = true)]
    async fn run_forever_stops_promptly_once_the_shutdown_flag_is_raised() {
        let shutdown_signal = Arc::new(AtomicBool::new(false));
        let cycles = Arc::new(AtomicU32::new(0));

        let loop_shutdown = shutdown_signal.clone();
        let loop_cycles = cycles.clone();

        let handle = tokio::spawn(async move {
            run_forever("test-worker", 1, loop_shutdown, || {
                let cycles = loop_cycles.clone();
                async move {
                    cycles.fetch_add(1, Ordering::SeqCst);
                }
            })
            .await;
        });

        tokio::time::advance(Duration::from_secs(3)).await;
        shutdown_signal.store(true, Ordering::SeqCst);
        tokio::time::advance(Duration::from_secs(2)).await;

        handle.await.expect("worker loop task should join cleanly");
        assert!(cycles.load(Ordering::SeqCst) >= 1);
    }
}
