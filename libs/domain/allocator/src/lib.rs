// [libs/domain/allocator/src/lib.rs]
/*!
 * =================================================================
 * APARATO: MONTHLY CREDIT ALLOCATOR (V1.0 - LEDGER GROUND ZERO)
 * CLASIFICACIÓN: DOMAIN LOGIC (ESTRATO L2)
 * RESPONSABILIDAD: ASIGNACIÓN MENSUAL Y FACTURACIÓN BORRADOR
 *
 * 1. Resuelve el periodo de facturación (mes anterior por defecto, con
 *    el acarreo diciembre->enero).
 * 2. Por cada suscripción ACTIVE: asigna créditos bajo la llave de
 *    idempotencia `allocation:<tenant_id>:<YYYY-MM>` (delegado en
 *    `ledger_domain_billing::allocate`, que ya trae su propio alcance
 *    transaccional) y luego crea la factura borrador correspondiente.
 * 3. Un tenant que falla no aborta el barrido completo — se cuenta
 *    como fallo y el asignador continúa con el resto.
 * =================================================================
 */

use chrono::{DateTime, Datelike, TimeZone, Utc};
use ledger_domain_billing::{allocate, dto::AllocateCommand};
use ledger_domain_models::{ErrorKind, Invoice, InvoiceLine, InvoiceStatus, LedgerError, Outcome};
use ledger_infra_db::repositories::{invoice as invoice_repo, subscription as subscription_repo};
use ledger_infra_db::{DbError, TursoClient, UnitOfWork};
use rust_decimal::Decimal;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

/// Número de intentos acotados ante una colisión de número de factura.
/// La decisión de usar reintento acotado en vez de, por ejemplo, un
/// generador de secuencia dedicado se documenta en DESIGN.md.
const INVOICE_NUMBER_RETRY_ATTEMPTS: u8 = 3;

#[derive(Debug, Clone)]
pub struct MonthlyAllocationSummary {
    pub total_subscriptions: usize,
    pub successful_allocations: usize,
    pub failed_allocations: usize,
    pub invoices_created: usize,
    pub billing_period_start: DateTime<Utc>,
    pub billing_period_end: DateTime<Utc>,
    pub execution_time_ms: u128,
}

fn generate_allocation_idempotency_key(tenant_id: &str, period_start: DateTime<Utc>) -> String {
    format!("allocation:{tenant_id}:{}", period_start.format("%Y-%m"))
}

/// Resuelve `[period_start, period_end]` para el mes dado, o el mes
/// calendario anterior si `year`/`month` no se proveen (acarreo
/// diciembre->enero, fin de mes consciente de años bisiestos).
pub fn resolve_billing_period(year: Option<i32>, month: Option<u32>) -> (DateTime<Utc>, DateTime<Utc>) {
    let (year, month) = match (year, month) {
        (Some(year), Some(month)) => (year, month),
        _ => {
            let today = Utc::now();
            if today.month() == 1 {
                (today.year() - 1, 12)
            } else {
                (today.year(), today.month() - 1)
            }
        }
    };

    let period_start = Utc.with_ymd_and_hms(year, month, 1, 0, 0, 0).single().expect("valid first-of-month");

    let (next_year, next_month) = if month == 12 { (year + 1, 1) } else { (year, month + 1) };
    let first_of_next_month =
        Utc.with_ymd_and_hms(next_year, next_month, 1, 0, 0, 0).single().expect("valid first-of-next-month");
    let last_day_of_month = (first_of_next_month - chrono::Duration::days(1)).day();

    let period_end = Utc
        .with_ymd_and_hms(year, month, last_day_of_month, 23, 59, 59)
        .single()
        .expect("valid end-of-month");

    (period_start, period_end)
}

/// Crea la factura borrador de un tenant para el periodo dado,
/// reintentando hasta `INVOICE_NUMBER_RETRY_ATTEMPTS` veces si la
/// generación de número colisiona con una factura concurrente.
/// `INVOICE_ALREADY_EXISTS` no es un reintento — es el contrato de
/// idempotencia por periodo y se propaga tal cual.
#[instrument(skip(client), fields(tenant_id = %tenant_id))]
pub async fn create_invoice(
    client: &TursoClient,
    tenant_id: &str,
    period_start: DateTime<Utc>,
    period_end: DateTime<Utc>,
    total_amount: Decimal,
    line_description: &str,
    line_quantity: Decimal,
    line_unit_price: Decimal,
) -> Outcome<Invoice> {
    for attempt in 1..=INVOICE_NUMBER_RETRY_ATTEMPTS {
        let uow = UnitOfWork::begin_for_write(client)
            .await
            .map_err(|e| LedgerError::wrap(ErrorKind::CreateInvoiceFailed, "failed to open write scope", e))?;

        let exists = invoice_repo::exists_for_period(uow.handle(), tenant_id, period_start, period_end)
            .await
            .map_err(|e| LedgerError::wrap(ErrorKind::CreateInvoiceFailed, "failed to check duplicate invoice", e))?;

        if exists {
            return Err(LedgerError::new(
                ErrorKind::InvoiceAlreadyExists,
                format!("invoice already exists for tenant {tenant_id} for period {period_start} to {period_end}"),
            ));
        }

        let now = Utc::now();
        let invoice_number = invoice_repo::generate_invoice_number(uow.handle(), now)
            .await
            .map_err(|e| LedgerError::wrap(ErrorKind::CreateInvoiceFailed, "failed to generate invoice number", e))?;

        let invoice = Invoice {
            id: Uuid::new_v4().to_string(),
            tenant_id: tenant_id.to_string(),
            invoice_number,
            status: InvoiceStatus::Draft,
            total_amount,
            currency: "USD".to_string(),
            billing_period_start: period_start,
            billing_period_end: period_end,
            issued_at: None,
            paid_at: None,
            created_at: now,
            updated_at: now,
        };

        let line = InvoiceLine::priced(
            Uuid::new_v4().to_string(),
            invoice.id.clone(),
            line_description.to_string(),
            line_quantity,
            line_unit_price,
            now,
        );

        match invoice_repo::create(uow.handle(), &invoice).await {
            Ok(()) => {
                invoice_repo::insert_lines(uow.handle(), std::slice::from_ref(&line))
                    .await
                    .map_err(|e| LedgerError::wrap(ErrorKind::CreateInvoiceFailed, "failed to persist invoice line", e))?;

                uow.commit()
                    .await
                    .map_err(|e| LedgerError::wrap(ErrorKind::CreateInvoiceFailed, "failed to commit invoice", e))?;

                return Ok(invoice);
            }
            Err(DbError::DuplicateInvoiceNumber) => {
                uow.rollback().await.map_err(|e| {
                    LedgerError::wrap(ErrorKind::CreateInvoiceFailed, "failed to roll back invoice-number collision", e)
                })?;
                warn!(attempt, invoice_number = %invoice.invoice_number, "invoice number collision, retrying");
                continue;
            }
            Err(db_fault) => {
                return Err(LedgerError::wrap(ErrorKind::CreateInvoiceFailed, "failed to persist invoice", db_fault));
            }
        }
    }

    Err(LedgerError::new(
        ErrorKind::CreateInvoiceFailed,
        format!("invoice number collided {INVOICE_NUMBER_RETRY_ATTEMPTS} times in a row for tenant {tenant_id}"),
    ))
}

/// Ejecuta una pasada de asignación mensual para el periodo dado (o el
/// mes calendario anterior).
#[instrument(skip(client, credit_price))]
pub async fn run_once(
    client: &TursoClient,
    year: Option<i32>,
    month: Option<u32>,
    credit_price: Decimal,
) -> Outcome<MonthlyAllocationSummary> {
    let started_at = std::time::Instant::now();
    let (period_start, period_end) = resolve_billing_period(year, month);

    info!(%period_start, %period_end, "starting monthly credit allocation");

    let read_uow = UnitOfWork::begin_read_only(client)
        .await
        .map_err(|e| LedgerError::wrap(ErrorKind::AllocateCreditFailed, "failed to open read scope", e))?;

    let subscriptions = subscription_repo::get_active_subscriptions(read_uow.handle())
        .await
        .map_err(|e| LedgerError::wrap(ErrorKind::AllocateCreditFailed, "failed to list active subscriptions", e))?;

    read_uow
        .rollback()
        .await
        .map_err(|e| LedgerError::wrap(ErrorKind::AllocateCreditFailed, "failed to close read scope", e))?;

    let total_subscriptions = subscriptions.len();
    info!(total_subscriptions, "active subscriptions found");

    let mut successful_allocations = 0usize;
    let mut failed_allocations = 0usize;
    let mut invoices_created = 0usize;

    for subscription in &subscriptions {
        let allocate_command = AllocateCommand {
            tenant_id: subscription.tenant_id.clone(),
            amount: subscription.monthly_credits,
            idempotency_key: generate_allocation_idempotency_key(&subscription.tenant_id, period_start),
            reference_type: Some("subscription".to_string()),
            reference_id: Some(subscription.id.clone()),
        };

        if let Err(fault) = allocate(client, allocate_command).await {
            error!(tenant_id = %subscription.tenant_id, error = %fault, "failed to allocate credits");
            failed_allocations += 1;
            continue;
        }

        successful_allocations += 1;
        info!(tenant_id = %subscription.tenant_id, amount = %subscription.monthly_credits, "allocated monthly credits");

        let invoice_amount = subscription.monthly_credits * credit_price;
        let description = format!("Monthly credit allocation - {}", subscription.plan_name);

        match create_invoice(
            client,
            &subscription.tenant_id,
            period_start,
            period_end,
            invoice_amount,
            &description,
            subscription.monthly_credits,
            credit_price,
        )
        .await
        {
            Ok(invoice) => {
                invoices_created += 1;
                info!(tenant_id = %subscription.tenant_id, invoice_number = %invoice.invoice_number, "invoice created");
            }
            Err(fault) if fault.kind == ErrorKind::InvoiceAlreadyExists => {
                info!(tenant_id = %subscription.tenant_id, "invoice already exists for period, skipping");
            }
            Err(fault) => {
                warn!(tenant_id = %subscription.tenant_id, error = %fault, "failed to create invoice");
            }
        }
    }

    let execution_time_ms = started_at.elapsed().as_millis();

    info!(
        successful_allocations,
        total_subscriptions, invoices_created, execution_time_ms, "monthly allocation complete"
    );

    Ok(MonthlyAllocationSummary {
        total_subscriptions,
        successful_allocations,
        failed_allocations,
        invoices_created,
        billing_period_start: period_start,
        billing_period_end: period_end,
        execution_time_ms,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ledger_infra_db::TursoClient;
    use rust_decimal_macros::dec;

    async fn in_memory_client() -> TursoClient {
        TursoClient::connect(":memory:", None).await.expect("in-memory ledger database")
    }

    #[test]
    fn resolve_billing_period_rolls_over_december_into_previous_year() {
        let (start, end) = resolve_billing_period(Some(2025), Some(12));
        assert_eq!(start.year(), 2025);
        assert_eq!(start.month(), 12);
        assert_eq!(start.day(), 1);
        assert_eq!(end.day(), 31);
    }

    #[test]
    fn resolve_billing_period_handles_leap_year_february() {
        let (start, end) = resolve_billing_period(Some(2028), Some(2));
        assert_eq!(start.month(), 2);
        assert_eq!(end.day(), 29, "2028 is a leap year");
    }

    #[tokio::test]
    async fn create_invoice_is_idempotent_per_billing_period() {
        let client = in_memory_client().await;
        let (period_start, period_end) = resolve_billing_period(Some(2026), Some(6));

        let first = create_invoice(
            &client,
            "tenant_alpha",
            period_start,
            period_end,
            dec!(15.00),
            "Monthly credit allocation - pro",
            dec!(1000),
            dec!(0.015),
        )
        .await
        .expect("first invoice should be created");

        assert_eq!(first.status, InvoiceStatus::Draft);
        assert!(first.invoice_number.starts_with("INV-2026-"));

        let second = create_invoice(
            &client,
            "tenant_alpha",
            period_start,
            period_end,
            dec!(15.00),
            "Monthly credit allocation - pro",
            dec!(1000),
            dec!(0.015),
        )
        .await
        .expect_err("duplicate invoice for the same period must be rejected");

        assert_eq!(second.kind, ErrorKind::InvoiceAlreadyExists);
    }

    #[tokio::test]
    async fn run_once_allocates_and_invoices_every_active_subscription() {
        let client = in_memory_client().await;

        // Sembrar una suscripción activa exige pasar por el ledger primero
        // para que exista un tenant con el que razonar; la suscripción en
        // sí se inserta directamente ya que este crate no posee su propio
        // comando de alta.
        let uow = UnitOfWork::begin_for_write(&client).await.expect("write scope");
        uow.handle()
            .execute(
                "INSERT INTO subscriptions (id, tenant_id, status, plan_name, monthly_credits, start_date, end_date)
                 VALUES ('sub-1', 'tenant_seed', 'ACTIVE', 'pro', '1000', '2026-01-01T00:00:00Z', NULL)",
                (),
            )
            .await
            .expect("seed subscription");
        uow.commit().await.expect("commit seed");

        let summary = run_once(&client, Some(2026), Some(6), dec!(0.015)).await.expect("allocation run succeeds");

        assert_eq!(summary.total_subscriptions, 1);
        assert_eq!(summary.successful_allocations, 1);
        assert_eq!(summary.invoices_created, 1);
        assert_eq!(summary.failed_allocations, 0);
    }
}
