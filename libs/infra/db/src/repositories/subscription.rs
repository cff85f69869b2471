// [libs/infra/db/src/repositories/subscription.rs]
/*!
 * APARATO: SUBSCRIPTION REPOSITORY (V1.0 - LEDGER GROUND ZERO)
 * CLASIFICACIÓN: INFRASTRUCTURE ADAPTER (ESTRATO L3)
 * RESPONSABILIDAD: LECTURA DE SUSCRIPCIONES PARA EL ASIGNADOR MENSUAL
 */

use libsql::{params, Row, Transaction};
use tracing::instrument;

use super::{parse_optional_timestamp, parse_timestamp};
use crate::errors::DbError;
use ledger_domain_models::{Subscription, SubscriptionStatus};

const SELECT_COLUMNS: &str = "id, tenant_id, status, plan_name, monthly_credits, start_date, end_date";

fn row_to_subscription(row: Row) -> Result<Subscription, DbError> {
    let raw_status = row.get::<String>(2)?;
    let status = SubscriptionStatus::parse(&raw_status)
        .ok_or_else(|| DbError::MappingError(format!("UNKNOWN_SUBSCRIPTION_STATUS: {raw_status}")))?;

    Ok(Subscription {
        id: row.get::<String>(0)?,
        tenant_id: row.get::<String>(1)?,
        status,
        plan_name: row.get::<String>(3)?,
        monthly_credits: super::parse_decimal(&row.get::<String>(4)?)?,
        start_date: parse_timestamp(&row.get::<String>(5)?)?,
        end_date: parse_optional_timestamp(row.get::<Option<String>>(6)?)?,
    })
}

/// Sólo las suscripciones ACTIVE participan en la asignación mensual.
#[instrument(skip(transaction))]
pub async fn get_active_subscriptions(transaction: &Transaction) -> Result<Vec<Subscription>, DbError> {
    let mut rows = transaction
        .query(
            &format!("SELECT {SELECT_COLUMNS} FROM subscriptions WHERE status = 'ACTIVE' ORDER BY tenant_id ASC"),
            (),
        )
        .await?;

    let mut subscriptions = Vec::new();
    while let Some(row) = rows.next().await? {
        subscriptions.push(row_to_subscription(row)?);
    }
    Ok(subscriptions)
}
