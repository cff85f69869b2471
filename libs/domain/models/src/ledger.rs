// [libs/domain/models/src/ledger.rs]
/*!
 * Entidad `CreditLedger`: el balance prepago de un tenant.
 *
 * Invariante de no-negatividad: `balance >= 0` en todo momento. El
 * tipo no lo impone por construcción (la capa de persistencia y los
 * manejadores de comando lo hacen cumplir) pero `newly_created` deja
 * rastro de la intención en el propio constructor.
 */

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CreditLedger {
    pub id: String,
    pub tenant_id: String,
    pub balance: Decimal,
    pub monthly_limit: Option<Decimal>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CreditLedger {
    /// Un ledger recién creado siempre nace con balance cero — la única vía
    /// de creación es Allocate sobre un tenant ausente.
    pub fn newly_created(id: String, tenant_id: String, now: DateTime<Utc>) -> Self {
        Self {
            id,
            tenant_id,
            balance: Decimal::ZERO,
            monthly_limit: None,
            created_at: now,
            updated_at: now,
        }
    }
}
