// [libs/domain/models/src/lib.rs]
/*!
 * =================================================================
 * APARATO: LEDGER DOMAIN CONTRACTS (V1.0 - GOLD MASTER)
 * CLASIFICACIÓN: DOMAIN LOGIC (ESTRATO L1)
 * RESPONSABILIDAD: ENTIDADES, ENUMERACIONES E INVARIANTES DEL LEDGER
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. DECIMAL PURITY: Todo monto monetario usa `rust_decimal::Decimal` a
 *    escala 6. Ningún punto flotante cruza una frontera del ledger.
 * 2. NOMINAL PURITY: Nomenclatura descriptiva absoluta sin abreviaciones.
 * 3. ZERO COUPLING: Este estrato no conoce persistencia ni transporte;
 *    únicamente define la gramática compartida por todos los niveles.
 * =================================================================
 */

pub mod ledger;
pub mod transaction;
pub mod anomaly;
pub mod subscription;
pub mod invoice;
pub mod outcome;
pub mod money;

pub use ledger::CreditLedger;
pub use transaction::{CreditTransaction, TransactionType};
pub use anomaly::{AnomalyStatus, AnomalyType, UsageAnomaly};
pub use subscription::{Subscription, SubscriptionStatus};
pub use invoice::{Invoice, InvoiceLine, InvoiceStatus};
pub use outcome::{ErrorKind, LedgerError, Outcome};
pub use money::scale_to_ledger_precision;
