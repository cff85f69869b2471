// [libs/domain/models/src/transaction.rs]
/*!
 * Entidad `CreditTransaction`: entrada inmutable de auditoría del ledger.
 *
 * Invariantes:
 * - `idempotency_key` es única en toda la tabla.
 * - CONSUME:  balance_after = balance_before - amount
 * - REFUND/ALLOCATE: balance_after = balance_before + amount
 * - ADJUST:  balance_after = balance_before + signed_amount
 * - Nunca se actualiza ni se borra tras el insert.
 */

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum TransactionType {
    Consume,
    Refund,
    Allocate,
    Adjust,
}

impl TransactionType {
    pub fn as_str(self) -> &'static str {
        match self {
            TransactionType::Consume => "CONSUME",
            TransactionType::Refund => "REFUND",
            TransactionType::Allocate => "ALLOCATE",
            TransactionType::Adjust => "ADJUST",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "CONSUME" => Some(TransactionType::Consume),
            "REFUND" => Some(TransactionType::Refund),
            "ALLOCATE" => Some(TransactionType::Allocate),
            "ADJUST" => Some(TransactionType::Adjust),
            _ => None,
        }
    }

    /// El signo que este tipo de movimiento aporta al balance agregado por
    /// `sum_by_ledger`. ADJUST no tiene signo fijo: su magnitud ya viene
    /// firmada en `amount`.
    pub fn ledger_sign(self) -> i32 {
        match self {
            TransactionType::Consume => -1,
            TransactionType::Refund | TransactionType::Allocate => 1,
            TransactionType::Adjust => 0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CreditTransaction {
    pub id: String,
    pub tenant_id: String,
    pub ledger_id: String,
    pub transaction_type: TransactionType,
    pub amount: Decimal,
    pub balance_before: Decimal,
    pub balance_after: Decimal,
    pub reference_type: Option<String>,
    pub reference_id: Option<String>,
    pub idempotency_key: String,
    pub created_at: DateTime<Utc>,
}

/// Aplica la aritmética de movimiento de saldo según el tipo de transacción.
/// Para ADJUST, `amount` ya lleva el signo.
pub fn apply_balance_delta(transaction_type: TransactionType, balance_before: Decimal, amount: Decimal) -> Decimal {
    match transaction_type {
        TransactionType::Consume => balance_before - amount,
        TransactionType::Refund | TransactionType::Allocate => balance_before + amount,
        TransactionType::Adjust => balance_before + amount,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    #[test]
    fn consume_subtracts_and_allocate_adds() {
        assert_eq!(apply_balance_delta(TransactionType::Consume, dec!(100), dec!(40)), dec!(60));
        assert_eq!(apply_balance_delta(TransactionType::Allocate, dec!(100), dec!(40)), dec!(140));
        assert_eq!(apply_balance_delta(TransactionType::Refund, dec!(100), dec!(40)), dec!(140));
    }

    #[test]
    fn adjust_applies_signed_amount_either_direction() {
        assert_eq!(apply_balance_delta(TransactionType::Adjust, dec!(100), dec!(-25)), dec!(75));
        assert_eq!(apply_balance_delta(TransactionType::Adjust, dec!(100), dec!(25)), dec!(125));
    }

    proptest! {
        // Chaining consume-then-refund of the same magnitude restores the
        // starting balance, independent of the magnitude chosen.
        #[test]
        fn consume_then_refund_same_amount_round_trips(
            starting_balance in 0i64..1_000_000_000i64,
            amount in 0i64..1_000_000_000i64,
        ) {
            let start = Decimal::new(starting_balance, 6);
            let delta = Decimal::new(amount, 6);
            let after_consume = apply_balance_delta(TransactionType::Consume, start, delta);
            let after_refund = apply_balance_delta(TransactionType::Refund, after_consume, delta);
            prop_assert_eq!(after_refund, start);
        }
    }
}
