// [libs/domain/models/src/money.rs]
//! Escala monetaria compartida: precisión 18 / escala 6, sin punto
//! flotante en ninguna ruta del ledger.

use rust_decimal::Decimal;

/// Escala fija de todos los montos del ledger: 6 dígitos decimales.
pub const LEDGER_SCALE: u32 = 6;

/// Redondea (banker's rounding, el predeterminado de `rust_decimal`) un
/// monto a la escala canónica del ledger.
pub fn scale_to_ledger_precision(amount: Decimal) -> Decimal {
    amount.round_dp(LEDGER_SCALE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn rounds_to_six_decimal_places() {
        assert_eq!(scale_to_ledger_precision(dec!(10.1234567)), dec!(10.123457));
    }

    #[test]
    fn leaves_already_scaled_amounts_untouched() {
        assert_eq!(scale_to_ledger_precision(dec!(400.000000)), dec!(400.000000));
    }
}
