// [libs/shared/config/src/lib.rs]
/*!
 * =================================================================
 * APARATO: LEDGER CONFIGURATION LOADER (V1.0 - LEDGER GROUND ZERO)
 * CLASIFICACIÓN: SHARED UTILITY (ESTRATO L4/L6)
 * RESPONSABILIDAD: CARGA TIPADA DE VARIABLES DE ENTORNO
 *
 * `dotenv().ok()` seguido de lectura tipada con valores por defecto
 * sensatos. Ningún componente del ledger lee `std::env::var`
 * directamente fuera de este aparato — `AppConfig` es la única fuente
 * de verdad.
 * =================================================================
 */

use rust_decimal::Decimal;
use std::env;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("[L6_CONFIG_FAULT]: MALFORMED_VALUE -> {key}={raw} ({reason})")]
    MalformedValue { key: &'static str, raw: String, reason: String },
}

fn read_bool(key: &'static str, default: bool) -> Result<bool, ConfigError> {
    match env::var(key) {
        Ok(raw) => match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            other => Err(ConfigError::MalformedValue { key, raw: other.to_string(), reason: "expected boolean".into() }),
        },
        Err(_) => Ok(default),
    }
}

fn read_decimal(key: &'static str, default: Decimal) -> Result<Decimal, ConfigError> {
    match env::var(key) {
        Ok(raw) => Decimal::from_str(raw.trim())
            .map_err(|e| ConfigError::MalformedValue { key, raw, reason: e.to_string() }),
        Err(_) => Ok(default),
    }
}

fn read_u16(key: &'static str, default: u16) -> Result<u16, ConfigError> {
    match env::var(key) {
        Ok(raw) => raw.trim().parse().map_err(|e: std::num::ParseIntError| {
            ConfigError::MalformedValue { key, raw, reason: e.to_string() }
        }),
        Err(_) => Ok(default),
    }
}

fn read_u32(key: &'static str, default: u32) -> Result<u32, ConfigError> {
    match env::var(key) {
        Ok(raw) => raw.trim().parse().map_err(|e: std::num::ParseIntError| {
            ConfigError::MalformedValue { key, raw, reason: e.to_string() }
        }),
        Err(_) => Ok(default),
    }
}

fn read_string(key: &'static str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn read_optional_string(key: &'static str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.is_empty())
}

/// Configuración completa del servicio de ledger, una sola fuente de
/// verdad cubriendo todas las claves reconocidas por el servicio.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub db_uri: String,
    pub db_auth_token: Option<String>,
    pub api_host: String,
    pub api_port: u16,
    pub log_level: String,

    pub anomaly_detection_enabled: bool,
    pub anomaly_hourly_threshold: Decimal,
    pub anomaly_daily_threshold: Decimal,
    pub anomaly_notification_webhook: Option<String>,

    pub monthly_allocation_enabled: bool,
    pub monthly_allocation_credit_price: Decimal,
    pub monthly_allocation_run_day: u32,

    pub reconciliation_enabled: bool,
    pub reconciliation_interval_seconds: u64,
}

impl AppConfig {
    /// Carga `.env` (si existe, silenciosamente ignorado si no) y
    /// construye la configuración tipada a partir del entorno de proceso.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        Ok(Self {
            db_uri: read_string("DB_URI", "file:./ledger.db"),
            db_auth_token: read_optional_string("DB_AUTH_TOKEN"),
            api_host: read_string("API_HOST", "0.0.0.0"),
            api_port: read_u16("API_PORT", 8080)?,
            log_level: read_string("LOG_LEVEL", "info"),

            anomaly_detection_enabled: read_bool("ANOMALY_DETECTION_ENABLED", true)?,
            anomaly_hourly_threshold: read_decimal("ANOMALY_HOURLY_THRESHOLD", Decimal::new(1_000_000_000, 6))?,
            anomaly_daily_threshold: read_decimal("ANOMALY_DAILY_THRESHOLD", Decimal::new(10_000_000_000, 6))?,
            anomaly_notification_webhook: read_optional_string("ANOMALY_NOTIFICATION_WEBHOOK"),

            monthly_allocation_enabled: read_bool("MONTHLY_ALLOCATION_ENABLED", true)?,
            monthly_allocation_credit_price: read_decimal("MONTHLY_ALLOCATION_CREDIT_PRICE", Decimal::new(15, 3))?,
            monthly_allocation_run_day: read_u32("MONTHLY_ALLOCATION_RUN_DAY", 1)?,

            reconciliation_enabled: read_bool("RECONCILIATION_ENABLED", true)?,
            reconciliation_interval_seconds: read_u32("RECONCILIATION_INTERVAL_SECONDS", 86_400)? as u64,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane_without_any_environment() {
        // No llamamos a `AppConfig::load` (lee el entorno real del proceso
        // de pruebas, compartido entre tests); ejercitamos los lectores
        // directamente contra claves ausentes.
        assert_eq!(read_bool("LEDGER_TEST_UNSET_BOOL", true).unwrap(), true);
        assert_eq!(read_decimal("LEDGER_TEST_UNSET_DECIMAL", Decimal::new(15, 3)).unwrap(), Decimal::new(15, 3));
    }

    #[test]
    fn rejects_malformed_boolean() {
        env::set_var("LEDGER_TEST_BOOL_MALFORMED", "not-a-bool");
        let result = read_bool("LEDGER_TEST_BOOL_MALFORMED", true);
        env::remove_var("LEDGER_TEST_BOOL_MALFORMED");
        assert!(result.is_err());
    }
}
