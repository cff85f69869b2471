// [libs/domain/models/src/anomaly.rs]
//! Entidad `UsageAnomaly`: rastro de detección de consumo anómalo.
//! A lo sumo un registro por (tenant_id, period_start, period_end) —
//! contrato aplicado por el detector, no por el esquema.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AnomalyType {
    HourlyThreshold,
    DailyThreshold,
    Spike,
    Pattern,
}

impl AnomalyType {
    pub fn as_str(self) -> &'static str {
        match self {
            AnomalyType::HourlyThreshold => "HOURLY_THRESHOLD",
            AnomalyType::DailyThreshold => "DAILY_THRESHOLD",
            AnomalyType::Spike => "SPIKE",
            AnomalyType::Pattern => "PATTERN",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "HOURLY_THRESHOLD" => Some(AnomalyType::HourlyThreshold),
            "DAILY_THRESHOLD" => Some(AnomalyType::DailyThreshold),
            "SPIKE" => Some(AnomalyType::Spike),
            "PATTERN" => Some(AnomalyType::Pattern),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AnomalyStatus {
    Detected,
    Acknowledged,
    Resolved,
    FalsePositive,
}

impl AnomalyStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            AnomalyStatus::Detected => "DETECTED",
            AnomalyStatus::Acknowledged => "ACKNOWLEDGED",
            AnomalyStatus::Resolved => "RESOLVED",
            AnomalyStatus::FalsePositive => "FALSE_POSITIVE",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "DETECTED" => Some(AnomalyStatus::Detected),
            "ACKNOWLEDGED" => Some(AnomalyStatus::Acknowledged),
            "RESOLVED" => Some(AnomalyStatus::Resolved),
            "FALSE_POSITIVE" => Some(AnomalyStatus::FalsePositive),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UsageAnomaly {
    pub id: String,
    pub tenant_id: String,
    pub anomaly_type: AnomalyType,
    pub status: AnomalyStatus,
    pub threshold_value: Decimal,
    pub actual_value: Decimal,
    pub period_start: DateTime<Utc>,
    pub period_end: DateTime<Utc>,
    pub description: String,
    pub metadata: Option<serde_json::Value>,
    pub detected_at: DateTime<Utc>,
    pub notified_at: Option<DateTime<Utc>>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub resolved_by: Option<String>,
}
