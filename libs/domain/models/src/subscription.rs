// [libs/domain/models/src/subscription.rs]
//! Entidad `Subscription`: asignación de plan consumida por el asignador
//! mensual, que únicamente lee suscripciones ACTIVE.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum SubscriptionStatus {
    Active,
    Cancelled,
    Expired,
}

impl SubscriptionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            SubscriptionStatus::Active => "ACTIVE",
            SubscriptionStatus::Cancelled => "CANCELLED",
            SubscriptionStatus::Expired => "EXPIRED",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "ACTIVE" => Some(SubscriptionStatus::Active),
            "CANCELLED" => Some(SubscriptionStatus::Cancelled),
            "EXPIRED" => Some(SubscriptionStatus::Expired),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Subscription {
    pub id: String,
    pub tenant_id: String,
    pub status: SubscriptionStatus,
    pub plan_name: String,
    pub monthly_credits: Decimal,
    pub start_date: DateTime<Utc>,
    pub end_date: Option<DateTime<Utc>>,
}
