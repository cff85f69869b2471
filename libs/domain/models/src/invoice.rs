// [libs/domain/models/src/invoice.rs]
//! Entidades `Invoice` / `InvoiceLine`. A lo sumo una factura por
//! (tenant_id, billing_period_start, billing_period_end). La
//! máquina de estados DRAFT -> ISSUED -> PAID (y las rutas a CANCELLED)
//! queda fuera del alcance de este núcleo salvo la creación inicial en
//! DRAFT por el asignador mensual.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum InvoiceStatus {
    Draft,
    Issued,
    Paid,
    Cancelled,
}

impl InvoiceStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            InvoiceStatus::Draft => "DRAFT",
            InvoiceStatus::Issued => "ISSUED",
            InvoiceStatus::Paid => "PAID",
            InvoiceStatus::Cancelled => "CANCELLED",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "DRAFT" => Some(InvoiceStatus::Draft),
            "ISSUED" => Some(InvoiceStatus::Issued),
            "PAID" => Some(InvoiceStatus::Paid),
            "CANCELLED" => Some(InvoiceStatus::Cancelled),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Invoice {
    pub id: String,
    pub tenant_id: String,
    pub invoice_number: String,
    pub status: InvoiceStatus,
    pub total_amount: Decimal,
    pub currency: String,
    pub billing_period_start: DateTime<Utc>,
    pub billing_period_end: DateTime<Utc>,
    pub issued_at: Option<DateTime<Utc>>,
    pub paid_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InvoiceLine {
    pub id: String,
    pub invoice_id: String,
    pub description: String,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    pub total_price: Decimal,
    pub created_at: DateTime<Utc>,
}

impl InvoiceLine {
    /// Construye una línea garantizando `total_price == quantity * unit_price`.
    pub fn priced(
        id: String,
        invoice_id: String,
        description: String,
        quantity: Decimal,
        unit_price: Decimal,
        created_at: DateTime<Utc>,
    ) -> Self {
        let total_price = crate::money::scale_to_ledger_precision(quantity * unit_price);
        Self { id, invoice_id, description, quantity, unit_price, total_price, created_at }
    }
}
