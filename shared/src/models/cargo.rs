//! Cargo Model

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Cargo entity (货物)
///
/// Immutable once created. Resale never changes `owner_id`: the original
/// shipper stays the owner however many times the carrying capacity is resold.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Cargo {
    pub id: i64,
    pub owner_id: i64,
    pub item_name: String,
    /// Trade terms (e.g. FOB, CIF)
    pub incoterms: String,
    pub total_cbm: Decimal,
    pub is_dangerous: bool,
    pub created_at: i64,
}

/// Create cargo payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CargoCreate {
    pub item_name: String,
    pub incoterms: String,
    pub total_cbm: Decimal,
    #[serde(default)]
    pub is_dangerous: bool,
}
