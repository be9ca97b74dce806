//! Loaded Cargo Model

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Where a loaded-cargo row came from
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CargoSource {
    /// Matched on the platform through a winning offer
    Platform { offer_id: i64 },
    /// Registered by the forwarder outside the platform
    External { name: String },
}

/// Loaded cargo row (装载记录)
///
/// Links a container to the volume it carries, either for a winning offer or
/// for externally registered cargo.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ContainerCargo {
    pub id: i64,
    pub container_id: String,
    pub source: CargoSource,
    pub cbm_loaded: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub freight_cost: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub freight_currency: Option<String>,
    pub added_at: i64,
}

impl ContainerCargo {
    pub fn is_external(&self) -> bool {
        matches!(self.source, CargoSource::External { .. })
    }

    pub fn offer_id(&self) -> Option<i64> {
        match self.source {
            CargoSource::Platform { offer_id } => Some(offer_id),
            CargoSource::External { .. } => None,
        }
    }
}

/// Register external cargo payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExternalCargoCreate {
    pub name: String,
    pub cbm: Decimal,
    pub freight_cost: Decimal,
    pub currency: String,
}
