//! Transport Request Model

use super::cargo::CargoCreate;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Request status
///
/// Only `Open -> Closed` is ever taken. `Confirmed` and `Resold` exist for
/// wire compatibility with listings that display them.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RequestStatus {
    Open,
    Closed,
    Confirmed,
    Resold,
}

/// Port pair shared by requests and containers
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Route {
    pub departure_port: String,
    pub arrival_port: String,
}

impl Route {
    pub fn new(departure_port: impl Into<String>, arrival_port: impl Into<String>) -> Self {
        Self {
            departure_port: departure_port.into(),
            arrival_port: arrival_port.into(),
        }
    }

    /// Port names are compared trimmed and case-insensitively
    pub fn matches(&self, other: &Route) -> bool {
        fn same(a: &str, b: &str) -> bool {
            a.trim().eq_ignore_ascii_case(b.trim())
        }
        same(&self.departure_port, &other.departure_port)
            && same(&self.arrival_port, &other.arrival_port)
    }
}

/// Transport request entity (运输请求)
///
/// `source_offer_id` is set iff the request was spawned by reselling a won
/// offer; such a request is a *resale* request, otherwise it is an *original*.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Request {
    pub id: i64,
    pub cargo_id: i64,
    /// Current owner: the shipper for originals, the reseller for resales
    pub requester_id: i64,
    #[serde(flatten)]
    pub route: Route,
    /// Bidding deadline (Unix millis)
    pub deadline: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub desired_arrival_date: Option<NaiveDate>,
    pub trade_type: String,
    pub transport_type: String,
    pub status: RequestStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_offer_id: Option<i64>,
    pub created_at: i64,
}

impl Request {
    pub fn is_open(&self) -> bool {
        self.status == RequestStatus::Open
    }

    pub fn is_resale(&self) -> bool {
        self.source_offer_id.is_some()
    }

    /// Deadline passed at `now` (a bid placed exactly at the deadline is late)
    pub fn is_expired(&self, now: i64) -> bool {
        self.deadline <= now
    }
}

/// Create original request payload (cargo is created together with it)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestCreate {
    pub cargo: CargoCreate,
    #[serde(flatten)]
    pub route: Route,
    pub deadline: i64,
    #[serde(default)]
    pub desired_arrival_date: Option<NaiveDate>,
    pub trade_type: String,
    pub transport_type: String,
}
