use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "UPPERCASE")]
#[sqlx(type_name = "TEXT", rename_all = "UPPERCASE")]
pub enum OrderKind {
    Flight,
    Hotel,
}

impl OrderKind {
    /// Prefix used in generated order numbers, e.g. `FL-2024-0001`.
    pub fn order_number_prefix(&self) -> &'static str {
        match self {
            OrderKind::Flight => "FL",
            OrderKind::Hotel => "HT",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderKind::Flight => "FLIGHT",
            OrderKind::Hotel => "HOTEL",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "UPPERCASE")]
#[sqlx(type_name = "TEXT", rename_all = "UPPERCASE")]
pub enum OrderStatus {
    New,
    Processing,
    Confirmed,
    Rejected,
    Completed,
    Cancelled,
}

impl OrderStatus {
    /// Terminal statuses permit no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OrderStatus::Completed | OrderStatus::Rejected | OrderStatus::Cancelled
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::New => "NEW",
            OrderStatus::Processing => "PROCESSING",
            OrderStatus::Confirmed => "CONFIRMED",
            OrderStatus::Rejected => "REJECTED",
            OrderStatus::Completed => "COMPLETED",
            OrderStatus::Cancelled => "CANCELLED",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "UPPERCASE")]
#[sqlx(type_name = "TEXT", rename_all = "UPPERCASE")]
pub enum Priority {
    Low,
    Medium,
    High,
    Urgent,
}

/// Payload for submitting a flight booking request.
#[derive(Debug, Clone, Deserialize)]
pub struct NewFlightOrder {
    pub departure_city: String,
    pub arrival_city: String,
    pub departure_date: NaiveDate,
    pub departure_time: String,
    pub arrival_date: NaiveDate,
    pub arrival_time: String,
    pub flight_number: String,
    pub airline: String,
    pub purpose: String,
    #[serde(default = "default_priority")]
    pub priority: Priority,
    #[serde(default = "default_passengers")]
    pub passengers: i32,
    pub luggage_info: Option<String>,
    pub special_requests: Option<String>,
}

/// Payload for submitting a hotel booking request.
#[derive(Debug, Clone, Deserialize)]
pub struct NewHotelOrder {
    pub city: String,
    pub check_in_date: NaiveDate,
    pub check_in_time: String,
    pub check_out_date: NaiveDate,
    pub check_out_time: String,
    pub flight_date: NaiveDate,
    pub flight_number: String,
}

fn default_priority() -> Priority {
    Priority::Medium
}

fn default_passengers() -> i32 {
    1
}

/// A flight or hotel booking request. The two kinds share one table;
/// itinerary columns for the other kind are NULL.
///
/// `employee_id` and `full_name` are a snapshot of the submitter taken at
/// submission time and are intentionally never re-synced with later
/// profile edits.
#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct Order {
    pub id: Uuid,
    pub order_number: String,
    pub kind: OrderKind,
    pub user_id: Uuid,
    pub employee_id: String,
    pub full_name: String,
    pub status: OrderStatus,

    // flight itinerary
    pub departure_city: Option<String>,
    pub arrival_city: Option<String>,
    pub departure_date: Option<NaiveDate>,
    pub departure_time: Option<String>,
    pub arrival_date: Option<NaiveDate>,
    pub arrival_time: Option<String>,
    pub flight_number: Option<String>,
    pub airline: Option<String>,
    pub purpose: Option<String>,
    pub priority: Option<Priority>,
    pub passengers: Option<i32>,
    pub luggage_info: Option<String>,
    pub special_requests: Option<String>,

    // hotel itinerary
    pub city: Option<String>,
    pub check_in_date: Option<NaiveDate>,
    pub check_in_time: Option<String>,
    pub check_out_date: Option<NaiveDate>,
    pub check_out_time: Option<String>,
    pub flight_date: Option<NaiveDate>,

    pub processed_by: Option<Uuid>,
    pub processed_at: Option<DateTime<Utc>>,
    pub admin_notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
