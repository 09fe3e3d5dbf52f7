use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Positions that grant administrative access over orders and users.
pub const ADMIN_POSITIONS: &[&str] = &["ADMIN", "MANAGER", "SUPERVISOR"];

#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub employee_id: String,
    pub full_name: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub position: String,
    pub location: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub last_login: Option<DateTime<Utc>>,
}

impl User {
    pub fn is_admin(&self) -> bool {
        is_admin_position(&self.position)
    }
}

pub fn is_admin_position(position: &str) -> bool {
    ADMIN_POSITIONS
        .iter()
        .any(|p| position.eq_ignore_ascii_case(p))
}
