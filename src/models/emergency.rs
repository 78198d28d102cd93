use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Lifecycle of an emergency record. `handled` is terminal: an admin
/// resolves an alert exactly once and nothing un-resolves it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertStatus {
    Active,
    Handled,
}

impl AlertStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertStatus::Active => "active",
            AlertStatus::Handled => "handled",
        }
    }
}

impl fmt::Display for AlertStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AlertStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(AlertStatus::Active),
            "handled" => Ok(AlertStatus::Handled),
            other => Err(other.to_string()),
        }
    }
}

/// One triggered emergency, as stored in the `emergencies` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmergencyAlert {
    pub id: Uuid,
    pub requester_id: String, // uid of the member who triggered it
    pub kost_id: String,      // scopes which kost's admins get notified
    pub message: String,
    pub status: AlertStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Payload for a new record. The store assigns the id and timestamps.
#[derive(Debug, Clone)]
pub struct NewEmergency {
    pub requester_id: String,
    pub kost_id: String,
    pub message: String,
}
