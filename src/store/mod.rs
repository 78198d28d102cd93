use anyhow::Result;
use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::{Pool, Postgres};
use thiserror::Error;
use tokio::sync::watch;
use uuid::Uuid;

use crate::models::emergency::{AlertStatus, EmergencyAlert, NewEmergency};

#[cfg(test)]
pub mod memory;
pub mod postgres;
pub mod queries;

pub type DbPool = Pool<Postgres>;

pub async fn init_pool(database_url: &str) -> Result<DbPool> {
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(database_url)
        .await?;
    Ok(pool)
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store rejected the write: {0}")]
    Rejected(String),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("no emergency record with id {0}")]
    UnknownAlert(Uuid),
    #[error("unrecognized status value {0:?}")]
    InvalidStatus(String),
}

/// Live view of one record's status.
///
/// Dropping the feed releases the underlying subscription: the pump task
/// that fills it notices the channel closing and exits. There is no
/// unsubscribe call to forget.
#[derive(Debug)]
pub struct StatusFeed {
    rx: watch::Receiver<AlertStatus>,
}

impl StatusFeed {
    pub fn new(rx: watch::Receiver<AlertStatus>) -> Self {
        Self { rx }
    }

    /// Latest observed status.
    pub fn current(&self) -> AlertStatus {
        *self.rx.borrow()
    }

    /// Wait until the record is handled. Returns `false` if the feed ended
    /// first; the record may well still be active, the caller just cannot
    /// observe it any more.
    pub async fn handled(&mut self) -> bool {
        loop {
            if *self.rx.borrow_and_update() == AlertStatus::Handled {
                return true;
            }
            if self.rx.changed().await.is_err() {
                return false;
            }
        }
    }
}

/// The `emergencies` collection, as the trigger flow sees it.
#[async_trait]
pub trait EmergencyStore: Send + Sync {
    /// Insert a new record with `status = active`. A failure is terminal
    /// for the attempt; the store never retries on the caller's behalf.
    async fn create_emergency(&self, new: NewEmergency) -> Result<EmergencyAlert, StoreError>;

    /// Overwrite the status field. Last writer wins; there is no
    /// optimistic-concurrency check.
    async fn update_status(&self, id: Uuid, status: AlertStatus) -> Result<(), StoreError>;

    async fn fetch(&self, id: Uuid) -> Result<Option<EmergencyAlert>, StoreError>;

    /// Newest still-active alert for a requester, if any. Drives the
    /// resume-existing retrigger policy.
    async fn find_active_for(
        &self,
        requester_id: &str,
    ) -> Result<Option<EmergencyAlert>, StoreError>;

    /// Subscribe to one record's status. The feed starts at the current
    /// value and then tracks changes; delivery is latest-wins, coalesced
    /// updates are fine.
    async fn watch_status(&self, id: Uuid) -> Result<StatusFeed, StoreError>;
}
