use async_trait::async_trait;
use sqlx::postgres::{PgListener, PgRow};
use sqlx::Row;
use tokio::sync::watch;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::models::emergency::{AlertStatus, EmergencyAlert, NewEmergency};
use crate::store::{queries, DbPool, EmergencyStore, StatusFeed, StoreError};

/// Postgres-backed emergency store.
///
/// Status changes are pushed through LISTEN/NOTIFY: a trigger on the
/// `emergencies` table (see schema.sql) notifies the configured channel with
/// the record id, and each feed pump refetches the row on notification. The
/// pump only ever publishes the current snapshot, so reordered or coalesced
/// notifications converge on the latest state.
pub struct PgEmergencyStore {
    pool: DbPool,
    notify_channel: String,
}

impl PgEmergencyStore {
    pub fn new(pool: DbPool, notify_channel: impl Into<String>) -> Self {
        Self {
            pool,
            notify_channel: notify_channel.into(),
        }
    }
}

fn alert_from_row(row: &PgRow) -> Result<EmergencyAlert, StoreError> {
    let status: String = row.try_get("status")?;
    let status = status
        .parse::<AlertStatus>()
        .map_err(StoreError::InvalidStatus)?;
    Ok(EmergencyAlert {
        id: row.try_get("id")?,
        requester_id: row.try_get("requester_id")?,
        kost_id: row.try_get("kost_id")?,
        message: row.try_get("message")?,
        status,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

async fn fetch_status(pool: &DbPool, id: Uuid) -> Result<Option<AlertStatus>, StoreError> {
    let row = sqlx::query(queries::SELECT_EMERGENCY_STATUS)
        .bind(id)
        .fetch_optional(pool)
        .await?;
    match row {
        Some(row) => {
            let status: String = row.try_get("status")?;
            Ok(Some(
                status
                    .parse::<AlertStatus>()
                    .map_err(StoreError::InvalidStatus)?,
            ))
        }
        None => Ok(None),
    }
}

#[async_trait]
impl EmergencyStore for PgEmergencyStore {
    async fn create_emergency(&self, new: NewEmergency) -> Result<EmergencyAlert, StoreError> {
        let id = Uuid::new_v4();
        sqlx::query(queries::INSERT_EMERGENCY)
            .bind(id)
            .bind(&new.requester_id)
            .bind(&new.kost_id)
            .bind(&new.message)
            .bind(AlertStatus::Active.as_str())
            .execute(&self.pool)
            .await
            .map_err(|e| match e {
                // Constraint violations are a rejection, not a transport
                // problem; either way the attempt is over, nobody retries.
                sqlx::Error::Database(db) => StoreError::Rejected(db.to_string()),
                other => StoreError::Database(other),
            })?;

        // Read back to pick up the store-assigned timestamps.
        self.fetch(id).await?.ok_or(StoreError::UnknownAlert(id))
    }

    async fn update_status(&self, id: Uuid, status: AlertStatus) -> Result<(), StoreError> {
        let result = sqlx::query(queries::UPDATE_EMERGENCY_STATUS)
            .bind(id)
            .bind(status.as_str())
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::UnknownAlert(id));
        }
        Ok(())
    }

    async fn fetch(&self, id: Uuid) -> Result<Option<EmergencyAlert>, StoreError> {
        let row = sqlx::query(queries::SELECT_EMERGENCY)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(alert_from_row).transpose()
    }

    async fn find_active_for(
        &self,
        requester_id: &str,
    ) -> Result<Option<EmergencyAlert>, StoreError> {
        let row = sqlx::query(queries::SELECT_ACTIVE_FOR_REQUESTER)
            .bind(requester_id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(alert_from_row).transpose()
    }

    async fn watch_status(&self, id: Uuid) -> Result<StatusFeed, StoreError> {
        let current = self.fetch(id).await?.ok_or(StoreError::UnknownAlert(id))?;

        let mut listener = PgListener::connect_with(&self.pool).await?;
        listener.listen(&self.notify_channel).await?;

        let (tx, rx) = watch::channel(current.status);

        // A change could land between the fetch above and LISTEN taking
        // effect; refetch once now that we are subscribed.
        if let Some(status) = fetch_status(&self.pool, id).await? {
            tx.send_replace(status);
        }

        let pool = self.pool.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = tx.closed() => break,
                    notification = listener.recv() => match notification {
                        Ok(n) => {
                            if n.payload().parse::<Uuid>().ok() != Some(id) {
                                continue;
                            }
                            match fetch_status(&pool, id).await {
                                Ok(Some(status)) => {
                                    tx.send_replace(status);
                                }
                                Ok(None) => {}
                                Err(e) => {
                                    warn!("status refetch for {} failed: {}", id, e);
                                    break;
                                }
                            }
                        }
                        Err(e) => {
                            warn!("emergency status listener lost: {}", e);
                            break;
                        }
                    },
                }
            }
            debug!("status feed for {} released", id);
        });

        Ok(StatusFeed::new(rx))
    }
}
