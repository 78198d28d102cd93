use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::watch;
use uuid::Uuid;

use crate::models::emergency::{AlertStatus, EmergencyAlert, NewEmergency};
use crate::store::{EmergencyStore, StatusFeed, StoreError};

/// In-memory stand-in for the Postgres store. Counts writes and can inject
/// failures, which is all the controller tests need.
#[derive(Default)]
pub struct MemoryEmergencyStore {
    records: Mutex<HashMap<Uuid, Record>>,
    creates: AtomicUsize,
    fail_next_create: AtomicBool,
    fail_next_update: AtomicBool,
}

struct Record {
    alert: EmergencyAlert,
    status_tx: watch::Sender<AlertStatus>,
}

impl MemoryEmergencyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Successful creations so far.
    pub fn create_count(&self) -> usize {
        self.creates.load(Ordering::SeqCst)
    }

    pub fn fail_next_create(&self) {
        self.fail_next_create.store(true, Ordering::SeqCst);
    }

    pub fn fail_next_update(&self) {
        self.fail_next_update.store(true, Ordering::SeqCst);
    }

    pub fn alerts(&self) -> Vec<EmergencyAlert> {
        let mut alerts: Vec<_> = self
            .records
            .lock()
            .unwrap()
            .values()
            .map(|r| r.alert.clone())
            .collect();
        alerts.sort_by_key(|a| a.created_at);
        alerts
    }

    /// Number of live feeds attached to a record.
    pub fn watcher_count(&self, id: Uuid) -> usize {
        self.records
            .lock()
            .unwrap()
            .get(&id)
            .map(|r| r.status_tx.receiver_count())
            .unwrap_or(0)
    }
}

#[async_trait]
impl EmergencyStore for MemoryEmergencyStore {
    async fn create_emergency(&self, new: NewEmergency) -> Result<EmergencyAlert, StoreError> {
        if self.fail_next_create.swap(false, Ordering::SeqCst) {
            return Err(StoreError::Rejected("injected create failure".into()));
        }
        let now = Utc::now();
        let alert = EmergencyAlert {
            id: Uuid::new_v4(),
            requester_id: new.requester_id,
            kost_id: new.kost_id,
            message: new.message,
            status: AlertStatus::Active,
            created_at: now,
            updated_at: now,
        };
        let (status_tx, _) = watch::channel(AlertStatus::Active);
        self.records.lock().unwrap().insert(
            alert.id,
            Record {
                alert: alert.clone(),
                status_tx,
            },
        );
        self.creates.fetch_add(1, Ordering::SeqCst);
        Ok(alert)
    }

    async fn update_status(&self, id: Uuid, status: AlertStatus) -> Result<(), StoreError> {
        if self.fail_next_update.swap(false, Ordering::SeqCst) {
            return Err(StoreError::Rejected("injected update failure".into()));
        }
        let mut records = self.records.lock().unwrap();
        let record = records.get_mut(&id).ok_or(StoreError::UnknownAlert(id))?;
        record.alert.status = status;
        record.alert.updated_at = Utc::now();
        record.status_tx.send_replace(status);
        Ok(())
    }

    async fn fetch(&self, id: Uuid) -> Result<Option<EmergencyAlert>, StoreError> {
        Ok(self
            .records
            .lock()
            .unwrap()
            .get(&id)
            .map(|r| r.alert.clone()))
    }

    async fn find_active_for(
        &self,
        requester_id: &str,
    ) -> Result<Option<EmergencyAlert>, StoreError> {
        Ok(self
            .alerts()
            .into_iter()
            .rev()
            .find(|a| a.requester_id == requester_id && a.status == AlertStatus::Active))
    }

    async fn watch_status(&self, id: Uuid) -> Result<StatusFeed, StoreError> {
        let records = self.records.lock().unwrap();
        let record = records.get(&id).ok_or(StoreError::UnknownAlert(id))?;
        Ok(StatusFeed::new(record.status_tx.subscribe()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_emergency() -> NewEmergency {
        NewEmergency {
            requester_id: "u1".into(),
            kost_id: "g1".into(),
            message: "EMERGENCY: Budi needs immediate help!".into(),
        }
    }

    #[tokio::test]
    async fn concurrent_handled_writes_stay_handled() {
        let store = MemoryEmergencyStore::new();
        let alert = store.create_emergency(new_emergency()).await.unwrap();

        let writes = (0..8).map(|_| store.update_status(alert.id, AlertStatus::Handled));
        for result in futures::future::join_all(writes).await {
            result.unwrap();
        }

        let fetched = store.fetch(alert.id).await.unwrap().unwrap();
        assert_eq!(fetched.status, AlertStatus::Handled);
    }

    #[tokio::test]
    async fn feed_tracks_status_changes() {
        let store = MemoryEmergencyStore::new();
        let alert = store.create_emergency(new_emergency()).await.unwrap();

        let mut feed = store.watch_status(alert.id).await.unwrap();
        assert_eq!(feed.current(), AlertStatus::Active);

        store
            .update_status(alert.id, AlertStatus::Handled)
            .await
            .unwrap();
        assert!(feed.handled().await);
    }

    #[tokio::test]
    async fn dropping_the_feed_releases_the_watcher() {
        let store = MemoryEmergencyStore::new();
        let alert = store.create_emergency(new_emergency()).await.unwrap();

        let feed = store.watch_status(alert.id).await.unwrap();
        assert_eq!(store.watcher_count(alert.id), 1);
        drop(feed);
        assert_eq!(store.watcher_count(alert.id), 0);
    }

    #[tokio::test]
    async fn find_active_for_skips_handled_records() {
        let store = MemoryEmergencyStore::new();
        let first = store.create_emergency(new_emergency()).await.unwrap();
        store
            .update_status(first.id, AlertStatus::Handled)
            .await
            .unwrap();

        assert!(store.find_active_for("u1").await.unwrap().is_none());

        let second = store.create_emergency(new_emergency()).await.unwrap();
        let found = store.find_active_for("u1").await.unwrap().unwrap();
        assert_eq!(found.id, second.id);
    }

    #[tokio::test]
    async fn update_on_unknown_id_is_an_error() {
        let store = MemoryEmergencyStore::new();
        let err = store
            .update_status(Uuid::new_v4(), AlertStatus::Handled)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::UnknownAlert(_)));
    }
}
