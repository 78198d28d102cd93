use std::sync::Arc;

use uuid::Uuid;

use crate::models::emergency::{AlertStatus, EmergencyAlert, NewEmergency};
use crate::models::session::SessionContext;
use crate::store::{EmergencyStore, StatusFeed, StoreError};

/// Thin pass-through to the emergency store, plus message construction.
#[derive(Clone)]
pub struct EmergencyClient {
    store: Arc<dyn EmergencyStore>,
}

impl EmergencyClient {
    pub fn new(store: Arc<dyn EmergencyStore>) -> Self {
        Self { store }
    }

    /// Insert a new active record for this member. The message carries the
    /// display name so admins see who needs help.
    pub async fn create_emergency(
        &self,
        ctx: &SessionContext,
    ) -> Result<EmergencyAlert, StoreError> {
        let new = NewEmergency {
            requester_id: ctx.uid.clone(),
            kost_id: ctx.kost_id.clone(),
            message: format!("EMERGENCY: {} needs immediate help!", ctx.display_name),
        };
        self.store.create_emergency(new).await
    }

    /// Overwrite the status field of the named record. Last writer wins.
    pub async fn update_status(&self, id: Uuid, status: AlertStatus) -> Result<(), StoreError> {
        self.store.update_status(id, status).await
    }

    pub async fn find_active(&self, requester_id: &str) -> Result<Option<EmergencyAlert>, StoreError> {
        self.store.find_active_for(requester_id).await
    }

    pub async fn watch_status(&self, id: Uuid) -> Result<StatusFeed, StoreError> {
        self.store.watch_status(id).await
    }
}
