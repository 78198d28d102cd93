pub mod reminder;

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::client::EmergencyClient;
use crate::models::emergency::{AlertStatus, EmergencyAlert};
use crate::models::session::{wait_resolved, SessionContext, SessionFeed, SessionResolution};
use crate::notify::{Notifier, Vibration};
use crate::store::{EmergencyStore, StoreError};
use reminder::ReminderJob;

const ERROR_TITLE: &str = "Emergency alert problem";
const CANCELLED_TITLE: &str = "Emergency alert cancelled";
const DEGRADED_TITLE: &str = "Live monitoring degraded";
const DEGRADED_BODY: &str =
    "The alert status can no longer be watched. Reminders continue until you cancel.";

/// How re-entering the trigger flow treats an alert that is still active
/// for the same requester.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RetriggerPolicy {
    /// Every activation creates a fresh record.
    #[default]
    AlwaysCreate,
    /// Reattach to the newest still-active record instead of inserting.
    ResumeExisting,
}

impl FromStr for RetriggerPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "always-create" => Ok(RetriggerPolicy::AlwaysCreate),
            "resume-existing" => Ok(RetriggerPolicy::ResumeExisting),
            other => Err(other.to_string()),
        }
    }
}

/// Where a finished trigger run ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The member cancelled; the record was marked handled from here.
    Cancelled,
    /// An admin marked the record handled elsewhere.
    ResolvedExternally,
    /// The store rejected the creation; nothing was started.
    CreateFailed,
    /// Identity never resolved, or resolved to signed-out. Zero writes.
    NeverTriggered,
}

/// Controller for one emergency trigger activation.
///
/// Runs the whole lifecycle headlessly: wait for identity, create the
/// record, remind until the record is handled (from here or by an admin),
/// and release every local resource on the way out. The phases mirror the
/// screen it replaces: idle, triggering, active, cancelling.
pub struct AlertTrigger {
    client: EmergencyClient,
    notifier: Arc<dyn Notifier>,
    reminder_interval: Duration,
    policy: RetriggerPolicy,
}

impl AlertTrigger {
    pub fn new(
        store: Arc<dyn EmergencyStore>,
        notifier: Arc<dyn Notifier>,
        reminder_interval: Duration,
        policy: RetriggerPolicy,
    ) -> Self {
        Self {
            client: EmergencyClient::new(store),
            notifier,
            reminder_interval,
            policy,
        }
    }

    /// Drive one activation to completion.
    ///
    /// `cancel` is the member's cancel control. Remote failures never
    /// escape: they surface as notices and shape the returned [`Outcome`].
    /// Dropping the future at any point stops the reminder and releases the
    /// status feed; the record itself stays active in that case.
    pub async fn run(&self, mut session: SessionFeed, cancel: CancellationToken) -> Outcome {
        // 1. Wait for identity context. No identity, no store writes.
        let ctx = match wait_resolved(&mut session).await {
            SessionResolution::Resolved(ctx) => ctx,
            SessionResolution::Absent => {
                self.notifier.notice(
                    ERROR_TITLE,
                    "You are signed out. Sign in to trigger an emergency alert.",
                );
                return Outcome::NeverTriggered;
            }
            SessionResolution::Ended => return Outcome::NeverTriggered,
        };

        // 2. Create (or resume) the record. A failure here is terminal for
        //    the attempt; the member has to re-enter to retry.
        info!(
            "triggering emergency alert for {} in kost {}",
            ctx.uid, ctx.kost_id
        );
        let alert = match self.obtain_alert(&ctx).await {
            Ok(alert) => alert,
            Err(e) => {
                warn!("emergency creation failed: {}", e);
                self.notifier.notice(
                    ERROR_TITLE,
                    "Could not send the emergency alert. Please try again.",
                );
                return Outcome::CreateFailed;
            }
        };
        info!("emergency {} active", alert.id);

        // 3. Active: one long alarm buzz, then the repeating reminder and
        //    the live status watch.
        self.notifier.vibrate(Vibration::Alarm);
        let reminder = ReminderJob::start(
            self.notifier.clone(),
            alert.message.clone(),
            self.reminder_interval,
        );

        let mut feed = match self.client.watch_status(alert.id).await {
            Ok(feed) => feed,
            Err(e) => {
                // No live view at all. The alert is still active; keep
                // reminding until the member cancels.
                warn!("status watch for {} unavailable: {}", alert.id, e);
                self.notifier.notice(DEGRADED_TITLE, DEGRADED_BODY);
                cancel.cancelled().await;
                return self.cancel_alert(alert.id, reminder).await;
            }
        };

        debug!(
            "watching emergency {} (currently {})",
            alert.id,
            feed.current()
        );

        let mut degraded = false;
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    drop(feed);
                    return self.cancel_alert(alert.id, reminder).await;
                }
                observed = feed.handled(), if !degraded => {
                    if observed {
                        info!("emergency {} handled externally", alert.id);
                        reminder.stop().await;
                        return Outcome::ResolvedExternally;
                    }
                    // Feed ended without a handled status: treat the alert
                    // as still active and keep reminding.
                    warn!("live status feed for {} lost", alert.id);
                    self.notifier.notice(DEGRADED_TITLE, DEGRADED_BODY);
                    degraded = true;
                }
            }
        }
    }

    async fn obtain_alert(&self, ctx: &SessionContext) -> Result<EmergencyAlert, StoreError> {
        if self.policy == RetriggerPolicy::ResumeExisting {
            if let Some(existing) = self.client.find_active(&ctx.uid).await? {
                info!("resuming active emergency {}", existing.id);
                return Ok(existing);
            }
        }
        self.client.create_emergency(ctx).await
    }

    /// Manual cancellation: mark the record handled, then tear down the
    /// local resources. Teardown proceeds even when the update fails.
    async fn cancel_alert(&self, id: Uuid, reminder: ReminderJob) -> Outcome {
        info!("cancelling emergency {}", id);
        if let Err(e) = self.client.update_status(id, AlertStatus::Handled).await {
            warn!("cancel update for {} failed: {}", id, e);
            self.notifier.notice(
                ERROR_TITLE,
                "Could not update the alert status. Admins may still see it as active.",
            );
        }
        reminder.stop().await;
        self.notifier
            .notice(CANCELLED_TITLE, "Your emergency alert has been cancelled.");
        Outcome::Cancelled
    }
}
