use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::notify::{Notifier, Vibration};

/// Title used for every repeating reminder notice.
pub const REMINDER_TITLE: &str = "Emergency alert";

/// Repeating local reminder: a blocking notice plus a short vibration
/// pulse, fired immediately and then on every interval tick until
/// cancelled.
///
/// The job owns its cancellation token. [`stop`](ReminderJob::stop) cancels
/// and waits for the task; dropping the job cancels it too, so an aborted
/// controller can never leak a ticking reminder.
pub struct ReminderJob {
    token: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

impl ReminderJob {
    pub fn start(notifier: Arc<dyn Notifier>, message: String, every: Duration) -> Self {
        let token = CancellationToken::new();
        let tick_token = token.clone();
        let handle = tokio::spawn(async move {
            // The first tick of an interval completes immediately.
            let mut ticker = tokio::time::interval(every);
            loop {
                tokio::select! {
                    _ = tick_token.cancelled() => break,
                    _ = ticker.tick() => {
                        notifier.notice(REMINDER_TITLE, &message);
                        notifier.vibrate(Vibration::Pulse);
                    }
                }
            }
        });
        Self {
            token,
            handle: Some(handle),
        }
    }

    /// Cancel and wait for the task to wind down.
    pub async fn stop(mut self) {
        self.token.cancel();
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }
}

impl Drop for ReminderJob {
    fn drop(&mut self) {
        self.token.cancel();
    }
}
