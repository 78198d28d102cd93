use tokio::sync::watch;

/// Identity context the trigger flow depends on. The session layer supplies
/// it some time after sign-in; the flow waits on it and never owns it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionContext {
    pub uid: String,
    pub display_name: String,
    pub kost_id: String,
}

/// Tri-state session: still resolving, signed in, or definitely signed out.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Pending,
    Resolved(SessionContext),
    Absent,
}

/// Receiving half of the session watch channel. The owner of the sender
/// publishes state changes; consumers only observe the latest snapshot.
pub type SessionFeed = watch::Receiver<SessionState>;

/// How waiting on a [`SessionFeed`] ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionResolution {
    Resolved(SessionContext),
    /// Definitely signed out.
    Absent,
    /// The session publisher went away while we were still pending.
    Ended,
}

/// Wait until the session resolves one way or the other. `Pending` keeps
/// waiting indefinitely; the caller bounds the wait by dropping the future.
pub async fn wait_resolved(feed: &mut SessionFeed) -> SessionResolution {
    loop {
        {
            let state = feed.borrow_and_update();
            match &*state {
                SessionState::Resolved(ctx) => return SessionResolution::Resolved(ctx.clone()),
                SessionState::Absent => return SessionResolution::Absent,
                SessionState::Pending => {}
            }
        }
        if feed.changed().await.is_err() {
            return SessionResolution::Ended;
        }
    }
}
