mod client;
mod config;
mod models;
mod notify;
mod store;
mod trigger;

use std::sync::Arc;
use std::time::Duration;

use config::AppConfig;
use notify::ConsoleNotifier;
use store::postgres::PgEmergencyStore;
use store::EmergencyStore;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::info;
use trigger::AlertTrigger;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load config
    let config = AppConfig::load()?;

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(&config.log_level)
        .init();

    info!("Starting Kost Emergency Trigger Service...");

    // Init DB
    let pool = store::init_pool(&config.database_url).await?;
    info!("Connected to database");

    let store: Arc<dyn EmergencyStore> =
        Arc::new(PgEmergencyStore::new(pool, config.notify_channel.clone()));

    // The headless service resolves the session from the environment.
    let (_session_tx, session_rx) = watch::channel(config.session_state());

    // Ctrl-C is the member's cancel control.
    let cancel = CancellationToken::new();
    let cancel_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("cancel requested");
            cancel_signal.cancel();
        }
    });

    let trigger = AlertTrigger::new(
        store,
        Arc::new(ConsoleNotifier),
        Duration::from_secs(config.reminder_interval_secs),
        config.retrigger_policy,
    );

    let outcome = trigger.run(session_rx, cancel).await;
    info!("Trigger run finished: {:?}", outcome);

    Ok(())
}
