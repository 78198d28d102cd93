use tracing::info;

/// Haptic patterns used by the flow. Durations are vibrate/pause/vibrate
/// milliseconds, matching the device vibration API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Vibration {
    /// Short buzz on every reminder tick.
    Pulse,
    /// Long double buzz, issued once when the alert is created.
    Alarm,
}

impl Vibration {
    pub fn pattern(&self) -> &'static [u64] {
        match self {
            Vibration::Pulse => &[300],
            Vibration::Alarm => &[800, 200, 800],
        }
    }
}

/// Local notification and haptic facility.
///
/// Purely local and fire-and-forget: calls cannot fail and are never gated
/// on network reachability.
pub trait Notifier: Send + Sync {
    /// Blocking informational dialog equivalent.
    fn notice(&self, title: &str, body: &str);

    fn vibrate(&self, vibration: Vibration);
}

/// Notifier for the headless service: notices land in the log.
pub struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn notice(&self, title: &str, body: &str) {
        info!("[{}] {}", title, body);
    }

    fn vibrate(&self, vibration: Vibration) {
        info!("vibrate {:?} {:?}ms", vibration, vibration.pattern());
    }
}
