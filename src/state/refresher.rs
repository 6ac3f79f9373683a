use crate::state::messages::UiEvent;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::interval;

/// How often an in-progress season is refetched.
pub const REFRESH_INTERVAL: Duration = Duration::from_secs(5 * 60);

/// Emits `RefreshDue` on a fixed interval. The app decides whether the
/// season on screen needs it; completed seasons are left alone.
pub struct PeriodicRefresher {
    ui_events: mpsc::Sender<UiEvent>,
    period: Duration,
}

impl PeriodicRefresher {
    pub fn new(ui_events: mpsc::Sender<UiEvent>) -> Self {
        Self {
            ui_events,
            period: REFRESH_INTERVAL,
        }
    }

    pub async fn run(self) {
        let mut refresh_interval = interval(self.period);
        // Skip the immediate first tick so startup loading isn't double-triggered.
        refresh_interval.tick().await;

        loop {
            refresh_interval.tick().await;
            if self.ui_events.send(UiEvent::RefreshDue).await.is_err() {
                break;
            }
        }
    }
}
