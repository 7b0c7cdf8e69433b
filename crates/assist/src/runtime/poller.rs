use std::time::Duration;

use tokio::{
    task::JoinHandle,
    time::{self, MissedTickBehavior},
};

use super::WeakAppHandle;
use crate::AppError;

/// Refreshes the volunteer feed every `period` for as long as the app runs.
/// Ticks that find no volunteer on the feed are skipped silently.
pub(crate) fn start(app: WeakAppHandle, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        // the first tick fires right away, landing on the feed refreshes anyway
        interval.tick().await;

        loop {
            interval.tick().await;
            let Some(app) = app.upgrade() else {
                break;
            };
            match app.refresh().await {
                Ok(_) => {}
                Err(AppError::AccessDenied(_))
                | Err(AppError::NotOnScreen { .. })
                | Err(AppError::Busy(_))
                | Err(AppError::Cancelled) => {}
                Err(AppError::Stopped) => break,
                Err(why) => log::warn!("Polling the feed failed: {why}"),
            }
        }
        log::debug!("Feed poller stopped.");
    })
}
