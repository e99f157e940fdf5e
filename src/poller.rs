//! Fixed-interval status polling.

use std::{sync::Arc, time::Duration};

use tokio::{sync::mpsc, time::MissedTickBehavior};

use crate::{api::JobApi, controller::PollGate, worker::WorkerEvent};

/// Poll status immediately, then once per `period`, until the UI goes away.
///
/// Each request is awaited before the next tick is taken, so polls never
/// overlap. After a slow request the schedule resumes right away and the
/// ticks it overran are dropped. Ticks that fall while a user action is
/// outstanding are skipped as well.
pub async fn run(
    api: Arc<dyn JobApi>,
    gate: PollGate,
    tx: mpsc::Sender<WorkerEvent>,
    period: Duration,
) {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    tracing::info!("poller started ({}ms)", period.as_millis());

    loop {
        ticker.tick().await;
        if tx.is_closed() {
            break;
        }
        if gate.action_in_flight() {
            tracing::trace!("poll skipped: action in flight");
            continue;
        }

        let generation = gate.generation();
        match api.status().await {
            Ok(state) => {
                if tx
                    .send(WorkerEvent::Polled { generation, state })
                    .await
                    .is_err()
                {
                    break;
                }
            }
            // Keep the last good snapshot on screen and try again next tick.
            Err(e) => tracing::warn!("status poll failed: {e}"),
        }
    }
    tracing::info!("poller stopped");
}
