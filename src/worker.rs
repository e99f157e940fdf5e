//! Background worker sending job commands to the server.

use std::sync::Arc;

use tokio::sync::mpsc;

use crate::{
    api::{JobApi, RequestError},
    controller::{JobAction, JobCommand},
    jobs::JobState,
};

/// Commands sent from the UI to the worker.
#[derive(Debug)]
pub enum WorkerCmd {
    /// Send a command already accepted by the controller.
    Perform(JobCommand),
}

/// Events emitted by the worker and the poller for UI updates.
#[derive(Clone, Debug)]
pub enum WorkerEvent {
    /// Status snapshot, tagged with the poll gate generation at request time.
    Polled { generation: u64, state: JobState },
    /// Response (or failure) of a user action.
    ActionFinished {
        action: JobAction,
        result: Result<JobState, RequestError>,
    },
    /// Informational log message.
    Log(String),
}

/// Main worker loop: handle commands sequentially until the UI hangs up.
pub async fn run(
    mut rx: mpsc::Receiver<WorkerCmd>,
    tx: mpsc::Sender<WorkerEvent>,
    api: Arc<dyn JobApi>,
) {
    tracing::info!("worker started");

    while let Some(cmd) = rx.recv().await {
        match cmd {
            WorkerCmd::Perform(cmd) => {
                let action = cmd.action();
                tracing::info!("{action} requested: {cmd:?}");
                let result = cmd.send(api.as_ref()).await;
                match &result {
                    Ok(state) => {
                        tracing::info!(
                            "{action} ok: running={} paused={}",
                            state.running,
                            state.paused
                        );
                        let _ = tx.send(WorkerEvent::Log(format!("{action} ok"))).await;
                    }
                    Err(RequestError::Server { status, message }) => {
                        tracing::error!("{action} rejected (HTTP {status}): {message}")
                    }
                    Err(e) => tracing::error!("{action} failed: {e}"),
                }
                // The UI must always hear back so the in-flight flag clears.
                if tx
                    .send(WorkerEvent::ActionFinished { action, result })
                    .await
                    .is_err()
                {
                    break;
                }
            }
        }
    }
    tracing::info!("worker stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{StartRequest, testing::FakeJobApi};

    #[tokio::test]
    async fn reports_every_command_in_order() {
        let api = Arc::new(FakeJobApi::with_script(vec![
            Ok(JobState {
                running: true,
                ..Default::default()
            }),
            Err(RequestError::Network("refused".into())),
        ]));
        let (tx_cmd, rx_cmd) = mpsc::channel(4);
        let (tx_ev, mut rx_ev) = mpsc::channel(16);
        tokio::spawn(run(rx_cmd, tx_ev, api.clone()));

        tx_cmd
            .send(WorkerCmd::Perform(JobCommand::Start(StartRequest {
                start_id: 3,
                batch_size: 10,
                interval_sec: None,
            })))
            .await
            .unwrap();
        tx_cmd
            .send(WorkerCmd::Perform(JobCommand::Stop))
            .await
            .unwrap();

        let mut finished = vec![];
        while finished.len() < 2 {
            match rx_ev.recv().await.unwrap() {
                WorkerEvent::ActionFinished { action, result } => {
                    finished.push((action, result.is_ok()))
                }
                WorkerEvent::Log(_) | WorkerEvent::Polled { .. } => {}
            }
        }
        assert_eq!(
            finished,
            vec![(JobAction::Start, true), (JobAction::Stop, false)]
        );
        assert_eq!(api.calls(), vec!["start", "stop"]);
    }
}
