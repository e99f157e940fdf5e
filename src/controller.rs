//! User-initiated job transitions and their reconciliation into the model.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use crate::{
    api::{JobApi, RequestError, StartRequest},
    jobs::{JobState, JobStateModel},
};

/// The four user actions.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum JobAction {
    Start,
    Pause,
    Resume,
    Stop,
}

impl JobAction {
    pub const ALL: [JobAction; 4] = [
        JobAction::Start,
        JobAction::Pause,
        JobAction::Resume,
        JobAction::Stop,
    ];

    fn index(self) -> usize {
        match self {
            JobAction::Start => 0,
            JobAction::Pause => 1,
            JobAction::Resume => 2,
            JobAction::Stop => 3,
        }
    }

    /// Whether the action makes sense against the last known snapshot.
    /// The server still has the final say.
    pub fn is_allowed(self, state: &JobState) -> bool {
        match self {
            JobAction::Start => !state.running,
            JobAction::Pause => state.running && !state.paused,
            JobAction::Resume => state.running && state.paused,
            JobAction::Stop => state.running,
        }
    }
}

impl fmt::Display for JobAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            JobAction::Start => "start",
            JobAction::Pause => "pause",
            JobAction::Resume => "resume",
            JobAction::Stop => "stop",
        })
    }
}

/// A ready-to-send request for one action.
#[derive(Clone, Debug, PartialEq)]
pub enum JobCommand {
    Start(StartRequest),
    Pause,
    Resume,
    Stop,
}

impl JobCommand {
    pub fn action(&self) -> JobAction {
        match self {
            JobCommand::Start(_) => JobAction::Start,
            JobCommand::Pause => JobAction::Pause,
            JobCommand::Resume => JobAction::Resume,
            JobCommand::Stop => JobAction::Stop,
        }
    }

    /// Issue the request. The only suspension point of an action.
    pub async fn send(&self, api: &dyn JobApi) -> Result<JobState, RequestError> {
        match self {
            JobCommand::Start(req) => api.start(req).await,
            JobCommand::Pause => api.pause().await,
            JobCommand::Resume => api.resume().await,
            JobCommand::Stop => api.stop().await,
        }
    }
}

/// Lenient start id: anything unparseable or below 1 becomes 1.
pub fn parse_start_id(text: &str) -> u64 {
    match text.trim().parse::<i64>() {
        Ok(n) if n >= 1 => n as u64,
        _ => 1,
    }
}

/// Lenient batch size: anything unparseable or below 1 becomes `default`.
pub fn parse_batch_size(text: &str, default: u64) -> u64 {
    match text.trim().parse::<i64>() {
        Ok(n) if n >= 1 => n as u64,
        _ => default.max(1),
    }
}

/// Why an action was not sent.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum Refusal {
    #[error("{0} is not available in the current job state")]
    Illegal(JobAction),
    #[error("{0} is already in progress")]
    InFlight(JobAction),
}

/// One flag per action whose request is outstanding.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct InFlight([bool; 4]);

impl InFlight {
    pub fn is_set(&self, action: JobAction) -> bool {
        self.0[action.index()]
    }

    pub fn any(&self) -> bool {
        self.0.iter().any(|f| *f)
    }

    fn set(&mut self, action: JobAction, value: bool) {
        self.0[action.index()] = value;
    }
}

/// Shared with the poller so it can skip ticks during actions and tag each
/// status request with the generation it started under.
#[derive(Clone, Debug, Default)]
pub struct PollGate {
    inner: Arc<GateInner>,
}

#[derive(Debug, Default)]
struct GateInner {
    generation: AtomicU64,
    actions: AtomicUsize,
}

impl PollGate {
    /// Bumped whenever an action is dispatched or completes.
    pub fn generation(&self) -> u64 {
        self.inner.generation.load(Ordering::SeqCst)
    }

    pub fn action_in_flight(&self) -> bool {
        self.inner.actions.load(Ordering::SeqCst) > 0
    }

    fn begin_action(&self) {
        self.inner.actions.fetch_add(1, Ordering::SeqCst);
        self.inner.generation.fetch_add(1, Ordering::SeqCst);
    }

    fn end_action(&self) {
        self.inner.actions.fetch_sub(1, Ordering::SeqCst);
        self.inner.generation.fetch_add(1, Ordering::SeqCst);
    }
}

/// Enforces legality and single submission, and applies confirmed results.
///
/// Never writes a predicted state: the model only changes through
/// [`JobController::complete`] on success or an accepted poll.
#[derive(Debug, Default)]
pub struct JobController {
    in_flight: InFlight,
    gate: PollGate,
}

impl JobController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle for the poller.
    pub fn gate(&self) -> PollGate {
        self.gate.clone()
    }

    pub fn in_flight(&self) -> InFlight {
        self.in_flight
    }

    /// Check the command against the local snapshot and mark it outstanding.
    /// Nothing is sent on refusal.
    pub fn prepare(
        &mut self,
        cmd: JobCommand,
        model: &JobStateModel,
    ) -> Result<JobCommand, Refusal> {
        let action = cmd.action();
        if self.in_flight.is_set(action) {
            return Err(Refusal::InFlight(action));
        }
        if !action.is_allowed(model.current()) {
            return Err(Refusal::Illegal(action));
        }
        self.in_flight.set(action, true);
        self.gate.begin_action();
        tracing::debug!(%action, generation = self.gate.generation(), "action dispatched");
        Ok(cmd)
    }

    /// Apply the response of a prepared command. Errors leave the model as is.
    pub fn complete(
        &mut self,
        action: JobAction,
        result: Result<JobState, RequestError>,
        model: &mut JobStateModel,
    ) -> Result<(), RequestError> {
        if self.in_flight.is_set(action) {
            self.in_flight.set(action, false);
            self.gate.end_action();
        }
        let state = result?;
        model.merge(state);
        Ok(())
    }

    /// A poll is applied only if no action was dispatched or completed since
    /// it started, and none is outstanding now.
    pub fn accepts_poll(&self, generation: u64) -> bool {
        generation == self.gate.generation() && !self.in_flight.any()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::testing::FakeJobApi;
    use crate::view::JobView;

    fn state(running: bool, paused: bool) -> JobState {
        JobState {
            running,
            paused,
            ..Default::default()
        }
    }

    fn start_cmd(text: &str) -> JobCommand {
        JobCommand::Start(StartRequest {
            start_id: parse_start_id(text),
            batch_size: 100,
            interval_sec: None,
        })
    }

    #[test]
    fn legality_table() {
        let idle = state(false, false);
        let running = state(true, false);
        let paused = state(true, true);

        assert!(JobAction::Start.is_allowed(&idle));
        assert!(!JobAction::Pause.is_allowed(&idle));
        assert!(!JobAction::Resume.is_allowed(&idle));
        assert!(!JobAction::Stop.is_allowed(&idle));

        assert!(!JobAction::Start.is_allowed(&running));
        assert!(JobAction::Pause.is_allowed(&running));
        assert!(!JobAction::Resume.is_allowed(&running));
        assert!(JobAction::Stop.is_allowed(&running));

        assert!(!JobAction::Start.is_allowed(&paused));
        assert!(!JobAction::Pause.is_allowed(&paused));
        assert!(JobAction::Resume.is_allowed(&paused));
        assert!(JobAction::Stop.is_allowed(&paused));
    }

    #[test]
    fn start_id_is_lenient() {
        for text in ["0", "-5", "", "abc", "  ", "1.5"] {
            assert_eq!(parse_start_id(text), 1, "input {text:?}");
        }
        assert_eq!(parse_start_id(" 42 "), 42);
    }

    #[test]
    fn batch_size_falls_back_to_default() {
        assert_eq!(parse_batch_size("", 100), 100);
        assert_eq!(parse_batch_size("0", 100), 100);
        assert_eq!(parse_batch_size("x", 0), 1);
        assert_eq!(parse_batch_size("25", 100), 25);
    }

    #[tokio::test]
    async fn start_while_running_never_hits_the_network() {
        let api = FakeJobApi::default();
        let mut ctl = JobController::new();
        let mut model = JobStateModel::default();
        model.merge(state(true, false));

        let refused = ctl.prepare(start_cmd("1"), &model);
        assert_eq!(refused, Err(Refusal::Illegal(JobAction::Start)));
        assert!(api.calls().is_empty());
        assert!(!ctl.in_flight().any());
    }

    #[tokio::test]
    async fn stale_start_rejected_by_server_keeps_model() {
        // Local snapshot says idle, but the server already runs a job.
        let api = FakeJobApi::with_script(vec![Err(RequestError::Server {
            status: 409,
            message: "job already running".into(),
        })]);
        let mut ctl = JobController::new();
        let mut model = JobStateModel::default();
        let before = model.current().clone();

        let cmd = ctl.prepare(start_cmd("7"), &model).unwrap();
        let result = cmd.send(&api).await;
        let err = ctl.complete(cmd.action(), result, &mut model).unwrap_err();

        assert!(matches!(err, RequestError::Server { status: 409, .. }));
        assert_eq!(model.current(), &before);
        assert!(model.previous().is_none());
        assert!(!ctl.in_flight().any());
        assert_eq!(api.calls(), vec!["start"]);
    }

    #[test]
    fn duplicate_submission_is_refused() {
        let mut ctl = JobController::new();
        let mut model = JobStateModel::default();
        model.merge(state(true, false));

        assert!(ctl.prepare(JobCommand::Pause, &model).is_ok());
        assert_eq!(
            ctl.prepare(JobCommand::Pause, &model),
            Err(Refusal::InFlight(JobAction::Pause))
        );
        assert!(ctl.in_flight().is_set(JobAction::Pause));
    }

    #[test]
    fn polls_overlapping_an_action_are_dropped() {
        let mut ctl = JobController::new();
        let mut model = JobStateModel::default();
        model.merge(state(true, false));
        let gate = ctl.gate();

        // Poll request leaves before the action is dispatched.
        let early = gate.generation();
        assert!(ctl.accepts_poll(early));

        ctl.prepare(JobCommand::Stop, &model).unwrap();
        assert!(gate.action_in_flight());
        // Poll that slipped out during the action.
        let during = gate.generation();
        assert!(!ctl.accepts_poll(during));

        ctl.complete(JobAction::Stop, Ok(state(false, false)), &mut model)
            .unwrap();
        assert!(!ctl.accepts_poll(early));
        assert!(!ctl.accepts_poll(during));
        assert!(ctl.accepts_poll(gate.generation()));
        assert!(!model.current().running);
    }

    #[tokio::test]
    async fn start_poll_stop_end_to_end() {
        let api = FakeJobApi::with_script(vec![
            Ok(JobState {
                running: true,
                paused: false,
                percent: Some(0.0),
                ..Default::default()
            }),
            Ok(JobState {
                running: true,
                paused: false,
                percent: Some(42.0),
                completed_count: Some(42),
                max_id: Some(100),
                ..Default::default()
            }),
            Ok(state(false, false)),
        ]);
        let mut ctl = JobController::new();
        let mut model = JobStateModel::default();

        let cmd = ctl.prepare(start_cmd("5"), &model).unwrap();
        assert_eq!(
            cmd,
            JobCommand::Start(StartRequest {
                start_id: 5,
                batch_size: 100,
                interval_sec: None
            })
        );
        let result = cmd.send(&api).await;
        ctl.complete(cmd.action(), result, &mut model).unwrap();
        let view = JobView::project(model.current());
        assert!(!view.buttons.start);
        assert!(view.buttons.pause);
        assert_eq!(view.percent, 0);

        let generation = ctl.gate().generation();
        let polled = api.status().await.unwrap();
        assert!(ctl.accepts_poll(generation));
        model.merge(polled);
        let view = JobView::project(model.current());
        assert_eq!(view.percent, 42);
        assert_eq!(view.progress_text, "42/100 (42%)");

        let cmd = ctl.prepare(JobCommand::Stop, &model).unwrap();
        let result = cmd.send(&api).await;
        ctl.complete(cmd.action(), result, &mut model).unwrap();
        let view = JobView::project(model.current());
        assert!(view.buttons.start);
        assert!(!view.buttons.pause);
        assert!(!view.buttons.resume);
        assert!(!view.buttons.stop);

        assert_eq!(api.calls(), vec!["start", "status", "stop"]);
    }
}
