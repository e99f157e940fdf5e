//! Pure projection of a job snapshot into what the panel shows.

use crate::{
    controller::{InFlight, JobAction},
    jobs::JobState,
};

/// Shown for any value the server did not report.
pub const PLACEHOLDER: &str = "-";

/// Enablement of the four action buttons.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ButtonStates {
    pub start: bool,
    pub pause: bool,
    pub resume: bool,
    pub stop: bool,
}

impl ButtonStates {
    /// Enablement as a function of `running` and `paused` alone.
    pub fn for_state(running: bool, paused: bool) -> Self {
        Self {
            start: !running,
            pause: running && !paused,
            resume: running && paused,
            stop: running,
        }
    }

    /// Disable every button whose request has not come back yet.
    pub fn masked(self, in_flight: &InFlight) -> Self {
        Self {
            start: self.start && !in_flight.is_set(JobAction::Start),
            pause: self.pause && !in_flight.is_set(JobAction::Pause),
            resume: self.resume && !in_flight.is_set(JobAction::Resume),
            stop: self.stop && !in_flight.is_set(JobAction::Stop),
        }
    }

    pub fn is_enabled(&self, action: JobAction) -> bool {
        match action {
            JobAction::Start => self.start,
            JobAction::Pause => self.pause,
            JobAction::Resume => self.resume,
            JobAction::Stop => self.stop,
        }
    }
}

/// Everything the panel renders for one snapshot.
#[derive(Clone, Debug, PartialEq)]
pub struct JobView {
    /// Progress bar fill, always within 0..=100.
    pub percent: u16,
    pub state_label: String,
    pub range_label: String,
    pub countdown_label: String,
    pub progress_text: String,
    pub last_range_label: String,
    /// Batch size, interval and, for the dual job, the next client.
    pub mode_label: String,
    /// Last batch failure the server reported while continuing.
    pub last_error: Option<String>,
    pub buttons: ButtonStates,
}

impl JobView {
    pub fn project(state: &JobState) -> Self {
        let percent = state.percent.map(clamp_percent);
        Self {
            percent: percent.map(|p| p.round() as u16).unwrap_or(0),
            state_label: state
                .state
                .clone()
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| PLACEHOLDER.into()),
            range_label: range(state.current_start_id, state.current_end_id_next),
            countdown_label: countdown(state),
            progress_text: format!(
                "{}/{} ({}%)",
                opt(state.completed_count),
                opt(state.max_id),
                percent.map(fmt_percent).unwrap_or_else(|| PLACEHOLDER.into())
            ),
            last_range_label: match state.last_processed_range {
                Some((a, b)) => range(Some(a), Some(b)),
                None => PLACEHOLDER.into(),
            },
            mode_label: mode(state),
            last_error: state.last_error.clone().filter(|e| !e.is_empty()),
            buttons: ButtonStates::for_state(state.running, state.paused),
        }
    }
}

/// Clamp into [0, 100]; out-of-range values are clamped, NaN reads as 0.
pub fn clamp_percent(p: f64) -> f64 {
    if p.is_nan() { 0.0 } else { p.clamp(0.0, 100.0) }
}

fn fmt_percent(p: f64) -> String {
    if p.fract() == 0.0 {
        format!("{p:.0}")
    } else {
        format!("{p:.1}")
    }
}

fn opt(v: Option<u64>) -> String {
    v.map(|n| n.to_string())
        .unwrap_or_else(|| PLACEHOLDER.into())
}

fn range(start: Option<u64>, end: Option<u64>) -> String {
    if start.is_none() && end.is_none() {
        return PLACEHOLDER.into();
    }
    format!("{}–{}", opt(start), opt(end))
}

fn countdown(state: &JobState) -> String {
    if state.paused {
        "paused".into()
    } else if let Some(secs) = state.next_run_seconds {
        format!("{secs}s")
    } else {
        PLACEHOLDER.into()
    }
}

fn mode(state: &JobState) -> String {
    let mut parts = vec![
        format!("batch {}", opt(state.batch_size)),
        format!("every {}s", opt(state.interval_sec)),
    ];
    if state.alternating == Some(true) {
        parts.push(format!(
            "next client {}",
            state
                .next_client_id
                .map(|c| c.to_string())
                .unwrap_or_else(|| PLACEHOLDER.into())
        ));
    }
    parts.join(" | ")
}
