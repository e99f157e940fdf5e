//! Config model and persistence helpers.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::{fs, path::Path, time::Duration};

/// Top-level configuration stored in `config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Where the job controller lives.
    pub server: ServerCfg,
    /// Defaults for the start request.
    pub job: JobCfg,
    /// Status polling cadence.
    pub poll: PollCfg,
}

/// Job controller endpoint settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerCfg {
    /// Scheme, host and port of the admin server.
    pub base_url: String,
    /// Which job controller to drive.
    pub job_kind: JobKind,
    /// Per-request timeout; a timed-out request counts as a network error.
    pub request_timeout_secs: u64,
}

/// The server runs two job controllers under different prefixes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobKind {
    /// Single-API batch job under `/api/admin/job`.
    #[serde(rename = "job")]
    Single,
    /// Alternating dual-API job under `/api/admin/dualjob`.
    #[serde(rename = "dualjob")]
    Dual,
}

impl JobKind {
    /// Path segment after `/api/admin/`.
    pub fn path_segment(self) -> &'static str {
        match self {
            JobKind::Single => "job",
            JobKind::Dual => "dualjob",
        }
    }
}

/// Values sent along with a start command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobCfg {
    /// Items per batch; used when the batch size input is blank or invalid.
    pub batch_size: u64,
    /// Seconds between batches. Omitted from the request when unset so the
    /// server keeps its own default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interval_sec: Option<u64>,
}

/// Poller settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollCfg {
    /// Milliseconds between status requests.
    pub interval_ms: u64,
}

impl PollCfg {
    /// Poll period, never shorter than 100ms.
    pub fn period(&self) -> Duration {
        Duration::from_millis(self.interval_ms.max(100))
    }
}

impl Config {
    /// Load from disk or create defaults when missing.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            let s = fs::read_to_string(path)?;
            Ok(toml::from_str(&s)?)
        } else {
            let cfg = Self::default();
            cfg.save(path)?;
            Ok(cfg)
        }
    }

    /// Persist the config as pretty TOML.
    pub fn save(&self, path: &Path) -> Result<()> {
        let s = toml::to_string_pretty(self)?;
        fs::write(path, s)?;
        Ok(())
    }
}

impl Default for Config {
    /// Defaults match the server's own job defaults.
    fn default() -> Self {
        Self {
            server: ServerCfg {
                base_url: "http://127.0.0.1:5000".into(),
                job_kind: JobKind::Single,
                request_timeout_secs: 10,
            },
            job: JobCfg {
                batch_size: 100,
                interval_sec: None,
            },
            poll: PollCfg { interval_ms: 1000 },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_survive_toml() {
        let s = toml::to_string_pretty(&Config::default()).unwrap();
        let cfg: Config = toml::from_str(&s).unwrap();
        assert_eq!(cfg.server.job_kind, JobKind::Single);
        assert_eq!(cfg.job.batch_size, 100);
        assert_eq!(cfg.job.interval_sec, None);
        assert_eq!(cfg.poll.period(), Duration::from_secs(1));
    }

    #[test]
    fn dual_job_kind_from_toml() {
        let cfg: Config = toml::from_str(
            r#"
            [server]
            base_url = "http://10.0.0.2:8000"
            job_kind = "dualjob"
            request_timeout_secs = 3

            [job]
            batch_size = 50
            interval_sec = 30

            [poll]
            interval_ms = 10
            "#,
        )
        .unwrap();
        assert_eq!(cfg.server.job_kind.path_segment(), "dualjob");
        assert_eq!(cfg.job.interval_sec, Some(30));
        assert_eq!(cfg.poll.period(), Duration::from_millis(100));
    }
}
