//! ジョブ操作パネルの起動処理。

use anyhow::{Context, Result};
use tracing_appender::non_blocking::WorkerGuard;

mod api;
mod app;
mod config;
mod controller;
mod events;
mod input;
mod jobs;
mod layout;
mod poller;
mod shortcuts;
mod ui;
mod view;
mod worker;

/// ログの出力先（カレントディレクトリ直下）。
const LOG_FILE: &str = "job_panel.log";

/// TUIの画面を汚さないよう、ログはファイルへ非同期で書き出す。
fn init_logging() -> Result<WorkerGuard> {
    let (writer, guard) =
        tracing_appender::non_blocking(tracing_appender::rolling::never(".", LOG_FILE));
    tracing_subscriber::fmt()
        .with_writer(writer)
        .with_ansi(false)
        .with_target(false)
        // ポーリング毎のdebugログは出さない。
        .with_max_level(tracing::Level::INFO)
        .try_init()
        .map_err(|e| anyhow::anyhow!("{e}"))
        .context("failed to init logging")?;
    Ok(guard)
}

#[tokio::main]
async fn main() -> Result<()> {
    // ガードが落ちると未書き込みのログが失われる。
    let _log_guard = init_logging()?;
    tracing::info!("job_panel {} starting", env!("CARGO_PKG_VERSION"));

    let mut terminal = ui::init_terminal()?;
    let outcome = app::run_app(&mut terminal).await;
    ui::restore_terminal()?;

    match &outcome {
        Ok(()) => tracing::info!("job_panel exiting"),
        Err(e) => tracing::error!("job_panel aborted: {e:#}"),
    }
    outcome
}
