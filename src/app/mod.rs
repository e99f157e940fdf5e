//! TUIのイベントループ、ジョブ操作の発行、状態の反映。

mod handlers;
mod render;

use anyhow::Result;
use chrono::{DateTime, Local};
use crossterm::event::{self, Event};
use std::{path::PathBuf, sync::Arc, time::Duration};
use tokio::sync::mpsc;

use crate::{
    api::{HttpJobApi, JobApi, StartRequest},
    config::Config,
    controller::{JobAction, JobCommand, JobController, parse_batch_size, parse_start_id},
    events::UiState,
    input::InputBoxState,
    jobs::{JobState, JobStateModel, Phase},
    poller,
    shortcuts::Shortcuts,
    ui::Tui,
    worker::{self, WorkerCmd, WorkerEvent},
};

use handlers::{handle_key, is_ctrl_c};
use render::draw;

/// 入力処理と描画で共有するアプリ状態。
pub struct App {
    /// メモリ上の現在設定。
    pub cfg: Config,
    /// ログやステータスなどUI固有の状態。
    pub ui: UiState,
    /// 最後に確認できたサーバー側のジョブ状態。
    pub model: JobStateModel,
    /// 操作の可否判定と応答の反映を担う。
    pub controller: JobController,
    /// 開始ID入力欄の文字列（空や不正値は1として扱う）。
    pub start_id_text: String,
    /// バッチ件数入力欄の文字列（空や不正値は設定値を使う）。
    pub batch_size_text: String,
    /// 最後にスナップショットを反映した時刻。
    pub last_sync: Option<DateTime<Local>>,
    /// Workerへのコマンド送信チャネル。
    pub worker_tx: mpsc::Sender<WorkerCmd>,
    /// Worker・Pollerからのイベント受信チャネル。
    pub worker_rx: mpsc::Receiver<WorkerEvent>,
    /// 入力ボックスの状態（入力中はSome）。
    pub input_box: Option<InputBoxState>,
    /// ショートカットキー設定。
    pub shortcuts: Shortcuts,
}

impl App {
    /// 設定とチャネルからアプリ状態を組み立てる。
    pub fn new(
        cfg: Config,
        shortcuts: Shortcuts,
        worker_tx: mpsc::Sender<WorkerCmd>,
        worker_rx: mpsc::Receiver<WorkerEvent>,
    ) -> Self {
        // 入力欄の初期値は開始ID=1、バッチ件数=設定値。
        let batch_size_text = cfg.job.batch_size.to_string();
        Self {
            cfg,
            ui: UiState::new(),
            model: JobStateModel::default(),
            controller: JobController::new(),
            start_id_text: "1".into(),
            batch_size_text,
            last_sync: None,
            worker_tx,
            worker_rx,
            input_box: None,
            shortcuts,
        }
    }
}

/// ユーザーが終了するまでメインTUIループを回す。
pub async fn run_app(terminal: &mut Tui) -> Result<()> {
    // 設定ファイルを読み込む（初回はデフォルトを生成）。
    let cfg = Config::load_or_default(&PathBuf::from("config.toml"))?;
    // ショートカット設定を読み込む（無ければデフォルト）。
    let shortcuts = Shortcuts::load_or_default(PathBuf::from("shortcut.toml"))?;
    tracing::info!(
        "server {} ({})",
        cfg.server.base_url,
        cfg.server.job_kind.path_segment()
    );

    // WorkerとPollerで共有するAPIクライアントを作る。
    let api: Arc<dyn JobApi> = Arc::new(HttpJobApi::new(&cfg.server)?);

    // Worker通信用のコマンド/イベントチャネルを作る。
    let (tx_cmd, rx_cmd) = mpsc::channel::<WorkerCmd>(16);
    let (tx_ev, rx_ev) = mpsc::channel::<WorkerEvent>(256);

    let period = cfg.poll.period();
    let mut app = App::new(cfg, shortcuts, tx_cmd, rx_ev);

    // Workerと、操作とは独立に状態を取りに行くPollerを起動する。
    tokio::spawn(worker::run(rx_cmd, tx_ev.clone(), api.clone()));
    tokio::spawn(poller::run(api, app.controller.gate(), tx_ev, period));

    loop {
        // 現在の状態を描画する。
        terminal.draw(|f| draw(f, &app))?;

        // 入力処理の前にWorker/Pollerのイベントを到着順に消化する。
        while let Ok(ev) = app.worker_rx.try_recv() {
            handle_worker_event(&mut app, ev)?;
        }

        // UIの応答性確保のため短いタイムアウトで入力をポーリングする。
        if event::poll(Duration::from_millis(50))?
            && let Event::Key(k) = event::read()?
        {
            // どの状態でもCtrl+Cで終了できるようにする。
            if is_ctrl_c(&k) {
                break;
            }
            if handle_key(&mut app, k).await? {
                break;
            }
        }
    }
    Ok(())
}

/// Worker/PollerのイベントをUI状態へ反映する。
fn handle_worker_event(app: &mut App, ev: WorkerEvent) -> Result<()> {
    match ev {
        WorkerEvent::Polled { generation, state } => {
            // 操作の前後にまたがったポーリング結果は古いので捨てる。
            if app.controller.accepts_poll(generation) {
                apply_snapshot(app, state);
            } else {
                tracing::debug!("stale poll dropped (generation {generation})");
            }
        }
        WorkerEvent::ActionFinished { action, result } => {
            // 成功時だけモデルが更新される。
            match app.controller.complete(action, result, &mut app.model) {
                Ok(()) => {
                    app.last_sync = Some(Local::now());
                    log_transition(app);
                    app.ui.status = format!("{action}: ok");
                }
                Err(e) => {
                    // 失敗は通知ポップアップで必ずユーザーに見せる。
                    app.ui.push_log(format!("{action} failed: {e}"));
                    app.ui.status = format!("{action}: failed");
                    app.ui.raise(format!("{action} failed"), e.to_string());
                }
            }
        }
        WorkerEvent::Log(s) => {
            // ログを追加する。
            app.ui.push_log(s);
        }
    }
    Ok(())
}

/// ポーリングで得たスナップショットを反映する。
fn apply_snapshot(app: &mut App, state: JobState) {
    app.model.merge(state);
    app.last_sync = Some(Local::now());
    log_transition(app);
}

/// フェーズが変わったらログに残す（表示用のみ）。
fn log_transition(app: &mut App) {
    let Some((from, to)) = app.model.transition() else {
        return;
    };
    let line = match (from, to) {
        (Phase::Idle, Phase::Running) => "job started",
        (Phase::Paused, Phase::Running) => "job resumed",
        (_, Phase::Paused) => "job paused",
        (_, Phase::Idle) => "job stopped",
        _ => return,
    };
    tracing::info!("{line}");
    app.ui.push_log(line);
}

/// 操作を検証してWorkerへ送る。許可されない操作はネットワークに出さない。
pub async fn dispatch(app: &mut App, action: JobAction) -> Result<()> {
    // 入力欄の値から送信内容を組み立てる。
    let cmd = match action {
        JobAction::Start => JobCommand::Start(StartRequest {
            start_id: parse_start_id(&app.start_id_text),
            batch_size: parse_batch_size(&app.batch_size_text, app.cfg.job.batch_size),
            interval_sec: app.cfg.job.interval_sec,
        }),
        JobAction::Pause => JobCommand::Pause,
        JobAction::Resume => JobCommand::Resume,
        JobAction::Stop => JobCommand::Stop,
    };

    match app.controller.prepare(cmd, &app.model) {
        Ok(cmd) => {
            // 送信前にボタンは無効化済み（in-flight）。
            app.worker_tx.send(WorkerCmd::Perform(cmd)).await?;
            app.ui.status = format!("{action}: sending...");
        }
        Err(refusal) => {
            tracing::warn!("{refusal}");
            app.ui.status = refusal.to_string();
        }
    }
    Ok(())
}
