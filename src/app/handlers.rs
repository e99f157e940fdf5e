//! キー入力ハンドラー関数。

use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::{
    controller::JobAction,
    input::{InputBoxState, InputTarget},
    shortcuts,
};

use super::{App, dispatch};

/// キー入力を1件処理し、終了すべきならtrueを返す。
pub async fn handle_key(app: &mut App, k: KeyEvent) -> Result<bool> {
    // 通知が出ている間は閉じる操作だけを受け付ける。
    if app.ui.notice.is_some() {
        if shortcuts::matches_shortcut(&k, &app.shortcuts.notice.dismiss) {
            app.ui.notice = None;
        }
        return Ok(false);
    }

    // 入力ボックスが開いていれば次に優先する。
    if app.input_box.is_some() {
        handle_input_box_key(app, k);
        return Ok(false);
    }

    handle_main_key(app, k).await
}

/// Ctrl+Cかどうかを判定する。
pub fn is_ctrl_c(k: &KeyEvent) -> bool {
    k.modifiers.contains(KeyModifiers::CONTROL) && k.code == KeyCode::Char('c')
}

/// メイン画面のキー処理。
async fn handle_main_key(app: &mut App, k: KeyEvent) -> Result<bool> {
    let sc = &app.shortcuts.main;

    if shortcuts::matches_shortcut(&k, &sc.quit) {
        return Ok(true);
    }

    // ジョブ操作のキーならControllerへ渡す。
    if let Some(action) = JobAction::ALL
        .into_iter()
        .find(|a| shortcuts::matches_shortcut(&k, sc.for_action(*a)))
    {
        dispatch(app, action).await?;
    } else if shortcuts::matches_shortcut(&k, &sc.edit_start_id) {
        // 開始IDの入力ボックスを開く。
        app.input_box = Some(InputBoxState::open(
            InputTarget::StartId,
            "Start ID (blank or invalid = 1):",
            &app.start_id_text,
        ));
    } else if shortcuts::matches_shortcut(&k, &sc.edit_batch_size) {
        // バッチ件数の入力ボックスを開く。
        let prompt = format!("Batch size (blank = {}):", app.cfg.job.batch_size);
        app.input_box = Some(InputBoxState::open(
            InputTarget::BatchSize,
            prompt,
            &app.batch_size_text,
        ));
    }

    Ok(false)
}

/// 入力ボックスのキー処理。
fn handle_input_box_key(app: &mut App, k: KeyEvent) {
    let Some(input_state) = &mut app.input_box else {
        return;
    };
    let sc = &app.shortcuts.input_box;

    if shortcuts::matches_shortcut(&k, &sc.confirm) {
        // 値を反映してから閉じる。
        let value = input_state.value.trim().to_string();
        match input_state.target {
            InputTarget::StartId => app.start_id_text = value,
            InputTarget::BatchSize => app.batch_size_text = value,
        }
        app.input_box = None;
    } else if shortcuts::matches_shortcut(&k, &sc.cancel) {
        // 入力を破棄して閉じる。
        app.input_box = None;
    } else if shortcuts::matches_shortcut(&k, &sc.backspace) {
        input_state.backspace();
    } else if shortcuts::matches_shortcut(&k, &sc.delete) {
        input_state.delete();
    } else if shortcuts::matches_shortcut(&k, &sc.left) {
        input_state.move_left();
    } else if shortcuts::matches_shortcut(&k, &sc.right) {
        input_state.move_right();
    } else if shortcuts::matches_shortcut(&k, &sc.home) {
        input_state.move_home();
    } else if shortcuts::matches_shortcut(&k, &sc.end) {
        input_state.move_end();
    } else if shortcuts::matches_shortcut(&k, &sc.clear_line) {
        input_state.clear_line();
    } else if let KeyCode::Char(c) = k.code
        && !k.modifiers.contains(KeyModifiers::CONTROL)
    {
        // コントロールキー以外の文字だけ挿入する。
        input_state.insert_char(c);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::Config, shortcuts::Shortcuts, worker::WorkerCmd};
    use tokio::sync::mpsc;

    fn key(c: char) -> KeyEvent {
        KeyEvent::new(KeyCode::Char(c), KeyModifiers::empty())
    }

    fn special(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::empty())
    }

    fn test_app() -> (App, mpsc::Receiver<WorkerCmd>) {
        let (tx_cmd, rx_cmd) = mpsc::channel(4);
        let (_tx_ev, rx_ev) = mpsc::channel(4);
        (
            App::new(Config::default(), Shortcuts::default(), tx_cmd, rx_ev),
            rx_cmd,
        )
    }

    #[tokio::test]
    async fn test_edit_start_id_then_start() {
        // 入力ボックスで開始IDを変えてから開始できることを検証する。
        let (mut app, mut rx_cmd) = test_app();
        handle_key(&mut app, key('i')).await.unwrap();
        handle_key(&mut app, special(KeyCode::Backspace))
            .await
            .unwrap();
        for c in "250".chars() {
            handle_key(&mut app, key(c)).await.unwrap();
        }
        handle_key(&mut app, special(KeyCode::Enter)).await.unwrap();
        assert_eq!(app.start_id_text, "250");

        handle_key(&mut app, key('s')).await.unwrap();
        let Some(WorkerCmd::Perform(cmd)) = rx_cmd.recv().await else {
            panic!("start not sent");
        };
        assert_eq!(cmd.action(), JobAction::Start);

        // 応答待ちの二度押しは送られない。
        handle_key(&mut app, key('s')).await.unwrap();
        assert!(rx_cmd.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_notice_blocks_other_keys() {
        // 通知表示中は操作キーも終了キーも無視されることを検証する。
        let (mut app, mut rx_cmd) = test_app();
        app.ui.raise("stop failed", "HTTP 500");
        assert!(!handle_key(&mut app, key('q')).await.unwrap());
        handle_key(&mut app, key('s')).await.unwrap();
        assert!(rx_cmd.try_recv().is_err());

        handle_key(&mut app, special(KeyCode::Enter)).await.unwrap();
        assert!(app.ui.notice.is_none());
        assert!(handle_key(&mut app, key('q')).await.unwrap());
    }

    #[tokio::test]
    async fn test_cancel_keeps_previous_value() {
        // Escで閉じると入力値は変わらないことを検証する。
        let (mut app, _rx_cmd) = test_app();
        handle_key(&mut app, key('b')).await.unwrap();
        handle_key(&mut app, key('7')).await.unwrap();
        handle_key(&mut app, special(KeyCode::Esc)).await.unwrap();
        assert_eq!(app.batch_size_text, "100");
        assert!(app.input_box.is_none());
    }
}
