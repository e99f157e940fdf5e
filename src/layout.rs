//! レイアウト計算のヘルパー関数

use ratatui::prelude::*;

/// メイン画面の各領域
pub struct MainLayout {
    /// 接続先とジョブ種別の表示行
    pub header: Rect,
    /// 進捗バー
    pub gauge: Rect,
    /// 状態ラベル + ログの領域
    pub body: Rect,
    /// ボタン列と入力値
    pub controls: Rect,
    /// HELPバー
    pub help_bar: Rect,
    /// STATUSバー
    pub status_bar: Rect,
}

/// ボディ部の2つの領域
pub struct BodyLayout {
    /// 状態ラベル
    pub info_panel: Rect,
    /// ログ
    pub log_panel: Rect,
}

/// メイン画面を縦に分割する
pub fn create_main_layout(area: Rect) -> MainLayout {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // ヘッダ
            Constraint::Length(3), // 進捗バー
            Constraint::Min(8),    // 状態ラベル + ログ
            Constraint::Length(3), // ボタン列
            Constraint::Length(3), // HELPバー
            Constraint::Length(3), // STATUSバー
        ])
        .split(area);

    MainLayout {
        header: chunks[0],
        gauge: chunks[1],
        body: chunks[2],
        controls: chunks[3],
        help_bar: chunks[4],
        status_bar: chunks[5],
    }
}

/// Body領域を左右に分割（状態 45% + ログ 55%）
pub fn create_body_layout(area: Rect) -> BodyLayout {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(45), Constraint::Percentage(55)])
        .split(area);

    BodyLayout {
        info_panel: chunks[0],
        log_panel: chunks[1],
    }
}

/// 中央配置のポップアップ領域を計算
pub fn centered_popup(area: Rect, width_percent: u16, height: u16) -> Rect {
    // 縦方向の中央行を取り出す。
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(area.height.saturating_sub(height) / 2),
            Constraint::Length(height),
            Constraint::Min(0),
        ])
        .split(area);

    // 横方向も中央に寄せる。
    let side = (100 - width_percent.min(100)) / 2;
    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(side),
            Constraint::Percentage(width_percent),
            Constraint::Percentage(side),
        ])
        .split(rows[1])[1]
}
