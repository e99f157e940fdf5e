//! 描画側と共有するUI状態。

/// ログパネルに保持する最大行数。
const LOG_CAPACITY: usize = 200;

/// 閉じるまで他のキー操作を受け付けない通知。
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Notice {
    /// ポップアップのタイトル。
    pub title: String,
    /// 本文。
    pub message: String,
}

/// 描画側と共有するUI状態。
#[derive(Clone, Debug)]
pub struct UiState {
    /// 右側パネルに表示するログ。
    pub log: Vec<String>,
    /// 画面下部のステータス文言。
    pub status: String,
    /// 表示中の通知（Someの間は通知の操作のみ受け付ける）。
    pub notice: Option<Notice>,
}

impl UiState {
    /// 初期状態を作る。
    pub fn new() -> Self {
        Self {
            log: vec![],
            status: "Ready".into(),
            notice: None,
        }
    }

    /// 時刻付きでログを追加する。
    pub fn push_log(&mut self, line: impl AsRef<str>) {
        // 表示用に現在時刻を先頭へ付ける。
        let ts = chrono::Local::now().format("%H:%M:%S");
        self.log.push(format!("[{ts}] {}", line.as_ref()));
        // 古い行から捨てて上限を保つ。
        if self.log.len() > LOG_CAPACITY {
            let overflow = self.log.len() - LOG_CAPACITY;
            self.log.drain(..overflow);
        }
    }

    /// 通知を開く。
    pub fn raise(&mut self, title: impl Into<String>, message: impl Into<String>) {
        self.notice = Some(Notice {
            title: title.into(),
            message: message.into(),
        });
    }
}

impl Default for UiState {
    fn default() -> Self {
        Self::new()
    }
}
