//! サーバーが報告するジョブ状態と、その手元のスナップショット。

use serde::Deserialize;

/// `/status` などが返すジョブ状態のスナップショット。
///
/// 未知のフィールドは無視し、欠けている任意項目は0ではなく「不在」として扱う。
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobState {
    /// ジョブが動作中か（停止・完了していない）。
    #[serde(default)]
    pub running: bool,
    /// 動作中だが一時停止しているか。
    #[serde(default)]
    pub paused: bool,
    /// サーバー定義のフェーズ表示（"idle"/"running"/"paused" など）。
    pub state: Option<String>,
    /// 処理中バッチの開始ID。
    pub current_start_id: Option<u64>,
    /// 次バッチの終了ID。
    pub current_end_id_next: Option<u64>,
    /// 次のバッチまでの残り秒数（待機中のみ）。
    pub next_run_seconds: Option<u64>,
    /// 対象となるIDの最大値。
    pub max_id: Option<u64>,
    /// 処理済み件数。
    pub completed_count: Option<u64>,
    /// サーバー計算の進捗率（0〜100）。
    pub percent: Option<f64>,
    /// 直近に完了したバッチの範囲。
    pub last_processed_range: Option<(u64, u64)>,
    /// バッチ間隔（秒）。
    pub interval_sec: Option<u64>,
    /// 1バッチあたりの件数。
    pub batch_size: Option<u64>,
    /// デュアルジョブで次に使うAPIクライアント（1 または 2）。
    pub next_client_id: Option<u8>,
    /// デュアルジョブ（交互実行）かどうか。
    pub alternating: Option<bool>,
    /// 直近バッチでサーバー側に起きたエラー。
    pub last_error: Option<String>,
    /// 2xx応答に含まれる拒否理由。
    pub error: Option<String>,
}

/// クライアントから見たジョブのフェーズ。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    /// 停止中（初期状態かつジョブ終了後の状態）。
    Idle,
    /// 実行中。
    Running,
    /// 一時停止中。
    Paused,
}

impl Phase {
    /// running/paused の組からフェーズを求める。
    pub fn of(state: &JobState) -> Self {
        // running でなければ paused は意味を持たない。
        match (state.running, state.paused) {
            (false, _) => Phase::Idle,
            (true, false) => Phase::Running,
            (true, true) => Phase::Paused,
        }
    }
}

/// 最後に確認できたサーバー状態の保持場所。
///
/// 更新は `merge` だけを通す。履歴は直前の1件のみ保持する。
#[derive(Clone, Debug, Default)]
pub struct JobStateModel {
    current: JobState,
    previous: Option<JobState>,
}

impl JobStateModel {
    /// 受け取ったスナップショットで丸ごと置き換える。
    pub fn merge(&mut self, incoming: JobState) {
        // 置き換え前の値を直前スナップショットとして残す。
        let old = std::mem::replace(&mut self.current, incoming);
        self.previous = Some(old);
    }

    /// 現在のスナップショット。
    pub fn current(&self) -> &JobState {
        &self.current
    }

    /// 直前のスナップショット（まだ一度もmergeしていなければNone）。
    pub fn previous(&self) -> Option<&JobState> {
        self.previous.as_ref()
    }

    /// 現在のフェーズ。
    pub fn phase(&self) -> Phase {
        Phase::of(&self.current)
    }

    /// 直近のmergeでフェーズが変わった場合に (変化前, 変化後) を返す。
    pub fn transition(&self) -> Option<(Phase, Phase)> {
        let before = Phase::of(self.previous()?);
        let after = self.phase();
        (before != after).then_some((before, after))
    }
}
