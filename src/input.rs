//! 開始IDやバッチ件数を編集するための1行入力ボックス。

use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Clear, Paragraph},
};

use crate::layout;

/// 入力確定時にどの値へ反映するか。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InputTarget {
    /// 開始ID。
    StartId,
    /// バッチ件数。
    BatchSize,
}

/// 入力ボックスの状態。
#[derive(Clone, Debug)]
pub struct InputBoxState {
    /// プロンプト。
    pub prompt: String,
    /// 編集中の値。
    pub value: String,
    /// カーソル位置（文字単位）。
    pub cursor: usize,
    /// 確定時の反映先。
    pub target: InputTarget,
}

impl InputBoxState {
    /// 既存値を末尾カーソルで開く。
    pub fn open(target: InputTarget, prompt: impl Into<String>, value: &str) -> Self {
        Self {
            prompt: prompt.into(),
            value: value.to_string(),
            cursor: value.chars().count(),
            target,
        }
    }

    /// 文字単位のカーソル位置をバイト位置へ変換する。
    fn byte_at(&self, cursor: usize) -> usize {
        self.value
            .char_indices()
            .nth(cursor)
            .map(|(i, _)| i)
            .unwrap_or(self.value.len())
    }

    /// カーソル位置に文字を挿入する。
    pub fn insert_char(&mut self, c: char) {
        let at = self.byte_at(self.cursor);
        self.value.insert(at, c);
        self.cursor += 1;
    }

    /// カーソル直前の文字を消す。
    pub fn backspace(&mut self) {
        if self.cursor == 0 {
            return;
        }
        self.cursor -= 1;
        let at = self.byte_at(self.cursor);
        self.value.remove(at);
    }

    /// カーソル位置の文字を消す。
    pub fn delete(&mut self) {
        if self.cursor < self.value.chars().count() {
            let at = self.byte_at(self.cursor);
            self.value.remove(at);
        }
    }

    /// カーソルを左へ。
    pub fn move_left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    /// カーソルを右へ（末尾で止まる）。
    pub fn move_right(&mut self) {
        self.cursor = (self.cursor + 1).min(self.value.chars().count());
    }

    /// 行頭へ。
    pub fn move_home(&mut self) {
        self.cursor = 0;
    }

    /// 行末へ。
    pub fn move_end(&mut self) {
        self.cursor = self.value.chars().count();
    }

    /// 入力を空にする。
    pub fn clear_line(&mut self) {
        self.value.clear();
        self.cursor = 0;
    }

    /// カーソル位置に `|` を差し込んだ表示用文字列。
    fn with_cursor(&self) -> String {
        let at = self.byte_at(self.cursor);
        format!("{}|{}", &self.value[..at], &self.value[at..])
    }
}

/// 入力ボックスをポップアップとして描画する。
pub fn render_input_box(f: &mut Frame, state: &InputBoxState) {
    // 画面中央にポップアップ領域を確保し、背景を消す。
    let area = layout::centered_popup(f.area(), 50, 6);
    f.render_widget(Clear, area);

    // プロンプト、入力欄、ヘルプの3行を並べる。
    let lines = vec![
        Line::from(state.prompt.clone()).style(
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        ),
        Line::from(state.with_cursor()).style(Style::default().fg(Color::Green)),
        Line::from("Enter=OK | Esc=cancel | Ctrl+U=clear").style(Style::default().fg(Color::Gray)),
    ];
    let popup = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .title("Input")
            .style(Style::default().bg(Color::DarkGray)),
    );
    f.render_widget(popup, area);
}
