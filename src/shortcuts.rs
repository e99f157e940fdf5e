//! ショートカット設定の管理。

use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::controller::JobAction;

/// ショートカット設定の全体。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Shortcuts {
    pub main: MainShortcuts,
    pub notice: NoticeShortcuts,
    pub input_box: InputBoxShortcuts,
}

/// メイン画面（ジョブ操作）のショートカット。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MainShortcuts {
    pub quit: Vec<String>,
    pub start: Vec<String>,
    pub pause: Vec<String>,
    pub resume: Vec<String>,
    pub stop: Vec<String>,
    pub edit_start_id: Vec<String>,
    pub edit_batch_size: Vec<String>,
}

impl MainShortcuts {
    /// アクションに対応するキー一覧。
    pub fn for_action(&self, action: JobAction) -> &[String] {
        match action {
            JobAction::Start => &self.start,
            JobAction::Pause => &self.pause,
            JobAction::Resume => &self.resume,
            JobAction::Stop => &self.stop,
        }
    }
}

/// 通知ポップアップのショートカット。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NoticeShortcuts {
    pub dismiss: Vec<String>,
}

/// InputBoxのショートカット。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputBoxShortcuts {
    pub confirm: Vec<String>,
    pub cancel: Vec<String>,
    pub backspace: Vec<String>,
    pub delete: Vec<String>,
    pub left: Vec<String>,
    pub right: Vec<String>,
    pub home: Vec<String>,
    pub end: Vec<String>,
    pub clear_line: Vec<String>,
}

impl Shortcuts {
    /// TOMLから読み込み、無ければデフォルトを返す。
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }
        // 既存ファイルを読み込んでパースする。
        let content = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }
}

impl Default for Shortcuts {
    fn default() -> Self {
        Self {
            main: MainShortcuts {
                quit: vec!["q".into()],
                start: vec!["s".into()],
                pause: vec!["p".into()],
                resume: vec!["r".into()],
                stop: vec!["x".into()],
                edit_start_id: vec!["i".into()],
                edit_batch_size: vec!["b".into()],
            },
            notice: NoticeShortcuts {
                dismiss: vec!["Enter".into(), "Esc".into()],
            },
            input_box: InputBoxShortcuts {
                confirm: vec!["Enter".into()],
                cancel: vec!["Esc".into()],
                backspace: vec!["Backspace".into()],
                delete: vec!["Delete".into()],
                left: vec!["Left".into()],
                right: vec!["Right".into()],
                home: vec!["Home".into()],
                end: vec!["End".into()],
                clear_line: vec!["Ctrl+u".into()],
            },
        }
    }
}

/// KeyEventがいずれかのショートカット文字列と一致するか判定する。
pub fn matches_shortcut(key: &KeyEvent, shortcuts: &[String]) -> bool {
    shortcuts.iter().any(|s| matches_single_shortcut(key, s))
}

/// "Ctrl+u" のような文字列を (修飾キー, キー名) に分ける。
fn split_shortcut(shortcut: &str) -> Option<(KeyModifiers, &str)> {
    let mut parts: Vec<&str> = shortcut.split('+').collect();
    let key = parts.pop()?;
    let mut modifiers = KeyModifiers::empty();
    for m in parts {
        modifiers |= match m.to_ascii_lowercase().as_str() {
            "ctrl" => KeyModifiers::CONTROL,
            "alt" => KeyModifiers::ALT,
            "shift" => KeyModifiers::SHIFT,
            _ => return None,
        };
    }
    Some((modifiers, key))
}

/// キー名をKeyCodeへ変換する。
fn key_code(name: &str) -> Option<KeyCode> {
    let code = match name.to_ascii_lowercase().as_str() {
        "enter" => KeyCode::Enter,
        "esc" => KeyCode::Esc,
        "tab" => KeyCode::Tab,
        "backspace" => KeyCode::Backspace,
        "delete" => KeyCode::Delete,
        "up" => KeyCode::Up,
        "down" => KeyCode::Down,
        "left" => KeyCode::Left,
        "right" => KeyCode::Right,
        "home" => KeyCode::Home,
        "end" => KeyCode::End,
        // 単一文字は大文字小文字を区別して Char とする。
        _ => {
            let mut chars = name.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => KeyCode::Char(c),
                _ => return None,
            }
        }
    };
    Some(code)
}

/// KeyEventが単一のショートカット文字列と一致するか判定する。
fn matches_single_shortcut(key: &KeyEvent, shortcut: &str) -> bool {
    let Some((modifiers, name)) = split_shortcut(shortcut) else {
        return false;
    };
    key.modifiers == modifiers && key_code(name) == Some(key.code)
}
