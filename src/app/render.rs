//! TUI描画関連の関数。

use ratatui::{
    Frame,
    prelude::*,
    widgets::{Block, Borders, Clear, Gauge, Paragraph, Wrap},
};

use crate::{
    controller::{InFlight, JobAction},
    events::Notice,
    input, layout,
    shortcuts::Shortcuts,
    view::{ButtonStates, JobView},
};

use super::App;

/// 画面全体のレイアウトを描画する。
pub fn draw(f: &mut Frame, app: &App) {
    // スナップショットから表示内容を計算する（副作用なし）。
    let view = JobView::project(app.model.current());
    let in_flight = app.controller.in_flight();
    let buttons = view.buttons.masked(&in_flight);

    let main_layout = layout::create_main_layout(f.area());
    let body_layout = layout::create_body_layout(main_layout.body);

    // ヘッダ：接続先と最終同期時刻。
    let synced = app
        .last_sync
        .map(|t| t.format("%H:%M:%S").to_string())
        .unwrap_or_else(|| "never".into());
    let header = Line::from(vec![
        Span::styled(" job_panel ", Style::default().fg(Color::Black).bg(Color::Cyan)),
        Span::raw(format!(
            " {} [{}] | last sync: {}",
            app.cfg.server.base_url,
            app.cfg.server.job_kind.path_segment(),
            synced
        )),
    ]);
    f.render_widget(Paragraph::new(header), main_layout.header);

    // 進捗バー。
    let gauge = Gauge::default()
        .block(Block::default().borders(Borders::ALL).title("PROGRESS"))
        .gauge_style(Style::default().fg(Color::Rgb(255, 140, 0)))
        .percent(view.percent)
        .label(view.progress_text.clone());
    f.render_widget(gauge, main_layout.gauge);

    // 状態ラベル。
    let info = Paragraph::new(build_info_lines(app, &view))
        .block(Block::default().borders(Borders::ALL).title("JOB"))
        .wrap(Wrap { trim: true });
    f.render_widget(info, body_layout.info_panel);

    // ログ（表示できる行数だけ末尾から出す）。
    let visible = body_layout.log_panel.height.saturating_sub(2) as usize;
    let skip = app.ui.log.len().saturating_sub(visible);
    let log = Paragraph::new(app.ui.log[skip..].join("\n"))
        .block(Block::default().borders(Borders::ALL).title("LOG"));
    f.render_widget(log, body_layout.log_panel);

    // ボタン列。
    let controls = Paragraph::new(build_button_line(&buttons, &in_flight, &app.shortcuts))
        .block(Block::default().borders(Borders::ALL).title("CONTROL"));
    f.render_widget(controls, main_layout.controls);

    // HELPバー。
    let help = Paragraph::new(help_text(&app.shortcuts))
        .block(Block::default().borders(Borders::ALL).title("HELP"))
        .wrap(Wrap { trim: true });
    f.render_widget(help, main_layout.help_bar);

    // STATUSバー。
    let status = Paragraph::new(app.ui.status.clone())
        .block(Block::default().borders(Borders::ALL).title("STATUS"));
    f.render_widget(status, main_layout.status_bar);

    // ポップアップは入力ボックス→通知の順に重ねる。
    if let Some(input_state) = &app.input_box {
        input::render_input_box(f, input_state);
    }
    if let Some(notice) = &app.ui.notice {
        render_notice(f, notice);
    }
}

/// 状態パネルの行を組み立てる。
fn build_info_lines(app: &App, view: &JobView) -> Vec<Line<'static>> {
    let row = |name: &str, value: String| {
        Line::from(vec![
            Span::styled(format!("{name:<11}"), Style::default().fg(Color::Gray)),
            Span::raw(value),
        ])
    };
    let mut lines = vec![
        row("State", view.state_label.clone()),
        row("Range", view.range_label.clone()),
        row("Next batch", view.countdown_label.clone()),
        row("Progress", view.progress_text.clone()),
        row("Last range", view.last_range_label.clone()),
        row("Mode", view.mode_label.clone()),
        Line::default(),
        row("Start ID", display_input(&app.start_id_text, "1")),
        row(
            "Batch size",
            display_input(&app.batch_size_text, &app.cfg.job.batch_size.to_string()),
        ),
    ];
    // サーバーがバッチ失敗を報告していれば赤字で出す。
    if let Some(err) = &view.last_error {
        lines.push(Line::default());
        lines.push(
            Line::from(format!("Last error: {err}")).style(Style::default().fg(Color::Red)),
        );
    }
    lines
}

/// 空の入力欄は既定値を括弧付きで見せる。
fn display_input(text: &str, fallback: &str) -> String {
    if text.trim().is_empty() {
        format!("({fallback})")
    } else {
        text.to_string()
    }
}

/// 4つのボタンを有効/無効/送信中で色分けして並べる。
fn build_button_line(
    buttons: &ButtonStates,
    in_flight: &InFlight,
    shortcuts: &Shortcuts,
) -> Line<'static> {
    let mut spans = vec![];
    for action in JobAction::ALL {
        let key = shortcuts
            .main
            .for_action(action)
            .first()
            .cloned()
            .unwrap_or_default();
        let (label, style) = if in_flight.is_set(action) {
            (
                format!(" [{key}] {}… ", title(action)),
                Style::default().fg(Color::Yellow),
            )
        } else if buttons.is_enabled(action) {
            (
                format!(" [{key}] {} ", title(action)),
                Style::default()
                    .fg(Color::Black)
                    .bg(Color::Green)
                    .add_modifier(Modifier::BOLD),
            )
        } else {
            (
                format!(" [{key}] {} ", title(action)),
                Style::default().fg(Color::DarkGray),
            )
        };
        spans.push(Span::styled(label, style));
        spans.push(Span::raw("  "));
    }
    Line::from(spans)
}

/// ボタン表示名。
fn title(action: JobAction) -> &'static str {
    match action {
        JobAction::Start => "Start",
        JobAction::Pause => "Pause",
        JobAction::Resume => "Resume",
        JobAction::Stop => "Stop",
    }
}

/// ヘルプ文字列を返す。
fn help_text(shortcuts: &Shortcuts) -> String {
    let sc = &shortcuts.main;
    format!(
        "{}: start id | {}: batch size | {}: quit | Ctrl+C: quit",
        format_keys(&sc.edit_start_id),
        format_keys(&sc.edit_batch_size),
        format_keys(&sc.quit)
    )
}

/// ショートカットキーの配列を表示用文字列に変換する。
fn format_keys(keys: &[String]) -> String {
    keys.join("/")
}

/// 通知ポップアップを描画する。
fn render_notice(f: &mut Frame, notice: &Notice) {
    let area = layout::centered_popup(f.area(), 60, 7);
    f.render_widget(Clear, area);
    let body = Paragraph::new(vec![
        Line::from(notice.message.clone()),
        Line::default(),
        Line::from("Enter/Esc to close").style(Style::default().fg(Color::Gray)),
    ])
    .block(
        Block::default()
            .borders(Borders::ALL)
            .title(notice.title.clone())
            .style(Style::default().fg(Color::Red)),
    )
    .wrap(Wrap { trim: true });
    f.render_widget(body, area);
}
