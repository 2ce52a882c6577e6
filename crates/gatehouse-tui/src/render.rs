//! Pure view functions.
//!
//! Everything here reads `&AppState` and draws into a frame. Nothing here
//! mutates state or returns effects.

use std::time::Instant;

use gatehouse_core::auth::{Phase, Tab, ToastKind};
use gatehouse_core::media::ImageSlot;
use gatehouse_core::validation::Field;
use gatehouse_types::OAuthProvider;
use ratatui::Frame;
use ratatui::layout::{Alignment, Constraint, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Tabs, Wrap};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use crate::state::{AppState, Focus, PathPrompt};

/// Width of the centered auth card.
const CARD_WIDTH: u16 = 64;

const TOAST_WIDTH: u16 = 44;

/// Spinner frames for the submit button.
const SPINNER_FRAMES: &[&str] = &["◐", "◓", "◑", "◒"];

const ACCENT: Color = Color::Cyan;
const MUTED: Color = Color::DarkGray;

pub fn render(app: &AppState, frame: &mut Frame, now: Instant) {
    let area = frame.area();
    let card = centered_columns(area, CARD_WIDTH);

    let [tabs, heading, humor, _, body, footer] = Layout::vertical([
        Constraint::Length(3),
        Constraint::Length(1),
        Constraint::Length(1),
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(1),
    ])
    .areas(card);

    render_tabs(app, frame, tabs);
    render_heading(app, frame, heading, humor, now);

    let lines = form_lines(app, body.width);
    frame.render_widget(Paragraph::new(lines), body);
    render_footer(app, frame, footer);

    if let Some(prompt) = &app.prompt {
        render_path_prompt(prompt, frame, area);
    }
    render_toasts(app, frame, area);
}

fn centered_columns(area: Rect, width: u16) -> Rect {
    let width = width.min(area.width);
    Rect::new(
        area.x + (area.width - width) / 2,
        area.y,
        width,
        area.height,
    )
}

// ============================================================================
// Header
// ============================================================================

fn render_tabs(app: &AppState, frame: &mut Frame, area: Rect) {
    let selected = match app.auth.tab {
        Tab::SignIn => 0,
        Tab::SignUp => 1,
    };
    let tabs = Tabs::new([Tab::SignIn.title(), Tab::SignUp.title()])
        .select(selected)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(MUTED))
                .title(" Gatehouse "),
        )
        .style(Style::default().fg(Color::White))
        .highlight_style(Style::default().fg(ACCENT).add_modifier(Modifier::BOLD));
    frame.render_widget(tabs, area);
}

fn render_heading(app: &AppState, frame: &mut Frame, heading: Rect, humor: Rect, now: Instant) {
    let title = Paragraph::new(Line::from(Span::styled(
        app.auth.tab.heading(),
        Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
    )))
    .alignment(Alignment::Center);
    frame.render_widget(title, heading);

    let humor_frame = app.auth.humor.frame(now);
    let line = Paragraph::new(Line::from(Span::styled(
        humor_frame.line,
        Style::default()
            .fg(humor_color(humor_frame.opacity))
            .add_modifier(Modifier::ITALIC),
    )))
    .alignment(Alignment::Center);
    frame.render_widget(line, humor);
}

/// Gray level for a fade opacity; fully faded blends into the background.
fn humor_color(opacity: f32) -> Color {
    let level = (opacity.clamp(0.0, 1.0) * 180.0).round() as u8 + 40;
    Color::Rgb(level, level, level)
}

// ============================================================================
// Form
// ============================================================================

fn form_lines(app: &AppState, width: u16) -> Vec<Line<'static>> {
    let mut lines = vec![oauth_line(app), divider("or continue with email", width)];

    for &field in app.auth.tab.fields() {
        lines.extend(field_lines(app, field, width));
    }

    if app.auth.tab == Tab::SignUp {
        lines.push(Line::from(""));
        for slot in [ImageSlot::Avatar, ImageSlot::Cover] {
            lines.push(image_line(app, slot, width));
        }
    }

    if let Some(url) = &app.auth.remote_avatar {
        lines.push(Line::from(vec![
            Span::styled("  Avatar: ", Style::default().fg(MUTED)),
            Span::styled(
                truncate_to_width(url, usize::from(width.saturating_sub(10))),
                Style::default().fg(Color::Blue),
            ),
        ]));
    }

    lines.push(Line::from(""));
    lines.push(submit_line(app));
    lines.push(Line::from(""));
    lines.push(switch_line(app));
    lines
}

fn focus_style(app: &AppState, focus: Focus, base: Style) -> Style {
    if app.focus == focus && app.prompt.is_none() {
        base.add_modifier(Modifier::REVERSED)
    } else {
        base
    }
}

fn oauth_line(app: &AppState) -> Line<'static> {
    let mut spans = vec![Span::raw("  ")];
    for (idx, provider) in OAuthProvider::all().iter().copied().enumerate() {
        if idx > 0 {
            spans.push(Span::raw("  "));
        }
        let style = if app.is_editable() {
            Style::default().fg(Color::White)
        } else {
            Style::default().fg(MUTED)
        };
        spans.push(Span::styled(
            format!("[ Continue with {} ]", provider.display_name()),
            focus_style(app, Focus::OAuth(provider), style),
        ));
    }
    Line::from(spans)
}

fn divider(label: &str, width: u16) -> Line<'static> {
    let label = format!(" {label} ");
    let side = usize::from(width).saturating_sub(label.width() + 4) / 2;
    Line::from(Span::styled(
        format!("  {}{label}{}", "─".repeat(side), "─".repeat(side)),
        Style::default().fg(MUTED),
    ))
}

fn field_lines(app: &AppState, field: Field, width: u16) -> Vec<Line<'static>> {
    let focused = app.focus == Focus::Field(field) && app.prompt.is_none();
    let marker = if focused { "▸ " } else { "  " };

    let mut label = vec![
        Span::styled(marker, Style::default().fg(ACCENT)),
        Span::styled(field.label(), Style::default().fg(Color::White)),
    ];
    if field.is_secret() {
        let hint = if app.auth.password_visible {
            "  (Ctrl+R to hide)"
        } else {
            "  (Ctrl+R to show)"
        };
        label.push(Span::styled(hint, Style::default().fg(MUTED)));
    }

    let raw = app.auth.field_value(field);
    let shown = if field.is_secret() && !app.auth.password_visible {
        "•".repeat(raw.chars().count())
    } else {
        raw.to_string()
    };
    let shown = truncate_start(&shown, usize::from(width.saturating_sub(6)));

    let mut value = vec![Span::styled("  > ", Style::default().fg(MUTED)), Span::raw(shown)];
    if focused {
        value.push(Span::styled("█", Style::default().fg(ACCENT)));
    }

    let mut lines = vec![Line::from(label), Line::from(value)];
    if let Some(error) = app.auth.field_error(field) {
        lines.push(Line::from(Span::styled(
            format!("    {error}"),
            Style::default().fg(Color::Red),
        )));
    }
    lines
}

fn image_line(app: &AppState, slot: ImageSlot, width: u16) -> Line<'static> {
    let key = match slot {
        ImageSlot::Avatar => "Ctrl+A",
        ImageSlot::Cover => "Ctrl+O",
    };
    let label = Span::styled(
        format!("  {}: ", slot.label()),
        focus_style(app, Focus::Image(slot), Style::default().fg(Color::White)),
    );

    let Some(selection) = app.auth.image(slot) else {
        return Line::from(vec![
            label,
            Span::styled(format!("none ({key} to choose)"), Style::default().fg(MUTED)),
        ]);
    };

    let details = format!(
        "{} · {} · {}",
        selection.file.name,
        format_size(selection.file.size()),
        selection.preview.url()
    );
    let room = usize::from(width).saturating_sub(slot.label().width() + 4);
    Line::from(vec![
        label,
        Span::styled(truncate_to_width(&details, room), Style::default().fg(Color::Green)),
    ])
}

fn submit_line(app: &AppState) -> Line<'static> {
    let (text, style) = match &app.auth.phase {
        Phase::Submitting => {
            let spinner = SPINNER_FRAMES[app.spinner_frame % SPINNER_FRAMES.len()];
            let status = if app.auth.loading_image {
                "Uploading image..."
            } else {
                match app.auth.tab {
                    Tab::SignIn => "Signing in...",
                    Tab::SignUp => "Creating account...",
                }
            };
            (format!("{spinner} {status}"), Style::default().fg(Color::Yellow))
        }
        Phase::Success { redirect } => (
            format!("✓ Redirecting to {redirect}"),
            Style::default().fg(Color::Green),
        ),
        Phase::Idle => {
            let label = match app.auth.tab {
                Tab::SignIn => "Sign In",
                Tab::SignUp => "Create Account",
            };
            let style = if app.auth.can_submit() {
                Style::default().fg(ACCENT).add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(MUTED)
            };
            (format!("[ {label} ]"), focus_style(app, Focus::Submit, style))
        }
    };
    Line::from(vec![Span::raw("  "), Span::styled(text, style)])
}

fn switch_line(app: &AppState) -> Line<'static> {
    let (question, action) = match app.auth.tab {
        Tab::SignIn => ("Don't have an account? ", Tab::SignUp.title()),
        Tab::SignUp => ("Already have an account? ", Tab::SignIn.title()),
    };
    Line::from(vec![
        Span::styled(format!("  {question}"), Style::default().fg(MUTED)),
        Span::styled(
            action,
            focus_style(
                app,
                Focus::SwitchTab,
                Style::default().fg(ACCENT).add_modifier(Modifier::UNDERLINED),
            ),
        ),
    ])
}

fn render_footer(app: &AppState, frame: &mut Frame, area: Rect) {
    let mut hints = vec![("Tab", "next"), ("Enter", "select"), ("F1/F2", "switch")];
    if app.auth.tab == Tab::SignUp {
        hints.push(("Ctrl+A/O", "images"));
    }
    hints.push(("Esc", "quit"));

    let mut spans = Vec::new();
    for (idx, (key, action)) in hints.into_iter().enumerate() {
        if idx > 0 {
            spans.push(Span::styled(" • ", Style::default().fg(MUTED)));
        }
        spans.push(Span::styled(key, Style::default().fg(ACCENT)));
        spans.push(Span::styled(format!(" {action}"), Style::default().fg(MUTED)));
    }
    frame.render_widget(
        Paragraph::new(Line::from(spans)).alignment(Alignment::Center),
        area,
    );
}

// ============================================================================
// Overlays
// ============================================================================

fn render_path_prompt(prompt: &PathPrompt, frame: &mut Frame, area: Rect) {
    let width = 60.min(area.width.saturating_sub(4));
    let height = 7.min(area.height);
    let popup = Rect::new(
        area.x + (area.width - width) / 2,
        area.y + (area.height - height) / 2,
        width,
        height,
    );
    frame.render_widget(Clear, popup);
    frame.render_widget(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(ACCENT))
            .title(format!(" Choose {} ", prompt.slot.label()))
            .title_style(Style::default().fg(ACCENT).add_modifier(Modifier::BOLD)),
        popup,
    );

    let inner = Rect::new(
        popup.x + 2,
        popup.y + 1,
        popup.width.saturating_sub(4),
        popup.height.saturating_sub(2),
    );
    let input = truncate_start(&prompt.buffer, usize::from(inner.width.saturating_sub(3)));
    let lines = vec![
        Line::from(vec![
            Span::styled("> ", Style::default().fg(ACCENT)),
            Span::raw(input),
            Span::styled("█", Style::default().fg(ACCENT)),
        ]),
        Line::from(""),
        Line::from(Span::styled(
            format!("Accepted: {}", prompt.slot.picker_extensions().join(", ")),
            Style::default().fg(MUTED),
        )),
        Line::from(""),
        Line::from(Span::styled(
            "Enter to load, Esc to cancel",
            Style::default().fg(MUTED),
        )),
    ];
    frame.render_widget(Paragraph::new(lines), inner);
}

fn render_toasts(app: &AppState, frame: &mut Frame, area: Rect) {
    let width = TOAST_WIDTH.min(area.width);
    let mut y = area.y;

    for toast in app.auth.toasts.iter().rev() {
        if y + 3 > area.y + area.height {
            break;
        }
        let color = match toast.kind {
            ToastKind::Success => Color::Green,
            ToastKind::Error => Color::Red,
            ToastKind::Info => ACCENT,
        };
        let inner_width = usize::from(width.saturating_sub(2));
        let height = if toast.message.width() > inner_width { 4 } else { 3 };
        let rect = Rect::new(area.x + area.width - width, y, width, height);

        frame.render_widget(Clear, rect);
        frame.render_widget(
            Paragraph::new(toast.message.clone())
                .wrap(Wrap { trim: true })
                .style(Style::default().fg(color))
                .block(
                    Block::default()
                        .borders(Borders::ALL)
                        .border_style(Style::default().fg(color)),
                ),
            rect,
        );
        y += height;
    }
}

// ============================================================================
// Text helpers
// ============================================================================

/// Cuts `text` to `max` columns, ending with an ellipsis when shortened.
fn truncate_to_width(text: &str, max: usize) -> String {
    if text.width() <= max {
        return text.to_string();
    }
    let mut out = String::new();
    let mut used = 0;
    for c in text.chars() {
        let w = c.width().unwrap_or(0);
        if used + w + 1 > max {
            break;
        }
        out.push(c);
        used += w;
    }
    out.push('…');
    out
}

/// Keeps the end of `text` visible, the way an input box scrolls.
fn truncate_start(text: &str, max: usize) -> String {
    if text.width() <= max {
        return text.to_string();
    }
    let mut kept = Vec::new();
    let mut used = 0;
    for c in text.chars().rev() {
        let w = c.width().unwrap_or(0);
        if used + w + 1 > max {
            break;
        }
        kept.push(c);
        used += w;
    }
    kept.push('…');
    kept.into_iter().rev().collect()
}

fn format_size(bytes: u64) -> String {
    const KB: f64 = 1024.0;
    let bytes = bytes as f64;
    if bytes < KB {
        format!("{bytes} B")
    } else if bytes < KB * KB {
        format!("{:.1} KB", bytes / KB)
    } else {
        format!("{:.1} MB", bytes / (KB * KB))
    }
}
