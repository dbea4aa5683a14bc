use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};

use postagent_core::{Notification, Page};

use crate::app::{App, AppState};

use super::{pages, styles};

/// Width of a toast box
const TOAST_WIDTH: u16 = 40;

/// Toasts drawn at once; older ones wait their turn
const MAX_VISIBLE_TOASTS: usize = 5;

pub fn render(frame: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Title bar
            Constraint::Length(3), // Page tabs
            Constraint::Min(10),   // Page body
            Constraint::Length(2), // Status bar
        ])
        .split(frame.area());

    render_title_bar(frame, app, chunks[0]);
    render_tabs(frame, app, chunks[1]);
    pages::render(frame, app, chunks[2]);
    render_status_bar(frame, app, chunks[3]);

    render_toasts(frame, app);

    // Render overlays
    if matches!(app.state, AppState::ShowingHelp) {
        render_help_overlay(frame);
    }

    if matches!(app.state, AppState::ConfirmingQuit) {
        render_quit_overlay(frame);
    }
}

fn render_title_bar(frame: &mut Frame, app: &App, area: Rect) {
    let title = "  Posting Agent";
    let right = match app.shell.session() {
        Some(session) => format!("{}  [?] Help", session.principal().unwrap_or("signed in")),
        None => "[?] Help".to_string(),
    };

    let title_line = Line::from(vec![
        Span::styled(title, styles::title_style()),
        Span::raw(" ".repeat(
            (area.width as usize).saturating_sub(title.len() + right.chars().count() + 4),
        )),
        Span::styled(right, styles::muted_style()),
    ]);

    let block = Block::default()
        .borders(Borders::BOTTOM)
        .border_style(styles::muted_style());

    frame.render_widget(Paragraph::new(title_line).block(block), area);
}

fn render_tabs(frame: &mut Frame, app: &App, area: Rect) {
    let current = app.shell.router().current_page();

    let mut spans = vec![Span::raw(" ")];
    for (i, page) in Page::NAV.iter().enumerate() {
        if i > 0 {
            spans.push(Span::styled(" | ", styles::muted_style()));
        }
        let label = format!("[{}] {}", i + 1, page.title());
        spans.push(Span::styled(label, styles::tab_style(current == Some(*page))));
    }

    let block = Block::default()
        .borders(Borders::BOTTOM)
        .border_style(styles::muted_style());

    frame.render_widget(Paragraph::new(Line::from(spans)).block(block), area);
}

fn render_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    let width = area.width as usize;

    if matches!(app.state, AppState::EditingPath) {
        let line = Line::from(vec![
            Span::styled(" Go to: ", styles::prompt_style()),
            Span::styled(format!("{}▌", app.path_input), styles::list_item_style()),
        ]);
        frame.render_widget(Paragraph::new(line).style(styles::status_bar_style()), area);
        return;
    }

    let left_text = if app.is_submitting() {
        " Signing in... ".to_string()
    } else if let Some(ref msg) = app.status_message {
        format!(" {} ", msg)
    } else {
        format!(" {} ", app.location())
    };

    let shortcuts = if app.is_on_login() {
        "[Tab] field | [Enter] sign in"
    } else {
        "[:] go to | [b]ack | [q]uit"
    };
    let right_text = format!(" {} ", shortcuts);

    let padding_len = width
        .saturating_sub(left_text.chars().count())
        .saturating_sub(right_text.len());
    let status_line = Line::from(vec![
        Span::styled(left_text, styles::muted_style()),
        Span::raw(" ".repeat(padding_len)),
        Span::styled(right_text, styles::muted_style()),
    ]);
    frame.render_widget(Paragraph::new(status_line).style(styles::status_bar_style()), area);
}

/// Lines a toast needs for its text at `TOAST_WIDTH`
fn toast_height(toast: &Notification) -> u16 {
    let inner = (TOAST_WIDTH - 4) as usize;
    let lines = toast.text.chars().count().div_ceil(inner).max(1);
    lines as u16 + 2
}

/// Stack active toasts in the top-right corner, newest on top
fn render_toasts(frame: &mut Frame, app: &App) {
    let area = frame.area();
    if area.width < TOAST_WIDTH + 2 {
        return;
    }

    let x = area.x + area.width - TOAST_WIDTH - 1;
    let mut y = area.y + 1;

    for toast in app.shell.notifications().active().iter().take(MAX_VISIBLE_TOASTS) {
        let height = toast_height(toast);
        if y + height > area.y + area.height {
            break;
        }
        let rect = Rect::new(x, y, TOAST_WIDTH, height);
        frame.render_widget(Clear, rect);

        let style = styles::toast_style(toast.kind);
        let block = Block::default().borders(Borders::ALL).border_style(style);
        let paragraph = Paragraph::new(Span::styled(toast.text.clone(), style))
            .block(block)
            .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, rect);

        y += height;
    }
}

fn help_line(key: &'static str, desc: &'static str) -> Line<'static> {
    Line::from(vec![
        Span::styled(format!("  {:<10}", key), styles::help_key_style()),
        Span::styled(desc, styles::help_desc_style()),
    ])
}

fn render_help_overlay(frame: &mut Frame) {
    let area = centered_rect_fixed(52, 22, frame.area());
    frame.render_widget(Clear, area);

    let version = env!("CARGO_PKG_VERSION");

    let help_text = vec![
        Line::from(Span::styled("  Posting Agent", styles::title_style())),
        Line::from(Span::styled(format!("  version {}", version), styles::muted_style())),
        Line::from(""),
        Line::from(Span::styled(" Navigation", styles::highlight_style())),
        help_line("1-5", "Jump to page"),
        help_line("←/→ Tab", "Previous/next page"),
        help_line(":", "Go to a path"),
        help_line("b", "Go back"),
        Line::from(""),
        Line::from(Span::styled(" Login", styles::highlight_style())),
        help_line("Tab ↑/↓", "Move between fields"),
        help_line("Enter", "Next field / sign in"),
        help_line(": ? q", "Shortcuts when the button is focused"),
        Line::from(""),
        Line::from(Span::styled(" Actions", styles::highlight_style())),
        help_line("r", "Reload profile (dashboard)"),
        help_line("x", "Dismiss notifications"),
        help_line("q", "Quit"),
        Line::from(""),
        Line::from(vec![
            Span::styled("       Press ", styles::muted_style()),
            Span::styled("?", styles::help_key_style()),
            Span::styled(" or ", styles::muted_style()),
            Span::styled("Esc", styles::help_key_style()),
            Span::styled(" to close", styles::muted_style()),
        ]),
    ];

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(styles::border_style(true))
        .style(Style::default());

    frame.render_widget(Paragraph::new(help_text).block(block), area);
}

/// Create a centered rectangle with fixed dimensions
pub fn centered_rect_fixed(width: u16, height: u16, r: Rect) -> Rect {
    let x = r.x + (r.width.saturating_sub(width)) / 2;
    let y = r.y + (r.height.saturating_sub(height)) / 2;
    Rect::new(x, y, width.min(r.width), height.min(r.height))
}

fn render_quit_overlay(frame: &mut Frame) {
    let area = centered_rect_fixed(46, 7, frame.area());
    frame.render_widget(Clear, area);

    let lines = vec![
        Line::from(""),
        Line::from(Span::styled(
            "   Are you sure you want to quit?",
            styles::highlight_style(),
        )),
        Line::from(""),
        Line::from(vec![
            Span::styled("   Press ", styles::muted_style()),
            Span::styled("[Y]", styles::help_key_style()),
            Span::styled(" to quit, ", styles::muted_style()),
            Span::styled("[N]", styles::help_key_style()),
            Span::styled(" to cancel", styles::muted_style()),
        ]),
    ];

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(styles::border_style(true))
        .style(Style::default());

    frame.render_widget(Paragraph::new(lines).block(block), area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use postagent_core::NotificationKind;

    fn toast(text: &str) -> Notification {
        Notification {
            id: 1,
            kind: NotificationKind::Error,
            text: text.to_string(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_toast_height_grows_with_text() {
        assert_eq!(toast_height(&toast("Connection error")), 3);
        assert_eq!(toast_height(&toast(&"x".repeat(40))), 4);
        assert_eq!(toast_height(&toast("")), 3);
    }

    #[test]
    fn test_centered_rect_fits_small_screens() {
        let r = centered_rect_fixed(52, 22, Rect::new(0, 0, 40, 10));
        assert_eq!(r.width, 40);
        assert_eq!(r.height, 10);
        assert_eq!(r.x, 0);
    }
}
