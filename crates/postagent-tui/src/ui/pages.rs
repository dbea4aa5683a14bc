//! Page bodies.
//!
//! Each routed page gets the main content area. The login form is drawn
//! here too since `/login` is an ordinary route.

use ratatui::{
    layout::{Alignment, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};

use postagent_core::routes::View;
use postagent_core::Page;

use crate::app::{App, LoginFocus};

use super::render::centered_rect_fixed;
use super::styles;

/// Width of the visible part of a login field
const FIELD_WIDTH: usize = 24;

pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    match app.view() {
        View::Page(Page::Login) => render_login(frame, app, area),
        View::Page(Page::Dashboard) => render_dashboard(frame, app, area),
        View::Page(page) => render_placeholder(frame, page, area),
        View::NotFound => render_not_found(frame, app, area),
    }
}

fn page_block(title: &str) -> Block<'_> {
    Block::default()
        .title(Span::styled(format!(" {} ", title), styles::title_style()))
        .borders(Borders::ALL)
        .border_style(styles::border_style(false))
}

/// Keep the tail of `text` that fits in the field
fn field_tail(text: &str) -> String {
    let count = text.chars().count();
    text.chars().skip(count.saturating_sub(FIELD_WIDTH)).collect()
}

fn render_login(frame: &mut Frame, app: &App, area: Rect) {
    let dialog = centered_rect_fixed(48, 12, area);
    frame.render_widget(Clear, dialog);

    let submitting = app.is_submitting();
    let mut lines = vec![
        Line::from(Span::styled("  Sign in to Posting Agent", styles::title_style())),
        Line::from(Span::styled(
            format!("  {}", app.shell.api().base_url()),
            styles::muted_style(),
        )),
        Line::from(""),
    ];

    let email_focused = app.login_focus == LoginFocus::Email;
    let cursor = if email_focused { "▌" } else { "" };
    lines.push(Line::from(vec![
        Span::styled("  Email:    [", styles::muted_style()),
        Span::styled(
            format!("{:<width$}", format!("{}{}", field_tail(&app.login_email), cursor), width = FIELD_WIDTH),
            field_style(email_focused),
        ),
        Span::styled("]", styles::muted_style()),
    ]));

    let password_focused = app.login_focus == LoginFocus::Password;
    let cursor = if password_focused { "▌" } else { "" };
    let masked = "*".repeat(app.login_password.chars().count().min(FIELD_WIDTH - 1));
    lines.push(Line::from(vec![
        Span::styled("  Password: [", styles::muted_style()),
        Span::styled(
            format!("{:<width$}", format!("{}{}", masked, cursor), width = FIELD_WIDTH),
            field_style(password_focused),
        ),
        Span::styled("]", styles::muted_style()),
    ]));

    lines.push(Line::from(""));
    let button_focused = app.login_focus == LoginFocus::Button;
    let label = match (submitting, button_focused) {
        (true, _) => " Signing in... ",
        (false, true) => " ▶ Sign in ◀  ",
        (false, false) => "   Sign in    ",
    };
    lines.push(Line::from(vec![
        Span::raw("              ["),
        Span::styled(label, field_style(button_focused)),
        Span::raw("]"),
    ]));

    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        "  Tab: next field   Enter: submit   Esc: quit",
        styles::muted_style(),
    )));

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(styles::border_style(true));
    frame.render_widget(Paragraph::new(lines).block(block), dialog);
}

fn field_style(focused: bool) -> ratatui::style::Style {
    if focused {
        styles::selected_style()
    } else {
        styles::list_item_style()
    }
}

fn render_dashboard(frame: &mut Frame, app: &App, area: Rect) {
    let mut lines = vec![Line::from("")];

    match (&app.current_user, app.shell.session()) {
        (Some(user), _) => {
            lines.push(Line::from(vec![
                Span::styled("  Welcome back, ", styles::muted_style()),
                Span::styled(user.display_name().to_string(), styles::highlight_style()),
            ]));
            lines.push(Line::from(""));
            lines.push(Line::from(vec![
                Span::styled("  Email      ", styles::muted_style()),
                Span::styled(user.email.clone(), styles::list_item_style()),
            ]));
            lines.push(Line::from(vec![
                Span::styled("  Username   ", styles::muted_style()),
                Span::styled(user.username.clone(), styles::list_item_style()),
            ]));
            let fetched = app
                .shell
                .current_user_key()
                .and_then(|key| app.shell.cache().age_display(&key));
            if let Some(age) = fetched {
                lines.push(Line::from(vec![
                    Span::styled("  Profile    ", styles::muted_style()),
                    Span::styled(format!("fetched {}", age), styles::muted_style()),
                ]));
            }
        }
        (None, Some(session)) => {
            lines.push(Line::from(Span::styled(
                format!("  Signed in {} min ago, loading profile...", session.age_minutes()),
                styles::muted_style(),
            )));
        }
        (None, None) => {
            lines.push(Line::from(Span::styled(
                "  Not signed in. Press : and go to /login",
                styles::muted_style(),
            )));
        }
    }

    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        "  [r] reload profile",
        styles::muted_style(),
    )));

    frame.render_widget(Paragraph::new(lines).block(page_block("Dashboard")), area);
}

fn page_summary(page: Page) -> &'static str {
    match page {
        Page::Posts => "Drafts, generated posts and their publishing status.",
        Page::Schedules => "Recurring posting schedules per account.",
        Page::Knowledge => "Documents the agent draws on when writing posts.",
        Page::Accounts => "Connected social media accounts.",
        Page::Login | Page::Dashboard => "",
    }
}

fn render_placeholder(frame: &mut Frame, page: Page, area: Rect) {
    let lines = vec![
        Line::from(""),
        Line::from(Span::styled(format!("  {}", page_summary(page)), styles::list_item_style())),
        Line::from(""),
        Line::from(Span::styled("  Nothing to show yet.", styles::muted_style())),
    ];
    let paragraph = Paragraph::new(lines)
        .block(page_block(page.title()))
        .wrap(Wrap { trim: false });
    frame.render_widget(paragraph, area);
}

fn render_not_found(frame: &mut Frame, app: &App, area: Rect) {
    let lines = vec![
        Line::from(""),
        Line::from(Span::styled("Page not found", styles::error_style())),
        Line::from(""),
        Line::from(Span::styled(
            format!("Nothing lives at {}", app.location()),
            styles::muted_style(),
        )),
        Line::from(Span::styled("Press b to go back", styles::muted_style())),
    ];
    let paragraph = Paragraph::new(lines)
        .alignment(Alignment::Center)
        .block(page_block("404"));
    frame.render_widget(paragraph, area);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_tail_keeps_end_of_long_input() {
        assert_eq!(field_tail("a@b.com"), "a@b.com");
        let long = "x".repeat(30) + "@example.com";
        let tail = field_tail(&long);
        assert_eq!(tail.chars().count(), FIELD_WIDTH);
        assert!(tail.ends_with("@example.com"));
    }
}
