//! Keyboard input handling for the TUI.
//!
//! This module handles all keyboard events and translates them into
//! application state changes.

use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent};

use postagent_core::routes::View;
use postagent_core::Page;

use crate::app::{
    can_add_email_char, can_add_password_char, can_add_path_char, App, AppState, LoginFocus,
};

/// Handle keyboard input. Returns true if the app should quit.
pub fn handle_input(app: &mut App, key: KeyEvent) -> Result<bool> {
    match app.state {
        AppState::ShowingHelp => {
            if matches!(key.code, KeyCode::Esc | KeyCode::Char('?') | KeyCode::Char('q')) {
                app.state = AppState::Normal;
            }
            Ok(false)
        }
        AppState::ConfirmingQuit => {
            match key.code {
                KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Enter => {
                    app.state = AppState::Quitting;
                    return Ok(true);
                }
                KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
                    app.state = AppState::Normal;
                }
                _ => {}
            }
            Ok(false)
        }
        AppState::EditingPath => {
            handle_path_input(app, key);
            Ok(false)
        }
        AppState::Quitting => Ok(true),
        AppState::Normal if app.is_on_login() => {
            handle_login_input(app, key);
            Ok(false)
        }
        AppState::Normal => {
            handle_page_input(app, key);
            Ok(false)
        }
    }
}

fn handle_page_input(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('q') | KeyCode::Esc => {
            app.state = AppState::ConfirmingQuit;
        }
        KeyCode::Char('?') => {
            app.state = AppState::ShowingHelp;
        }
        KeyCode::Char(':') => app.start_path_input(),
        KeyCode::Tab | KeyCode::Right | KeyCode::Char('l') => app.next_page(),
        KeyCode::BackTab | KeyCode::Left | KeyCode::Char('h') => app.prev_page(),
        KeyCode::Char('b') | KeyCode::Backspace => app.go_back(),
        KeyCode::Char('x') => app.shell.notifications().dismiss_all(),
        KeyCode::Char('r') if app.view() == View::Page(Page::Dashboard) => {
            app.reload_current_user();
        }
        KeyCode::Char(c) => {
            if let Some(page) = page_for_digit(c) {
                app.navigate(page.path());
            }
        }
        _ => {}
    }
}

/// `1`..`5` jump straight to a page in tab order
fn page_for_digit(c: char) -> Option<Page> {
    let index = c.to_digit(10)?.checked_sub(1)? as usize;
    Page::NAV.get(index).copied()
}

fn handle_login_input(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => {
            app.state = AppState::ConfirmingQuit;
        }
        KeyCode::Tab | KeyCode::Down => {
            app.login_focus = app.login_focus.next();
        }
        KeyCode::BackTab | KeyCode::Up => {
            app.login_focus = app.login_focus.prev();
        }
        KeyCode::Enter => match app.login_focus {
            LoginFocus::Email => app.login_focus = LoginFocus::Password,
            LoginFocus::Password | LoginFocus::Button => app.submit_login(),
        },
        KeyCode::Backspace => match app.login_focus {
            LoginFocus::Email => {
                app.login_email.pop();
            }
            LoginFocus::Password => {
                app.login_password.pop();
            }
            LoginFocus::Button => {}
        },
        KeyCode::Char(c) => match app.login_focus {
            LoginFocus::Email => {
                if can_add_email_char(app.login_email.len(), c) {
                    app.login_email.push(c);
                }
            }
            LoginFocus::Password => {
                if can_add_password_char(app.login_password.len(), c) {
                    app.login_password.push(c);
                }
            }
            // Fields swallow every character, so shortcuts live on the button
            LoginFocus::Button => match c {
                ':' => app.start_path_input(),
                '?' => app.state = AppState::ShowingHelp,
                'q' => app.state = AppState::ConfirmingQuit,
                _ => {}
            },
        },
        _ => {}
    }
}

fn handle_path_input(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => {
            app.path_input.clear();
            app.state = AppState::Normal;
        }
        KeyCode::Enter => app.submit_path_input(),
        KeyCode::Backspace => {
            app.path_input.pop();
        }
        KeyCode::Char(c) => {
            if can_add_path_char(app.path_input.len(), c) {
                app.path_input.push(c);
            }
        }
        _ => {}
    }
}
