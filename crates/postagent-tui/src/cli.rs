//! Line-mode commands: `--login`, `--register` and `--whoami`.
//!
//! These run the same shell as the TUI and print whatever toasts the flow
//! published instead of drawing them.

use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::{bail, Context, Result};

use postagent_core::api::Registration;
use postagent_core::{AppShell, Config, Credentials, NotificationKind, SessionStore, SubmitOutcome};
use tracing::warn;

fn prompt(label: &str, default: Option<&str>) -> Result<String> {
    match default {
        Some(value) => print!("{} [{}]: ", label, value),
        None => print!("{}: ", label),
    }
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    let input = input.trim();

    match (input.is_empty(), default) {
        (true, Some(value)) => Ok(value.to_string()),
        _ => Ok(input.to_string()),
    }
}

fn prompt_password() -> Result<String> {
    match std::env::var("POSTAGENT_PASSWORD") {
        Ok(password) => Ok(password),
        Err(_) => rpassword::prompt_password("Password: ").context("Failed to read password"),
    }
}

fn default_email(shell: &AppShell) -> Option<String> {
    std::env::var("POSTAGENT_EMAIL")
        .ok()
        .or_else(|| shell.config().last_email.clone())
}

/// Print and clear everything on the notification bus
fn print_toasts(shell: &AppShell) {
    let bus = shell.notifications();
    // Oldest first reads naturally on a terminal
    for toast in bus.active().iter().rev() {
        match toast.kind {
            NotificationKind::Success => println!("{}", toast.text),
            NotificationKind::Error => eprintln!("Error: {}", toast.text),
        }
    }
    bus.dismiss_all();
}

pub async fn login(shell: &AppShell) -> Result<()> {
    println!("\n=== Posting Agent Login ({}) ===\n", shell.api().base_url());

    let default = default_email(shell);
    let email = prompt("Email", default.as_deref())?;
    let password = prompt_password()?;

    println!("\nAuthenticating...");
    sign_in(shell, Credentials::new(email, password), Config::config_path()?).await
}

/// Run the login flow, print its toasts and remember the email on success
async fn sign_in(shell: &AppShell, credentials: Credentials, config_path: PathBuf) -> Result<()> {
    let email = credentials.email.clone();
    let outcome = shell.login_flow().submit(credentials).await;
    print_toasts(shell);

    match outcome {
        SubmitOutcome::Authenticated => {
            remember_email(config_path, &email);
            Ok(())
        }
        SubmitOutcome::Busy => bail!("A login is already in progress"),
        SubmitOutcome::Rejected(_) | SubmitOutcome::ConnectionFailed => bail!("Login failed"),
    }
}

fn remember_email(config_path: PathBuf, email: &str) {
    if let Err(e) = Config::remember_email_at(config_path, email) {
        warn!(error = %e, "Failed to save config");
    }
}

pub async fn register(shell: &AppShell) -> Result<()> {
    println!("\n=== Posting Agent Registration ({}) ===\n", shell.api().base_url());

    let default = default_email(shell);
    let email = prompt("Email", default.as_deref())?;
    let username = prompt("Username", None)?;
    let full_name = prompt("Full name (optional)", None)?;
    let password = prompt_password()?;

    let registration = Registration {
        email,
        username,
        password,
        full_name: Some(full_name).filter(|name| !name.is_empty()),
    };

    println!("\nCreating account...");
    let session = match shell.api().register(&registration).await {
        Ok(session) => session,
        Err(e) => bail!("{}", e),
    };

    shell
        .session_store()
        .set(&session)
        .context("Failed to save session")?;
    remember_email(Config::config_path()?, &registration.email);
    println!("Account created, you are now logged in");
    Ok(())
}

pub async fn whoami(shell: &AppShell) -> Result<()> {
    if shell.session().is_none() {
        bail!("Not logged in. Run `postagent --login` first.");
    }

    match shell.current_user().await {
        Ok(user) => {
            println!("{} <{}>", user.display_name(), user.email);
            println!("username: {}", user.username);
            if let Some(session) = shell.session() {
                println!("session age: {} min", session.age_minutes());
            }
            Ok(())
        }
        Err(e) => {
            if shell.session().is_none() {
                bail!("Session expired, please log in again");
            }
            Err(e).context("Failed to fetch profile")
        }
    }
}
