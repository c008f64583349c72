//! Unibox - A terminal front end for the unified inbox
//!
//! This is the main entry point for the Unibox application. It drives an
//! inbox runtime from commands read on stdin.

use std::sync::Arc;

use anyhow::{Context, Result};
use log::{error, info, warn};
use mail::{
    AccountScope, CredentialProvider, HttpMailApi, InboxHandle, InboxRuntime, InboxSettings,
    MailApi, Notification, Notifier, SessionFile, StaticCredentials, ViewState,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::watch;

mod commands;
mod view;

use commands::Command;

/// Prints notifications next to the command output
struct TerminalNotifier {
    session_path: Option<String>,
}

impl Notifier for TerminalNotifier {
    fn notify(&self, notification: &Notification) {
        match notification {
            Notification::Info(msg) => eprintln!("[info] {}", msg),
            Notification::Error(msg) => eprintln!("[error] {}", msg),
        }
    }

    fn session_expired(&self) {
        match &self.session_path {
            Some(path) => eprintln!(
                "[error] Session expired. Sign in again and update {} or set UNIBOX_TOKEN.",
                path
            ),
            None => eprintln!("[error] Session expired. Set UNIBOX_TOKEN to a valid token."),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    // Bootstrap config directory
    if let Err(e) = config::init() {
        error!("Failed to initialize config directory: {}", e);
    }

    let settings = InboxSettings::load().context("Failed to load inbox settings")?;
    match InboxSettings::default_settings_path() {
        Some(path) if path.exists() => info!("Loaded settings from {}", path.display()),
        _ => info!("No settings file, using defaults"),
    }
    let (credentials, session_path) = load_credentials();
    let api: Arc<dyn MailApi> = Arc::new(HttpMailApi::new(settings.api_url.clone(), credentials));
    info!("Using mail backend at {}", settings.api_url);

    let notifier = Arc::new(TerminalNotifier { session_path });
    let (runtime, handle) =
        InboxRuntime::new(Arc::clone(&api), notifier, settings, AccountScope::All);
    let inbox = runtime.spawn();
    let printer = tokio::spawn(print_updates(handle.subscribe()));

    println!("{}", commands::HELP);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let command = match commands::parse(&line) {
            Ok(command) => command,
            Err(e) => {
                eprintln!("{:#}", e);
                continue;
            }
        };
        if command == Command::Quit {
            break;
        }
        if let Err(e) = run_command(command, &handle, &api).await {
            eprintln!("{:#}", e);
        }
    }

    // The runtime may already be gone if stdin outlived it
    let _ = handle.unmount();
    inbox.await.context("Inbox runtime panicked")?;
    printer.abort();
    info!("Unibox stopped");
    Ok(())
}

/// Token from `UNIBOX_TOKEN`, else the session file in the config directory
fn load_credentials() -> (Arc<dyn CredentialProvider>, Option<String>) {
    match std::env::var("UNIBOX_TOKEN") {
        Ok(token) if !token.trim().is_empty() => {
            return (Arc::new(StaticCredentials::new(token.trim())), None);
        }
        _ => {}
    }

    match SessionFile::open_default() {
        Ok(session) => {
            let path = session.path().display().to_string();
            (Arc::new(session), Some(path))
        }
        Err(e) => {
            warn!("No session available: {}", e);
            (Arc::new(StaticCredentials::signed_out()), None)
        }
    }
}

async fn run_command(command: Command, handle: &InboxHandle, api: &Arc<dyn MailApi>) -> Result<()> {
    match command {
        Command::Accounts => {
            let api = Arc::clone(api);
            let accounts = tokio::task::spawn_blocking(move || api.list_accounts())
                .await
                .context("Account lookup panicked")?
                .context("Failed to list accounts")?;
            print!("{}", view::render_accounts(&accounts));
        }
        Command::Scope(scope) => handle.switch_scope(scope)?,
        Command::Page(page) => handle.change_page(page)?,
        Command::Search(query) => handle.set_search_query(query)?,
        Command::Refresh => handle.refresh()?,
        Command::Read(id) => {
            match handle.snapshot().find(&id) {
                Some(message) => print!("{}", view::render_message(message)),
                None => eprintln!("No message {} in the current view", id.as_str()),
            }
            handle.mark_read(id)?;
        }
        Command::Dismiss(id) => handle.dismiss(id)?,
        Command::Delete(ids) => handle.delete(ids)?,
        Command::ClearError => handle.dismiss_error()?,
        Command::Show => print!("{}", view::render_state(&handle.snapshot())),
        Command::Help => println!("{}", commands::HELP),
        Command::Quit => {}
    }
    Ok(())
}

/// Print the view whenever a settled state is published
async fn print_updates(mut updates: watch::Receiver<ViewState>) {
    while updates.changed().await.is_ok() {
        let state = updates.borrow_and_update().clone();
        if !state.is_loading {
            print!("{}", view::render_state(&state));
        }
    }
}
