//! Plain-text rendering of the inbox view

use std::fmt::Write;

use chrono::Local;
use mail::{Account, MessageSummary, Phase, ViewMode, ViewState};

const SUBJECT_WIDTH: usize = 48;
const SENDER_WIDTH: usize = 24;

pub fn render_state(state: &ViewState) -> String {
    let mut out = String::new();

    let header = match state.mode {
        ViewMode::Paginated => format!(
            "Inbox [{}] page {}/{} ({} messages, {} unread on page)",
            state.scope,
            state.current_page,
            state.total_pages,
            state.total_count,
            state.unread_count()
        ),
        ViewMode::Search => format!(
            "Search {:?} in [{}]: {} matches",
            state.search_input.trim(),
            state.scope,
            state.total_count
        ),
    };
    let _ = writeln!(out, "{}", header);

    if let Some(error) = &state.last_error {
        let _ = writeln!(out, "  ! {}", error);
    }

    match state.phase {
        Phase::Idle => {}
        Phase::Loading if state.items.is_empty() => {
            let _ = writeln!(out, "  loading...");
        }
        _ if state.is_empty_result() => {
            let _ = writeln!(out, "  (no messages)");
        }
        _ => {}
    }

    for message in &state.items {
        let _ = writeln!(out, "{}", render_row(message));
    }
    out
}

pub fn render_row(message: &MessageSummary) -> String {
    let marker = match (message.read, message.starred) {
        (false, true) => "*!",
        (false, false) => "* ",
        (true, true) => " !",
        (true, false) => "  ",
    };
    let date = message
        .date
        .map(|d| d.with_timezone(&Local).format("%b %d %H:%M").to_string())
        .unwrap_or_else(|| "-".to_string());

    format!(
        "{} {:<12} {:<12} {:<sw$} {}",
        marker,
        message.id.as_str(),
        date,
        truncate(&message.sender, SENDER_WIDTH),
        truncate(&message.subject, SUBJECT_WIDTH),
        sw = SENDER_WIDTH,
    )
}

pub fn render_message(message: &MessageSummary) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "From:    {}", message.sender);
    let _ = writeln!(out, "Subject: {}", message.subject);
    if let Some(date) = message.date {
        let _ = writeln!(out, "Date:    {}", date.with_timezone(&Local).format("%Y-%m-%d %H:%M"));
    }
    let _ = writeln!(out);
    let _ = writeln!(out, "{}", message.preview);
    out
}

pub fn render_accounts(accounts: &[Account]) -> String {
    if accounts.is_empty() {
        return "No accounts connected\n".to_string();
    }
    let mut out = String::new();
    for account in accounts {
        let _ = writeln!(
            out,
            "{:>6}  {:<32} {:<8} {} unread",
            account.id.to_string(),
            account.email,
            String::from(account.kind.clone()),
            account.unread_count
        );
    }
    out
}

fn truncate(s: &str, width: usize) -> String {
    if s.chars().count() <= width {
        return s.to_string();
    }
    let mut cut: String = s.chars().take(width.saturating_sub(1)).collect();
    cut.push('…');
    cut
}
