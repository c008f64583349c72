//! Parsing of the line-oriented command set

use anyhow::{Context, Result, bail};
use mail::{AccountScope, MessageId};

pub const HELP: &str = "\
Commands:
  accounts            list connected accounts
  scope <all|id>      show all accounts or a single one
  page <n>            go to page n
  search [text]       search loaded mail; no text clears the search
  refresh             reload the current view
  read <id>           mark a message read and show it
  dismiss <id>        hide a message from the list
  delete <id>...      delete messages
  clear               dismiss the current error
  show                print the current view
  quit                exit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Accounts,
    Scope(AccountScope),
    Page(u32),
    Search(String),
    Refresh,
    Read(MessageId),
    Dismiss(MessageId),
    Delete(Vec<MessageId>),
    ClearError,
    Show,
    Help,
    Quit,
}

pub fn parse(line: &str) -> Result<Command> {
    let line = line.trim();
    let (name, rest) = match line.split_once(char::is_whitespace) {
        Some((name, rest)) => (name, rest.trim()),
        None => (line, ""),
    };

    let command = match name {
        "accounts" => Command::Accounts,
        "scope" => Command::Scope(rest.parse().context("Usage: scope <all|account id>")?),
        "page" => Command::Page(rest.parse().context("Usage: page <number>")?),
        // Raw text, the coordinator decides what is searchable
        "search" => Command::Search(rest.to_string()),
        "refresh" => Command::Refresh,
        "read" => Command::Read(single_id(rest, "read")?),
        "dismiss" => Command::Dismiss(single_id(rest, "dismiss")?),
        "delete" => {
            let ids: Vec<MessageId> = rest.split_whitespace().map(MessageId::from).collect();
            if ids.is_empty() {
                bail!("Usage: delete <id>...");
            }
            Command::Delete(ids)
        }
        "clear" => Command::ClearError,
        "show" => Command::Show,
        "help" | "?" => Command::Help,
        "quit" | "exit" | "q" => Command::Quit,
        other => bail!("Unknown command {:?}, type help", other),
    };
    Ok(command)
}

fn single_id(rest: &str, command: &str) -> Result<MessageId> {
    match rest.split_whitespace().collect::<Vec<_>>().as_slice() {
        [id] => Ok(MessageId::from(*id)),
        _ => bail!("Usage: {} <message id>", command),
    }
}
