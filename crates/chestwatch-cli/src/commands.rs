use chestwatch_core::{Address, WatchError};
use chestwatch_feed::UserAction;

/// One line typed into `chestwatch watch`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleCommand {
    Refresh,
    /// A stake, claim or swap just completed on chain.
    Completed(UserAction),
    Account(Address),
    Disconnect,
    Quit,
}

#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error("unknown command `{0}` (try: refresh, stake, claim, swap, account <0x…>, disconnect, quit)")]
    Unknown(String),

    #[error("`account` needs an address")]
    MissingAddress,

    #[error(transparent)]
    Address(#[from] WatchError),
}

/// `Ok(None)` for a blank line.
pub fn parse_command(line: &str) -> Result<Option<ConsoleCommand>, CommandError> {
    let mut words = line.split_whitespace();
    let Some(verb) = words.next() else {
        return Ok(None);
    };
    let command = match verb.to_ascii_lowercase().as_str() {
        "refresh" | "r" => ConsoleCommand::Refresh,
        "stake" => ConsoleCommand::Completed(UserAction::Stake),
        "claim" => ConsoleCommand::Completed(UserAction::Claim),
        "swap" => ConsoleCommand::Completed(UserAction::Swap),
        "account" => {
            let addr = words.next().ok_or(CommandError::MissingAddress)?;
            ConsoleCommand::Account(Address::from_hex(addr)?)
        }
        "disconnect" => ConsoleCommand::Disconnect,
        "quit" | "exit" | "q" => ConsoleCommand::Quit,
        other => return Err(CommandError::Unknown(other.to_string())),
    };
    Ok(Some(command))
}
