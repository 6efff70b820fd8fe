//! Interactive commands read from stdin.
//!
//! One command per line, verb first:
//!
//! ```text
//! add PETR4          subscribe
//! remove PETR4       unsubscribe
//! preset win         subscribe a preset group
//! buy PETR4 100      market buy
//! sell PETR4 100     market sell
//! stats              header statistics
//! quotes             current quote table
//! reconnect          reopen after giving up
//! quit               leave
//! ```
use std::str::FromStr;

use quotedesk_common::instrument::Preset;
use quotedesk_common::order::Side;
use thiserror::Error;

/// Action requested by the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserCommand {
    /// Subscribe to the raw instrument token.
    Add(String),
    /// Unsubscribe from the raw instrument token.
    Remove(String),
    /// Subscribe every instrument of a preset.
    Preset(Preset),
    /// Place a market order; quantity is validated later.
    Order {
        /// Raw instrument token.
        ticker: String,
        /// Direction.
        side: Side,
        /// Raw quantity input.
        quantity: String,
    },
    /// Print header statistics.
    Stats,
    /// Print the quote table.
    Quotes,
    /// Explicitly reopen the session.
    Reconnect,
    /// Stop the client.
    Quit,
}

/// Why a command line could not be understood.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum CommandError {
    /// Blank line.
    #[error("empty command")]
    Empty,
    /// First word is not a known verb.
    #[error("unknown command '{0}'")]
    UnknownVerb(String),
    /// A required argument is absent.
    #[error("'{verb}' needs {what}")]
    MissingArgument {
        /// Verb being parsed.
        verb: String,
        /// Description of the missing argument.
        what: &'static str,
    },
    /// Preset name not recognized.
    #[error("unknown preset '{0}' (expected win, wdo or all)")]
    UnknownPreset(String),
}

impl FromStr for UserCommand {
    type Err = CommandError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut words = line.split_whitespace();
        let verb = words.next().ok_or(CommandError::Empty)?.to_lowercase();
        let mut arg = |what: &'static str| {
            words.next().map(str::to_string).ok_or_else(|| {
                CommandError::MissingArgument {
                    verb: verb.clone(),
                    what,
                }
            })
        };

        let command = match verb.as_str() {
            "add" => UserCommand::Add(arg("a ticker")?),
            "remove" | "rm" => UserCommand::Remove(arg("a ticker")?),
            "preset" => {
                let name = arg("a preset name")?;
                let preset = name
                    .parse::<Preset>()
                    .map_err(|_| CommandError::UnknownPreset(name))?;
                UserCommand::Preset(preset)
            }
            "buy" | "sell" => {
                let side = if verb == "buy" { Side::Buy } else { Side::Sell };
                let ticker = arg("a ticker")?;
                // A missing quantity is left for order validation to report.
                let quantity = words.next().unwrap_or_default().to_string();
                UserCommand::Order {
                    ticker,
                    side,
                    quantity,
                }
            }
            "stats" => UserCommand::Stats,
            "quotes" => UserCommand::Quotes,
            "reconnect" => UserCommand::Reconnect,
            "quit" | "exit" => UserCommand::Quit,
            _ => return Err(CommandError::UnknownVerb(verb.clone())),
        };
        Ok(command)
    }
}
