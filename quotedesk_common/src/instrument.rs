//! Instrument identifiers and helpers shared by the session core and the CLI.
//!
//! An `InstrumentId` is an opaque ticker token normalized to upper case. It is the
//! only key used for subscription and quote lookup, so every path that produces one
//! (user input, watchlist files, wire messages) goes through the same normalization.
use std::fmt;
use std::io::BufRead;
use std::str::FromStr;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

use crate::error::DeskError;

/// Case-normalized instrument token (e.g. `PETR4`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct InstrumentId(String);

impl InstrumentId {
    /// Trims and uppercases `raw`. Blank input is rejected.
    pub fn new(raw: &str) -> Result<Self, DeskError> {
        let normalized = raw.trim().to_uppercase();
        if normalized.is_empty() {
            return Err(DeskError::InvalidInstrument(String::from(
                "instrument token must not be empty",
            )));
        }
        Ok(InstrumentId(normalized))
    }

    /// The normalized token.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for InstrumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for InstrumentId {
    type Err = DeskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        InstrumentId::new(s)
    }
}

impl TryFrom<String> for InstrumentId {
    type Error = DeskError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        InstrumentId::new(&value)
    }
}

impl From<InstrumentId> for String {
    fn from(id: InstrumentId) -> Self {
        id.0
    }
}

/// Trait providing watchlist parsing for instruments.
pub trait InstrumentParser {
    /// Parses instruments from a buffered reader.
    ///
    /// Tokens may be separated by commas, whitespace or new lines. Duplicates are
    /// dropped, keeping the first occurrence.
    fn parse_from_file<R: BufRead>(reader: R) -> Result<Vec<InstrumentId>, DeskError>;
}

impl InstrumentParser for InstrumentId {
    fn parse_from_file<R: BufRead>(reader: R) -> Result<Vec<Self>, DeskError> {
        let mut instruments: Vec<InstrumentId> = Vec::new();

        for line_result in reader.lines() {
            let line = line_result.map_err(DeskError::Io)?;
            for token in line.split(|c: char| c == ',' || c.is_whitespace()) {
                if token.is_empty() {
                    continue;
                }
                let id = InstrumentId::new(token)?;
                if !instruments.contains(&id) {
                    instruments.push(id);
                }
            }
        }
        Ok(instruments)
    }
}

/// Quick-subscribe groups of frequently watched contracts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Display, EnumString)]
#[clap(rename_all = "lower")]
#[strum(ascii_case_insensitive, serialize_all = "UPPERCASE")]
pub enum Preset {
    /// Mini index futures.
    Win,
    /// Mini dollar futures.
    Wdo,
    /// A mixed set of the most traded contracts.
    All,
}

impl Preset {
    /// Instruments covered by this preset.
    pub fn instruments(&self) -> Vec<InstrumentId> {
        let tokens: &[&str] = match self {
            Preset::Win => &["WINV25", "WINH25", "WINJ25"],
            Preset::Wdo => &["WDOV25", "WDOH25", "WDOJ25"],
            Preset::All => &["WINV25", "WDOV25", "PETRV25", "VALEV25"],
        };
        tokens
            .iter()
            .map(|token| InstrumentId(String::from(*token)))
            .collect()
    }
}
