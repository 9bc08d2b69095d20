//! Call-center outcome recorded on an order after each call attempt.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallResult {
    NoAnswer,
    Busy,
    Answered,
    Rejected,
    InvalidNumber,
}

impl CallResult {
    /// Results that leave the customer unreached and eligible for a follow-up nudge.
    pub const UNREACHED: [CallResult; 2] = [Self::NoAnswer, Self::Busy];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NoAnswer => "no_answer",
            Self::Busy => "busy",
            Self::Answered => "answered",
            Self::Rejected => "rejected",
            Self::InvalidNumber => "invalid_number",
        }
    }
}

impl FromStr for CallResult {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "no_answer" => Ok(Self::NoAnswer),
            "busy" => Ok(Self::Busy),
            "answered" => Ok(Self::Answered),
            "rejected" => Ok(Self::Rejected),
            "invalid_number" => Ok(Self::InvalidNumber),
            _ => Err(()),
        }
    }
}
