//! Order status groups.
//!
//! Tenants name their own statuses; the group is the closed category that
//! drives lifecycle side effects.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Coarse category of an order status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusGroup {
    Processing,
    Accepted,
    Shipped,
    Paid,
    Canceled,
    Return,
    Spam,
}

/// Lifecycle timestamp stamped (once) when an order enters a group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleStamp {
    Approved,
    Shipped,
    Canceled,
}

#[derive(Debug, thiserror::Error)]
#[error("unknown status group: {0}")]
pub struct UnknownStatusGroup(pub String);

impl StatusGroup {
    pub const ALL: [StatusGroup; 7] = [
        Self::Processing,
        Self::Accepted,
        Self::Shipped,
        Self::Paid,
        Self::Canceled,
        Self::Return,
        Self::Spam,
    ];

    /// Groups counted as open operator work by the assignment balancer.
    pub const OPEN: [StatusGroup; 2] = [Self::Processing, Self::Accepted];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Processing => "processing",
            Self::Accepted => "accepted",
            Self::Shipped => "shipped",
            Self::Paid => "paid",
            Self::Canceled => "canceled",
            Self::Return => "return",
            Self::Spam => "spam",
        }
    }

    pub fn is_open(&self) -> bool {
        Self::OPEN.contains(self)
    }

    /// Which lifecycle timestamp entering this group stamps, if any.
    pub fn lifecycle_stamp(&self) -> Option<LifecycleStamp> {
        match self {
            Self::Accepted => Some(LifecycleStamp::Approved),
            Self::Shipped => Some(LifecycleStamp::Shipped),
            Self::Canceled | Self::Return | Self::Spam => Some(LifecycleStamp::Canceled),
            Self::Processing | Self::Paid => None,
        }
    }
}

impl fmt::Display for StatusGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StatusGroup {
    type Err = UnknownStatusGroup;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|group| group.as_str() == s)
            .ok_or_else(|| UnknownStatusGroup(s.to_owned()))
    }
}
