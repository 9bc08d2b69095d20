//! Newtype wrappers for domain identifiers.
//!
//! All primary keys are database-assigned integers; the wrappers keep a rule id
//! from being passed where an order id is expected.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

macro_rules! integer_id {
    ($(#[$meta:meta])* $name:ident($inner:ty)) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub $inner);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }

        impl FromStr for $name {
            type Err = std::num::ParseIntError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok(Self(s.parse()?))
            }
        }

        impl From<$inner> for $name {
            fn from(id: $inner) -> Self {
                Self(id)
            }
        }
    };
}

integer_id!(
    /// Identifies a tenant (project).
    ProjectId(i32)
);
integer_id!(
    /// Identifies an order (lead).
    OrderId(i32)
);
integer_id!(
    /// Identifies a tenant-scoped order status.
    StatusId(i32)
);
integer_id!(
    /// Identifies a user account; operators are users with a project membership.
    UserId(i32)
);
integer_id!(
    /// Identifies an automation rule.
    RuleId(i32)
);
integer_id!(
    /// Identifies one automation execution row.
    ExecutionId(i64)
);
integer_id!(
    /// Identifies an SMS template.
    TemplateId(i32)
);
