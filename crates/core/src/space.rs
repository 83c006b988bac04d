use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Promotion tier a resource currently belongs to.
///
/// Spaces form a linear order `draft < test < standard`. Content is edited in
/// `draft` and promoted one step at a time; `standard` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Space {
    Draft,
    Test,
    Standard,
}

impl Space {
    /// Every space, in promotion order.
    pub const ALL: [Space; 3] = [Space::Draft, Space::Test, Space::Standard];

    /// Next space in the promotion order, or `self` when already terminal.
    ///
    /// Callers must treat "returned the same space" as "no further promotion
    /// possible"; [`Space::next_space`] does that check for you.
    pub fn promote(self) -> Space {
        match self {
            Space::Draft => Space::Test,
            Space::Test => Space::Standard,
            Space::Standard => Space::Standard,
        }
    }

    /// Like [`Space::promote`] but fails on the terminal space.
    pub fn next_space(self) -> Result<Space, CoreError> {
        let next = self.promote();
        if next == self {
            return Err(CoreError::NoFurtherPromotion(self));
        }
        Ok(next)
    }

    /// Parse a wire name (`draft`, `test`, `standard`).
    pub fn from_name(name: &str) -> Result<Space, CoreError> {
        match name {
            "draft" => Ok(Space::Draft),
            "test" => Ok(Space::Test),
            "standard" => Ok(Space::Standard),
            other => Err(CoreError::UnknownSpace(other.to_string())),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Space::Draft => "draft",
            Space::Test => "test",
            Space::Standard => "standard",
        }
    }

    /// Only the draft space accepts direct edits; the others change only
    /// through promotion.
    pub fn is_editable(self) -> bool {
        self == Space::Draft
    }
}

impl fmt::Display for Space {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Space {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Space::from_name(s)
    }
}
