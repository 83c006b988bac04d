use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Kind of catalog content. The wire name doubles as the changeset key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceType {
    Policy,
    Integrations,
    Rules,
    Kvdbs,
    Decoders,
    Filters,
}

impl ResourceType {
    pub const ALL: [ResourceType; 6] = [
        ResourceType::Policy,
        ResourceType::Integrations,
        ResourceType::Rules,
        ResourceType::Kvdbs,
        ResourceType::Decoders,
        ResourceType::Filters,
    ];

    /// The policy exists exactly once per space and is compared by content.
    pub fn is_singleton(self) -> bool {
        self == ResourceType::Policy
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ResourceType::Policy => "policy",
            ResourceType::Integrations => "integrations",
            ResourceType::Rules => "rules",
            ResourceType::Kvdbs => "kvdbs",
            ResourceType::Decoders => "decoders",
            ResourceType::Filters => "filters",
        }
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourceType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ResourceType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| CoreError::UnknownResourceType(s.to_string()))
    }
}
