//! # Resource Types
//!
//! Defines the organization-scoped resource types that permissions
//! are granted on.

use serde::{Deserialize, Serialize};

/// Resource types that can have permissions assigned.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ResourceType {
    /// The organization record itself.
    Organization,
    /// Plan and payment management.
    Billing,
    /// Memberships and invitations.
    Members,
    /// Agents owned by the organization.
    Agents,
    /// Conversation threads.
    Threads,
    /// Organization settings.
    Settings,
}

impl ResourceType {
    /// Every resource type.
    pub const ALL: [ResourceType; 6] = [
        ResourceType::Organization,
        ResourceType::Billing,
        ResourceType::Members,
        ResourceType::Agents,
        ResourceType::Threads,
        ResourceType::Settings,
    ];

    /// Get the string representation used in permission strings.
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceType::Organization => "org",
            ResourceType::Billing => "billing",
            ResourceType::Members => "members",
            ResourceType::Agents => "agents",
            ResourceType::Threads => "threads",
            ResourceType::Settings => "settings",
        }
    }

    /// Parse resource type from string representation.
    ///
    /// Accepts both the short prefix (`org`) and the long name (`organization`).
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "org" | "organization" => Some(ResourceType::Organization),
            "billing" => Some(ResourceType::Billing),
            "members" | "member" => Some(ResourceType::Members),
            "agents" | "agent" => Some(ResourceType::Agents),
            "threads" | "thread" => Some(ResourceType::Threads),
            "settings" => Some(ResourceType::Settings),
            _ => None,
        }
    }
}

impl std::fmt::Display for ResourceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resource_parse_round_trip() {
        for resource in ResourceType::ALL {
            assert_eq!(ResourceType::parse(resource.as_str()), Some(resource));
        }
        assert_eq!(ResourceType::parse("organization"), Some(ResourceType::Organization));
        assert_eq!(ResourceType::parse("documents"), None);
    }
}
