//! # Actions
//!
//! Defines the actions that can be performed on organization resources.
//! Ownership-scoped actions (`*_own`, `*_any`) distinguish acting on one's
//! own agents and threads from acting on anyone's.

use serde::{Deserialize, Serialize};

/// Actions that can be performed on resources.
///
/// - **View**: See resource data
/// - **Create**: Create new resource instances
/// - **Update**: Modify resource data
/// - **UpdateOwn** / **UpdateAny**: Modify own / anyone's instances
/// - **Delete**: Remove resource instances
/// - **DeleteOwn** / **DeleteAny**: Remove own / anyone's instances
/// - **Invite**: Send invitations
/// - **Run**: Execute agents
/// - **Manage**: Full administrative control
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    /// View resource.
    View,
    /// Create new resource.
    Create,
    /// Update resource.
    Update,
    /// Update resources the caller created.
    UpdateOwn,
    /// Update any resource.
    UpdateAny,
    /// Delete resource.
    Delete,
    /// Delete resources the caller created.
    DeleteOwn,
    /// Delete any resource.
    DeleteAny,
    /// Send invitations.
    Invite,
    /// Execute.
    Run,
    /// Administer.
    Manage,
}

impl Action {
    /// Every action, in declaration order.
    pub const ALL: [Action; 11] = [
        Action::View,
        Action::Create,
        Action::Update,
        Action::UpdateOwn,
        Action::UpdateAny,
        Action::Delete,
        Action::DeleteOwn,
        Action::DeleteAny,
        Action::Invite,
        Action::Run,
        Action::Manage,
    ];

    /// Get the string representation of the action.
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::View => "view",
            Action::Create => "create",
            Action::Update => "update",
            Action::UpdateOwn => "update_own",
            Action::UpdateAny => "update_any",
            Action::Delete => "delete",
            Action::DeleteOwn => "delete_own",
            Action::DeleteAny => "delete_any",
            Action::Invite => "invite",
            Action::Run => "run",
            Action::Manage => "manage",
        }
    }

    /// Parse action from string representation.
    ///
    /// # Example
    ///
    /// ```
    /// use tenancy_rbac::actions::Action;
    ///
    /// assert_eq!(Action::parse("view"), Some(Action::View));
    /// assert_eq!(Action::parse("read"), Some(Action::View)); // Alias
    /// assert_eq!(Action::parse("delete_any"), Some(Action::DeleteAny));
    /// assert_eq!(Action::parse("invalid"), None);
    /// ```
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "view" | "read" => Some(Action::View),
            "create" => Some(Action::Create),
            "update" | "edit" => Some(Action::Update),
            "update_own" => Some(Action::UpdateOwn),
            "update_any" => Some(Action::UpdateAny),
            "delete" | "remove" => Some(Action::Delete),
            "delete_own" => Some(Action::DeleteOwn),
            "delete_any" => Some(Action::DeleteAny),
            "invite" => Some(Action::Invite),
            "run" | "execute" => Some(Action::Run),
            "manage" => Some(Action::Manage),
            _ => None,
        }
    }

    /// Check if this action implies another action.
    ///
    /// - `Manage` implies all other actions
    /// - `UpdateAny` implies `UpdateOwn`, `DeleteAny` implies `DeleteOwn`
    /// - Every other action implies `View`
    ///
    /// # Example
    ///
    /// ```
    /// use tenancy_rbac::actions::Action;
    ///
    /// assert!(Action::Manage.implies(Action::Invite));
    /// assert!(Action::DeleteAny.implies(Action::DeleteOwn));
    /// assert!(!Action::DeleteOwn.implies(Action::DeleteAny));
    /// ```
    pub fn implies(&self, other: Action) -> bool {
        if *self == other {
            return false;
        }
        match self {
            Action::Manage => true,
            Action::UpdateAny => matches!(other, Action::UpdateOwn | Action::View),
            Action::DeleteAny => matches!(other, Action::DeleteOwn | Action::View),
            Action::View => false,
            _ => other == Action::View,
        }
    }

    /// Check if this is a read-only action.
    pub fn is_read_only(&self) -> bool {
        matches!(self, Action::View)
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
