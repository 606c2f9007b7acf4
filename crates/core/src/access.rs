//! Which projects a caller may see.

use crate::roles::Role;
use crate::types::{Actor, DbId};

/// Visibility scope applied to project listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectScope {
    /// Office-wide roles see everything.
    All,
    /// Clients see the projects they own.
    ClientOwned(DbId),
    /// Project leads see the projects they lead.
    Led(DbId),
    /// Field staff see projects whose team they are on.
    TeamMember(DbId),
}

pub fn project_scope(actor: &Actor) -> ProjectScope {
    match actor.role {
        role if role.is_global() => ProjectScope::All,
        Role::Client => ProjectScope::ClientOwned(actor.user_id),
        Role::ProjectLead => ProjectScope::Led(actor.user_id),
        _ => ProjectScope::TeamMember(actor.user_id),
    }
}

/// Whether a single project falls inside `scope`.
///
/// `is_member` is only consulted for [`ProjectScope::TeamMember`].
pub fn can_view(
    scope: ProjectScope,
    client_id: DbId,
    project_lead_id: Option<DbId>,
    is_member: bool,
) -> bool {
    match scope {
        ProjectScope::All => true,
        ProjectScope::ClientOwned(id) => client_id == id,
        ProjectScope::Led(id) => project_lead_id == Some(id) || is_member,
        ProjectScope::TeamMember(_) => is_member,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scopes_follow_role() {
        assert_eq!(project_scope(&Actor::new(1, Role::HeadConsultant)), ProjectScope::All);
        assert_eq!(project_scope(&Actor::new(2, Role::Client)), ProjectScope::ClientOwned(2));
        assert_eq!(project_scope(&Actor::new(3, Role::ProjectLead)), ProjectScope::Led(3));
        assert_eq!(project_scope(&Actor::new(4, Role::Inspector)), ProjectScope::TeamMember(4));
    }

    #[test]
    fn client_cannot_view_foreign_project() {
        assert!(can_view(ProjectScope::ClientOwned(2), 2, None, false));
        assert!(!can_view(ProjectScope::ClientOwned(2), 9, None, true));
    }

    #[test]
    fn lead_sees_led_and_member_projects() {
        assert!(can_view(ProjectScope::Led(3), 1, Some(3), false));
        assert!(can_view(ProjectScope::Led(3), 1, None, true));
        assert!(!can_view(ProjectScope::Led(3), 1, Some(4), false));
    }
}
