//! Well-known user roles.
//!
//! The identity provider stamps one of these labels into every token.

use crate::status::define_label_enum;

define_label_enum! {
    /// Role held by a user for the whole platform.
    Role {
        Client = "client",
        AdminTeam = "admin_team",
        AdminLead = "admin_lead",
        ProjectLead = "project_lead",
        Inspector = "inspector",
        Drafter = "drafter",
        HeadConsultant = "head_consultant",
    }
}

/// Roles allowed to sit on an approval chain step.
pub const REVIEWER_ROLES: &[Role] = &[
    Role::AdminTeam,
    Role::ProjectLead,
    Role::AdminLead,
    Role::HeadConsultant,
];

/// Roles that see every project regardless of team membership.
pub const GLOBAL_ROLES: &[Role] = &[Role::AdminTeam, Role::AdminLead, Role::HeadConsultant];

impl Role {
    pub fn is_reviewer(self) -> bool {
        REVIEWER_ROLES.contains(&self)
    }

    pub fn is_global(self) -> bool {
        GLOBAL_ROLES.contains(&self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_roles_are_not_reviewers() {
        assert!(!Role::Inspector.is_reviewer());
        assert!(!Role::Drafter.is_reviewer());
        assert!(!Role::Client.is_reviewer());
        assert!(Role::HeadConsultant.is_reviewer());
    }

    #[test]
    fn role_labels_parse() {
        assert_eq!("project_lead".parse::<Role>().unwrap(), Role::ProjectLead);
        assert!("admin".parse::<Role>().is_err());
    }
}
