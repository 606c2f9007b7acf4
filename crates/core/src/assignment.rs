//! Eligibility rules for assigning schedules to users.

use crate::error::CoreError;
use crate::roles::Role;
use crate::status::{ScheduleStatus, ScheduleType};
use crate::types::DbId;

/// Roles allowed to hand out schedules.
pub const ASSIGNER_ROLES: &[Role] = &[Role::ProjectLead, Role::AdminLead];

/// Role an assignee must hold for a schedule type, if any.
pub fn required_assignee_role(schedule_type: ScheduleType) -> Option<Role> {
    match schedule_type {
        ScheduleType::Inspection => Some(Role::Inspector),
        ScheduleType::ReportDrafting => Some(Role::Drafter),
        ScheduleType::Meeting => None,
    }
}

/// Check the acting user may assign work at all.
pub fn check_assigner(role: Role) -> Result<(), CoreError> {
    if ASSIGNER_ROLES.contains(&role) {
        Ok(())
    } else {
        Err(CoreError::Unauthorized {
            role: role.to_string(),
            action: "assign schedules".to_string(),
        })
    }
}

/// Check the target user's role fits the schedule type.
pub fn check_assignee_role(
    schedule_type: ScheduleType,
    user_id: DbId,
    user_role: Role,
) -> Result<(), CoreError> {
    match required_assignee_role(schedule_type) {
        Some(required) if required != user_role => Err(CoreError::RoleMismatch {
            user_id,
            required: required.to_string(),
            actual: user_role.to_string(),
        }),
        _ => Ok(()),
    }
}

/// Assignment may only change before the schedule starts.
///
/// Once an inspection is in progress the location capture belongs to the
/// original assignee.
pub fn check_reassignable(schedule_status: ScheduleStatus) -> Result<(), CoreError> {
    if schedule_status == ScheduleStatus::Scheduled {
        Ok(())
    } else {
        Err(CoreError::IllegalTransition {
            entity: "schedule",
            from: schedule_status.to_string(),
            to: "reassigned".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn inspection_needs_inspector() {
        assert!(check_assignee_role(ScheduleType::Inspection, 1, Role::Inspector).is_ok());
        assert_matches!(
            check_assignee_role(ScheduleType::Inspection, 1, Role::Drafter),
            Err(CoreError::RoleMismatch { required, .. }) if required == "inspector"
        );
    }

    #[test]
    fn drafting_needs_drafter() {
        assert!(check_assignee_role(ScheduleType::ReportDrafting, 2, Role::Drafter).is_ok());
        assert_matches!(
            check_assignee_role(ScheduleType::ReportDrafting, 2, Role::Inspector),
            Err(CoreError::RoleMismatch { .. })
        );
    }

    #[test]
    fn meetings_accept_any_role() {
        for &role in Role::ALL {
            assert!(check_assignee_role(ScheduleType::Meeting, 3, role).is_ok());
        }
    }

    #[test]
    fn only_scheduled_entries_are_reassignable() {
        assert!(check_reassignable(ScheduleStatus::Scheduled).is_ok());
        for status in [
            ScheduleStatus::InProgress,
            ScheduleStatus::Completed,
            ScheduleStatus::Cancelled,
        ] {
            assert_matches!(
                check_reassignable(status),
                Err(CoreError::IllegalTransition { .. })
            );
        }
    }

    #[test]
    fn field_staff_cannot_assign() {
        assert!(check_assigner(Role::ProjectLead).is_ok());
        assert!(check_assigner(Role::Inspector).is_err());
    }
}
