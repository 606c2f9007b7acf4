//! Approval chain definitions and decision rules.
//!
//! A chain is an ordered list of reviewer roles. Steps are decided strictly
//! in order; the first rejection ends the chain.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::roles::Role;
use crate::status::{define_label_enum, StepDecision};
use crate::workflow::has_text;

/// Longest chain accepted.
pub const MAX_CHAIN_LENGTH: usize = 8;

/// Chain used when none is configured.
pub const DEFAULT_REPORT_CHAIN: &[Role] = &[
    Role::AdminTeam,
    Role::ProjectLead,
    Role::AdminLead,
    Role::HeadConsultant,
];

define_label_enum! {
    /// Decision a reviewer records on their step.
    Decision {
        Approved = "approved",
        Rejected = "rejected",
    }
}

impl From<Decision> for StepDecision {
    fn from(value: Decision) -> Self {
        match value {
            Decision::Approved => StepDecision::Approved,
            Decision::Rejected => StepDecision::Rejected,
        }
    }
}

/// Validated, ordered list of reviewer roles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Role>", into = "Vec<Role>")]
pub struct ChainDefinition {
    steps: Vec<Role>,
}

impl ChainDefinition {
    pub fn new(steps: Vec<Role>) -> Result<Self, CoreError> {
        if steps.is_empty() {
            return Err(CoreError::Validation(
                "An approval chain needs at least one step".to_string(),
            ));
        }
        if steps.len() > MAX_CHAIN_LENGTH {
            return Err(CoreError::Validation(format!(
                "An approval chain may have at most {MAX_CHAIN_LENGTH} steps"
            )));
        }
        if let Some(role) = steps.iter().find(|r| !r.is_reviewer()) {
            return Err(CoreError::Validation(format!(
                "Role '{role}' cannot sign off an approval step"
            )));
        }
        if let Some(role) = steps
            .iter()
            .enumerate()
            .find_map(|(i, r)| steps[..i].contains(r).then_some(r))
        {
            return Err(CoreError::Validation(format!(
                "Role '{role}' appears more than once in the approval chain"
            )));
        }
        Ok(Self { steps })
    }

    /// Parse a comma-separated role list, e.g. `admin_team,head_consultant`.
    pub fn parse(csv: &str) -> Result<Self, CoreError> {
        let steps = csv
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::parse)
            .collect::<Result<Vec<Role>, _>>()?;
        Self::new(steps)
    }

    pub fn steps(&self) -> &[Role] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

impl Default for ChainDefinition {
    fn default() -> Self {
        Self {
            steps: DEFAULT_REPORT_CHAIN.to_vec(),
        }
    }
}

impl TryFrom<Vec<Role>> for ChainDefinition {
    type Error = CoreError;

    fn try_from(value: Vec<Role>) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ChainDefinition> for Vec<Role> {
    fn from(value: ChainDefinition) -> Self {
        value.steps
    }
}

/// Result of applying one decision to a chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum ChainOutcome {
    /// More steps remain; `next_role` decides next.
    Advanced { next_position: i32, next_role: Role },
    /// The last step approved.
    Approved,
    /// A step rejected; the chain is closed.
    Rejected,
}

/// Position and role of the first undecided step, 1-based.
pub fn next_pending(steps: &[(Role, StepDecision)]) -> Option<(i32, Role)> {
    steps
        .iter()
        .position(|(_, d)| *d == StepDecision::Pending)
        .map(|idx| (idx as i32 + 1, steps[idx].0))
}

/// Check that `role` may decide the next pending step.
///
/// Returns the 1-based position of that step. Earlier steps are approved
/// by construction, since a rejection closes the chain.
pub fn check_decision(
    steps: &[(Role, StepDecision)],
    role: Role,
    decision: Decision,
    notes: Option<&str>,
) -> Result<i32, CoreError> {
    let (position, expected) = next_pending(steps).ok_or_else(|| {
        CoreError::Conflict("Every step of this approval chain is already decided".to_string())
    })?;

    if expected != role {
        return Err(CoreError::Unauthorized {
            role: role.to_string(),
            action: format!("decide approval step {position}, which awaits '{expected}'"),
        });
    }

    if decision == Decision::Rejected && !has_text(notes) {
        return Err(CoreError::MissingPayload(
            "rejection requires notes".to_string(),
        ));
    }

    Ok(position)
}

/// What happens to the chain after `decision` on the 1-based step `position`.
pub fn outcome(
    steps: &[(Role, StepDecision)],
    position: i32,
    decision: Decision,
) -> ChainOutcome {
    if decision == Decision::Rejected {
        return ChainOutcome::Rejected;
    }
    match steps.get(position as usize) {
        Some((role, _)) => ChainOutcome::Advanced {
            next_position: position + 1,
            next_role: *role,
        },
        None => ChainOutcome::Approved,
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    fn pending(roles: &[Role]) -> Vec<(Role, StepDecision)> {
        roles.iter().map(|r| (*r, StepDecision::Pending)).collect()
    }

    #[test]
    fn empty_chain_rejected() {
        assert_matches!(ChainDefinition::new(vec![]), Err(CoreError::Validation(_)));
    }

    #[test]
    fn non_reviewer_step_rejected() {
        let result = ChainDefinition::new(vec![Role::AdminTeam, Role::Drafter]);
        assert_matches!(result, Err(CoreError::Validation(msg)) if msg.contains("drafter"));
    }

    #[test]
    fn duplicate_role_rejected() {
        let result = ChainDefinition::new(vec![
            Role::AdminTeam,
            Role::HeadConsultant,
            Role::AdminTeam,
        ]);
        assert_matches!(result, Err(CoreError::Validation(msg)) if msg.contains("admin_team"));
        assert!(ChainDefinition::parse("admin_lead,admin_lead").is_err());
        assert!(serde_json::from_str::<ChainDefinition>(r#"["project_lead","project_lead"]"#).is_err());
    }

    #[test]
    fn parse_reads_comma_separated_roles() {
        let chain = ChainDefinition::parse(" admin_team, admin_lead ,head_consultant").unwrap();
        assert_eq!(
            chain.steps(),
            &[Role::AdminTeam, Role::AdminLead, Role::HeadConsultant]
        );
        assert!(ChainDefinition::parse("admin_team,boss").is_err());
    }

    #[test]
    fn default_chain_runs_admin_team_to_head_consultant() {
        let chain = ChainDefinition::default();
        assert_eq!(chain.steps().first(), Some(&Role::AdminTeam));
        assert_eq!(chain.steps().last(), Some(&Role::HeadConsultant));
    }

    #[test]
    fn chain_definition_deserializes_with_validation() {
        let chain: ChainDefinition = serde_json::from_str(r#"["project_lead"]"#).unwrap();
        assert_eq!(chain.len(), 1);
        assert!(serde_json::from_str::<ChainDefinition>("[]").is_err());
    }

    #[test]
    fn only_the_next_pending_role_may_decide() {
        let steps = pending(&[Role::AdminTeam, Role::ProjectLead]);
        assert_eq!(
            check_decision(&steps, Role::AdminTeam, Decision::Approved, None).unwrap(),
            1
        );
        assert_matches!(
            check_decision(&steps, Role::ProjectLead, Decision::Approved, None),
            Err(CoreError::Unauthorized { .. })
        );
    }

    #[test]
    fn rejection_decision_requires_notes() {
        let steps = pending(&[Role::AdminTeam]);
        assert_matches!(
            check_decision(&steps, Role::AdminTeam, Decision::Rejected, Some(" ")),
            Err(CoreError::MissingPayload(_))
        );
    }

    #[test]
    fn fully_decided_chain_accepts_nothing() {
        let steps = vec![(Role::AdminTeam, StepDecision::Approved)];
        assert_matches!(
            check_decision(&steps, Role::AdminTeam, Decision::Approved, None),
            Err(CoreError::Conflict(_))
        );
    }

    #[test]
    fn outcome_advances_then_approves() {
        let steps = pending(&[Role::AdminTeam, Role::HeadConsultant]);
        assert_eq!(
            outcome(&steps, 1, Decision::Approved),
            ChainOutcome::Advanced {
                next_position: 2,
                next_role: Role::HeadConsultant
            }
        );
        assert_eq!(outcome(&steps, 2, Decision::Approved), ChainOutcome::Approved);
        assert_eq!(outcome(&steps, 1, Decision::Rejected), ChainOutcome::Rejected);
    }
}
