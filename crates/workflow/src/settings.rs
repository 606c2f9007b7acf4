use slf_core::approval::ChainDefinition;
use slf_core::error::CoreError;

use crate::retry::RetryPolicy;

/// Workflow behaviour loaded from environment variables.
#[derive(Debug, Clone)]
pub struct WorkflowSettings {
    /// Reviewer roles a report passes through, in order.
    pub approval_chain: ChainDefinition,
    /// Sign-off a project passes through in `head_consultant_review`.
    pub project_approval_chain: ChainDefinition,
    /// Move the project along when inspections start and finish.
    pub auto_advance: bool,
    /// Backoff for storage calls that fail with a connectivity error.
    pub retry: RetryPolicy,
}

impl Default for WorkflowSettings {
    fn default() -> Self {
        Self {
            approval_chain: ChainDefinition::default(),
            project_approval_chain: ChainDefinition::default(),
            auto_advance: false,
            retry: RetryPolicy::default(),
        }
    }
}

impl WorkflowSettings {
    /// Load settings from the process environment.
    ///
    /// | Env Var                  | Default                                          |
    /// |--------------------------|--------------------------------------------------|
    /// | `APPROVAL_CHAIN`         | `admin_team,project_lead,admin_lead,head_consultant` |
    /// | `PROJECT_APPROVAL_CHAIN` | `admin_team,project_lead,admin_lead,head_consultant` |
    /// | `WORKFLOW_AUTO_ADVANCE`  | `false`                                          |
    /// | `STORAGE_RETRY_ATTEMPTS` | `2`                                              |
    pub fn from_env() -> Result<Self, CoreError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load settings through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, CoreError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let approval_chain = chain_setting(&lookup, "APPROVAL_CHAIN")?;
        let project_approval_chain = chain_setting(&lookup, "PROJECT_APPROVAL_CHAIN")?;

        let auto_advance = match lookup("WORKFLOW_AUTO_ADVANCE") {
            Some(value) => parse_flag(&value).ok_or_else(|| {
                CoreError::Validation(format!(
                    "WORKFLOW_AUTO_ADVANCE must be true or false, got '{value}'"
                ))
            })?,
            None => false,
        };

        let attempts = match lookup("STORAGE_RETRY_ATTEMPTS") {
            Some(value) => value.trim().parse::<u32>().map_err(|_| {
                CoreError::Validation(format!(
                    "STORAGE_RETRY_ATTEMPTS must be a non-negative integer, got '{value}'"
                ))
            })?,
            None => RetryPolicy::default().attempts,
        };

        Ok(Self {
            approval_chain,
            project_approval_chain,
            auto_advance,
            retry: RetryPolicy::with_attempts(attempts),
        })
    }
}

fn chain_setting<F>(lookup: &F, key: &str) -> Result<ChainDefinition, CoreError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(csv) if !csv.trim().is_empty() => ChainDefinition::parse(&csv),
        _ => Ok(ChainDefinition::default()),
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
