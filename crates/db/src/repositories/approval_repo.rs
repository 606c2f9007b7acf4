//! Repository for the `approval_chains` and `approval_steps` tables.

use slf_core::status::{ChainStatus, EntityKind, StepDecision};
use slf_core::types::DbId;
use sqlx::PgPool;

use super::{ProjectRepo, ReportRepo};
use crate::models::approval::{
    ApprovalChain, ApprovalStep, ChainWithSteps, CloseReview, NewChain, OpenReview,
    RecordDecision, ReviewedEntity, SubjectChange,
};

type Tx<'a> = sqlx::Transaction<'a, sqlx::Postgres>;

/// Outcome of a chain-closing write.
#[derive(Debug)]
pub enum ClosedReview {
    Closed(ApprovalStep, ReviewedEntity),
    /// The step was already decided or the chain already closed.
    StepNotPending,
    /// The reviewed entity's version moved.
    EntityMoved,
}

const CHAIN_COLUMNS: &str = "id, entity_type, entity_id, status, created_by, created_at, closed_at";

const STEP_COLUMNS: &str = "id, chain_id, position, role, decision, decided_by, notes, decided_at";

/// Approval chains and their append-only steps.
pub struct ApprovalRepo;

impl ApprovalRepo {
    /// Move the entity into review and open its chain in one transaction.
    ///
    /// Returns `None` when the entity's compare-and-swap matched no row. The
    /// partial unique index on in-flight chains makes a concurrent second
    /// open fail with a unique violation.
    pub async fn open_review(
        pool: &PgPool,
        input: &OpenReview,
    ) -> Result<Option<(ChainWithSteps, ReviewedEntity)>, sqlx::Error> {
        let mut tx = pool.begin().await?;
        let Some(entity) = apply_subject(
            &mut tx,
            input.chain.entity_id,
            input.expected_version,
            &input.change,
        )
        .await?
        else {
            return Ok(None);
        };
        let chain = Self::insert_chain_in_tx(&mut tx, &input.chain).await?;
        tx.commit().await?;
        Ok(Some((chain, entity)))
    }

    async fn insert_chain_in_tx(
        tx: &mut Tx<'_>,
        input: &NewChain,
    ) -> Result<ChainWithSteps, sqlx::Error> {
        let query = format!(
            "INSERT INTO approval_chains (entity_type, entity_id, created_by) \
             VALUES ($1, $2, $3) RETURNING {CHAIN_COLUMNS}"
        );
        let chain = sqlx::query_as::<_, ApprovalChain>(&query)
            .bind(input.entity_type.as_str())
            .bind(input.entity_id)
            .bind(input.created_by)
            .fetch_one(&mut **tx)
            .await?;

        let step_query = format!(
            "INSERT INTO approval_steps (chain_id, position, role) \
             VALUES ($1, $2, $3) RETURNING {STEP_COLUMNS}"
        );
        let mut steps = Vec::with_capacity(input.steps.len());
        for (idx, role) in input.steps.iter().enumerate() {
            let step = sqlx::query_as::<_, ApprovalStep>(&step_query)
                .bind(chain.id)
                .bind(idx as i32 + 1)
                .bind(role.as_str())
                .fetch_one(&mut **tx)
                .await?;
            steps.push(step);
        }
        Ok(ChainWithSteps { chain, steps })
    }

    pub async fn find_active(
        pool: &PgPool,
        entity_type: EntityKind,
        entity_id: DbId,
    ) -> Result<Option<ChainWithSteps>, sqlx::Error> {
        let query = format!(
            "SELECT {CHAIN_COLUMNS} FROM approval_chains \
             WHERE entity_type = $1 AND entity_id = $2 AND status = $3"
        );
        let chain = sqlx::query_as::<_, ApprovalChain>(&query)
            .bind(entity_type.as_str())
            .bind(entity_id)
            .bind(ChainStatus::InFlight.as_str())
            .fetch_optional(pool)
            .await?;

        match chain {
            Some(chain) => {
                let steps = Self::list_steps(pool, chain.id).await?;
                Ok(Some(ChainWithSteps { chain, steps }))
            }
            None => Ok(None),
        }
    }

    /// Every chain ever opened for an entity, oldest first.
    pub async fn list_for_entity(
        pool: &PgPool,
        entity_type: EntityKind,
        entity_id: DbId,
    ) -> Result<Vec<ChainWithSteps>, sqlx::Error> {
        let query = format!(
            "SELECT {CHAIN_COLUMNS} FROM approval_chains \
             WHERE entity_type = $1 AND entity_id = $2 ORDER BY id"
        );
        let chains = sqlx::query_as::<_, ApprovalChain>(&query)
            .bind(entity_type.as_str())
            .bind(entity_id)
            .fetch_all(pool)
            .await?;

        let mut out = Vec::with_capacity(chains.len());
        for chain in chains {
            let steps = Self::list_steps(pool, chain.id).await?;
            out.push(ChainWithSteps { chain, steps });
        }
        Ok(out)
    }

    pub async fn list_steps(
        pool: &PgPool,
        chain_id: DbId,
    ) -> Result<Vec<ApprovalStep>, sqlx::Error> {
        let query = format!(
            "SELECT {STEP_COLUMNS} FROM approval_steps WHERE chain_id = $1 ORDER BY position"
        );
        sqlx::query_as::<_, ApprovalStep>(&query)
            .bind(chain_id)
            .fetch_all(pool)
            .await
    }

    /// Decide a step that is still pending.
    ///
    /// Returns `None` when the step was already decided or the chain is no
    /// longer in flight.
    pub async fn record_decision(
        pool: &PgPool,
        input: &RecordDecision,
    ) -> Result<Option<ApprovalStep>, sqlx::Error> {
        let mut tx = pool.begin().await?;
        let step = Self::decide_in_tx(&mut tx, input).await?;
        if step.is_some() {
            tx.commit().await?;
        }
        Ok(step)
    }

    /// Decide the final step, close the chain and move the entity out of
    /// review in one transaction.
    pub async fn close_review(
        pool: &PgPool,
        input: &CloseReview,
    ) -> Result<ClosedReview, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let Some(step) = Self::decide_in_tx(&mut tx, &input.decision).await? else {
            return Ok(ClosedReview::StepNotPending);
        };
        if Self::close_in_tx(&mut tx, input.decision.chain_id, input.close_as)
            .await?
            .is_none()
        {
            return Ok(ClosedReview::StepNotPending);
        }
        let Some(entity) =
            apply_subject(&mut tx, input.entity_id, input.expected_version, &input.change).await?
        else {
            return Ok(ClosedReview::EntityMoved);
        };

        tx.commit().await?;
        Ok(ClosedReview::Closed(step, entity))
    }

    /// Mark any in-flight chain of the entity `abandoned`.
    pub(crate) async fn abandon_in_tx(
        tx: &mut Tx<'_>,
        entity_type: EntityKind,
        entity_id: DbId,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE approval_chains SET status = $3, closed_at = NOW() \
             WHERE entity_type = $1 AND entity_id = $2 AND status = $4",
        )
        .bind(entity_type.as_str())
        .bind(entity_id)
        .bind(ChainStatus::Abandoned.as_str())
        .bind(ChainStatus::InFlight.as_str())
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    async fn decide_in_tx(
        tx: &mut Tx<'_>,
        input: &RecordDecision,
    ) -> Result<Option<ApprovalStep>, sqlx::Error> {
        let query = "UPDATE approval_steps s SET \
                decision = $3, decided_by = $4, notes = $5, decided_at = NOW() \
             FROM approval_chains c \
             WHERE s.chain_id = $1 AND s.position = $2 AND s.decision = $6 \
               AND c.id = s.chain_id AND c.status = $7 \
             RETURNING s.id, s.chain_id, s.position, s.role, s.decision, \
                       s.decided_by, s.notes, s.decided_at";
        sqlx::query_as::<_, ApprovalStep>(query)
            .bind(input.chain_id)
            .bind(input.position)
            .bind(input.decision.as_str())
            .bind(input.decided_by)
            .bind(&input.notes)
            .bind(StepDecision::Pending.as_str())
            .bind(ChainStatus::InFlight.as_str())
            .fetch_optional(&mut **tx)
            .await
    }

    async fn close_in_tx(
        tx: &mut Tx<'_>,
        chain_id: DbId,
        status: ChainStatus,
    ) -> Result<Option<ApprovalChain>, sqlx::Error> {
        let query = format!(
            "UPDATE approval_chains SET status = $2, closed_at = NOW() \
             WHERE id = $1 AND status = $3 \
             RETURNING {CHAIN_COLUMNS}"
        );
        sqlx::query_as::<_, ApprovalChain>(&query)
            .bind(chain_id)
            .bind(status.as_str())
            .bind(ChainStatus::InFlight.as_str())
            .fetch_optional(&mut **tx)
            .await
    }
}

async fn apply_subject(
    tx: &mut Tx<'_>,
    id: DbId,
    expected_version: i32,
    change: &SubjectChange,
) -> Result<Option<ReviewedEntity>, sqlx::Error> {
    Ok(match change {
        SubjectChange::Project(c) => ProjectRepo::transition_in_tx(tx, id, expected_version, c)
            .await?
            .map(ReviewedEntity::Project),
        SubjectChange::Report(c) => ReportRepo::transition_in_tx(tx, id, expected_version, c)
            .await?
            .map(ReviewedEntity::Report),
    })
}
