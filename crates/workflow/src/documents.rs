//! Document uploads, verification and completeness.
//!
//! File bytes live in object storage; uploads here carry only the returned
//! reference and metadata. Each project has one document row per category,
//! replaced in place on re-upload.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use slf_core::approval::Decision;
use slf_core::documents::{self, DocumentRequirement, UploadOutcome};
use slf_core::error::CoreError;
use slf_core::roles::Role;
use slf_core::status::{ApplicationType, DocumentStatus, EntityKind};
use slf_core::types::{Actor, DbId};
use slf_core::workflow::has_text;
use slf_db::models::document::{CreateDocument, Document, DocumentChange, StoredFile};
use slf_events::{kinds, Recipient, WorkflowEvent};

use crate::context::{check_version, clean_notes, Context};

/// Metadata of a file already stored in object storage.
#[derive(Debug, Clone, Deserialize)]
pub struct UploadDocument {
    pub category: String,
    pub file_ref: String,
    pub file_name: String,
    pub file_format: String,
    pub file_size_bytes: i64,
}

impl UploadDocument {
    /// Trimmed metadata with the format lowercased and without a leading dot.
    fn stored_file(&self) -> StoredFile {
        StoredFile {
            file_ref: self.file_ref.trim().to_string(),
            file_name: self.file_name.trim().to_string(),
            file_format: self
                .file_format
                .trim()
                .trim_start_matches('.')
                .to_ascii_lowercase(),
            file_size_bytes: self.file_size_bytes,
        }
    }
}

/// Which required documents a project still lacks.
#[derive(Debug, Clone, Serialize)]
pub struct DocumentCompleteness {
    pub project_id: DbId,
    pub application_type: ApplicationType,
    pub required: &'static [DocumentRequirement],
    pub missing: Vec<&'static DocumentRequirement>,
    pub complete: bool,
}

#[derive(Clone)]
pub struct DocumentService {
    ctx: Context,
}

impl DocumentService {
    pub(crate) fn new(ctx: Context) -> Self {
        Self { ctx }
    }

    /// Record an uploaded file against a project category.
    ///
    /// `project_id = None` registers an unattached client submission.
    pub async fn upload_document(
        &self,
        project_id: Option<DbId>,
        input: UploadDocument,
        actor: Actor,
    ) -> Result<Document, CoreError> {
        if input.file_ref.trim().is_empty() || input.file_name.trim().is_empty() {
            return Err(CoreError::Validation(
                "An upload needs a file reference and a file name".to_string(),
            ));
        }

        let Some(project_id) = project_id else {
            return self.upload_unattached(input, actor).await;
        };

        let project = self.ctx.visible_project(project_id, &actor).await?;
        match actor.role {
            Role::Client if project.client_id == actor.user_id => {}
            Role::AdminTeam | Role::AdminLead => {}
            role => {
                return Err(CoreError::Unauthorized {
                    role: role.to_string(),
                    action: "upload project documents".to_string(),
                })
            }
        }

        let req = documents::requirement(project.application_type, &input.category)?;
        documents::validate_upload(req, &input.file_format, input.file_size_bytes)?;

        let store = self.ctx.store();
        let category = input.category.as_str();
        let existing = self
            .ctx
            .retry(move || store.find_document(project_id, category))
            .await?;

        let file = input.stored_file();
        let doc = match existing {
            Some(doc) => doc,
            None => {
                let create = CreateDocument {
                    project_id: Some(project_id),
                    category: input.category.clone(),
                    uploaded_by: actor.user_id,
                    file,
                };
                let create = &create;
                let created = self.ctx.retry(move || store.create_document(create)).await?;
                tracing::info!(
                    document_id = created.id,
                    project_id,
                    category = %created.category,
                    actor_id = actor.user_id,
                    "Document uploaded"
                );
                return Ok(created);
            }
        };

        let outcome = documents::upload_outcome(doc.status)?;
        let mut change = DocumentChange::from_current(&doc).with_file(&file, actor.user_id);
        if outcome == UploadOutcome::Revise {
            change.revision = doc.revision + 1;
            change.revision_notes = None;
            change.verified_by = None;
            change.verified_at = None;
        }

        let (doc_id, version) = (doc.id, doc.version);
        let change = &change;
        let updated = self
            .ctx
            .retry(move || store.update_document(doc_id, version, change))
            .await?;

        tracing::info!(
            document_id = updated.id,
            project_id,
            category = %updated.category,
            revision = updated.revision,
            actor_id = actor.user_id,
            "Document uploaded"
        );
        Ok(updated)
    }

    async fn upload_unattached(
        &self,
        input: UploadDocument,
        actor: Actor,
    ) -> Result<Document, CoreError> {
        if actor.role != Role::Client {
            return Err(CoreError::Unauthorized {
                role: actor.role.to_string(),
                action: "submit documents outside a project".to_string(),
            });
        }
        let req = ApplicationType::ALL
            .iter()
            .find_map(|t| documents::requirement(*t, &input.category).ok())
            .ok_or_else(|| {
                CoreError::Validation(format!("Unknown document category '{}'", input.category))
            })?;
        documents::validate_upload(req, &input.file_format, input.file_size_bytes)?;

        let store = self.ctx.store();
        let create = CreateDocument {
            project_id: None,
            category: input.category.clone(),
            uploaded_by: actor.user_id,
            file: input.stored_file(),
        };
        let create = &create;
        let created = self.ctx.retry(move || store.create_document(create)).await?;

        tracing::info!(
            document_id = created.id,
            category = %created.category,
            actor_id = actor.user_id,
            "Unattached document submitted"
        );
        Ok(created)
    }

    /// Verify or reject an uploaded document.
    pub async fn verify_document(
        &self,
        document_id: DbId,
        decision: Decision,
        notes: Option<&str>,
        actor: Actor,
        expected_version: Option<i32>,
    ) -> Result<Document, CoreError> {
        let store = self.ctx.store();
        let doc = self.ctx.retry(move || store.get_document(document_id)).await?;
        if let Some(project_id) = doc.project_id {
            self.ctx.visible_project(project_id, &actor).await?;
        }

        let expected = check_version("document", document_id, doc.version, expected_version)?;
        documents::check_verifiable(doc.status, actor.role)?;
        if decision == Decision::Rejected && !has_text(notes) {
            return Err(CoreError::MissingPayload(
                "rejection requires notes".to_string(),
            ));
        }

        let mut change = DocumentChange::from_current(&doc);
        match decision {
            Decision::Approved => {
                change.status = DocumentStatus::Verified;
                change.verified_by = Some(actor.user_id);
                change.verified_at = Some(Utc::now());
            }
            Decision::Rejected => {
                change.status = DocumentStatus::Rejected;
                change.revision_notes = clean_notes(notes);
                change.verified_by = None;
                change.verified_at = None;
            }
        }
        let change = &change;
        let updated = self
            .ctx
            .retry(move || store.update_document(document_id, expected, change))
            .await?;

        tracing::info!(
            document_id,
            project_id = ?updated.project_id,
            status = %updated.status,
            actor_id = actor.user_id,
            "Document reviewed"
        );

        let (kind, message) = match decision {
            Decision::Approved => (
                kinds::DOCUMENT_VERIFIED,
                format!("Your '{}' document was verified", updated.category),
            ),
            Decision::Rejected => (
                kinds::DOCUMENT_REJECTED,
                format!(
                    "Your '{}' document was rejected: {}",
                    updated.category,
                    updated.revision_notes.as_deref().unwrap_or_default()
                ),
            ),
        };
        let event = WorkflowEvent::new(kind, EntityKind::Document, document_id, message)
            .by(actor)
            .to(Recipient::User(updated.uploaded_by));
        self.ctx.notify(event).await;

        Ok(updated)
    }

    pub async fn list_documents(
        &self,
        project_id: DbId,
        actor: &Actor,
    ) -> Result<Vec<Document>, CoreError> {
        self.ctx.visible_project(project_id, actor).await?;
        let store = self.ctx.store();
        self.ctx.retry(move || store.list_documents(project_id)).await
    }

    pub async fn document_completeness(
        &self,
        project_id: DbId,
        actor: &Actor,
    ) -> Result<DocumentCompleteness, CoreError> {
        let project = self.ctx.visible_project(project_id, actor).await?;
        let store = self.ctx.store();
        let docs = self.ctx.retry(move || store.list_documents(project_id)).await?;

        let missing = documents::missing_categories(
            project.application_type,
            docs.iter().map(|d| (d.category.as_str(), d.status)),
        );
        Ok(DocumentCompleteness {
            project_id,
            application_type: project.application_type,
            required: documents::requirements(project.application_type),
            complete: missing.is_empty(),
            missing,
        })
    }
}

