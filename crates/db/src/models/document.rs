//! Document entity model and DTOs.

use serde::{Deserialize, Serialize};
use slf_core::status::DocumentStatus;
use slf_core::types::{DbId, Timestamp};
use sqlx::FromRow;

/// A row from the `documents` table.
///
/// `project_id` is `NULL` for client submissions not yet attached to a
/// project. The file bytes live in external storage; only the reference
/// and metadata are kept here.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Document {
    pub id: DbId,
    pub project_id: Option<DbId>,
    pub category: String,
    pub uploaded_by: DbId,
    #[sqlx(try_from = "String")]
    pub status: DocumentStatus,
    pub file_ref: Option<String>,
    pub file_name: Option<String>,
    pub file_format: Option<String>,
    pub file_size_bytes: Option<i64>,
    /// Number of re-uploads after a rejection.
    pub revision: i32,
    pub revision_notes: Option<String>,
    pub verified_by: Option<DbId>,
    pub verified_at: Option<Timestamp>,
    pub version: i32,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Metadata of a file already in object storage.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StoredFile {
    pub file_ref: String,
    pub file_name: String,
    pub file_format: String,
    pub file_size_bytes: i64,
}

/// DTO for a first upload. The row is inserted `uploaded` with its file.
#[derive(Debug, Clone)]
pub struct CreateDocument {
    pub project_id: Option<DbId>,
    pub category: String,
    pub uploaded_by: DbId,
    pub file: StoredFile,
}

/// Full replacement of a document's mutable fields.
#[derive(Debug, Clone)]
pub struct DocumentChange {
    pub status: DocumentStatus,
    pub uploaded_by: DbId,
    pub file_ref: Option<String>,
    pub file_name: Option<String>,
    pub file_format: Option<String>,
    pub file_size_bytes: Option<i64>,
    pub revision: i32,
    pub revision_notes: Option<String>,
    pub verified_by: Option<DbId>,
    pub verified_at: Option<Timestamp>,
}

impl DocumentChange {
    /// Point the document at a newly uploaded file.
    pub fn with_file(mut self, file: &StoredFile, uploaded_by: DbId) -> Self {
        self.status = DocumentStatus::Uploaded;
        self.uploaded_by = uploaded_by;
        self.file_ref = Some(file.file_ref.clone());
        self.file_name = Some(file.file_name.clone());
        self.file_format = Some(file.file_format.clone());
        self.file_size_bytes = Some(file.file_size_bytes);
        self
    }

    /// Start from the document's current values.
    pub fn from_current(doc: &Document) -> Self {
        Self {
            status: doc.status,
            uploaded_by: doc.uploaded_by,
            file_ref: doc.file_ref.clone(),
            file_name: doc.file_name.clone(),
            file_format: doc.file_format.clone(),
            file_size_bytes: doc.file_size_bytes,
            revision: doc.revision,
            revision_notes: doc.revision_notes.clone(),
            verified_by: doc.verified_by,
            verified_at: doc.verified_at,
        }
    }
}
