//! Document requirements per application type and upload rules.

use serde::Serialize;

use crate::error::CoreError;
use crate::roles::Role;
use crate::status::{ApplicationType, DocumentStatus};

/// Size limit for scanned documents.
pub const MAX_DOCUMENT_SIZE_MB: u64 = 10;

/// Size limit for site photos.
pub const MAX_PHOTO_SIZE_MB: u64 = 5;

const PDF_OR_IMAGE: &[&str] = &["pdf", "jpg", "png"];
const PDF_ONLY: &[&str] = &["pdf"];
const IMAGES: &[&str] = &["jpg", "png"];

/// Roles that verify or reject uploaded documents.
pub const VERIFIER_ROLES: &[Role] = &[Role::AdminTeam, Role::AdminLead];

/// One required document category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DocumentRequirement {
    pub category: &'static str,
    pub label: &'static str,
    pub formats: &'static [&'static str],
    pub max_size_mb: u64,
}

impl DocumentRequirement {
    const fn new(
        category: &'static str,
        label: &'static str,
        formats: &'static [&'static str],
        max_size_mb: u64,
    ) -> Self {
        Self {
            category,
            label,
            formats,
            max_size_mb,
        }
    }

    pub fn max_size_bytes(&self) -> u64 {
        self.max_size_mb * 1024 * 1024
    }
}

const SLF_REQUIREMENTS: &[DocumentRequirement] = &[
    DocumentRequirement::new("owner_identity", "Owner identity card", PDF_OR_IMAGE, MAX_DOCUMENT_SIZE_MB),
    DocumentRequirement::new("land_title", "Land title certificate", PDF_ONLY, MAX_DOCUMENT_SIZE_MB),
    DocumentRequirement::new("building_permit", "Existing building permit", PDF_ONLY, MAX_DOCUMENT_SIZE_MB),
    DocumentRequirement::new("as_built_drawings", "As-built drawings", PDF_ONLY, MAX_DOCUMENT_SIZE_MB),
    DocumentRequirement::new("structural_calculation", "Structural calculation", PDF_ONLY, MAX_DOCUMENT_SIZE_MB),
    DocumentRequirement::new("site_photos", "Site photos", IMAGES, MAX_PHOTO_SIZE_MB),
];

const PBG_REQUIREMENTS: &[DocumentRequirement] = &[
    DocumentRequirement::new("owner_identity", "Owner identity card", PDF_OR_IMAGE, MAX_DOCUMENT_SIZE_MB),
    DocumentRequirement::new("land_title", "Land title certificate", PDF_ONLY, MAX_DOCUMENT_SIZE_MB),
    DocumentRequirement::new("architectural_drawings", "Architectural drawings", PDF_ONLY, MAX_DOCUMENT_SIZE_MB),
    DocumentRequirement::new("structural_calculation", "Structural calculation", PDF_ONLY, MAX_DOCUMENT_SIZE_MB),
    DocumentRequirement::new("utility_plan", "Utility plan", PDF_ONLY, MAX_DOCUMENT_SIZE_MB),
];

/// The required document set of an application type.
pub fn requirements(application_type: ApplicationType) -> &'static [DocumentRequirement] {
    match application_type {
        ApplicationType::Slf => SLF_REQUIREMENTS,
        ApplicationType::Pbg => PBG_REQUIREMENTS,
    }
}

/// Look up one category of an application type.
pub fn requirement(
    application_type: ApplicationType,
    category: &str,
) -> Result<&'static DocumentRequirement, CoreError> {
    requirements(application_type)
        .iter()
        .find(|r| r.category == category)
        .ok_or_else(|| {
            CoreError::Validation(format!(
                "Unknown document category '{category}' for {application_type} applications"
            ))
        })
}

/// Check file format and size against a category's requirement.
pub fn validate_upload(
    req: &DocumentRequirement,
    file_format: &str,
    file_size_bytes: i64,
) -> Result<(), CoreError> {
    let format = file_format.trim().trim_start_matches('.').to_ascii_lowercase();
    let format = if format == "jpeg" { "jpg".to_string() } else { format };
    if !req.formats.contains(&format.as_str()) {
        return Err(CoreError::Validation(format!(
            "Format '{file_format}' is not accepted for {}. Must be one of: {}",
            req.category,
            req.formats.join(", ")
        )));
    }
    if file_size_bytes <= 0 {
        return Err(CoreError::Validation("File size must be positive".to_string()));
    }
    if file_size_bytes as u64 > req.max_size_bytes() {
        return Err(CoreError::Validation(format!(
            "File exceeds the {} MB limit for {}",
            req.max_size_mb, req.category
        )));
    }
    Ok(())
}

/// What an upload does to a document in `status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadOutcome {
    /// First file, or a replacement before verification.
    Replace,
    /// Re-upload after rejection; bumps the revision and clears the notes.
    Revise,
}

/// Decide how an upload applies to an existing document.
pub fn upload_outcome(status: DocumentStatus) -> Result<UploadOutcome, CoreError> {
    match status {
        DocumentStatus::Pending | DocumentStatus::Uploaded => Ok(UploadOutcome::Replace),
        DocumentStatus::Rejected => Ok(UploadOutcome::Revise),
        DocumentStatus::Verified => Err(CoreError::IllegalTransition {
            entity: "document",
            from: status.to_string(),
            to: DocumentStatus::Uploaded.to_string(),
        }),
    }
}

/// Only uploaded documents can be verified or rejected.
pub fn check_verifiable(status: DocumentStatus, role: Role) -> Result<(), CoreError> {
    if !VERIFIER_ROLES.contains(&role) {
        return Err(CoreError::Unauthorized {
            role: role.to_string(),
            action: "verify documents".to_string(),
        });
    }
    if status != DocumentStatus::Uploaded {
        return Err(CoreError::IllegalTransition {
            entity: "document",
            from: status.to_string(),
            to: "verified".to_string(),
        });
    }
    Ok(())
}

/// Required categories without a verified document.
pub fn missing_categories<'a, I>(
    application_type: ApplicationType,
    present: I,
) -> Vec<&'static DocumentRequirement>
where
    I: IntoIterator<Item = (&'a str, DocumentStatus)>,
{
    let verified: Vec<&str> = present
        .into_iter()
        .filter(|(_, status)| *status == DocumentStatus::Verified)
        .map(|(category, _)| category)
        .collect();

    requirements(application_type)
        .iter()
        .filter(|r| !verified.contains(&r.category))
        .collect()
}
