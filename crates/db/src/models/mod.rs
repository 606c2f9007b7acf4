//! Domain model structs and DTOs.
//!
//! Each submodule contains:
//! - A `FromRow` + `Serialize` entity struct matching the database row
//! - `Deserialize` create DTOs for inserts
//! - Change structs describing one versioned write

pub mod approval;
pub mod checklist;
pub mod document;
pub mod notification;
pub mod project;
pub mod report;
pub mod schedule;
pub mod transition;
pub mod user;

use slf_core::error::CoreError;
use sqlx::postgres::PgRow;
use sqlx::Row;

/// Decode a `TEXT` label column into its enum.
pub(crate) fn label<T>(row: &PgRow, column: &str) -> Result<T, sqlx::Error>
where
    T: TryFrom<String, Error = CoreError>,
{
    let raw: String = row.try_get(column)?;
    T::try_from(raw).map_err(|e| sqlx::Error::ColumnDecode {
        index: column.to_string(),
        source: Box::new(e),
    })
}

/// Decode a nullable `TEXT` label column into its enum.
pub(crate) fn optional_label<T>(row: &PgRow, column: &str) -> Result<Option<T>, sqlx::Error>
where
    T: TryFrom<String, Error = CoreError>,
{
    let raw: Option<String> = row.try_get(column)?;
    raw.map(T::try_from)
        .transpose()
        .map_err(|e| sqlx::Error::ColumnDecode {
            index: column.to_string(),
            source: Box::new(e),
        })
}
