//! Text-backed lifecycle enums.
//!
//! Every status is stored as its snake_case label in a `TEXT` column and
//! travels over the wire with the same label. The labels are the only
//! serialized form; the enum discriminants are never persisted.

/// Define an enum whose variants map one-to-one onto string labels.
///
/// Generates `ALL`, `as_str`, `Display`, `FromStr`, `TryFrom<String>` and
/// label-based serde impls.
macro_rules! define_label_enum {
    (
        $(#[$meta:meta])*
        $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident = $label:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $( $(#[$vmeta])* $variant ),+
        }

        impl $name {
            /// Every variant, in declaration order.
            pub const ALL: &'static [$name] = &[ $( $name::$variant ),+ ];

            /// The stored / serialized label.
            pub fn as_str(self) -> &'static str {
                match self {
                    $( $name::$variant => $label ),+
                }
            }
        }

        impl ::std::fmt::Display for $name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl ::std::str::FromStr for $name {
            type Err = $crate::error::CoreError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $( $label => Ok($name::$variant), )+
                    other => Err($crate::error::CoreError::Validation(format!(
                        "Invalid {} '{other}'. Must be one of: {}",
                        stringify!($name),
                        [$( $label ),+].join(", ")
                    ))),
                }
            }
        }

        impl TryFrom<String> for $name {
            type Error = $crate::error::CoreError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                value.parse()
            }
        }

        impl ::serde::Serialize for $name {
            fn serialize<S: ::serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(self.as_str())
            }
        }

        impl<'de> ::serde::Deserialize<'de> for $name {
            fn deserialize<D: ::serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let raw = <String as ::serde::Deserialize>::deserialize(deserializer)?;
                raw.parse().map_err(::serde::de::Error::custom)
            }
        }
    };
}

pub(crate) use define_label_enum;

define_label_enum! {
    /// Certification lifecycle of a project.
    ProjectStatus {
        Draft = "draft",
        Submitted = "submitted",
        ProjectLeadReview = "project_lead_review",
        InspectionScheduled = "inspection_scheduled",
        InspectionInProgress = "inspection_in_progress",
        InspectionCompleted = "inspection_completed",
        ReportSubmitted = "report_submitted",
        HeadConsultantReview = "head_consultant_review",
        ApprovedByAdminLead = "approved_by_admin_lead",
        GovernmentSubmitted = "government_submitted",
        SlfIssued = "slf_issued",
        Completed = "completed",
        Rejected = "rejected",
        Cancelled = "cancelled",
    }
}

define_label_enum! {
    /// Lifecycle of one report version.
    ReportStatus {
        Draft = "draft",
        Submitted = "submitted",
        UnderReview = "under_review",
        Approved = "approved",
        Rejected = "rejected",
        Cancelled = "cancelled",
    }
}

define_label_enum! {
    /// Verification state of an uploaded document.
    DocumentStatus {
        Pending = "pending",
        Uploaded = "uploaded",
        Verified = "verified",
        Rejected = "rejected",
    }
}

define_label_enum! {
    /// Lifecycle of a schedule (inspection, meeting, drafting task).
    ScheduleStatus {
        Scheduled = "scheduled",
        InProgress = "in_progress",
        Completed = "completed",
        Cancelled = "cancelled",
    }
}

define_label_enum! {
    /// What a schedule entry is for.
    ScheduleType {
        Inspection = "inspection",
        Meeting = "meeting",
        ReportDrafting = "report_drafting",
    }
}

define_label_enum! {
    /// Certificate / permit kind that drives the required document set.
    ApplicationType {
        Slf = "slf",
        Pbg = "pbg",
    }
}

define_label_enum! {
    /// Entity kinds referenced by audit rows, chains and notifications.
    EntityKind {
        Project = "project",
        Document = "document",
        Schedule = "schedule",
        Report = "report",
    }
}

define_label_enum! {
    /// Overall state of an approval chain.
    ChainStatus {
        InFlight = "in_flight",
        Approved = "approved",
        Rejected = "rejected",
        Abandoned = "abandoned",
    }
}

define_label_enum! {
    /// Recorded decision of a single approval step.
    StepDecision {
        Pending = "pending",
        Approved = "approved",
        Rejected = "rejected",
    }
}

define_label_enum! {
    /// Whether a checklist answer is still being edited.
    ResponseStatus {
        Draft = "draft",
        Submitted = "submitted",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_round_trip_through_from_str() {
        for status in ProjectStatus::ALL {
            assert_eq!(status.as_str().parse::<ProjectStatus>().unwrap(), *status);
        }
        for status in ReportStatus::ALL {
            assert_eq!(status.as_str().parse::<ReportStatus>().unwrap(), *status);
        }
    }

    #[test]
    fn unknown_label_is_a_validation_error() {
        let err = "approved_by_everyone".parse::<ProjectStatus>().unwrap_err();
        assert!(err.to_string().contains("Invalid ProjectStatus"));
    }

    #[test]
    fn serde_uses_the_label() {
        let json = serde_json::to_string(&ProjectStatus::ApprovedByAdminLead).unwrap();
        assert_eq!(json, "\"approved_by_admin_lead\"");

        let parsed: ScheduleStatus = serde_json::from_str("\"in_progress\"").unwrap();
        assert_eq!(parsed, ScheduleStatus::InProgress);

        assert!(serde_json::from_str::<ScheduleStatus>("\"paused\"").is_err());
    }

    #[test]
    fn try_from_string_matches_from_str() {
        assert_eq!(
            ApplicationType::try_from("pbg".to_string()).unwrap(),
            ApplicationType::Pbg
        );
    }
}
