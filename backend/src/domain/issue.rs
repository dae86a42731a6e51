//! Issues: citizen-reported civic problems with a lifecycle status.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::geo::{Coordinates, Location};
use super::user::UserId;

/// Maximum allowed length for an issue title.
pub const TITLE_MAX: usize = 200;

/// Validation errors for issue fields.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IssueValidationError {
    /// Title was blank once trimmed.
    #[error("title must not be empty")]
    EmptyTitle,
    /// Title exceeded [`TITLE_MAX`] characters.
    #[error("title must be at most {max} characters")]
    TitleTooLong {
        /// Maximum accepted length.
        max: usize,
    },
    /// Description was blank once trimmed.
    #[error("description must not be empty")]
    EmptyDescription,
    /// Category string was not a known category.
    #[error("unknown issue category")]
    UnknownCategory,
    /// Status string was not a known status.
    #[error("unknown issue status")]
    UnknownStatus,
}

/// Stable issue identifier stored as a UUID.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
pub struct IssueId(Uuid);

impl IssueId {
    /// Generate a new random [`IssueId`].
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wrap an existing UUID.
    pub const fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    /// Access the underlying UUID.
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for IssueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Kind of civic problem being reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum IssueCategory {
    /// Road damage such as potholes.
    Road,
    /// Water supply or drainage problems.
    Water,
    /// Street lighting and power faults.
    Electricity,
    /// Waste collection and littering.
    Waste,
    /// Public safety hazards.
    Safety,
    /// Anything that fits no other category.
    Other,
}

impl IssueCategory {
    /// Stable string form used by the persistence layer.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Road => "road",
            Self::Water => "water",
            Self::Electricity => "electricity",
            Self::Waste => "waste",
            Self::Safety => "safety",
            Self::Other => "other",
        }
    }
}

impl FromStr for IssueCategory {
    type Err = IssueValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "road" => Ok(Self::Road),
            "water" => Ok(Self::Water),
            "electricity" => Ok(Self::Electricity),
            "waste" => Ok(Self::Waste),
            "safety" => Ok(Self::Safety),
            "other" => Ok(Self::Other),
            _ => Err(IssueValidationError::UnknownCategory),
        }
    }
}

impl fmt::Display for IssueCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle status of an issue.
///
/// Every transition between two distinct states is currently permitted;
/// the moderation workflow decides policy, not this enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum IssueStatus {
    /// Newly reported, not yet triaged.
    Reported,
    /// Acknowledged and being assessed.
    UnderReview,
    /// Work is underway.
    InProgress,
    /// The underlying problem was fixed.
    Resolved,
    /// No further action will be taken.
    Closed,
}

impl IssueStatus {
    /// Status assigned to every freshly created issue.
    pub const INITIAL: Self = Self::Reported;

    /// Stable string form used by the persistence layer.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Reported => "reported",
            Self::UnderReview => "under_review",
            Self::InProgress => "in_progress",
            Self::Resolved => "resolved",
            Self::Closed => "closed",
        }
    }
}

impl FromStr for IssueStatus {
    type Err = IssueValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "reported" => Ok(Self::Reported),
            "under_review" => Ok(Self::UnderReview),
            "in_progress" => Ok(Self::InProgress),
            "resolved" => Ok(Self::Resolved),
            "closed" => Ok(Self::Closed),
            _ => Err(IssueValidationError::UnknownStatus),
        }
    }
}

impl fmt::Display for IssueStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A reported civic issue together with its owned location.
///
/// ## Invariants
/// - `status` is never mutated without a status log row written in the
///   same transaction.
/// - `reporter_id` is immutable for the lifetime of the issue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Issue {
    /// Stable identifier.
    pub id: IssueId,
    /// Short summary of the problem.
    pub title: String,
    /// Full description of the problem.
    pub description: String,
    /// Kind of problem.
    pub category: IssueCategory,
    /// Current lifecycle status.
    pub status: IssueStatus,
    /// Opaque references to uploaded photos.
    pub photos: Vec<String>,
    /// Account that reported the issue.
    pub reporter_id: UserId,
    /// Owned geographic position.
    pub location: Location,
    /// Record creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last modification timestamp.
    pub updated_at: DateTime<Utc>,
}

/// Validate an issue title.
pub fn validate_title(title: &str) -> Result<(), IssueValidationError> {
    if title.trim().is_empty() {
        return Err(IssueValidationError::EmptyTitle);
    }
    if title.chars().count() > TITLE_MAX {
        return Err(IssueValidationError::TitleTooLong { max: TITLE_MAX });
    }
    Ok(())
}

/// Validate an issue description.
pub fn validate_description(description: &str) -> Result<(), IssueValidationError> {
    if description.trim().is_empty() {
        return Err(IssueValidationError::EmptyDescription);
    }
    Ok(())
}

/// Partial update applied to an issue's descriptive fields.
///
/// Status never travels through a patch; status changes are a separate
/// operation so the audit log is written alongside them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IssuePatch {
    /// Replacement title.
    pub title: Option<String>,
    /// Replacement description.
    pub description: Option<String>,
    /// Replacement category.
    pub category: Option<IssueCategory>,
    /// Replacement coordinates for the owned location.
    pub coordinates: Option<Coordinates>,
    /// Replacement human-readable address.
    pub address: Option<String>,
    /// Photo references appended to the existing list.
    pub appended_photos: Vec<String>,
}

impl IssuePatch {
    /// Whether the patch changes nothing.
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.category.is_none()
            && self.coordinates.is_none()
            && self.address.is_none()
            && self.appended_photos.is_empty()
    }

    /// Validate the fields present in the patch.
    pub fn validate(&self) -> Result<(), IssueValidationError> {
        if let Some(title) = self.title.as_deref() {
            validate_title(title)?;
        }
        if let Some(description) = self.description.as_deref() {
            validate_description(description)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("road", IssueCategory::Road)]
    #[case("water", IssueCategory::Water)]
    #[case("electricity", IssueCategory::Electricity)]
    #[case("waste", IssueCategory::Waste)]
    #[case("safety", IssueCategory::Safety)]
    #[case("other", IssueCategory::Other)]
    fn categories_round_trip_through_strings(#[case] raw: &str, #[case] category: IssueCategory) {
        assert_eq!(raw.parse::<IssueCategory>().expect("known category"), category);
        assert_eq!(category.as_str(), raw);
    }

    #[rstest]
    #[case("reported", IssueStatus::Reported)]
    #[case("under_review", IssueStatus::UnderReview)]
    #[case("in_progress", IssueStatus::InProgress)]
    #[case("resolved", IssueStatus::Resolved)]
    #[case("closed", IssueStatus::Closed)]
    fn statuses_round_trip_through_strings(#[case] raw: &str, #[case] status: IssueStatus) {
        assert_eq!(raw.parse::<IssueStatus>().expect("known status"), status);
        assert_eq!(status.as_str(), raw);
    }

    #[rstest]
    fn unknown_enum_strings_are_rejected() {
        assert_eq!(
            "pothole".parse::<IssueCategory>().expect_err("unknown"),
            IssueValidationError::UnknownCategory
        );
        assert_eq!(
            "done".parse::<IssueStatus>().expect_err("unknown"),
            IssueValidationError::UnknownStatus
        );
    }

    #[rstest]
    #[case("", IssueValidationError::EmptyTitle)]
    #[case("   ", IssueValidationError::EmptyTitle)]
    fn blank_titles_are_rejected(#[case] title: &str, #[case] expected: IssueValidationError) {
        assert_eq!(validate_title(title).expect_err("blank rejected"), expected);
    }

    #[rstest]
    fn overlong_titles_are_rejected() {
        let title = "x".repeat(TITLE_MAX + 1);
        assert_eq!(
            validate_title(&title).expect_err("too long rejected"),
            IssueValidationError::TitleTooLong { max: TITLE_MAX }
        );
    }

    #[rstest]
    fn empty_patch_is_detected() {
        assert!(IssuePatch::default().is_empty());
        let patch = IssuePatch {
            title: Some("New title".to_owned()),
            ..IssuePatch::default()
        };
        assert!(!patch.is_empty());
    }

    #[rstest]
    fn patch_validation_checks_present_fields_only() {
        let patch = IssuePatch {
            description: Some("  ".to_owned()),
            ..IssuePatch::default()
        };
        assert_eq!(
            patch.validate().expect_err("blank description rejected"),
            IssueValidationError::EmptyDescription
        );
        assert!(IssuePatch::default().validate().is_ok());
    }
}
